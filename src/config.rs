use std::str::FromStr;

use crate::error::AppError;

pub const DEFAULT_SECRET_KEY: &str = "your_secret_key_here";

/// Where `/chat` takes the caller's identity from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityMode {
    /// Trust the `email` field of the request body.
    Body,
    /// Require a bearer token and use its verified subject.
    Token,
}

impl FromStr for IdentityMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "body" => Ok(IdentityMode::Body),
            "token" => Ok(IdentityMode::Token),
            other => Err(AppError::Config(format!(
                "Invalid CHAT_IDENTITY: {} (expected 'body' or 'token')",
                other
            ))),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub secret_key: String,
    pub cohere_api_key: String,
    pub cohere_api_url: String,
    pub cohere_model: String,
    pub cohere_max_tokens: u32,
    pub generation_timeout_secs: u64,
    pub cors_origins: Vec<String>,
    pub chat_identity: IdentityMode,
    pub conversation_capacity: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_host: "0.0.0.0".to_string(),
            server_port: 5000,
            database_url: "sqlite://chatbot.db".to_string(),
            db_max_connections: 20,
            db_min_connections: 1,
            secret_key: DEFAULT_SECRET_KEY.to_string(),
            cohere_api_key: "your-cohere-api-key".to_string(),
            cohere_api_url: "https://api.cohere.ai/v1/generate".to_string(),
            cohere_model: "command".to_string(),
            cohere_max_tokens: 100,
            generation_timeout_secs: 20,
            cors_origins: vec!["http://localhost:3000".to_string()],
            chat_identity: IdentityMode::Body,
            conversation_capacity: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = Config::default();

        Ok(Config {
            server_host: std::env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_var("PORT", defaults.server_port)?,
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            db_min_connections: parse_var("DB_MIN_CONNECTIONS", defaults.db_min_connections)?,
            secret_key: std::env::var("SECRET_KEY").unwrap_or(defaults.secret_key),
            cohere_api_key: std::env::var("COHERE_API_KEY").unwrap_or(defaults.cohere_api_key),
            cohere_api_url: std::env::var("COHERE_API_URL").unwrap_or(defaults.cohere_api_url),
            cohere_model: std::env::var("COHERE_MODEL").unwrap_or(defaults.cohere_model),
            cohere_max_tokens: parse_var("COHERE_MAX_TOKENS", defaults.cohere_max_tokens)?,
            generation_timeout_secs: parse_var(
                "GENERATION_TIMEOUT_SECS",
                defaults.generation_timeout_secs,
            )?,
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or(defaults.cors_origins),
            chat_identity: parse_var("CHAT_IDENTITY", defaults.chat_identity)?,
            conversation_capacity: match parse_var("CONVERSATION_CAPACITY", 0usize)? {
                0 => None,
                n => Some(n),
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }
}

fn parse_var<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_mode_parses_case_insensitively() {
        assert_eq!("Token".parse::<IdentityMode>().unwrap(), IdentityMode::Token);
        assert_eq!(" body ".parse::<IdentityMode>().unwrap(), IdentityMode::Body);
        assert!("cookie".parse::<IdentityMode>().is_err());
    }

    #[test]
    fn origins_are_split_and_trimmed() {
        let origins = parse_origins("http://a.test, http://b.test,,");
        assert_eq!(origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn defaults_flag_the_placeholder_secret() {
        let config = Config::default();
        assert!(config.uses_default_secret());
        assert_eq!(config.server_address(), "0.0.0.0:5000");
        assert_eq!(config.conversation_capacity, None);
    }
}
