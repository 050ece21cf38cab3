//! Bridge to the external text-generation service.
//!
//! `GenerationGateway::generate` reports failures as `GatewayError`;
//! `GenerationGateway::reply` is the fail-soft boundary used by the chat loop
//! and always yields text.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::error::AppError;

pub const GREETING: &str = "Hi there! How can I help you today?";
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error.";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Generation backend timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GatewayError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    generations: Vec<Generation>,
}

#[derive(Debug, Deserialize)]
struct Generation {
    text: String,
}

/// Cohere `generate` endpoint.
pub struct CohereBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl CohereBackend {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.generation_timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.cohere_api_url.clone(),
            api_key: config.cohere_api_key.clone(),
            model: config.cohere_model.clone(),
            max_tokens: config.cohere_max_tokens,
        })
    }
}

#[async_trait]
impl GenerationBackend for CohereBackend {
    async fn generate(&self, prompt: &str) -> Result<String, GatewayError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;

        parsed
            .generations
            .into_iter()
            .next()
            .map(|generation| generation.text)
            .ok_or_else(|| GatewayError::Malformed("no generations returned".to_string()))
    }
}

pub struct GenerationGateway {
    backend: Arc<dyn GenerationBackend>,
    timeout: Duration,
}

impl GenerationGateway {
    pub fn new(backend: Arc<dyn GenerationBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Call the backend under the gateway timeout and trim the completion.
    pub async fn generate(&self, prompt: &str) -> Result<String, GatewayError> {
        let text = tokio::time::timeout(self.timeout, self.backend.generate(prompt))
            .await
            .map_err(|_| GatewayError::Timeout(self.timeout))??;

        Ok(text.trim().to_string())
    }

    /// Reply text for a user message. Never fails.
    pub async fn reply(&self, message: &str) -> String {
        if is_greeting(message) {
            return GREETING.to_string();
        }

        let started = std::time::Instant::now();
        match self.generate(message).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Error calling generation backend"
                );
                FALLBACK_REPLY.to_string()
            }
        }
    }
}

pub fn is_greeting(message: &str) -> bool {
    message.to_lowercase().contains("hello")
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Backend stub that records prompts and answers from a script.
    pub struct StubBackend {
        pub calls: AtomicUsize,
        pub prompts: Mutex<Vec<String>>,
        outcome: fn(&str) -> Result<String, GatewayError>,
        delay: Option<Duration>,
    }

    impl StubBackend {
        pub fn replying(outcome: fn(&str) -> Result<String, GatewayError>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
                outcome,
                delay: None,
            }
        }

        pub fn echo() -> Self {
            Self::replying(|prompt| Ok(format!("  echo: {}\n", prompt)))
        }

        pub fn hanging() -> Self {
            Self {
                delay: Some(Duration::from_secs(30)),
                ..Self::echo()
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerationBackend for StubBackend {
        async fn generate(&self, prompt: &str) -> Result<String, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            (self.outcome)(prompt)
        }
    }
}
