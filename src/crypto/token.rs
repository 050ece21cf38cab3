//! Session tokens: HS256 JWTs carrying the user's email and an expiry.
//!
//! Tokens are never stored or revoked. A token is valid iff its signature
//! verifies under the process secret and `now < exp`.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifetime of an issued token.
pub const TOKEN_TTL_SECS: i64 = 3600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    /// Subject email.
    user: String,
    /// Expiry (Unix timestamp, seconds).
    exp: i64,
}

/// A signed token plus its expiry.
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub expires_at: i64,
}

pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, email: &str) -> Result<SignedToken, TokenError> {
        self.issue_at(email, Utc::now())
    }

    pub fn issue_at(&self, email: &str, now: DateTime<Utc>) -> Result<SignedToken, TokenError> {
        let expires_at = (now + Duration::seconds(TOKEN_TTL_SECS)).timestamp();
        let claims = SessionClaims {
            user: email.to_string(),
            exp: expires_at,
        };

        // Encoding only fails on key/algorithm mismatch, which HS256 + secret can't hit.
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| {
                tracing::error!(error = %e, "Token signing failed");
                TokenError::Invalid
            })?;

        Ok(SignedToken { token, expires_at })
    }

    /// Returns the subject email of a valid token.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below without leeway.
        validation.validate_exp = false;
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })?;

        if now.timestamp() >= data.claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(data.claims.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn token_valid_within_the_hour() {
        let issuer = TokenIssuer::new("secret");
        let signed = issuer.issue_at("a@example.com", t0()).unwrap();
        assert_eq!(signed.expires_at, t0().timestamp() + TOKEN_TTL_SECS);

        let subject = issuer
            .verify_at(&signed.token, t0() + Duration::seconds(1))
            .unwrap();
        assert_eq!(subject, "a@example.com");
    }

    #[test]
    fn token_expires_exactly_at_one_hour() {
        let issuer = TokenIssuer::new("secret");
        let signed = issuer.issue_at("a@example.com", t0()).unwrap();

        assert_eq!(
            issuer.verify_at(&signed.token, t0() + Duration::seconds(3600)),
            Err(TokenError::Expired)
        );
        assert_eq!(
            issuer.verify_at(&signed.token, t0() + Duration::seconds(3601)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn token_from_other_secret_is_invalid() {
        let signed = TokenIssuer::new("one").issue_at("a@example.com", t0()).unwrap();
        let other = TokenIssuer::new("two");
        assert_eq!(
            other.verify_at(&signed.token, t0()),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn malformed_token_is_invalid() {
        let issuer = TokenIssuer::new("secret");
        assert_eq!(issuer.verify("not.a.jwt"), Err(TokenError::Invalid));
        assert_eq!(issuer.verify(""), Err(TokenError::Invalid));
    }

    #[test]
    fn fresh_token_verifies_against_wall_clock() {
        let issuer = TokenIssuer::new("secret");
        let signed = issuer.issue("b@example.com").unwrap();
        assert_eq!(issuer.verify(&signed.token).unwrap(), "b@example.com");
    }
}
