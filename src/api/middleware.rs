use std::any::Any;
use std::time::Instant;

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Request},
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;

use crate::crypto::TokenIssuer;
use crate::error::AppError;

pub const INVALID_JSON: &str = "Invalid request format. JSON expected.";

/// Wraps every request with start/end timestamps and a structured log line.
pub async fn request_logging(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    tracing::debug!(%method, %path, "Received request");

    let response = next.run(request).await;

    tracing::info!(
        %method,
        %path,
        status = response.status().as_u16(),
        duration_ms = started.elapsed().as_millis() as u64,
        "Request processed"
    );

    response
}

/// Rejects POST/PUT/PATCH bodies that are not declared as JSON.
pub async fn require_json(request: Request, next: Next) -> Result<Response, AppError> {
    let needs_body = matches!(*request.method(), Method::POST | Method::PUT | Method::PATCH);

    if needs_body && !is_json(request.headers()) {
        tracing::warn!(
            method = %request.method(),
            path = %request.uri().path(),
            "Non-JSON request rejected"
        );
        return Err(AppError::Validation(INVALID_JSON.to_string()));
    }

    Ok(next.run(request).await)
}

fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
    else {
        return false;
    };

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

/// JSON body extractor whose every rejection is the documented 400.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            tracing::warn!(reason = %rejection.body_text(), "Unreadable JSON body");
            AppError::Validation(INVALID_JSON.to_string())
        })?;

        Ok(JsonBody(value))
    }
}

/// Subject of the `Authorization: Bearer <token>` header.
pub fn authenticated_email(headers: &HeaderMap, tokens: &TokenIssuer) -> Result<String, AppError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Auth("Missing Authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid Authorization format".to_string()))?;

    Ok(tokens.verify(token)?)
}

pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    AppError::Internal(format!("Handler panicked: {}", detail)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_content_type(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn json_content_types() {
        assert!(is_json(&with_content_type("application/json")));
        assert!(is_json(&with_content_type("application/json; charset=utf-8")));
        assert!(is_json(&with_content_type("application/problem+json")));
        assert!(!is_json(&with_content_type("text/plain")));
        assert!(!is_json(&with_content_type("application/x-www-form-urlencoded")));
        assert!(!is_json(&HeaderMap::new()));
    }

    #[test]
    fn bearer_token_yields_subject() {
        let tokens = TokenIssuer::new("secret");
        let signed = tokens.issue("a@example.com").unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", signed.token)).unwrap(),
        );
        assert_eq!(authenticated_email(&headers, &tokens).unwrap(), "a@example.com");
    }

    #[test]
    fn missing_or_malformed_authorization_is_rejected() {
        let tokens = TokenIssuer::new("secret");
        assert!(matches!(
            authenticated_email(&HeaderMap::new(), &tokens),
            Err(AppError::Auth(_))
        ));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Token abc"));
        assert!(matches!(
            authenticated_email(&headers, &tokens),
            Err(AppError::Auth(_))
        ));
    }
}
