use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::api::middleware::JsonBody;
use crate::api::state::AppState;
use crate::db::CredentialStore;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub email: String,
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CredentialsRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    CredentialStore::register(&state.db, &req.email, &req.password).await?;

    tracing::info!(email = %req.email, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User registered successfully".to_string(),
        }),
    ))
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CredentialsRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = CredentialStore::verify_credentials(&state.db, &req.email, &req.password).await?;

    let signed = state
        .tokens
        .issue(&user.email)
        .map_err(|e| AppError::Internal(format!("Token issue failed: {}", e)))?;

    tracing::info!(email = %user.email, expires_at = signed.expires_at, "Session token issued");

    Ok(Json(LoginResponse {
        token: signed.token,
        user: UserSummary { email: user.email },
    }))
}
