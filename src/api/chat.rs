use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{authenticated_email, JsonBody};
use crate::api::state::AppState;
use crate::config::IdentityMode;
use crate::conversation::ChatOrchestrator;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// POST /chat
///
/// In `body` identity mode the caller names itself through `email`; in `token`
/// mode the bearer token's subject is used and `email` is ignored. A missing
/// message is rejected before identity is looked at, in either mode.
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(req): JsonBody<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    ChatOrchestrator::validate_message(req.message.as_deref())?;

    let email = match state.config.chat_identity {
        IdentityMode::Body => req.email.unwrap_or_default(),
        IdentityMode::Token => authenticated_email(&headers, &state.tokens)?,
    };

    let response = state
        .chat
        .handle_message(&email, req.message.as_deref())
        .await?;

    Ok(Json(ChatResponse { response }))
}
