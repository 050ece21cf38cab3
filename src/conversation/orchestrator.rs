use std::sync::Arc;

use sqlx::{Pool, Sqlite};

use crate::conversation::gateway::GenerationGateway;
use crate::conversation::state::ConversationStore;
use crate::db::HistoryLedger;
use crate::error::AppError;

/// Runs one chat turn: memory, generation, durable history.
pub struct ChatOrchestrator {
    db: Pool<Sqlite>,
    conversations: Arc<ConversationStore>,
    gateway: Arc<GenerationGateway>,
}

impl ChatOrchestrator {
    pub fn new(
        db: Pool<Sqlite>,
        conversations: Arc<ConversationStore>,
        gateway: GenerationGateway,
    ) -> Self {
        Self {
            db,
            conversations,
            gateway: Arc::new(gateway),
        }
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    /// The message to act on, or the 400 for a missing/empty one.
    pub fn validate_message(message: Option<&str>) -> Result<&str, AppError> {
        match message {
            Some(m) if !m.is_empty() => Ok(m),
            _ => Err(AppError::Validation("No message provided".to_string())),
        }
    }

    /// Runs the turn on its own task, so dropping the caller (a client
    /// disconnect) neither aborts generation nor skips the history writes.
    pub async fn handle_message(
        &self,
        email: &str,
        message: Option<&str>,
    ) -> Result<String, AppError> {
        let message = Self::validate_message(message)?.to_string();

        let turn = tokio::spawn(run_turn(
            self.db.clone(),
            self.conversations.clone(),
            self.gateway.clone(),
            email.to_string(),
            message,
        ));

        turn.await
            .map_err(|e| AppError::Internal(format!("Chat turn failed: {}", e)))
    }
}

async fn run_turn(
    db: Pool<Sqlite>,
    conversations: Arc<ConversationStore>,
    gateway: Arc<GenerationGateway>,
    email: String,
    message: String,
) -> String {
    let reply = gateway.reply(&message).await;

    // Both entries land under one lock, so this user's pairs never interleave.
    conversations.record_turn(&email, &message, &reply).await;

    let entry = HistoryLedger::format_entry(&message, &reply);
    if let Err(e) = HistoryLedger::append_history(&db, &email, &entry).await {
        tracing::warn!(error = %e, email = %email, "Failed to persist chat history");
    }

    reply
}
