use std::sync::Arc;
use std::time::Duration;

use sqlx::{Pool, Sqlite};

use crate::config::Config;
use crate::conversation::{ChatOrchestrator, ConversationStore, GenerationBackend, GenerationGateway};
use crate::crypto::TokenIssuer;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Sqlite>,
    pub config: Arc<Config>,
    pub tokens: Arc<TokenIssuer>,
    pub chat: Arc<ChatOrchestrator>,
}

impl AppState {
    pub fn new(db: Pool<Sqlite>, config: Config, backend: Arc<dyn GenerationBackend>) -> Self {
        let tokens = Arc::new(TokenIssuer::new(&config.secret_key));
        let conversations = Arc::new(ConversationStore::new(config.conversation_capacity));
        let gateway = GenerationGateway::new(
            backend,
            Duration::from_secs(config.generation_timeout_secs),
        );
        let chat = Arc::new(ChatOrchestrator::new(db.clone(), conversations, gateway));

        Self {
            db,
            config: Arc::new(config),
            tokens,
            chat,
        }
    }
}
