pub mod gateway;
pub mod orchestrator;
pub mod state;

pub use gateway::{CohereBackend, GatewayError, GenerationBackend, GenerationGateway};
pub use orchestrator::ChatOrchestrator;
pub use state::{Conversation, ConversationStore};
