use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_backend::{
    api::{create_router, AppState},
    config::Config,
    conversation::CohereBackend,
    db,
    error::AppError,
};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chat_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting chat backend v{}...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    if config.uses_default_secret() {
        tracing::warn!("SECRET_KEY not set, signing tokens with the development default");
    }
    tracing::info!(
        identity = ?config.chat_identity,
        capacity = ?config.conversation_capacity,
        "Configuration loaded"
    );

    let pool = db::connect(&config).await?;
    tracing::info!("Database ready: {}", config.database_url);

    let backend = Arc::new(CohereBackend::new(&config)?);
    tracing::info!(
        model = %config.cohere_model,
        timeout_secs = config.generation_timeout_secs,
        "Generation backend configured"
    );

    let addr = config.server_address();
    let state = AppState::new(pool, config, backend);
    let app = create_router(state);

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("  POST /register - Register new user");
    tracing::info!("  POST /login    - Exchange credentials for a session token");
    tracing::info!("  POST /chat     - Send a chat message");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
