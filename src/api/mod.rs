pub mod auth;
pub mod chat;
pub mod middleware;
pub mod state;

pub use state::AppState;

use axum::{
    http::{header, HeaderValue, Method, StatusCode, Uri},
    middleware as axum_middleware,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/health", get(health))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/chat", post(chat::chat))
        .fallback(not_found)
        // Runs before routing reaches a handler
        .layer(axum_middleware::from_fn(middleware::require_json))
        .layer(axum_middleware::from_fn(middleware::request_logging))
        .layer(CatchPanicLayer::custom(middleware::handle_panic))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn not_found(uri: Uri) -> (StatusCode, Json<serde_json::Value>) {
    tracing::error!(path = %uri.path(), "404 Error");
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Resource not found" })),
    )
}
