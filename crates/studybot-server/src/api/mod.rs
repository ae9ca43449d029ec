pub mod chat;
pub mod error;
pub mod health;
pub mod state;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::config::ServerConfig;
use crate::middleware::cors::build_cors_layer;
pub use state::{AppState, GatewayState};

/// Conversation payloads are small; anything bigger is a client bug.
const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn router(state: AppState, config: &ServerConfig) -> anyhow::Result<Router> {
    let cors = build_cors_layer(&config.cors_origins)?;
    Ok(Router::new()
        .route("/api/chat", post(chat::chat))
        .route("/api/health", get(health::health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state))
}
