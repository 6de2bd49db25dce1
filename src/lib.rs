// Public API for integration tests and potential library usage

pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod protocol;
pub mod state;
pub mod store;
pub mod types;
pub mod ws;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// The full HTTP surface: WebSocket plus the JSON read API
pub fn app(state: Arc<state::AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .merge(api::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
