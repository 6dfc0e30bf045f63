//! API route definitions

use super::handlers::{self, AppState};
use super::ws_handlers;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Work tasks
        .route(
            "/work-tasks",
            get(handlers::list_work_tasks).post(handlers::create_work_task),
        )
        // Link resolution
        .route("/api/resolve-link", post(handlers::resolve_link_handler))
        // Chat channels
        .route("/api/channels", get(handlers::list_channels))
        .route("/ws/chat", get(ws_handlers::ws_chat))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
