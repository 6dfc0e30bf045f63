//! HTTP and WebSocket API surface.

pub mod handlers;
pub mod routes;
pub mod ws_handlers;

pub use handlers::{AppError, AppState, ServerState};
pub use routes::create_router;
