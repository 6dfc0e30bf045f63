//! API request handlers

use crate::chat::{ChannelSummary, ChatHub};
use crate::tasks::{CreateStatus, WorkTask, WorkTaskStore};
use crate::tracker::{resolve_link, Resolution, TrackerQuery, WorkItem};
use crate::Config;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared server state
pub struct ServerState {
    pub hub: Arc<ChatHub>,
    pub tasks: Arc<WorkTaskStore>,
    pub tracker: Arc<dyn TrackerQuery>,
    pub config: Config,
}

pub type AppState = Arc<ServerState>;

// ============================================================================
// Health check
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Work tasks
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateWorkTaskRequest {
    /// Tracker URL to resolve into a work item.
    pub link: String,
}

#[derive(Debug, Serialize)]
pub struct CreateWorkTaskResponse {
    pub task: WorkTask,
    pub created: bool,
}

pub async fn list_work_tasks(State(state): State<AppState>) -> Json<Vec<WorkTask>> {
    Json(state.tasks.list())
}

/// Resolve a tracker link and register the first resolved item as a work
/// task. Posting the same issue twice is not an error: the existing task
/// comes back with `202 Accepted` instead of `201 Created`.
pub async fn create_work_task(
    State(state): State<AppState>,
    Json(req): Json<CreateWorkTaskRequest>,
) -> Result<impl IntoResponse, AppError> {
    let resolution = resolve_link(
        &req.link,
        &state.config.tracker_base_url,
        state.tracker.as_ref(),
        &CancellationToken::new(),
    )
    .await?;

    let item = resolution
        .items
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound(format!("No issues resolved from {}", req.link)))?;

    let (task, status) = state.tasks.create(item);
    let created = status == CreateStatus::Created;
    let code = if created {
        StatusCode::CREATED
    } else {
        StatusCode::ACCEPTED
    };
    Ok((code, Json(CreateWorkTaskResponse { task, created })))
}

// ============================================================================
// Link resolution
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ResolveLinkRequest {
    pub link: String,
}

#[derive(Debug, Serialize)]
pub struct ResolveLinkResponse {
    pub items: Vec<WorkItem>,
    pub truncated: bool,
}

impl From<Resolution> for ResolveLinkResponse {
    fn from(r: Resolution) -> Self {
        Self {
            items: r.items,
            truncated: r.truncated,
        }
    }
}

pub async fn resolve_link_handler(
    State(state): State<AppState>,
    Json(req): Json<ResolveLinkRequest>,
) -> Result<Json<ResolveLinkResponse>, AppError> {
    let resolution = resolve_link(
        &req.link,
        &state.config.tracker_base_url,
        state.tracker.as_ref(),
        &CancellationToken::new(),
    )
    .await?;
    Ok(Json(resolution.into()))
}

// ============================================================================
// Channels
// ============================================================================

pub async fn list_channels(State(state): State<AppState>) -> Json<Vec<ChannelSummary>> {
    Json(state.hub.store().summaries().await)
}

// ============================================================================
// Error handling
// ============================================================================

pub enum AppError {
    Internal(anyhow::Error),
    NotFound(String),
    BadRequest(String),
    BadGateway(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::Internal(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<crate::error::Error> for AppError {
    fn from(err: crate::error::Error) -> Self {
        use crate::error::Error;
        match err {
            Error::HostMismatch { .. } | Error::NoResolutionStrategy { .. } => {
                AppError::BadRequest(err.to_string())
            }
            Error::QueryRejected { .. } => AppError::BadRequest(err.to_string()),
            Error::IssueNotFound { .. } => AppError::NotFound(err.to_string()),
            Error::TransportUnavailable { .. } => AppError::BadGateway(err.to_string()),
            Error::Cancelled => AppError::Internal(anyhow::anyhow!("resolution cancelled")),
        }
    }
}
