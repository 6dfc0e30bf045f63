//! Chat data model and wire frames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for a live connection.
pub type ConnectionId = Uuid;

/// One message in a task channel. Immutable once appended; owned by the
/// channel store for the lifetime of the channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique per message — receivers de-duplicate on this, never on sender
    /// comparison.
    pub id: Uuid,
    /// The task identifier owning the channel.
    pub task_id: String,
    pub sender: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(
        task_id: impl Into<String>,
        sender: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id: task_id.into(),
            sender: sender.into(),
            body: body.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A chat message as rendered on the wire, with the sender's presence color
/// attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub message_id: Uuid,
    pub task_id: String,
    pub sender: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    /// Presence color token for the sender (stable per name per process).
    pub color: String,
}

impl WireMessage {
    pub fn from_message(message: &ChatMessage, color: &str) -> Self {
        Self {
            message_id: message.id,
            task_id: message.task_id.clone(),
            sender: message.sender.clone(),
            body: message.body.clone(),
            timestamp: message.timestamp,
            color: color.to_string(),
        }
    }
}

/// Frames sent by a client over the chat WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Watch a task channel. Implicitly leaves the previously joined one.
    Join { task_id: String },
    /// Send a message to the currently joined channel.
    Send { text: String },
}

/// Frames pushed by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Acknowledges a join and replays the channel history.
    Joined {
        task_id: String,
        history: Vec<WireMessage>,
    },
    /// A newly appended message, fanned out to every subscriber of the task
    /// — including the sender; clients de-duplicate by `message_id`.
    MessageReceived(WireMessage),
    /// A recoverable protocol or transport error for this connection only.
    Error { message: String },
}

/// Per-channel listing entry for the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub task_id: String,
    pub message_count: usize,
    pub subscriber_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_preview: Option<String>,
}
