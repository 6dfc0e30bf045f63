//! Task-scoped chat: channel store, fan-out hub, service seam, and the
//! WebSocket client.

pub mod client;
pub mod hub;
pub mod palette;
pub mod service;
pub mod store;
pub mod types;

pub use client::{ConnectionState, RemoteChatService};
pub use hub::ChatHub;
pub use palette::PresenceColorAssigner;
pub use service::{ChatService, LocalChatService};
pub use store::{Channel, ChannelStore};
pub use types::{
    ChannelSummary, ChatMessage, ClientFrame, ConnectionId, ServerFrame, WireMessage,
};
