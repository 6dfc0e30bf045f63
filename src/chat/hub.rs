//! Connection lifecycle and message routing.
//!
//! One registry entry per live connection, each with its own outbound frame
//! queue; the WebSocket handler (or an in-process service) drains the queue.
//! All channel state lives in [`ChannelStore`]; the hub only tracks which
//! task each connection currently watches.

use super::palette::PresenceColorAssigner;
use super::store::ChannelStore;
use super::types::{ChatMessage, ConnectionId, ServerFrame, WireMessage};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};

struct ConnectionEntry {
    name: String,
    /// At most one joined task; joining another implicitly leaves this one.
    joined_task: Option<String>,
    outbound: mpsc::UnboundedSender<ServerFrame>,
}

/// Server-side hub: accepts connections, routes joins and sends, fans
/// appended messages out to every watcher of the task.
pub struct ChatHub {
    store: Arc<ChannelStore>,
    palette: PresenceColorAssigner,
    connections: RwLock<HashMap<ConnectionId, ConnectionEntry>>,
    /// History bound applied on join replay.
    history_page_size: usize,
}

impl ChatHub {
    pub fn new(store: Arc<ChannelStore>, history_page_size: usize) -> Self {
        Self {
            store,
            palette: PresenceColorAssigner::new(),
            connections: RwLock::new(HashMap::new()),
            history_page_size,
        }
    }

    pub fn store(&self) -> &Arc<ChannelStore> {
        &self.store
    }

    /// Presence color for a participant name.
    pub fn color_for(&self, name: &str) -> &'static str {
        self.palette.color_for(name)
    }

    /// Register a connection. The returned receiver is the connection's
    /// outbound queue; the transport layer drains it into the socket.
    pub async fn connect(&self, name: &str) -> (ConnectionId, mpsc::UnboundedReceiver<ServerFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn_id = ConnectionId::new_v4();
        self.connections.write().await.insert(
            conn_id,
            ConnectionEntry {
                name: name.to_string(),
                joined_task: None,
                outbound: tx,
            },
        );
        info!(conn_id = %conn_id, name = %name, "chat connection registered");
        (conn_id, rx)
    }

    /// Join a task channel: leave the previous one (if any), ensure the
    /// channel exists, subscribe, and return the replayable history.
    /// Re-joining the currently joined task is a no-op that returns the same
    /// history without duplicating the subscription.
    pub async fn join(&self, conn_id: ConnectionId, task_id: &str) -> Result<Vec<ChatMessage>> {
        let mut connections = self.connections.write().await;
        let entry = connections
            .get_mut(&conn_id)
            .ok_or_else(|| anyhow!("unknown connection {conn_id}"))?;

        match &entry.joined_task {
            Some(current) if current == task_id => {}
            Some(previous) => {
                if let Some(channel) = self.store.get(previous).await {
                    channel.unsubscribe(conn_id).await;
                }
                entry.joined_task = Some(task_id.to_string());
            }
            None => entry.joined_task = Some(task_id.to_string()),
        }

        let channel = self.store.ensure_channel(task_id).await;
        let history = channel
            .subscribe_with_history(conn_id, entry.outbound.clone(), self.history_page_size)
            .await;
        debug!(conn_id = %conn_id, task_id = %task_id, replayed = history.len(), "joined channel");
        Ok(history)
    }

    /// Send a message to the connection's joined task. Blank-after-trim text
    /// is a silent no-op (`Ok(None)`). On success the message is appended
    /// and fanned out to every subscriber of the task, the sender included —
    /// receivers de-duplicate by message id.
    pub async fn send(&self, conn_id: ConnectionId, text: &str) -> Result<Option<ChatMessage>> {
        let body = text.trim();
        if body.is_empty() {
            return Ok(None);
        }

        let connections = self.connections.read().await;
        let entry = connections
            .get(&conn_id)
            .ok_or_else(|| anyhow!("unknown connection {conn_id}"))?;
        let task_id = entry
            .joined_task
            .clone()
            .ok_or_else(|| anyhow!("no task joined — join a task before sending"))?;
        let sender = entry.name.clone();
        drop(connections);

        let message = ChatMessage::new(task_id.clone(), sender.clone(), body);
        let frame = ServerFrame::MessageReceived(WireMessage::from_message(
            &message,
            self.palette.color_for(&sender),
        ));

        let channel = self.store.ensure_channel(&task_id).await;
        let delivered = channel.append_and_broadcast(message.clone(), frame).await;
        debug!(
            task_id = %task_id,
            message_id = %message.id,
            delivered,
            "message appended and fanned out"
        );
        Ok(Some(message))
    }

    /// Remove a connection from the registry and from its joined channel's
    /// subscriber set. Safe to call from any state; unknown ids are ignored.
    pub async fn disconnect(&self, conn_id: ConnectionId) {
        let entry = self.connections.write().await.remove(&conn_id);
        if let Some(entry) = entry {
            if let Some(task_id) = entry.joined_task {
                if let Some(channel) = self.store.get(&task_id).await {
                    channel.unsubscribe(conn_id).await;
                }
            }
            info!(conn_id = %conn_id, "chat connection removed");
        }
    }

    /// Number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}
