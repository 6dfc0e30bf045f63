//! In-memory channel store: one append-only message history plus a live
//! subscriber set per task identifier.
//!
//! Lock discipline: the registry is a read-write lock over `Arc<Channel>`
//! handles; each channel serializes its own mutations behind one mutex, so
//! appends and subscriber edits for the same task never interleave while
//! different tasks proceed in parallel.

use super::types::{ChannelSummary, ChatMessage, ConnectionId, ServerFrame};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::debug;

/// A single task channel: ordered history + live subscribers.
pub struct Channel {
    task_id: String,
    inner: Mutex<ChannelInner>,
}

struct ChannelInner {
    /// Append-only, arrival order. Never mutated in place.
    messages: Vec<ChatMessage>,
    /// Subscriber outbound queues, keyed by connection id. Keeping the
    /// sender here lets fan-out run under the same lock as the append, which
    /// is what makes per-task delivery order match history order.
    subscribers: HashMap<ConnectionId, mpsc::UnboundedSender<ServerFrame>>,
}

impl Channel {
    fn new(task_id: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            inner: Mutex::new(ChannelInner {
                messages: Vec::new(),
                subscribers: HashMap::new(),
            }),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Append a message and fan the given frame out to every subscriber —
    /// including the sender's own connection. Both happen under the channel
    /// lock, so all subscribers observe messages in append order.
    ///
    /// Delivery is fire-and-forget per subscriber: a closed queue is logged
    /// and skipped, never propagated.
    pub async fn append_and_broadcast(&self, message: ChatMessage, frame: ServerFrame) -> usize {
        let mut inner = self.inner.lock().await;
        inner.messages.push(message);

        let mut delivered = 0;
        for (conn_id, tx) in &inner.subscribers {
            match tx.send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    debug!(task_id = %self.task_id, conn_id = %conn_id, "subscriber queue closed, skipping delivery");
                }
            }
        }
        delivered
    }

    /// Add a subscriber and snapshot the current history in one critical
    /// section. Anything appended afterwards reaches the subscriber through
    /// its queue; anything before is in the returned history — no gap, no
    /// duplicate. Re-subscribing an existing connection is a no-op for the
    /// membership and still returns the history.
    pub async fn subscribe_with_history(
        &self,
        conn_id: ConnectionId,
        tx: mpsc::UnboundedSender<ServerFrame>,
        limit: usize,
    ) -> Vec<ChatMessage> {
        let mut inner = self.inner.lock().await;
        inner.subscribers.entry(conn_id).or_insert(tx);
        inner.messages.iter().take(limit).cloned().collect()
    }

    pub async fn unsubscribe(&self, conn_id: ConnectionId) {
        let mut inner = self.inner.lock().await;
        inner.subscribers.remove(&conn_id);
    }

    /// Messages in arrival order, `offset` applied before `limit`. Ranges
    /// beyond the history yield the empty remainder, never an error.
    pub async fn history(&self, limit: usize, offset: usize) -> Vec<ChatMessage> {
        let inner = self.inner.lock().await;
        inner
            .messages
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Live view of the subscriber membership.
    pub async fn subscribers(&self) -> Vec<ConnectionId> {
        let inner = self.inner.lock().await;
        inner.subscribers.keys().copied().collect()
    }

    async fn summary(&self) -> ChannelSummary {
        let inner = self.inner.lock().await;
        ChannelSummary {
            task_id: self.task_id.clone(),
            message_count: inner.messages.len(),
            subscriber_count: inner.subscribers.len(),
            last_message_preview: inner.messages.last().map(|m| m.body.clone()),
        }
    }
}

/// Registry of channels, created lazily and never destroyed (channel
/// lifetime = process lifetime).
#[derive(Default)]
pub struct ChannelStore {
    channels: RwLock<HashMap<String, Arc<Channel>>>,
}

impl ChannelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent lazy create: first call for a task id creates the channel,
    /// later calls return the same handle.
    pub async fn ensure_channel(&self, task_id: &str) -> Arc<Channel> {
        {
            let channels = self.channels.read().await;
            if let Some(channel) = channels.get(task_id) {
                return channel.clone();
            }
        }
        let mut channels = self.channels.write().await;
        channels
            .entry(task_id.to_string())
            .or_insert_with(|| Arc::new(Channel::new(task_id)))
            .clone()
    }

    /// Existing channel handle, if any. Unlike
    /// [`ChannelStore::ensure_channel`] this never creates.
    pub async fn get(&self, task_id: &str) -> Option<Arc<Channel>> {
        self.channels.read().await.get(task_id).cloned()
    }

    /// History of a channel; an unknown task id yields the empty history.
    pub async fn history(&self, task_id: &str, limit: usize, offset: usize) -> Vec<ChatMessage> {
        match self.get(task_id).await {
            Some(channel) => channel.history(limit, offset).await,
            None => Vec::new(),
        }
    }

    /// Listing of all channels for the dashboard.
    pub async fn summaries(&self) -> Vec<ChannelSummary> {
        let channels: Vec<Arc<Channel>> = self.channels.read().await.values().cloned().collect();
        let mut out = Vec::with_capacity(channels.len());
        for channel in channels {
            out.push(channel.summary().await);
        }
        out.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        out
    }
}
