//! Chat service seam. The in-memory and network-backed variants are
//! interchangeable behind one trait, selected at composition time.

use super::hub::ChatHub;
use super::types::{ConnectionId, ServerFrame, WireMessage};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A participant's view of the chat system.
#[async_trait]
pub trait ChatService: Send {
    /// Watch a task channel and replay its history. Implicitly leaves a
    /// previously joined task.
    async fn join(&mut self, task_id: &str) -> Result<Vec<WireMessage>>;

    /// Send to the currently joined task. Blank-after-trim text is a silent
    /// no-op on the server side.
    async fn send(&mut self, text: &str) -> Result<()>;

    /// Next server push. Fails with `TransportUnavailable` when the link to
    /// the hub is gone.
    async fn next_frame(&mut self) -> Result<ServerFrame>;
}

/// In-process variant: talks to the hub directly, no transport.
pub struct LocalChatService {
    hub: Arc<ChatHub>,
    conn_id: ConnectionId,
    incoming: mpsc::UnboundedReceiver<ServerFrame>,
}

impl LocalChatService {
    pub async fn connect(hub: Arc<ChatHub>, name: &str) -> Self {
        let (conn_id, incoming) = hub.connect(name).await;
        Self {
            hub,
            conn_id,
            incoming,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.conn_id
    }
}

#[async_trait]
impl ChatService for LocalChatService {
    async fn join(&mut self, task_id: &str) -> Result<Vec<WireMessage>> {
        let history = self
            .hub
            .join(self.conn_id, task_id)
            .await
            .map_err(|e| Error::transport(e.to_string()))?;
        Ok(history
            .iter()
            .map(|m| WireMessage::from_message(m, self.hub.color_for(&m.sender)))
            .collect())
    }

    async fn send(&mut self, text: &str) -> Result<()> {
        self.hub
            .send(self.conn_id, text)
            .await
            .map(|_| ())
            .map_err(|e| Error::transport(e.to_string()))
    }

    async fn next_frame(&mut self) -> Result<ServerFrame> {
        self.incoming
            .recv()
            .await
            .ok_or_else(|| Error::transport("hub closed the connection"))
    }
}

impl Drop for LocalChatService {
    fn drop(&mut self) {
        // Unregister lazily; the queue is gone either way, so fan-out to
        // this connection already degrades to a logged skip. Dropping
        // outside a runtime leaves the stale entry behind instead of
        // panicking.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let hub = self.hub.clone();
                let conn_id = self.conn_id;
                handle.spawn(async move { hub.disconnect(conn_id).await });
            }
            Err(_) => {
                tracing::debug!(conn_id = %self.conn_id, "dropped outside a runtime, skipping unregister");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::store::ChannelStore;

    #[tokio::test]
    async fn test_local_service_join_send_receive() {
        let hub = Arc::new(ChatHub::new(Arc::new(ChannelStore::new()), 200));
        let mut alex = LocalChatService::connect(hub.clone(), "alex").await;
        let mut jamie = LocalChatService::connect(hub.clone(), "jamie").await;

        assert!(alex.join("T1").await.unwrap().is_empty());
        jamie.join("T1").await.unwrap();

        alex.send("hello").await.unwrap();

        let frame = jamie.next_frame().await.unwrap();
        match frame {
            ServerFrame::MessageReceived(wire) => {
                assert_eq!(wire.sender, "alex");
                assert_eq!(wire.body, "hello");
                assert!(!wire.color.is_empty());
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_history_carries_stable_colors() {
        let hub = Arc::new(ChatHub::new(Arc::new(ChannelStore::new()), 200));
        let mut alex = LocalChatService::connect(hub.clone(), "alex").await;
        alex.join("T1").await.unwrap();
        alex.send("one").await.unwrap();
        alex.send("two").await.unwrap();

        let mut late = LocalChatService::connect(hub.clone(), "late").await;
        let history = late.join("T1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].color, history[1].color);
    }

    #[test]
    fn test_drop_outside_runtime_is_harmless() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let hub = Arc::new(ChatHub::new(Arc::new(ChannelStore::new()), 200));
        let service = rt.block_on(LocalChatService::connect(hub, "alex"));
        drop(rt);
        drop(service);
    }
}
