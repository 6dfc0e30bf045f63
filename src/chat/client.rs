//! Network-backed chat service: a WebSocket client with automatic
//! reconnect.
//!
//! Connection state machine: `Disconnected → Connecting → Connected →
//! Disconnected`. Reconnect uses capped exponential backoff and surfaces
//! persistent failure as `TransportUnavailable` instead of retrying forever.
//! The server forgets a dropped connection's subscription, so after a
//! reconnect the caller re-issues `join` for its active task.

use super::service::ChatService;
use super::types::{ClientFrame, ServerFrame, WireMessage};
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

const DEFAULT_CONNECT_ATTEMPTS: u32 = 5;
const INITIAL_BACKOFF: Duration = Duration::from_millis(250);
const MAX_BACKOFF: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket-backed [`ChatService`] variant.
pub struct RemoteChatService {
    /// Full `ws://…/ws/chat?name=…` endpoint.
    endpoint: String,
    state: ConnectionState,
    socket: Option<Socket>,
    /// Pushes that arrived while waiting for a join acknowledgement.
    pending: VecDeque<ServerFrame>,
    max_connect_attempts: u32,
}

impl RemoteChatService {
    /// `server_url` is the HTTP base of the hub server, e.g.
    /// `ws://127.0.0.1:8080`. The participant name travels as a query
    /// parameter, percent-encoded.
    pub fn new(server_url: &str, name: &str) -> Self {
        let endpoint = format!(
            "{}/ws/chat?name={}",
            server_url.trim_end_matches('/'),
            urlencoding::encode(name)
        );
        Self {
            endpoint,
            state: ConnectionState::Disconnected,
            socket: None,
            pending: VecDeque::new(),
            max_connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Establish (or re-establish) the connection, with capped exponential
    /// backoff between attempts. Persistent failure surfaces as
    /// `TransportUnavailable` after the attempt budget is spent.
    pub async fn connect(&mut self) -> Result<()> {
        if self.state == ConnectionState::Connected {
            return Ok(());
        }

        let mut backoff = INITIAL_BACKOFF;
        let mut last_error = String::from("no attempt made");
        for attempt in 1..=self.max_connect_attempts {
            self.state = ConnectionState::Connecting;
            match connect_async(&self.endpoint).await {
                Ok((socket, _response)) => {
                    self.socket = Some(socket);
                    self.state = ConnectionState::Connected;
                    info!(endpoint = %self.endpoint, attempt, "chat transport connected");
                    return Ok(());
                }
                Err(e) => {
                    last_error = e.to_string();
                    self.state = ConnectionState::Disconnected;
                    warn!(attempt, error = %e, "chat transport connect failed");
                    if attempt < self.max_connect_attempts {
                        tokio::time::sleep(backoff).await;
                        backoff = (backoff * 2).min(MAX_BACKOFF);
                    }
                }
            }
        }
        Err(Error::transport(format!(
            "gave up connecting after {} attempts: {}",
            self.max_connect_attempts, last_error
        )))
    }

    /// Drop the transport. The next `join` or `send` establishes a fresh
    /// connection; the server forgets the old subscription, so callers
    /// re-issue `join` for their active task afterwards.
    pub fn disconnect(&mut self) {
        if self.socket.is_some() {
            debug!("chat transport closed by client");
        }
        self.drop_transport();
        self.pending.clear();
    }

    fn drop_transport(&mut self) {
        self.socket = None;
        self.state = ConnectionState::Disconnected;
    }

    async fn send_frame(&mut self, frame: &ClientFrame) -> Result<()> {
        self.connect().await?;
        let text = serde_json::to_string(frame)
            .map_err(|e| Error::transport(format!("frame serialization failed: {e}")))?;
        let socket = self
            .socket
            .as_mut()
            .ok_or_else(|| Error::transport("not connected"))?;
        if let Err(e) = socket.send(Message::Text(text.into())).await {
            self.drop_transport();
            return Err(Error::transport(format!("send failed: {e}")));
        }
        Ok(())
    }

    /// Read the next server frame off the socket, skipping transport-level
    /// control messages.
    async fn read_frame(&mut self) -> Result<ServerFrame> {
        loop {
            let socket = self
                .socket
                .as_mut()
                .ok_or_else(|| Error::transport("not connected"))?;
            match socket.next().await {
                Some(Ok(Message::Text(text))) => match serde_json::from_str(text.as_str()) {
                    Ok(frame) => return Ok(frame),
                    Err(e) => {
                        debug!(error = %e, "ignoring unparseable server frame");
                    }
                },
                Some(Ok(Message::Close(_))) | None => {
                    self.drop_transport();
                    return Err(Error::transport("server closed the connection"));
                }
                Some(Ok(_)) => {
                    // Ping/pong/binary — nothing to surface.
                }
                Some(Err(e)) => {
                    self.drop_transport();
                    return Err(Error::transport(format!("read failed: {e}")));
                }
            }
        }
    }
}

#[async_trait]
impl ChatService for RemoteChatService {
    async fn join(&mut self, task_id: &str) -> Result<Vec<WireMessage>> {
        self.send_frame(&ClientFrame::Join {
            task_id: task_id.to_string(),
        })
        .await?;

        // Wait for the acknowledgement; pushes racing the join are queued so
        // the consumer still sees them after the history replay.
        loop {
            match self.read_frame().await? {
                ServerFrame::Joined {
                    task_id: acked,
                    history,
                } if acked == task_id => return Ok(history),
                ServerFrame::Error { message } => return Err(Error::transport(message)),
                other => self.pending.push_back(other),
            }
        }
    }

    async fn send(&mut self, text: &str) -> Result<()> {
        self.send_frame(&ClientFrame::Send {
            text: text.to_string(),
        })
        .await
    }

    async fn next_frame(&mut self) -> Result<ServerFrame> {
        if let Some(frame) = self.pending.pop_front() {
            return Ok(frame);
        }
        self.read_frame().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_surfaces_persistent_failure() {
        // Nothing listens on this port; every attempt must fail and the
        // state machine must end Disconnected with a transport error.
        let mut client = RemoteChatService::new("ws://127.0.0.1:1", "alex");
        client.max_connect_attempts = 2;

        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, Error::TransportUnavailable { .. }));
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_endpoint_encodes_participant_name() {
        let client = RemoteChatService::new("ws://localhost:8080/", "Alex Müller");
        assert_eq!(
            client.endpoint,
            "ws://localhost:8080/ws/chat?name=Alex%20M%C3%BCller"
        );
    }
}
