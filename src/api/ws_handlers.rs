//! WebSocket handler for task-scoped chat
//!
//! One connection per participant. Protocol:
//! - Client → Server: JSON frames (`join`, `send`)
//! - Server → Client: JSON frames (`joined` with history replay,
//!   `message_received`, `error`)
//!
//! The `joined` acknowledgement is written to the socket before any queued
//! live frame, so a joining client always sees history first.

use super::handlers::AppState;
use crate::chat::{ChatMessage, ClientFrame, ServerFrame, WireMessage};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
pub struct WsChatQuery {
    /// Display name of the participant.
    pub name: String,
}

/// WebSocket upgrade handler for `/ws/chat?name={name}`
pub async fn ws_chat(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsChatQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_chat(socket, state, query.name))
}

async fn handle_ws_chat(socket: WebSocket, state: AppState, name: String) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let hub = state.hub.clone();
    let (conn_id, mut outbound) = hub.connect(&name).await;
    info!(%conn_id, participant = %name, "chat client connected");

    // Ping interval (30s)
    let mut ping_interval = interval(Duration::from_secs(30));
    ping_interval.tick().await; // skip first immediate tick

    loop {
        tokio::select! {
            // Forward hub frames to the WebSocket client
            frame = outbound.recv() => {
                match frame {
                    Some(frame) => {
                        if send_frame(&mut ws_sender, &frame).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            // Send periodic pings to detect dead clients
            _ = ping_interval.tick() => {
                if ws_sender.send(Message::Ping(vec![].into())).await.is_err() {
                    debug!(%conn_id, "ping failed, client disconnected");
                    break;
                }
            }

            // Handle incoming frames from the client
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientFrame>(text.as_str()) {
                            Ok(ClientFrame::Join { task_id }) => {
                                match hub.join(conn_id, &task_id).await {
                                    Ok(history) => {
                                        let frame = joined_frame(&hub, &task_id, history);
                                        // Ack before draining any queued live frame
                                        if send_frame(&mut ws_sender, &frame).await.is_err() {
                                            break;
                                        }
                                    }
                                    Err(e) => {
                                        let frame = ServerFrame::Error { message: e.to_string() };
                                        if send_frame(&mut ws_sender, &frame).await.is_err() {
                                            break;
                                        }
                                    }
                                }
                            }
                            Ok(ClientFrame::Send { text }) => {
                                if let Err(e) = hub.send(conn_id, &text).await {
                                    let frame = ServerFrame::Error { message: e.to_string() };
                                    if send_frame(&mut ws_sender, &frame).await.is_err() {
                                        break;
                                    }
                                }
                            }
                            Err(e) => {
                                warn!(%conn_id, error = %e, "unparseable client frame");
                                let frame = ServerFrame::Error {
                                    message: format!("Invalid frame: {e}"),
                                };
                                if send_frame(&mut ws_sender, &frame).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(%conn_id, "client closed connection");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Ping/pong/binary — ignored
                    }
                    Some(Err(e)) => {
                        warn!(%conn_id, error = %e, "websocket receive error");
                        break;
                    }
                }
            }
        }
    }

    hub.disconnect(conn_id).await;
    info!(%conn_id, participant = %name, "chat client disconnected");
}

fn joined_frame(hub: &crate::chat::ChatHub, task_id: &str, history: Vec<ChatMessage>) -> ServerFrame {
    let history = history
        .iter()
        .map(|m| {
            let color = hub.color_for(&m.sender);
            WireMessage::from_message(m, color)
        })
        .collect();
    ServerFrame::Joined {
        task_id: task_id.to_string(),
        history,
    }
}

async fn send_frame(
    sender: &mut (impl futures::Sink<Message, Error = axum::Error> + Unpin),
    frame: &ServerFrame,
) -> Result<(), ()> {
    let text = match serde_json::to_string(frame) {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, "failed to serialize server frame");
            return Ok(());
        }
    };
    sender.send(Message::Text(text.into())).await.map_err(|_| ())
}
