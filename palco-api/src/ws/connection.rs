//! Per-connection lifecycle: authentication, the inbound frame loop, event
//! fan-out draining, and the liveness probe.

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use palco_core::events::{ClientFrame, ServerEvent};
use palco_core::models::{generate_id, RoomId, UserId};

use crate::state::AppState;

pub(super) async fn run(state: AppState, socket: WebSocket, query_token: Option<String>) {
    let (mut sink, mut stream) = socket.split();

    let user_id = match authenticate(&state, &mut stream, query_token).await {
        Ok(user_id) => user_id,
        Err(message) => {
            let _ = send_event(&mut sink, &ServerEvent::Error { message }).await;
            let _ = sink.close().await;
            return;
        }
    };

    let connection_id = generate_id();
    let mut events = state.hub.register(connection_id.clone(), user_id.clone());
    info!(connection_id, user_id = %user_id, "WebSocket connection authenticated");

    let mut joined: Vec<RoomId> = Vec::new();
    let ping_interval = Duration::from_secs(state.realtime.ping_interval_seconds);
    let pong_grace = Duration::from_secs(state.realtime.pong_grace_seconds);
    let mut probe = tokio::time::interval(ping_interval);
    let mut last_pong = Instant::now();

    loop {
        tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    let reply = match serde_json::from_str::<ClientFrame>(&text) {
                        Ok(frame) => {
                            handle_frame(&state, &user_id, &connection_id, &mut joined, frame)
                                .await
                        }
                        Err(e) => Some(ServerEvent::Error {
                            message: format!("Malformed frame: {e}"),
                        }),
                    };
                    if let Some(event) = reply {
                        if send_event(&mut sink, &event).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Pong(_))) => {
                    last_pong = Instant::now();
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // binary and ping frames are ignored
                Some(Err(e)) => {
                    debug!(connection_id, error = %e, "WebSocket read error");
                    break;
                }
            },

            event = events.recv() => match event {
                // A send failure just ends the connection; the client
                // re-syncs on reconnect instead of us queueing.
                Some(event) => {
                    if send_event(&mut sink, &event).await.is_err() {
                        break;
                    }
                }
                None => break,
            },

            _ = probe.tick() => {
                if last_pong.elapsed() > pong_grace {
                    warn!(connection_id, user_id = %user_id, "Liveness probe timed out; closing connection");
                    break;
                }
                if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    state.hub.disconnect(&connection_id);
    for room_id in &joined {
        if let Err(e) = state.rooms.leave_room(room_id, &user_id) {
            debug!(room_id = %room_id, error = %e, "Leave on disconnect");
        }
    }
    let _ = sink.close().await;
    info!(connection_id, user_id = %user_id, "WebSocket connection closed");
}

/// Resolve the connection's identity from the query token or the first
/// AUTH frame, bounded by the configured deadline.
async fn authenticate(
    state: &AppState,
    stream: &mut SplitStream<WebSocket>,
    query_token: Option<String>,
) -> Result<UserId, String> {
    let token = if let Some(token) = query_token {
        token
    } else {
        let deadline = Duration::from_secs(state.realtime.auth_deadline_seconds);
        let first = tokio::time::timeout(deadline, stream.next())
            .await
            .map_err(|_| "Authentication deadline passed".to_string())?;
        match first {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientFrame>(&text) {
                Ok(ClientFrame::Auth { token }) => token,
                Ok(_) => return Err("First frame must be AUTH".to_string()),
                Err(e) => return Err(format!("Malformed frame: {e}")),
            },
            _ => return Err("Connection closed before AUTH".to_string()),
        }
    };

    let user_id = state
        .identity
        .verify(&token)
        .map_err(|e| e.to_string())?;
    if !state.users.contains(&user_id) {
        return Err(format!("Unknown user {user_id}"));
    }
    Ok(user_id)
}

/// Dispatch one inbound frame. Returns an event to send straight back to
/// this socket (errors only); everything else flows through the hub.
async fn handle_frame(
    state: &AppState,
    user_id: &UserId,
    connection_id: &str,
    joined: &mut Vec<RoomId>,
    frame: ClientFrame,
) -> Option<ServerEvent> {
    match frame {
        ClientFrame::Auth { .. } => Some(ServerEvent::Error {
            message: "Already authenticated".to_string(),
        }),

        ClientFrame::JoinStream { stream_id } => {
            match state.rooms.join_room(&stream_id, user_id).await {
                Ok(_) => {
                    state.hub.join_room(connection_id, &stream_id);
                    if !joined.contains(&stream_id) {
                        joined.push(stream_id.clone());
                    }
                    // The snapshot goes straight back so the joiner renders
                    // the room without waiting for the next presence event.
                    Some(ServerEvent::PresenceUpdated {
                        room_id: stream_id.clone(),
                        snapshot: state.presence.snapshot(&stream_id),
                    })
                }
                Err(e) => Some(ServerEvent::Error {
                    message: e.to_string(),
                }),
            }
        }

        ClientFrame::LeaveStream { stream_id } => {
            state.hub.leave_room(connection_id, &stream_id);
            joined.retain(|r| r != &stream_id);
            if let Err(e) = state.rooms.leave_room(&stream_id, user_id) {
                debug!(room_id = %stream_id, error = %e, "Leave stream");
            }
            None
        }

        ClientFrame::ChatMessage { stream_id, content } => {
            if !joined.contains(&stream_id) {
                return Some(ServerEvent::Error {
                    message: "Join the stream before chatting".to_string(),
                });
            }
            if content.is_empty() || content.len() > 500 {
                return Some(ServerEvent::Error {
                    message: "Message must be 1-500 characters".to_string(),
                });
            }
            if state.chat_limiter.check_key(user_id).is_err() {
                return Some(ServerEvent::Error {
                    message: "Chat rate limit exceeded".to_string(),
                });
            }

            state.hub.publish_room(
                &stream_id,
                &ServerEvent::ChatMessage {
                    room_id: stream_id.clone(),
                    user_id: user_id.clone(),
                    content,
                },
            );
            None
        }
    }
}

async fn send_event(
    sink: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(event)
        .unwrap_or_else(|_| r#"{"type":"ERROR","message":"encoding failure"}"#.to_string());
    sink.send(Message::Text(text.into())).await
}
