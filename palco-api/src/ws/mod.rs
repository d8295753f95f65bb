//! WebSocket realtime bus.
//!
//! One persistent bidirectional connection per client. The first thing a
//! connection must do is authenticate (token query parameter or an `AUTH`
//! frame within the deadline); after that it can join rooms, chat, and
//! receives every event fanned out to its user feed and joined rooms.
//!
//! Delivery is best-effort and at-most-once. A periodic liveness probe
//! pings each connection; one that misses the pong grace window is closed
//! and dropped from every fan-out set, which is not surfaced as an
//! application error.

mod connection;

use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::state::AppState;

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Identity token; may instead arrive in the first AUTH frame.
    pub token: Option<String>,
}

/// WebSocket handler for realtime updates
///
/// `GET /api/ws?token={token}` (or send `{"type":"AUTH","token":...}` as
/// the first frame).
pub async fn websocket_handler(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::run(state, socket, query.token))
}
