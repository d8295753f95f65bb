//! In-process event fan-out hub.
//!
//! Connections register one outbound channel each, then subscribe to room
//! feeds as they join. Publishing walks the subscriber list and pushes the
//! event into each channel; a closed channel prunes the subscriber on the
//! spot. Delivery is best-effort and at-most-once: no queueing for
//! disconnected clients, no retry, no ordering across reconnects.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::events::ServerEvent;
use crate::models::{RoomId, UserId};

pub type ConnectionId = String;

#[derive(Clone)]
struct Subscriber {
    connection_id: ConnectionId,
    sender: mpsc::UnboundedSender<ServerEvent>,
}

struct ConnectionEntry {
    user_id: UserId,
    sender: mpsc::UnboundedSender<ServerEvent>,
    rooms: Vec<RoomId>,
}

#[derive(Clone, Default)]
pub struct EventHub {
    rooms: Arc<DashMap<RoomId, Vec<Subscriber>>>,
    users: Arc<DashMap<UserId, Vec<Subscriber>>>,
    connections: Arc<DashMap<ConnectionId, ConnectionEntry>>,
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("connections", &self.connections.len())
            .field("rooms", &self.rooms.len())
            .finish()
    }
}

impl EventHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an authenticated connection and subscribe it to its user
    /// feed. Returns the receiving end the connection's writer drains.
    pub fn register(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
    ) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();

        self.users
            .entry(user_id.clone())
            .or_default()
            .push(Subscriber {
                connection_id: connection_id.clone(),
                sender: tx.clone(),
            });

        self.connections.insert(
            connection_id,
            ConnectionEntry {
                user_id,
                sender: tx,
                rooms: Vec::new(),
            },
        );

        rx
    }

    /// Subscribe a registered connection to a room feed.
    pub fn join_room(&self, connection_id: &str, room_id: &RoomId) {
        let Some(mut entry) = self.connections.get_mut(connection_id) else {
            return;
        };
        if entry.rooms.contains(room_id) {
            return;
        }
        entry.rooms.push(room_id.clone());

        self.rooms
            .entry(room_id.clone())
            .or_default()
            .push(Subscriber {
                connection_id: connection_id.to_string(),
                sender: entry.sender.clone(),
            });
    }

    pub fn leave_room(&self, connection_id: &str, room_id: &RoomId) {
        if let Some(mut entry) = self.connections.get_mut(connection_id) {
            entry.rooms.retain(|r| r != room_id);
        }
        if let Some(mut subscribers) = self.rooms.get_mut(room_id) {
            subscribers.retain(|s| s.connection_id != connection_id);
        }
    }

    /// Remove a connection from every fan-out set. Called on close, and by
    /// the liveness probe when a socket stops responding.
    pub fn disconnect(&self, connection_id: &str) {
        let Some((_, entry)) = self.connections.remove(connection_id) else {
            return;
        };
        for room_id in &entry.rooms {
            if let Some(mut subscribers) = self.rooms.get_mut(room_id) {
                subscribers.retain(|s| s.connection_id != connection_id);
            }
        }
        if let Some(mut subscribers) = self.users.get_mut(&entry.user_id) {
            subscribers.retain(|s| s.connection_id != connection_id);
        }
        debug!(connection_id, "Connection removed from hub");
    }

    /// Fan an event out to everyone subscribed to a room.
    pub fn publish_room(&self, room_id: &RoomId, event: &ServerEvent) {
        let Some(mut subscribers) = self.rooms.get_mut(room_id) else {
            return;
        };
        subscribers.retain(|s| s.sender.send(event.clone()).is_ok());
    }

    /// Deliver an event to every connection of one user.
    pub fn publish_user(&self, user_id: &UserId, event: &ServerEvent) {
        let Some(mut subscribers) = self.users.get_mut(user_id) else {
            return;
        };
        subscribers.retain(|s| s.sender.send(event.clone()).is_ok());
    }

    /// Drop a room's fan-out set entirely (room teardown).
    pub fn remove_room(&self, room_id: &RoomId) {
        if let Some((_, subscribers)) = self.rooms.remove(room_id) {
            for subscriber in &subscribers {
                if let Some(mut entry) = self.connections.get_mut(&subscriber.connection_id) {
                    entry.rooms.retain(|r| r != room_id);
                }
            }
        }
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn room_subscriber_count(&self, room_id: &RoomId) -> usize {
        self.rooms.get(room_id).map_or(0, |s| s.len())
    }
}
