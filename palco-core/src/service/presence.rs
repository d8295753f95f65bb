//! Room presence: the live set of user ids joined to each room.
//!
//! Joins and leaves mutate the set directly; externally-triggered refreshes
//! hand in a whole snapshot and get back the genuine newcomers, so the
//! caller can announce each of them exactly once.

use dashmap::DashMap;
use indexmap::IndexSet;
use std::sync::Arc;
use tracing::debug;

use crate::events::ServerEvent;
use crate::models::{RoomId, UserId};
use crate::service::hub::EventHub;

#[derive(Clone)]
pub struct PresenceRegistry {
    rooms: Arc<DashMap<RoomId, IndexSet<UserId>>>,
    hub: EventHub,
}

impl std::fmt::Debug for PresenceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceRegistry")
            .field("rooms", &self.rooms.len())
            .finish()
    }
}

impl PresenceRegistry {
    #[must_use]
    pub fn new(hub: EventHub) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            hub,
        }
    }

    /// Add a member. Returns true when the user was genuinely new; the
    /// room gets a fresh presence snapshot and an entered announcement.
    pub fn join(&self, room_id: &RoomId, user_id: &UserId) -> bool {
        let added = self
            .rooms
            .entry(room_id.clone())
            .or_default()
            .insert(user_id.clone());

        if added {
            debug!(room_id = %room_id, user_id = %user_id, "Presence join");
            self.hub.publish_room(
                room_id,
                &ServerEvent::EnteredRoom {
                    room_id: room_id.clone(),
                    user_id: user_id.clone(),
                },
            );
            self.publish_snapshot(room_id);
        }
        added
    }

    /// Remove a member. Returns true when the user was present.
    pub fn leave(&self, room_id: &RoomId, user_id: &UserId) -> bool {
        let removed = self
            .rooms
            .get_mut(room_id)
            .is_some_and(|mut members| members.shift_remove(user_id));

        if removed {
            debug!(room_id = %room_id, user_id = %user_id, "Presence leave");
            self.publish_snapshot(room_id);
        }
        removed
    }

    /// Diff an externally-sourced snapshot against the current membership
    /// and replace it. Returns each genuinely new member exactly once
    /// (never the observer, never someone already present) and announces
    /// them to the room.
    pub fn refresh(
        &self,
        room_id: &RoomId,
        observer: &UserId,
        snapshot: Vec<UserId>,
    ) -> Vec<UserId> {
        let mut entry = self.rooms.entry(room_id.clone()).or_default();
        let previous = std::mem::take(entry.value_mut());

        let mut entered = Vec::new();
        for user_id in snapshot {
            if entry.insert(user_id.clone())
                && !previous.contains(&user_id)
                && user_id != *observer
            {
                entered.push(user_id);
            }
        }
        drop(entry);

        for user_id in &entered {
            self.hub.publish_room(
                room_id,
                &ServerEvent::EnteredRoom {
                    room_id: room_id.clone(),
                    user_id: user_id.clone(),
                },
            );
        }
        if !entered.is_empty() {
            self.publish_snapshot(room_id);
        }
        entered
    }

    #[must_use]
    pub fn snapshot(&self, room_id: &RoomId) -> Vec<UserId> {
        self.rooms
            .get(room_id)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn count(&self, room_id: &RoomId) -> usize {
        self.rooms.get(room_id).map_or(0, |members| members.len())
    }

    #[must_use]
    pub fn contains(&self, room_id: &RoomId, user_id: &UserId) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|members| members.contains(user_id))
    }

    /// Drop the whole membership set (room teardown).
    pub fn remove_room(&self, room_id: &RoomId) {
        self.rooms.remove(room_id);
    }

    fn publish_snapshot(&self, room_id: &RoomId) {
        self.hub.publish_room(
            room_id,
            &ServerEvent::PresenceUpdated {
                room_id: room_id.clone(),
                snapshot: self.snapshot(room_id),
            },
        );
    }
}
