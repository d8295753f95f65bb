//! Registry of live sessions, one per active room. Sessions are created
//! with the room, mutated by the gift path, and discarded with the room;
//! nothing here survives the room's lifetime.

use dashmap::DashMap;
use std::sync::Arc;

use crate::models::{LiveSession, RankingEntry, RoomId, UserId};
use crate::{Error, Result};

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<RoomId, LiveSession>>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("count", &self.sessions.len())
            .finish()
    }
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, room_id: RoomId) {
        self.sessions
            .entry(room_id.clone())
            .or_insert_with(|| LiveSession::new(room_id));
    }

    pub fn remove(&self, room_id: &RoomId) -> Option<LiveSession> {
        self.sessions.remove(room_id).map(|(_, s)| s)
    }

    #[must_use]
    pub fn get(&self, room_id: &RoomId) -> Option<LiveSession> {
        self.sessions.get(room_id).map(|e| e.value().clone())
    }

    /// Fold a gift into the room's session and return the re-sorted
    /// ranking for the announcement.
    pub fn record_gift(
        &self,
        room_id: &RoomId,
        sender_id: &UserId,
        gift_name: &str,
        quantity: i64,
        total_cost: i64,
    ) -> Result<Vec<RankingEntry>> {
        let mut session = self
            .sessions
            .get_mut(room_id)
            .ok_or_else(|| Error::NotFound(format!("Live session for room {room_id}")))?;
        session.record_gift(sender_id, gift_name, quantity, total_cost);
        Ok(session.ranking())
    }

    pub fn set_viewer_count(&self, room_id: &RoomId, count: u64) {
        if let Some(mut session) = self.sessions.get_mut(room_id) {
            session.viewer_count = count;
        }
    }

    #[must_use]
    pub fn ranking(&self, room_id: &RoomId) -> Vec<RankingEntry> {
        self.sessions
            .get(room_id)
            .map(|s| s.ranking())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_gift_requires_session() {
        let registry = SessionRegistry::new();
        let room = RoomId::new();
        let sender = UserId::new();

        assert!(registry
            .record_gift(&room, &sender, "rose", 1, 1)
            .is_err());

        registry.create(room.clone());
        let ranking = registry
            .record_gift(&room, &sender, "rose", 1, 1)
            .expect("recorded");
        assert_eq!(ranking.len(), 1);
        assert_eq!(ranking[0].session_contribution, 1);
    }

    #[test]
    fn test_remove_discards_state() {
        let registry = SessionRegistry::new();
        let room = RoomId::new();
        registry.create(room.clone());
        registry
            .record_gift(&room, &UserId::new(), "rose", 1, 1)
            .expect("recorded");

        let session = registry.remove(&room).expect("present");
        assert_eq!(session.coins_accumulated, 1);
        assert!(registry.get(&room).is_none());
    }
}
