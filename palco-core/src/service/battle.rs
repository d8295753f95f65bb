//! PK battle coordination: two-team heart/score counters per room, kept
//! only while the battle (and room) lives.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

use crate::events::ServerEvent;
use crate::models::{PkBattle, PkTeam, RoomId, UserId};
use crate::repository::RoomRepository;
use crate::service::hub::EventHub;
use crate::{Error, Result};

#[derive(Clone)]
pub struct PkBattleCoordinator {
    battles: Arc<DashMap<RoomId, PkBattle>>,
    rooms: RoomRepository,
    hub: EventHub,
}

impl std::fmt::Debug for PkBattleCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkBattleCoordinator")
            .field("active", &self.battles.len())
            .finish()
    }
}

impl PkBattleCoordinator {
    #[must_use]
    pub fn new(rooms: RoomRepository, hub: EventHub) -> Self {
        Self {
            battles: Arc::new(DashMap::new()),
            rooms,
            hub,
        }
    }

    pub fn start(&self, room_id: &RoomId, opponent_id: &UserId) -> Result<PkBattle> {
        self.rooms.require(room_id)?;
        if self.battles.contains_key(room_id) {
            return Err(Error::AlreadyExists(format!(
                "PK battle in room {room_id}"
            )));
        }
        let battle = PkBattle::new(room_id.clone(), opponent_id.clone());
        self.battles.insert(room_id.clone(), battle.clone());
        info!(room_id = %room_id, opponent_id = %opponent_id, "PK battle started");
        Ok(battle)
    }

    /// Tally one heart and announce the new counters.
    pub fn add_heart(&self, room_id: &RoomId, team: PkTeam) -> Result<(u64, u64)> {
        let (hearts_a, hearts_b) = {
            let mut battle = self
                .battles
                .get_mut(room_id)
                .ok_or_else(|| Error::NotFound(format!("PK battle in room {room_id}")))?;
            battle.add_heart(team);
            (battle.hearts_a, battle.hearts_b)
        };

        self.hub.publish_room(
            room_id,
            &ServerEvent::PkHeartUpdated {
                room_id: room_id.clone(),
                hearts_a,
                hearts_b,
            },
        );
        Ok((hearts_a, hearts_b))
    }

    pub fn end(&self, room_id: &RoomId) -> Result<PkBattle> {
        let (_, battle) = self
            .battles
            .remove(room_id)
            .ok_or_else(|| Error::NotFound(format!("PK battle in room {room_id}")))?;
        info!(room_id = %room_id, hearts_a = battle.hearts_a, hearts_b = battle.hearts_b, "PK battle ended");
        Ok(battle)
    }

    #[must_use]
    pub fn get(&self, room_id: &RoomId) -> Option<PkBattle> {
        self.battles.get(room_id).map(|e| e.value().clone())
    }

    /// Silent teardown hook for the room-close cascade.
    pub fn remove_room(&self, room_id: &RoomId) {
        self.battles.remove(room_id);
    }
}
