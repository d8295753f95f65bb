//! In-memory room and invitation store. Rooms are live broadcasts; they
//! exist only while their host is on air and are never snapshotted.

use dashmap::DashMap;
use std::sync::Arc;

use crate::models::{Invitation, InvitationStatus, Room, RoomId, UserId};
use crate::{Error, Result};

#[derive(Clone, Default)]
pub struct RoomRepository {
    rooms: Arc<DashMap<RoomId, Room>>,
    invitations: Arc<DashMap<RoomId, Vec<Invitation>>>,
}

impl std::fmt::Debug for RoomRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomRepository")
            .field("count", &self.rooms.len())
            .finish()
    }
}

impl RoomRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, room: Room) -> Result<()> {
        if self.rooms.contains_key(&room.id) {
            return Err(Error::AlreadyExists(format!("Room {}", room.id)));
        }
        self.rooms.insert(room.id.clone(), room);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &RoomId) -> Option<Room> {
        self.rooms.get(id).map(|e| e.value().clone())
    }

    pub fn require(&self, id: &RoomId) -> Result<Room> {
        self.get(id)
            .ok_or_else(|| Error::NotFound(format!("Room {id}")))
    }

    /// Remove the room and its pending invitations; returns the room so the
    /// caller can run the rest of the teardown cascade.
    pub fn remove(&self, id: &RoomId) -> Option<Room> {
        self.invitations.remove(id);
        self.rooms.remove(id).map(|(_, room)| room)
    }

    #[must_use]
    pub fn list(&self) -> Vec<Room> {
        self.rooms.iter().map(|e| e.value().clone()).collect()
    }

    pub fn add_invitation(&self, invitation: Invitation) -> Result<()> {
        if !self.rooms.contains_key(&invitation.room_id) {
            return Err(Error::NotFound(format!("Room {}", invitation.room_id)));
        }
        let mut entry = self
            .invitations
            .entry(invitation.room_id.clone())
            .or_default();
        if entry.iter().any(|i| i.invitee_id == invitation.invitee_id) {
            return Err(Error::AlreadyExists(format!(
                "Invitation for {}",
                invitation.invitee_id
            )));
        }
        entry.push(invitation);
        Ok(())
    }

    #[must_use]
    pub fn invitation_for(&self, room_id: &RoomId, invitee_id: &UserId) -> Option<Invitation> {
        self.invitations.get(room_id).and_then(|list| {
            list.iter()
                .find(|i| i.invitee_id == *invitee_id)
                .cloned()
        })
    }

    pub fn accept_invitation(&self, room_id: &RoomId, invitee_id: &UserId) -> Result<()> {
        let mut list = self
            .invitations
            .get_mut(room_id)
            .ok_or_else(|| Error::NotFound(format!("Invitation for {invitee_id}")))?;
        let invitation = list
            .iter_mut()
            .find(|i| i.invitee_id == *invitee_id)
            .ok_or_else(|| Error::NotFound(format!("Invitation for {invitee_id}")))?;
        invitation.status = InvitationStatus::Accepted;
        Ok(())
    }
}
