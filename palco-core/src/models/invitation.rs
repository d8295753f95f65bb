use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{RoomId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
}

/// Invitation into a (typically private) room. Created on invite-send,
/// consulted by the room-join access check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub room_id: RoomId,
    pub invitee_id: UserId,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    #[must_use]
    pub fn new(room_id: RoomId, invitee_id: UserId) -> Self {
        Self {
            room_id,
            invitee_id,
            status: InvitationStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn accept(&mut self) {
        self.status = InvitationStatus::Accepted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept() {
        let mut invitation = Invitation::new(RoomId::new(), UserId::new());
        assert_eq!(invitation.status, InvitationStatus::Pending);
        invitation.accept();
        assert_eq!(invitation.status, InvitationStatus::Accepted);
    }
}
