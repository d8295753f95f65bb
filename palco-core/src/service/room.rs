//! Room lifecycle and membership commands.
//!
//! A room exists while its host broadcasts. Closing it (explicitly or by
//! the host leaving) cascades through every piece of per-room state: live
//! session, PK battle, presence set, pending invitations, fan-out set.

use tracing::info;

use crate::events::ServerEvent;
use crate::models::{
    CreateRoomRequest, Invitation, Room, RoomId, UserId,
};
use crate::repository::{RoomRepository, UserRepository};
use crate::service::battle::PkBattleCoordinator;
use crate::service::hub::EventHub;
use crate::service::presence::PresenceRegistry;
use crate::service::session::SessionRegistry;
use crate::{Error, Result};

#[derive(Clone)]
pub struct RoomService {
    rooms: RoomRepository,
    users: UserRepository,
    sessions: SessionRegistry,
    presence: PresenceRegistry,
    battles: PkBattleCoordinator,
    hub: EventHub,
}

impl std::fmt::Debug for RoomService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomService").finish()
    }
}

impl RoomService {
    #[must_use]
    pub const fn new(
        rooms: RoomRepository,
        users: UserRepository,
        sessions: SessionRegistry,
        presence: PresenceRegistry,
        battles: PkBattleCoordinator,
        hub: EventHub,
    ) -> Self {
        Self {
            rooms,
            users,
            sessions,
            presence,
            battles,
            hub,
        }
    }

    /// Open a room for a broadcaster: the room record, its zeroed live
    /// session, and the host's own presence.
    pub async fn create_room(
        &self,
        host_id: &UserId,
        request: CreateRoomRequest,
    ) -> Result<Room> {
        if request.title.trim().is_empty() {
            return Err(Error::InvalidInput("Room title cannot be empty".to_string()));
        }
        self.users.require(host_id).await?;

        let mut room = Room::new(host_id.clone(), request.title);
        room.is_private = request.is_private;
        room.tags = request.tags;
        if let Some(quality) = request.quality {
            room.quality = quality;
        }

        self.rooms.insert(room.clone())?;
        self.sessions.create(room.id.clone());
        self.presence.join(&room.id, host_id);
        self.sync_viewer_count(&room.id);

        info!(room_id = %room.id, host_id = %host_id, "Room created");
        Ok(room)
    }

    /// Join a room as a viewer. Private rooms require an invitation, which
    /// is consumed into the accepted state on first join.
    pub async fn join_room(&self, room_id: &RoomId, user_id: &UserId) -> Result<Room> {
        let room = self.rooms.require(room_id)?;
        self.users.require(user_id).await?;

        if room.is_private && !room.is_host(user_id) {
            match self.rooms.invitation_for(room_id, user_id) {
                Some(_) => self.rooms.accept_invitation(room_id, user_id)?,
                None => {
                    return Err(Error::PermissionDenied(
                        "Room is private and you were not invited".to_string(),
                    ))
                }
            }
        }

        self.presence.join(room_id, user_id);
        self.sync_viewer_count(room_id);
        self.publish_room_state(room_id);
        Ok(room)
    }

    /// Leave a room. The host leaving tears the room down for everyone.
    pub fn leave_room(&self, room_id: &RoomId, user_id: &UserId) -> Result<()> {
        let room = self.rooms.require(room_id)?;

        if room.is_host(user_id) {
            self.close_room(room_id)?;
            return Ok(());
        }

        self.presence.leave(room_id, user_id);
        self.sync_viewer_count(room_id);
        self.publish_room_state(room_id);
        Ok(())
    }

    /// Tear a room down: the cascade drops the live session, PK battle,
    /// presence set, invitations and the room's fan-out subscriptions.
    pub fn close_room(&self, room_id: &RoomId) -> Result<Room> {
        let room = self
            .rooms
            .remove(room_id)
            .ok_or_else(|| Error::NotFound(format!("Room {room_id}")))?;

        let session = self.sessions.remove(room_id);
        self.battles.remove_room(room_id);
        self.presence.remove_room(room_id);
        self.hub.remove_room(room_id);

        info!(
            room_id = %room_id,
            host_id = %room.host_id,
            coins = session.as_ref().map_or(0, |s| s.coins_accumulated),
            "Room closed"
        );
        Ok(room)
    }

    /// Invite a user into the room. Only the host may invite.
    pub async fn invite(
        &self,
        room_id: &RoomId,
        inviter_id: &UserId,
        invitee_id: &UserId,
    ) -> Result<Invitation> {
        let room = self.rooms.require(room_id)?;
        if !room.is_host(inviter_id) {
            return Err(Error::PermissionDenied(
                "Only the host can invite".to_string(),
            ));
        }
        self.users.require(invitee_id).await?;

        let invitation = Invitation::new(room_id.clone(), invitee_id.clone());
        self.rooms.add_invitation(invitation.clone())?;
        Ok(invitation)
    }

    pub fn get_room(&self, room_id: &RoomId) -> Result<Room> {
        self.rooms.require(room_id)
    }

    pub fn toggle_mic(&self, room_id: &RoomId, user_id: &UserId, enabled: bool) -> Result<()> {
        self.rooms.require(room_id)?;
        self.hub.publish_room(
            room_id,
            &ServerEvent::MicToggled {
                room_id: room_id.clone(),
                user_id: user_id.clone(),
                enabled,
            },
        );
        Ok(())
    }

    pub fn toggle_sound(&self, room_id: &RoomId, user_id: &UserId, enabled: bool) -> Result<()> {
        self.rooms.require(room_id)?;
        self.hub.publish_room(
            room_id,
            &ServerEvent::SoundToggled {
                room_id: room_id.clone(),
                user_id: user_id.clone(),
                enabled,
            },
        );
        Ok(())
    }

    pub fn toggle_auto_invite(&self, user_id: &UserId, enabled: bool) {
        self.hub.publish_user(
            user_id,
            &ServerEvent::AutoInviteToggled {
                user_id: user_id.clone(),
                enabled,
            },
        );
    }

    fn sync_viewer_count(&self, room_id: &RoomId) {
        self.sessions
            .set_viewer_count(room_id, self.presence.count(room_id) as u64);
    }

    fn publish_room_state(&self, room_id: &RoomId) {
        let Some(session) = self.sessions.get(room_id) else {
            return;
        };
        self.hub.publish_room(
            room_id,
            &ServerEvent::RoomUpdated {
                room_id: room_id.clone(),
                viewer_count: session.viewer_count,
                ranking: session.ranking(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use crate::repository::SnapshotStore;

    struct Fixture {
        service: RoomService,
        sessions: SessionRegistry,
        presence: PresenceRegistry,
        battles: PkBattleCoordinator,
        host_id: UserId,
        viewer_id: UserId,
    }

    async fn fixture() -> Fixture {
        let users = UserRepository::new(SnapshotStore::disabled());
        let rooms = RoomRepository::new();
        let sessions = SessionRegistry::new();
        let hub = EventHub::new();
        let presence = PresenceRegistry::new(hub.clone());
        let battles = PkBattleCoordinator::new(rooms.clone(), hub.clone());

        let host = User::new("host".to_string());
        let viewer = User::new("viewer".to_string());
        let host_id = host.id.clone();
        let viewer_id = viewer.id.clone();
        users.insert(host).await.expect("insert");
        users.insert(viewer).await.expect("insert");

        let service = RoomService::new(
            rooms,
            users,
            sessions.clone(),
            presence.clone(),
            battles.clone(),
            hub,
        );

        Fixture {
            service,
            sessions,
            presence,
            battles,
            host_id,
            viewer_id,
        }
    }

    fn request(title: &str) -> CreateRoomRequest {
        CreateRoomRequest {
            title: title.to_string(),
            is_private: false,
            tags: Vec::new(),
            quality: None,
        }
    }

    #[tokio::test]
    async fn test_create_join_updates_viewer_count() {
        let fixture = fixture().await;
        let room = fixture
            .service
            .create_room(&fixture.host_id, request("live"))
            .await
            .expect("create");

        fixture
            .service
            .join_room(&room.id, &fixture.viewer_id)
            .await
            .expect("join");

        let session = fixture.sessions.get(&room.id).expect("session");
        assert_eq!(session.viewer_count, 2);
        assert!(fixture.presence.contains(&room.id, &fixture.viewer_id));
    }

    #[tokio::test]
    async fn test_private_room_requires_invitation() {
        let fixture = fixture().await;
        let mut req = request("private");
        req.is_private = true;
        let room = fixture
            .service
            .create_room(&fixture.host_id, req)
            .await
            .expect("create");

        let denied = fixture.service.join_room(&room.id, &fixture.viewer_id).await;
        assert!(matches!(denied, Err(Error::PermissionDenied(_))));

        fixture
            .service
            .invite(&room.id, &fixture.host_id, &fixture.viewer_id)
            .await
            .expect("invite");
        fixture
            .service
            .join_room(&room.id, &fixture.viewer_id)
            .await
            .expect("join after invite");
    }

    #[tokio::test]
    async fn test_only_host_invites() {
        let fixture = fixture().await;
        let room = fixture
            .service
            .create_room(&fixture.host_id, request("live"))
            .await
            .expect("create");

        let result = fixture
            .service
            .invite(&room.id, &fixture.viewer_id, &fixture.host_id)
            .await;
        assert!(matches!(result, Err(Error::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_host_leave_cascades_everything() {
        let fixture = fixture().await;
        let room = fixture
            .service
            .create_room(&fixture.host_id, request("live"))
            .await
            .expect("create");
        fixture
            .service
            .join_room(&room.id, &fixture.viewer_id)
            .await
            .expect("join");
        fixture
            .battles
            .start(&room.id, &UserId::new())
            .expect("battle");

        fixture
            .service
            .leave_room(&room.id, &fixture.host_id)
            .expect("host leave");

        assert!(fixture.service.get_room(&room.id).is_err());
        assert!(fixture.sessions.get(&room.id).is_none());
        assert!(fixture.battles.get(&room.id).is_none());
        assert_eq!(fixture.presence.count(&room.id), 0);
    }

    #[tokio::test]
    async fn test_viewer_leave_keeps_room() {
        let fixture = fixture().await;
        let room = fixture
            .service
            .create_room(&fixture.host_id, request("live"))
            .await
            .expect("create");
        fixture
            .service
            .join_room(&room.id, &fixture.viewer_id)
            .await
            .expect("join");

        fixture
            .service
            .leave_room(&room.id, &fixture.viewer_id)
            .expect("leave");

        assert!(fixture.service.get_room(&room.id).is_ok());
        assert_eq!(fixture.sessions.get(&room.id).expect("session").viewer_count, 1);
    }

    #[tokio::test]
    async fn test_empty_title_rejected() {
        let fixture = fixture().await;
        let result = fixture
            .service
            .create_room(&fixture.host_id, request("  "))
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
