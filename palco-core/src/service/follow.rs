//! Follow relationships. Gift sends with an auto-follow flag call into
//! here as a best-effort side effect; failure never rolls back the gift.

use tracing::info;

use crate::events::ServerEvent;
use crate::models::UserId;
use crate::repository::UserRepository;
use crate::service::hub::EventHub;
use crate::{Error, Result};

#[derive(Clone)]
pub struct FollowService {
    users: UserRepository,
    hub: EventHub,
}

impl std::fmt::Debug for FollowService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FollowService").finish()
    }
}

impl FollowService {
    #[must_use]
    pub const fn new(users: UserRepository, hub: EventHub) -> Self {
        Self { users, hub }
    }

    /// Follow `target_id`. Returns false when the follow already existed.
    pub async fn follow(&self, follower_id: &UserId, target_id: &UserId) -> Result<bool> {
        if follower_id == target_id {
            return Err(Error::InvalidInput("Cannot follow yourself".to_string()));
        }
        if !self.users.contains(target_id) {
            return Err(Error::NotFound(format!("User {target_id}")));
        }

        let added = self
            .users
            .update(follower_id, |user| Ok(user.following.insert(target_id.clone())))
            .await?;

        if added {
            info!(follower_id = %follower_id, target_id = %target_id, "Follow created");
            self.broadcast(follower_id, target_id, true);
        }
        Ok(added)
    }

    pub async fn unfollow(&self, follower_id: &UserId, target_id: &UserId) -> Result<bool> {
        let removed = self
            .users
            .update(follower_id, |user| Ok(user.following.remove(target_id)))
            .await?;

        if removed {
            self.broadcast(follower_id, target_id, false);
        }
        Ok(removed)
    }

    pub async fn is_following(&self, follower_id: &UserId, target_id: &UserId) -> Result<bool> {
        Ok(self.users.require(follower_id).await?.is_following(target_id))
    }

    fn broadcast(&self, follower_id: &UserId, target_id: &UserId, following: bool) {
        let event = ServerEvent::FollowUpdated {
            follower_id: follower_id.clone(),
            target_id: target_id.clone(),
            following,
        };
        self.hub.publish_user(follower_id, &event);
        self.hub.publish_user(target_id, &event);
    }
}
