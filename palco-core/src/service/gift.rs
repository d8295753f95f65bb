//! The gift ledger: one gift send is one atomic state transition across
//! sender balance, receiver earnings, lifetime counters, XP/level and the
//! session contribution tally. Either all of it commits or none of it
//! does, and nothing is broadcast until the committed state is persisted.

use std::sync::Arc;
use tracing::{info, warn};

use crate::events::ServerEvent;
use crate::models::{GiftCatalog, RankingEntry, RoomId, User, UserId, UserView};
use crate::repository::{RoomRepository, UserRepository};
use crate::service::follow::FollowService;
use crate::service::hub::EventHub;
use crate::service::session::SessionRegistry;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct GiftOutcome {
    pub sender: UserView,
    pub receiver: UserView,
    pub total_cost: i64,
    pub ranking: Vec<RankingEntry>,
}

#[derive(Clone)]
pub struct GiftService {
    users: UserRepository,
    rooms: RoomRepository,
    sessions: SessionRegistry,
    catalog: Arc<dyn GiftCatalog>,
    follows: FollowService,
    hub: EventHub,
}

impl std::fmt::Debug for GiftService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GiftService").finish()
    }
}

impl GiftService {
    #[must_use]
    pub fn new(
        users: UserRepository,
        rooms: RoomRepository,
        sessions: SessionRegistry,
        catalog: Arc<dyn GiftCatalog>,
        follows: FollowService,
        hub: EventHub,
    ) -> Self {
        Self {
            users,
            rooms,
            sessions,
            catalog,
            follows,
            hub,
        }
    }

    pub async fn send_gift(
        &self,
        sender_id: &UserId,
        room_id: &RoomId,
        gift_name: &str,
        quantity: i64,
    ) -> Result<GiftOutcome> {
        if quantity < 1 {
            return Err(Error::InvalidInput(
                "Gift quantity must be at least 1".to_string(),
            ));
        }
        let gift = self
            .catalog
            .get(gift_name)
            .ok_or_else(|| Error::NotFound(format!("Gift {gift_name}")))?;
        let room = self.rooms.require(room_id)?;
        let receiver_id = room.host_id.clone();

        let total_cost = gift.price.checked_mul(quantity).ok_or_else(|| {
            Error::InvalidInput("Gift quantity overflows the diamond cost".to_string())
        })?;

        // The whole financial transition runs inside the per-user locks;
        // a failed balance check commits nothing.
        let (sender_view, receiver_view) = if sender_id == &receiver_id {
            self.users
                .update(sender_id, |user| {
                    Self::apply_sender(user, total_cost, quantity)?;
                    Self::apply_receiver(user, &gift.name, total_cost, quantity);
                    Ok((UserView::from(&*user), UserView::from(&*user)))
                })
                .await?
        } else {
            self.users
                .update_pair(sender_id, &receiver_id, |sender, receiver| {
                    Self::apply_sender(sender, total_cost, quantity)?;
                    Self::apply_receiver(receiver, &gift.name, total_cost, quantity);
                    Ok((UserView::from(&*sender), UserView::from(&*receiver)))
                })
                .await?
        };

        let ranking = self
            .sessions
            .record_gift(room_id, sender_id, &gift.name, quantity, total_cost)?;

        info!(
            sender_id = %sender_id,
            receiver_id = %receiver_id,
            room_id = %room_id,
            gift = %gift.name,
            quantity,
            total_cost,
            "Gift sent"
        );

        self.hub.publish_user(
            sender_id,
            &ServerEvent::UserUpdated {
                user: sender_view.clone(),
            },
        );
        self.hub.publish_user(
            &receiver_id,
            &ServerEvent::UserUpdated {
                user: receiver_view.clone(),
            },
        );
        self.hub.publish_user(
            &receiver_id,
            &ServerEvent::GiftReceived {
                receiver_id: receiver_id.clone(),
                gift_name: gift.name.clone(),
                quantity,
            },
        );
        self.hub.publish_room(
            room_id,
            &ServerEvent::NewGift {
                room_id: room_id.clone(),
                sender_id: sender_id.clone(),
                gift_name: gift.name.clone(),
                quantity,
                total_cost,
                ranking: ranking.clone(),
            },
        );

        if gift.triggers_auto_follow && sender_id != &receiver_id {
            // Best effort: the gift stands even if the follow fails.
            match self.follows.follow(sender_id, &receiver_id).await {
                Ok(_) | Err(Error::InvalidInput(_)) => {}
                Err(e) => {
                    warn!(
                        sender_id = %sender_id,
                        receiver_id = %receiver_id,
                        error = %e,
                        "Auto-follow after gift failed"
                    );
                }
            }
        }

        Ok(GiftOutcome {
            sender: sender_view,
            receiver: receiver_view,
            total_cost,
            ranking,
        })
    }

    fn apply_sender(sender: &mut User, total_cost: i64, quantity: i64) -> Result<()> {
        if sender.diamonds < total_cost {
            return Err(Error::InsufficientBalance(format!(
                "Diamond balance {} below gift cost {total_cost}",
                sender.diamonds
            )));
        }
        sender.diamonds -= total_cost;
        sender.gifts_sent_total += quantity;
        sender.apply_xp(total_cost);
        Ok(())
    }

    fn apply_receiver(receiver: &mut User, gift_name: &str, total_cost: i64, quantity: i64) {
        receiver.earnings += total_cost;
        receiver.gifts_received_total += quantity;
        receiver.record_received_gift(gift_name, quantity);
        receiver.apply_xp(total_cost);
    }
}
