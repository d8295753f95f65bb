use governor::{clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;

use palco_core::config::RealtimeConfig;
use palco_core::models::UserId;
use palco_core::repository::UserRepository;
use palco_core::service::{
    EventHub, GiftService, PkBattleCoordinator, PresenceRegistry, RoomService, WalletService,
};

use crate::auth::IdentityProvider;

/// Per-user keyed limiter for chat frames.
pub type ChatRateLimiter =
    RateLimiter<UserId, DefaultKeyedStateStore<UserId>, DefaultClock>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub users: UserRepository,
    pub wallet: WalletService,
    pub gifts: GiftService,
    pub rooms: RoomService,
    pub battles: PkBattleCoordinator,
    pub presence: PresenceRegistry,
    pub hub: EventHub,
    pub identity: Arc<dyn IdentityProvider>,
    pub realtime: RealtimeConfig,
    pub chat_limiter: Arc<ChatRateLimiter>,
}

impl AppState {
    /// Build the keyed chat limiter from the configured per-second quota.
    #[must_use]
    pub fn chat_limiter_for(realtime: &RealtimeConfig) -> Arc<ChatRateLimiter> {
        let per_second = NonZeroU32::new(realtime.chat_messages_per_second)
            .unwrap_or(nonzero!(10u32));
        Arc::new(RateLimiter::keyed(Quota::per_second(per_second)))
    }
}
