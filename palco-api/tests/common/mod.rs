use std::sync::Arc;

use palco_api::{AppState, JwtIdentity};
use palco_core::config::RealtimeConfig;
use palco_core::models::{CreateRoomRequest, Room, StaticGiftCatalog, User, UserId};
use palco_core::repository::{
    LedgerRepository, RoomRepository, SnapshotStore, UserRepository,
};
use palco_core::service::{
    EventHub, FollowService, GiftService, PkBattleCoordinator, PresenceRegistry, RoomService,
    SessionRegistry, WalletService, WithdrawalCalculator,
};

pub const TEST_SECRET: &str = "test-secret";

pub fn build_state() -> AppState {
    let users = UserRepository::new(SnapshotStore::disabled());
    let ledger = LedgerRepository::new(SnapshotStore::disabled());
    let rooms = RoomRepository::new();
    let sessions = SessionRegistry::new();
    let hub = EventHub::new();
    let presence = PresenceRegistry::new(hub.clone());
    let battles = PkBattleCoordinator::new(rooms.clone(), hub.clone());
    let follows = FollowService::new(users.clone(), hub.clone());

    let wallet = WalletService::new(
        users.clone(),
        ledger,
        WithdrawalCalculator::default(),
        hub.clone(),
    );
    let gifts = GiftService::new(
        users.clone(),
        rooms.clone(),
        sessions.clone(),
        Arc::new(StaticGiftCatalog::default()),
        follows,
        hub.clone(),
    );
    let room_service = RoomService::new(
        rooms,
        users.clone(),
        sessions,
        presence.clone(),
        battles.clone(),
        hub.clone(),
    );

    let realtime = RealtimeConfig {
        ping_interval_seconds: 1,
        pong_grace_seconds: 5,
        auth_deadline_seconds: 2,
        chat_messages_per_second: 50,
    };
    let chat_limiter = AppState::chat_limiter_for(&realtime);

    AppState {
        users,
        wallet,
        gifts,
        rooms: room_service,
        battles,
        presence,
        hub,
        identity: Arc::new(JwtIdentity::new(TEST_SECRET)),
        realtime,
        chat_limiter,
    }
}

pub async fn seed_user(state: &AppState, username: &str, diamonds: i64) -> UserId {
    let mut user = User::new(username.to_string());
    user.diamonds = diamonds;
    let id = user.id.clone();
    state.users.insert(user).await.expect("seed user");
    id
}

pub async fn seed_room(state: &AppState, host_id: &UserId) -> Room {
    state
        .rooms
        .create_room(
            host_id,
            CreateRoomRequest {
                title: "live".to_string(),
                is_private: false,
                tags: Vec::new(),
                quality: None,
            },
        )
        .await
        .expect("seed room")
}

pub fn token_for(user_id: &UserId) -> String {
    JwtIdentity::new(TEST_SECRET)
        .issue(user_id, chrono::Duration::minutes(5))
        .expect("issue token")
}
