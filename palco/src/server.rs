//! Server lifecycle management
//!
//! Wires repositories and services together, restores the financial-state
//! snapshot, and runs the HTTP/WebSocket server until shutdown.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use palco_api::{AppState, JwtIdentity};
use palco_core::models::StaticGiftCatalog;
use palco_core::repository::{
    LedgerRepository, RoomRepository, SnapshotStore, UserRepository,
};
use palco_core::service::{
    EventHub, FollowService, GiftService, PkBattleCoordinator, PresenceRegistry, RoomService,
    SessionRegistry, WalletService, WithdrawalCalculator,
};
use palco_core::Config;

/// Container for shared services
#[derive(Clone)]
pub struct Services {
    pub state: AppState,
}

impl Services {
    /// Build every repository and service from configuration and restore
    /// the balances/ledger snapshot before anything is served.
    pub async fn build(config: &Config) -> anyhow::Result<Self> {
        let snapshots = config
            .storage
            .data_dir
            .as_ref()
            .map_or_else(SnapshotStore::disabled, |dir| {
                SnapshotStore::new(PathBuf::from(dir))
            });

        let users = UserRepository::new(snapshots.clone());
        let ledger = LedgerRepository::new(snapshots);
        let restored_users = users.restore().await?;
        let restored_records = ledger.restore().await?;
        info!(restored_users, restored_records, "Snapshot restored");

        let rooms = RoomRepository::new();
        let sessions = SessionRegistry::new();
        let hub = EventHub::new();
        let presence = PresenceRegistry::new(hub.clone());
        let battles = PkBattleCoordinator::new(rooms.clone(), hub.clone());
        let follows = FollowService::new(users.clone(), hub.clone());

        let calculator =
            WithdrawalCalculator::new(config.wallet.tiers.clone(), config.wallet.fee_rate)?;
        let wallet = WalletService::new(users.clone(), ledger, calculator, hub.clone());
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

        let chat_limiter = AppState::chat_limiter_for(&config.realtime);
        let state = AppState {
            users,
            wallet,
            gifts,
            rooms: room_service,
            battles,
            presence,
            hub,
            identity: Arc::new(JwtIdentity::new(&config.auth.jwt_secret)),
            realtime: config.realtime.clone(),
            chat_limiter,
        };

        Ok(Self { state })
    }
}

/// Palco server - HTTP routes plus the WebSocket bus
pub struct PalcoServer {
    config: Config,
    services: Services,
}

impl PalcoServer {
    #[must_use]
    pub const fn new(config: Config, services: Services) -> Self {
        Self { config, services }
    }

    /// Serve until ctrl-c.
    pub async fn run(self) -> anyhow::Result<()> {
        let router = palco_api::create_router(self.services.state);

        let addr = format!("{}:{}", self.config.server.host, self.config.server.http_port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(addr, "HTTP server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    info!("Shutdown signal received");
}
