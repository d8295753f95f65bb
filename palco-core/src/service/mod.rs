pub mod battle;
pub mod follow;
pub mod gift;
pub mod hub;
pub mod presence;
pub mod room;
pub mod session;
pub mod wallet;

pub use battle::PkBattleCoordinator;
pub use follow::FollowService;
pub use gift::{GiftOutcome, GiftService};
pub use hub::{ConnectionId, EventHub};
pub use presence::PresenceRegistry;
pub use room::RoomService;
pub use session::SessionRegistry;
pub use wallet::{
    ExchangeTier, WalletService, WithdrawalCalculator, WithdrawalOutcome, WithdrawalQuote,
};
