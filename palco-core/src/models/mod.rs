pub mod battle;
pub mod gift;
pub mod id;
pub mod invitation;
pub mod ledger;
pub mod room;
pub mod session;
pub mod user;

pub use battle::{PkBattle, PkTeam};
pub use gift::{GiftCatalog, GiftCatalogEntry, StaticGiftCatalog};
pub use id::{generate_id, RoomId, UserId};
pub use invitation::{Invitation, InvitationStatus};
pub use ledger::{LedgerAccount, LedgerRecord, LedgerRecordKind, LedgerStatus};
pub use room::{CreateRoomRequest, Room, StreamQuality};
pub use session::{GiftLine, GiftSenderEntry, LiveSession, RankingEntry};
pub use user::{OwnedFrame, User, UserView, WithdrawalMethod, LEVEL_THRESHOLDS};
