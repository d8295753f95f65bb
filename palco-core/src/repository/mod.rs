pub mod ledger;
pub mod room;
pub mod snapshot;
pub mod user;

pub use ledger::LedgerRepository;
pub use room::RoomRepository;
pub use snapshot::SnapshotStore;
pub use user::UserRepository;
