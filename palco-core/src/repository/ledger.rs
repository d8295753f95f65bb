//! Append-only ledger and the platform-earnings accumulator.
//!
//! The accumulator is fed exclusively by withdrawal fees; diamond-purchase
//! revenue is recorded but never credited here. That asymmetry is what the
//! platform-operator balance screen displays and must hold exactly.

use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::snapshot::SnapshotStore;
use crate::models::{LedgerAccount, LedgerRecord, LedgerRecordKind};
use crate::Result;

const SNAPSHOT_NAME: &str = "ledger";

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerState {
    records: Vec<LedgerRecord>,
    platform_earnings: Decimal,
}

#[derive(Clone)]
pub struct LedgerRepository {
    state: Arc<RwLock<LedgerState>>,
    snapshots: SnapshotStore,
}

impl std::fmt::Debug for LedgerRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerRepository")
            .field("records", &self.state.read().records.len())
            .finish()
    }
}

impl LedgerRepository {
    #[must_use]
    pub fn new(snapshots: SnapshotStore) -> Self {
        Self {
            state: Arc::new(RwLock::new(LedgerState::default())),
            snapshots,
        }
    }

    pub async fn restore(&self) -> Result<usize> {
        let Some(loaded) = self.snapshots.read::<LedgerState>(SNAPSHOT_NAME).await? else {
            return Ok(0);
        };
        let count = loaded.records.len();
        *self.state.write() = loaded;
        Ok(count)
    }

    pub async fn append(&self, record: LedgerRecord) -> Result<()> {
        self.state.write().records.push(record);
        self.persist().await
    }

    /// Append a withdrawal's two records as one step: the user-facing net
    /// record and the platform-facing fee record, crediting the
    /// accumulator with the fee. Never produces a single record.
    pub async fn append_withdrawal_pair(
        &self,
        user_record: LedgerRecord,
        fee_record: LedgerRecord,
    ) -> Result<()> {
        debug_assert_eq!(user_record.record_kind, LedgerRecordKind::Withdrawal);
        debug_assert_eq!(fee_record.record_kind, LedgerRecordKind::PlatformFeeIncome);
        debug_assert_eq!(fee_record.account, LedgerAccount::Platform);

        {
            let mut state = self.state.write();
            state.platform_earnings += fee_record.amount_brl;
            state.records.push(user_record);
            state.records.push(fee_record);
        }
        self.persist().await
    }

    #[must_use]
    pub fn platform_earnings(&self) -> Decimal {
        self.state.read().platform_earnings
    }

    #[must_use]
    pub fn records_for(&self, account: &LedgerAccount) -> Vec<LedgerRecord> {
        self.state
            .read()
            .records
            .iter()
            .filter(|r| r.account == *account)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn record_count(&self) -> usize {
        self.state.read().records.len()
    }

    async fn persist(&self) -> Result<()> {
        if !self.snapshots.is_enabled() {
            return Ok(());
        }
        let serialized = {
            let state = self.state.read();
            serde_json::to_value(&*state)?
        };
        self.snapshots.write(SNAPSHOT_NAME, &serialized).await
    }
}
