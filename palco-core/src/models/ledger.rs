use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Account a ledger record belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum LedgerAccount {
    User(UserId),
    Platform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerRecordKind {
    Purchase,
    GiftSent,
    GiftReceived,
    Withdrawal,
    PlatformFeeIncome,
}

impl LedgerRecordKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::GiftSent => "gift_sent",
            Self::GiftReceived => "gift_received",
            Self::Withdrawal => "withdrawal",
            Self::PlatformFeeIncome => "platform_fee_income",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerStatus {
    Pending,
    Completed,
    Failed,
}

/// Immutable append-only financial record. A withdrawal always produces two
/// of these: the user-facing net record and the platform-facing fee record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub id: String,
    pub account: LedgerAccount,
    pub record_kind: LedgerRecordKind,
    pub amount_brl: Decimal,
    pub amount_coins: i64,
    pub status: LedgerStatus,
    pub created_at: DateTime<Utc>,
}

impl LedgerRecord {
    #[must_use]
    pub fn completed(
        account: LedgerAccount,
        record_kind: LedgerRecordKind,
        amount_brl: Decimal,
        amount_coins: i64,
    ) -> Self {
        Self {
            id: super::id::generate_id(),
            account,
            record_kind,
            amount_brl,
            amount_coins,
            status: LedgerStatus::Completed,
            created_at: Utc::now(),
        }
    }
}
