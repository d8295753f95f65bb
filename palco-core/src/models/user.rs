use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::id::UserId;

/// Cumulative XP required to reach each level. Index N holds the XP needed
/// to advance past level N; level 1 is the floor for every account.
pub const LEVEL_THRESHOLDS: &[i64] = &[0, 100, 500, 1_500, 5_000, 15_000, 50_000, 150_000];

/// Saved payout destination for earnings withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WithdrawalMethod {
    Pix { key: String },
    Bank { bank: String, branch: String, account: String },
}

impl WithdrawalMethod {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pix { .. } => "pix",
            Self::Bank { .. } => "bank",
        }
    }
}

/// Avatar frame owned by a user, granted with an expiration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedFrame {
    pub frame_id: String,
    pub expires_at: DateTime<Utc>,
}

impl OwnedFrame {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,

    /// Spendable virtual currency, purchased with real money. Never negative.
    pub diamonds: i64,

    /// Currency accrued from gifts received, withdrawable. Never negative.
    pub earnings: i64,

    /// Lifetime diamonds withdrawn.
    pub earnings_withdrawn: i64,

    pub xp: i64,
    pub level: u32,

    pub owned_frames: Vec<OwnedFrame>,
    pub withdrawal_method: Option<WithdrawalMethod>,

    /// Lifetime counters shown on the profile.
    pub gifts_sent_total: i64,
    pub gifts_received_total: i64,

    /// Aggregate of gifts received, by gift name (profile display).
    pub received_gifts: BTreeMap<String, i64>,

    /// Users this user follows.
    pub following: BTreeSet<UserId>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn new(username: String) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            username,
            diamonds: 0,
            earnings: 0,
            earnings_withdrawn: 0,
            xp: 0,
            level: 1,
            owned_frames: Vec::new(),
            withdrawal_method: None,
            gifts_sent_total: 0,
            gifts_received_total: 0,
            received_gifts: BTreeMap::new(),
            following: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add XP and re-evaluate the level by walking the threshold table
    /// upward. A single large grant can cross several thresholds; the level
    /// never moves down. Returns the number of levels gained.
    pub fn apply_xp(&mut self, amount: i64) -> u32 {
        self.xp += amount;
        let before = self.level;
        while (self.level as usize) < LEVEL_THRESHOLDS.len()
            && self.xp >= LEVEL_THRESHOLDS[self.level as usize]
        {
            self.level += 1;
        }
        self.level - before
    }

    /// Record a received gift line into the profile aggregate.
    pub fn record_received_gift(&mut self, gift_name: &str, quantity: i64) {
        *self.received_gifts.entry(gift_name.to_string()).or_insert(0) += quantity;
    }

    #[must_use]
    pub fn is_following(&self, target: &UserId) -> bool {
        self.following.contains(target)
    }

    #[must_use]
    pub const fn has_withdrawal_method(&self) -> bool {
        self.withdrawal_method.is_some()
    }
}

/// Client-facing projection of a user, safe to broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub diamonds: i64,
    pub earnings: i64,
    pub xp: i64,
    pub level: u32,
    pub gifts_sent_total: i64,
    pub gifts_received_total: i64,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            diamonds: user.diamonds,
            earnings: user.earnings,
            xp: user.xp,
            level: user.level,
            gifts_sent_total: user.gifts_sent_total,
            gifts_received_total: user.gifts_received_total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_xp_single_threshold() {
        let mut user = User::new("ana".to_string());
        let gained = user.apply_xp(100);
        assert_eq!(gained, 1);
        assert_eq!(user.level, 2);
    }

    #[test]
    fn test_apply_xp_multi_step_jump() {
        let mut user = User::new("ana".to_string());
        // 5_000 XP crosses the 100, 500, 1_500 and 5_000 thresholds at once.
        let gained = user.apply_xp(5_000);
        assert_eq!(gained, 4);
        assert_eq!(user.level, 5);
    }

    #[test]
    fn test_level_never_decreases() {
        let mut user = User::new("ana".to_string());
        user.apply_xp(600);
        let level = user.level;
        user.apply_xp(0);
        assert_eq!(user.level, level);
        user.apply_xp(1);
        assert!(user.level >= level);
    }

    #[test]
    fn test_received_gift_aggregate() {
        let mut user = User::new("ana".to_string());
        user.record_received_gift("rose", 2);
        user.record_received_gift("rose", 3);
        user.record_received_gift("car", 1);
        assert_eq!(user.received_gifts.get("rose"), Some(&5));
        assert_eq!(user.received_gifts.get("car"), Some(&1));
    }

    #[test]
    fn test_frame_expiration() {
        let frame = OwnedFrame {
            frame_id: "neon".to_string(),
            expires_at: Utc::now() - chrono::Duration::hours(1),
        };
        assert!(frame.is_expired(Utc::now()));
    }
}
