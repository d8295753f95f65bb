use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::id::{RoomId, UserId};

/// One gift line inside a sender's session tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftLine {
    pub gift_name: String,
    pub quantity: i64,
}

/// Per-sender tally for the current session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GiftSenderEntry {
    pub gifts_sent: Vec<GiftLine>,
    /// Running diamonds spent in this room session. Monotonically
    /// non-decreasing for the session's lifetime; the ranking sort key.
    pub session_contribution: i64,
}

/// One position of the in-room gifter ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub user_id: UserId,
    pub session_contribution: i64,
}

/// Ephemeral per-room live state. Created with the room, discarded with it;
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveSession {
    pub room_id: RoomId,
    pub viewer_count: u64,
    pub coins_accumulated: i64,
    /// Keyed by sender; iteration order is first-gift order, which breaks
    /// ranking ties.
    pub gift_senders: IndexMap<UserId, GiftSenderEntry>,
}

impl LiveSession {
    #[must_use]
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            viewer_count: 0,
            coins_accumulated: 0,
            gift_senders: IndexMap::new(),
        }
    }

    /// Fold a gift into the sender's tally and the room total.
    pub fn record_gift(&mut self, sender_id: &UserId, gift_name: &str, quantity: i64, total_cost: i64) {
        let entry = self.gift_senders.entry(sender_id.clone()).or_default();
        if let Some(line) = entry.gifts_sent.iter_mut().find(|l| l.gift_name == gift_name) {
            line.quantity += quantity;
        } else {
            entry.gifts_sent.push(GiftLine {
                gift_name: gift_name.to_string(),
                quantity,
            });
        }
        entry.session_contribution += total_cost;
        self.coins_accumulated += total_cost;
    }

    /// Ranking by descending contribution. The sort is stable over the
    /// insertion-ordered map, so equal contributions keep first-gift order.
    #[must_use]
    pub fn ranking(&self) -> Vec<RankingEntry> {
        let mut entries: Vec<RankingEntry> = self
            .gift_senders
            .iter()
            .map(|(user_id, entry)| RankingEntry {
                user_id: user_id.clone(),
                session_contribution: entry.session_contribution,
            })
            .collect();
        entries.sort_by(|a, b| b.session_contribution.cmp(&a.session_contribution));
        entries
    }

    /// The "top gifter" badge holders: the first three ranking positions.
    #[must_use]
    pub fn top_contributors(&self) -> Vec<UserId> {
        self.ranking().into_iter().take(3).map(|e| e.user_id).collect()
    }

    #[must_use]
    pub fn contribution_of(&self, user_id: &UserId) -> i64 {
        self.gift_senders
            .get(user_id)
            .map_or(0, |e| e.session_contribution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_gift_accumulates() {
        let mut session = LiveSession::new(RoomId::new());
        let sender = UserId::new();
        session.record_gift(&sender, "rose", 3, 3);
        session.record_gift(&sender, "rose", 2, 2);
        session.record_gift(&sender, "heart", 1, 5);

        let entry = session.gift_senders.get(&sender).expect("entry exists");
        assert_eq!(entry.session_contribution, 10);
        assert_eq!(entry.gifts_sent.len(), 2);
        assert_eq!(entry.gifts_sent[0].quantity, 5);
        assert_eq!(session.coins_accumulated, 10);
    }

    #[test]
    fn test_ranking_descending_with_insertion_tie_break() {
        let mut session = LiveSession::new(RoomId::new());
        let first = UserId::from("a-first");
        let second = UserId::from("b-second");
        let third = UserId::from("c-third");

        session.record_gift(&first, "rose", 10, 10);
        session.record_gift(&second, "rose", 10, 10);
        session.record_gift(&third, "heart", 4, 20);

        let ranking = session.ranking();
        assert_eq!(ranking[0].user_id, third);
        // first and second are tied; first gifted first and stays ahead.
        assert_eq!(ranking[1].user_id, first);
        assert_eq!(ranking[2].user_id, second);
    }

    #[test]
    fn test_top_contributors_capped_at_three() {
        let mut session = LiveSession::new(RoomId::new());
        for (i, spend) in [40, 30, 20, 10].iter().enumerate() {
            let sender = UserId::from(format!("user-{i}"));
            session.record_gift(&sender, "rose", *spend, *spend);
        }
        let top = session.top_contributors();
        assert_eq!(top.len(), 3);
        assert_eq!(top[0], UserId::from("user-0"));
    }

    #[test]
    fn test_contribution_monotonic() {
        let mut session = LiveSession::new(RoomId::new());
        let sender = UserId::new();
        let mut last = 0;
        for _ in 0..5 {
            session.record_gift(&sender, "rose", 1, 1);
            let now = session.contribution_of(&sender);
            assert!(now >= last);
            last = now;
        }
    }
}
