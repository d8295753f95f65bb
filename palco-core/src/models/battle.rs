use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::id::{RoomId, UserId};

/// Side of a PK battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PkTeam {
    A,
    B,
}

impl PkTeam {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
        }
    }
}

impl FromStr for PkTeam {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "a" => Ok(Self::A),
            "b" => Ok(Self::B),
            _ => Err(format!("Unknown PK team: {s}")),
        }
    }
}

/// Head-to-head contest between two broadcasters, tallied with viewer
/// hearts. Lives exactly as long as the room does.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PkBattle {
    pub room_id: RoomId,
    pub opponent_id: UserId,
    pub hearts_a: u64,
    pub hearts_b: u64,
    pub score_a: u64,
    pub score_b: u64,
}

impl PkBattle {
    #[must_use]
    pub const fn new(room_id: RoomId, opponent_id: UserId) -> Self {
        Self {
            room_id,
            opponent_id,
            hearts_a: 0,
            hearts_b: 0,
            score_a: 0,
            score_b: 0,
        }
    }

    /// Unbounded monotonic counter; hearts are never removed.
    pub fn add_heart(&mut self, team: PkTeam) {
        match team {
            PkTeam::A => self.hearts_a += 1,
            PkTeam::B => self.hearts_b += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_heart() {
        let mut battle = PkBattle::new(RoomId::new(), UserId::new());
        battle.add_heart(PkTeam::A);
        battle.add_heart(PkTeam::A);
        battle.add_heart(PkTeam::B);
        assert_eq!(battle.hearts_a, 2);
        assert_eq!(battle.hearts_b, 1);
    }

    #[test]
    fn test_team_parse() {
        assert_eq!("A".parse::<PkTeam>(), Ok(PkTeam::A));
        assert_eq!("b".parse::<PkTeam>(), Ok(PkTeam::B));
        assert!("c".parse::<PkTeam>().is_err());
    }
}
