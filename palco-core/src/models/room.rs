use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::id::{RoomId, UserId};

/// Broadcast quality selected by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamQuality {
    Low,
    Standard,
    High,
}

impl StreamQuality {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Standard => "standard",
            Self::High => "high",
        }
    }
}

impl FromStr for StreamQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "standard" => Ok(Self::Standard),
            "high" => Ok(Self::High),
            _ => Err(format!("Unknown stream quality: {s}")),
        }
    }
}

impl std::fmt::Display for StreamQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A broadcast room. Created when the host goes live, destroyed when the
/// session ends; its live session, presence set and PK battle go with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub host_id: UserId,
    pub title: String,
    pub is_private: bool,
    pub tags: Vec<String>,
    pub quality: StreamQuality,
    pub created_at: DateTime<Utc>,
}

impl Room {
    #[must_use]
    pub fn new(host_id: UserId, title: String) -> Self {
        Self {
            id: RoomId::new(),
            host_id,
            title,
            is_private: false,
            tags: Vec::new(),
            quality: StreamQuality::Standard,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_host(&self, user_id: &UserId) -> bool {
        self.host_id == *user_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub title: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    pub quality: Option<StreamQuality>,
}
