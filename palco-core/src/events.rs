//! Realtime wire protocol: the closed set of frames exchanged over the
//! WebSocket bus. Both directions are tagged enums decoded exhaustively;
//! an unknown `type` is a decode error, not a fall-through.

use serde::{Deserialize, Serialize};

use crate::models::{RankingEntry, RoomId, UserId, UserView};

/// Frames a client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum ClientFrame {
    Auth { token: String },
    ChatMessage { stream_id: RoomId, content: String },
    JoinStream { stream_id: RoomId },
    LeaveStream { stream_id: RoomId },
}

/// Frames the server fans out. Delivery is best-effort and at-most-once; a
/// client that was disconnected re-fetches a full snapshot instead of
/// replaying these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    UserUpdated {
        user: UserView,
    },
    RoomUpdated {
        room_id: RoomId,
        viewer_count: u64,
        ranking: Vec<RankingEntry>,
    },
    NewGift {
        room_id: RoomId,
        sender_id: UserId,
        gift_name: String,
        quantity: i64,
        total_cost: i64,
        ranking: Vec<RankingEntry>,
    },
    GiftReceived {
        receiver_id: UserId,
        gift_name: String,
        quantity: i64,
    },
    FollowUpdated {
        follower_id: UserId,
        target_id: UserId,
        following: bool,
    },
    PresenceUpdated {
        room_id: RoomId,
        snapshot: Vec<UserId>,
    },
    EnteredRoom {
        room_id: RoomId,
        user_id: UserId,
    },
    MicToggled {
        room_id: RoomId,
        user_id: UserId,
        enabled: bool,
    },
    SoundToggled {
        room_id: RoomId,
        user_id: UserId,
        enabled: bool,
    },
    AutoInviteToggled {
        user_id: UserId,
        enabled: bool,
    },
    PkHeartUpdated {
        room_id: RoomId,
        hearts_a: u64,
        hearts_b: u64,
    },
    ChatMessage {
        room_id: RoomId,
        user_id: UserId,
        content: String,
    },
    Error {
        message: String,
    },
}
