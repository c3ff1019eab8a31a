//! Shared domain types for the room runtime: identifiers, room configuration,
//! membership records and chat messages.

mod chat;
mod member;
mod room_config;

pub use chat::{ChatMessage, ChatMessageError, CHAT_MESSAGE_MAX_LEN};
pub use member::RoomMemberInfo;
pub use room_config::{RoomConfig, RoomConfigError};

use serde::{Deserialize, Serialize};

pub type RoomId = String;
pub type UserId = String;
pub type SeatNumber = u8;
/// Chip counts are never negative (§3 PlayerState invariant `stack >= 0`).
pub type Chips = u64;

/// Identity handed to the core by the (out of scope) auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub username: String,
    pub email_verified: bool,
}
