use serde::{Deserialize, Serialize};

use super::{RoomId, UserId};

/// Maximum length of a chat message body (§6.1(b) rate/size limit).
pub const CHAT_MESSAGE_MAX_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub username: String,
    pub message: String,
    pub timestamp: i64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChatMessageError {
    #[error("chat message must not be empty")]
    Empty,
    #[error("chat message exceeds {CHAT_MESSAGE_MAX_LEN} characters")]
    TooLong,
}

impl ChatMessage {
    pub fn validate_body(body: &str) -> Result<(), ChatMessageError> {
        if body.is_empty() {
            return Err(ChatMessageError::Empty);
        }
        if body.chars().count() > CHAT_MESSAGE_MAX_LEN {
            return Err(ChatMessageError::TooLong);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_message() {
        assert_eq!(ChatMessage::validate_body(""), Err(ChatMessageError::Empty));
    }

    #[test]
    fn rejects_message_over_limit() {
        let body = "a".repeat(CHAT_MESSAGE_MAX_LEN + 1);
        assert_eq!(ChatMessage::validate_body(&body), Err(ChatMessageError::TooLong));
    }

    #[test]
    fn accepts_message_at_limit() {
        let body = "a".repeat(CHAT_MESSAGE_MAX_LEN);
        assert!(ChatMessage::validate_body(&body).is_ok());
    }
}
