use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{Chips, RoomId, UserId};

const JOIN_CODE_LEN: usize = 8;

/// Durable, (mostly) immutable per-room configuration (§3 RoomConfig).
///
/// `maxPlayers` and `filterProfanity` are the only fields a room owner may
/// change after creation (enforced by the command surface, not this type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomConfig {
    pub room_id: RoomId,
    pub owner_id: UserId,
    pub join_code: String,
    pub max_players: u8,
    pub starting_stack: Chips,
    pub small_blind: Chips,
    pub big_blind: Chips,
    pub ante: Chips,
    pub hand_delay_seconds: u32,
    pub filter_profanity: bool,
    pub public: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RoomConfigError {
    #[error("maxPlayers must be between 2 and 8")]
    MaxPlayersOutOfRange,
    #[error("bigBlind must be strictly greater than smallBlind")]
    BigBlindNotGreater,
    #[error("bigBlind must not exceed startingStack")]
    BigBlindExceedsStack,
    #[error("ante must not exceed startingStack")]
    AnteExceedsStack,
}

impl RoomConfig {
    /// Validates the invariants from §3 / §6.2's `createRoom` policy table.
    pub fn validate(&self) -> Result<(), RoomConfigError> {
        if !(2..=8).contains(&self.max_players) {
            return Err(RoomConfigError::MaxPlayersOutOfRange);
        }
        if self.big_blind <= self.small_blind {
            return Err(RoomConfigError::BigBlindNotGreater);
        }
        if self.big_blind > self.starting_stack {
            return Err(RoomConfigError::BigBlindExceedsStack);
        }
        if self.ante > self.starting_stack {
            return Err(RoomConfigError::AnteExceedsStack);
        }
        Ok(())
    }

    /// Draws a fresh URL-safe join code from an alphanumeric alphabet.
    /// Uniqueness across rooms is the caller's (Room Store's) responsibility.
    pub fn generate_join_code() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(JOIN_CODE_LEN)
            .map(char::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> RoomConfig {
        RoomConfig {
            room_id: "room-1".into(),
            owner_id: "u1".into(),
            join_code: RoomConfig::generate_join_code(),
            max_players: 6,
            starting_stack: 1000,
            small_blind: 10,
            big_blind: 20,
            ante: 0,
            hand_delay_seconds: 3,
            filter_profanity: true,
            public: true,
        }
    }

    #[test]
    fn join_code_has_expected_length() {
        assert_eq!(RoomConfig::generate_join_code().len(), JOIN_CODE_LEN);
    }

    #[test]
    fn rejects_big_blind_not_greater_than_small_blind() {
        let mut cfg = base();
        cfg.big_blind = cfg.small_blind;
        assert_eq!(cfg.validate(), Err(RoomConfigError::BigBlindNotGreater));
    }

    #[test]
    fn rejects_big_blind_over_stack() {
        let mut cfg = base();
        cfg.big_blind = cfg.starting_stack + 1;
        assert_eq!(cfg.validate(), Err(RoomConfigError::BigBlindExceedsStack));
    }

    #[test]
    fn rejects_out_of_range_max_players() {
        let mut cfg = base();
        cfg.max_players = 9;
        assert_eq!(cfg.validate(), Err(RoomConfigError::MaxPlayersOutOfRange));
    }

    #[test]
    fn accepts_well_formed_config() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn room_config_round_trips_through_json() {
        crate::test_utils::serde::assert_round_trip_json(&base());
    }
}
