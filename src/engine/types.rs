use serde::{Deserialize, Serialize};

use crate::domain::Chips;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Waiting,
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
    EndHand,
}

/// Blinds/ante for the hand currently being played — embedded in
/// `GameState` per §3 ("embedded roomConfig").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandStakes {
    pub small_blind: Chips,
    pub big_blind: Chips,
    pub ante: Chips,
}

/// The §6.1 client action messages. `amount` is always the target total for
/// the street, never a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlayerAction {
    Fold,
    Check,
    Call,
    Bet { amount: Chips },
    Raise { amount: Chips },
}
