/// Poker-rule violations at action time (§7 `InvalidAction`) — routed back
/// to the acting socket only, never broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("it is not your turn to act")]
    NotYourTurn,
    #[error("you have already folded")]
    AlreadyFolded,
    #[error("you are already all-in")]
    AlreadyAllIn,
    #[error("you are sitting out this hand")]
    SittingOut,
    #[error("cannot check while facing a bet")]
    IllegalCheck,
    #[error("cannot call: no bet to call, check instead")]
    IllegalCall,
    #[error("cannot bet: a bet is already open, raise instead")]
    IllegalBet,
    #[error("cannot raise: no bet is open, bet instead")]
    IllegalRaise,
    #[error("bet must be at least {min} (or all-in)")]
    BetTooSmall { min: crate::domain::Chips },
    #[error("raise must bring the total to at least {min} (or all-in)")]
    RaiseTooSmall { min: crate::domain::Chips },
    #[error("amount exceeds your stack")]
    AmountExceedsStack,
}

/// Invariant violations (§7 `Internal`) — the hand is aborted, committed
/// chips are returned to contributors, and the event is logged, never
/// silently swallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HandError {
    #[error("action rejected: {0}")]
    Action(#[from] ActionError),
    #[error("fewer than two eligible participants to start a hand")]
    NotEnoughParticipants,
    #[error("deck exhausted while dealing")]
    DeckExhausted,
    #[error("no such participant in this hand")]
    UnknownParticipant,
    #[error("hand is not in a phase that accepts actions")]
    NotAcceptingActions,
}

impl HandError {
    /// True for §7 `Internal` kinds (invariant violations: deck exhaustion,
    /// an impossible branch) as opposed to `InvalidAction` (an ordinary rule
    /// violation routed back to the actor). Internal failures are fatal for
    /// the hand and must be logged, never surfaced as if the actor erred.
    pub fn is_internal(&self) -> bool {
        matches!(self, HandError::DeckExhausted)
    }
}
