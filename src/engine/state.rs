use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cards::{Card, Deck};
use crate::domain::{Chips, SeatNumber, UserId};

use super::types::{GamePhase, HandStakes};

/// Per-participant record inside a hand (§3 PlayerState).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub user_id: UserId,
    pub seat_number: SeatNumber,
    pub stack: Chips,
    pub hand: Vec<Card>,
    pub current_bet: Chips,
    pub total_bet: Chips,
    pub has_acted: bool,
    pub is_folded: bool,
    pub is_all_in: bool,
    pub is_sitting_out: bool,
}

impl PlayerState {
    pub fn new(user_id: UserId, seat_number: SeatNumber, stack: Chips, is_sitting_out: bool) -> Self {
        Self {
            user_id,
            seat_number,
            stack,
            hand: Vec::new(),
            current_bet: 0,
            total_bet: 0,
            has_acted: false,
            is_folded: false,
            is_all_in: false,
            is_sitting_out,
        }
    }

    /// Can this player still be asked to act this round?
    pub fn can_act(&self) -> bool {
        !self.is_folded && !self.is_all_in && !self.is_sitting_out
    }

    /// Commits `amount` from stack to the current street, clamped to the
    /// player's stack (callers compute the intended amount first); flips
    /// `is_all_in` when the stack hits zero.
    pub fn commit(&mut self, amount: Chips) {
        let amount = amount.min(self.stack);
        self.stack -= amount;
        self.current_bet += amount;
        self.total_bet += amount;
        if self.stack == 0 {
            self.is_all_in = true;
        }
    }
}

/// Per-room hand snapshot (§3 GameState).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub phase: GamePhase,
    pub deck: Deck,
    pub community_cards: Vec<Card>,
    pub pot: Chips,
    pub current_bet: Chips,
    pub min_raise_amount: Chips,
    pub dealer_seat: SeatNumber,
    pub small_blind_seat: SeatNumber,
    pub big_blind_seat: SeatNumber,
    pub current_player_seat: Option<SeatNumber>,
    pub last_action_player_seat: Option<SeatNumber>,
    pub player_states: HashMap<UserId, PlayerState>,
    pub hand_history: Vec<String>,
    pub last_update_time: i64,
    pub stakes: HandStakes,
}

impl GameState {
    pub fn player(&self, user_id: &UserId) -> Option<&PlayerState> {
        self.player_states.get(user_id)
    }

    pub fn player_mut(&mut self, user_id: &UserId) -> Option<&mut PlayerState> {
        self.player_states.get_mut(user_id)
    }

    pub fn player_at_seat(&self, seat: SeatNumber) -> Option<&PlayerState> {
        self.player_states.values().find(|p| p.seat_number == seat)
    }

    /// Players still in the hand (not folded, not sitting out) — the
    /// population the betting-round closure test and showdown operate on.
    pub fn seats_still_in(&self) -> Vec<SeatNumber> {
        let mut seats: Vec<SeatNumber> = self
            .player_states
            .values()
            .filter(|p| !p.is_folded && !p.is_sitting_out)
            .map(|p| p.seat_number)
            .collect();
        seats.sort_unstable();
        seats
    }

    pub fn record(&mut self, event: impl Into<String>) {
        self.hand_history.push(event.into());
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateWithoutDeck<'a> {
    pub phase: GamePhase,
    pub community_cards: &'a [Card],
    pub pot: Chips,
    pub current_bet: Chips,
    pub min_raise_amount: Chips,
    pub dealer_seat: SeatNumber,
    pub small_blind_seat: SeatNumber,
    pub big_blind_seat: SeatNumber,
    pub current_player_seat: Option<SeatNumber>,
    pub last_action_player_seat: Option<SeatNumber>,
    pub player_states: &'a HashMap<UserId, PlayerState>,
    pub hand_history: &'a [String],
    pub last_update_time: i64,
    pub stakes: HandStakes,
}

impl GameState {
    /// The client-facing projection used for `game_state` snapshots (§6.1)
    /// before per-viewer hole-card masking is applied (§4.6.3 / C7).
    pub fn without_deck(&self) -> GameStateWithoutDeck<'_> {
        GameStateWithoutDeck {
            phase: self.phase,
            community_cards: &self.community_cards,
            pot: self.pot,
            current_bet: self.current_bet,
            min_raise_amount: self.min_raise_amount,
            dealer_seat: self.dealer_seat,
            small_blind_seat: self.small_blind_seat,
            big_blind_seat: self.big_blind_seat,
            current_player_seat: self.current_player_seat,
            last_action_player_seat: self.last_action_player_seat,
            player_states: &self.player_states,
            hand_history: &self.hand_history,
            last_update_time: self.last_update_time,
            stakes: self.stakes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Deck, Rank, Suit};
    use crate::test_utils::serde::assert_round_trip_json;

    fn sample_state() -> GameState {
        let mut player_states = HashMap::new();
        let mut alice = PlayerState::new("alice".to_string(), 0, 1_000, false);
        alice.hand = vec![Card::new(Rank::Ace, Suit::Spades), Card::new(Rank::King, Suit::Spades)];
        player_states.insert(alice.user_id.clone(), alice);

        GameState {
            phase: GamePhase::Flop,
            deck: Deck::new_shuffled_with_seed(1),
            community_cards: vec![
                Card::new(Rank::Two, Suit::Hearts),
                Card::new(Rank::Seven, Suit::Clubs),
                Card::new(Rank::Jack, Suit::Diamonds),
            ],
            pot: 150,
            current_bet: 50,
            min_raise_amount: 50,
            dealer_seat: 0,
            small_blind_seat: 1,
            big_blind_seat: 2,
            current_player_seat: Some(1),
            last_action_player_seat: Some(0),
            player_states,
            hand_history: vec!["hand started".to_string()],
            last_update_time: 1_700_000_000,
            stakes: HandStakes { small_blind: 5, big_blind: 10, ante: 0 },
        }
    }

    #[test]
    fn game_state_round_trips_through_json() {
        assert_round_trip_json(&sample_state());
    }
}
