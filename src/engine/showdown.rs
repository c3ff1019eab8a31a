use crate::cards::{evaluate_best_hand, HandRank};
use crate::domain::{Chips, SeatNumber, UserId};

use super::pots::Pot;
use super::state::GameState;

/// One pot's resolution: the winning users and how many chips each gets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PotAward {
    pub winners: Vec<(UserId, Chips)>,
}

/// Resolves every pot layer (§4.4 Showdown / §4.3 distribution rule):
/// evaluate eligible hands, split equally among the best, and award odd
/// chips one-by-one starting at the first eligible seat clockwise from the
/// small blind.
pub fn resolve_showdown(state: &GameState, pots: &[Pot]) -> Vec<PotAward> {
    pots.iter().map(|pot| resolve_pot(state, pot)).collect()
}

fn resolve_pot(state: &GameState, pot: &Pot) -> PotAward {
    if pot.eligible.is_empty() || pot.amount == 0 {
        return PotAward { winners: Vec::new() };
    }

    if pot.eligible.len() == 1 {
        return PotAward {
            winners: vec![(pot.eligible[0].clone(), pot.amount)],
        };
    }

    let ranked: Vec<(UserId, HandRank)> = pot
        .eligible
        .iter()
        .filter_map(|uid| {
            let player = state.player(uid)?;
            let mut cards = player.hand.clone();
            cards.extend(state.community_cards.iter().copied());
            if cards.len() < 5 {
                return None;
            }
            Some((uid.clone(), evaluate_best_hand(&cards)))
        })
        .collect();

    let best = ranked.iter().map(|(_, r)| r).max().cloned();
    let Some(best) = best else {
        return PotAward { winners: Vec::new() };
    };

    let mut winner_seats: Vec<(UserId, SeatNumber)> = ranked
        .into_iter()
        .filter(|(_, r)| *r == best)
        .filter_map(|(uid, _)| state.player(&uid).map(|p| (uid, p.seat_number)))
        .collect();

    winner_seats.sort_by_key(|(_, seat)| *seat);
    let start_index = winner_seats
        .iter()
        .position(|(_, seat)| *seat >= state.small_blind_seat)
        .unwrap_or(0);
    winner_seats.rotate_left(start_index);

    let count = winner_seats.len() as Chips;
    let share = pot.amount / count;
    let remainder = pot.amount % count;

    let winners = winner_seats
        .into_iter()
        .enumerate()
        .map(|(i, (uid, _))| {
            let extra = if (i as Chips) < remainder { 1 } else { 0 };
            (uid, share + extra)
        })
        .collect();

    PotAward { winners }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Card, Deck, Rank, Suit};
    use crate::engine::state::PlayerState;
    use crate::engine::types::{GamePhase, HandStakes};
    use std::collections::HashMap;

    fn make_state(players: Vec<PlayerState>, community: Vec<Card>, sb_seat: SeatNumber) -> GameState {
        let mut player_states = HashMap::new();
        for p in players {
            player_states.insert(p.user_id.clone(), p);
        }
        GameState {
            phase: GamePhase::Showdown,
            deck: Deck::new_ordered(),
            community_cards: community,
            pot: 0,
            current_bet: 0,
            min_raise_amount: 0,
            dealer_seat: 1,
            small_blind_seat: sb_seat,
            big_blind_seat: sb_seat + 1,
            current_player_seat: None,
            last_action_player_seat: None,
            player_states,
            hand_history: Vec::new(),
            last_update_time: 0,
            stakes: HandStakes {
                small_blind: 5,
                big_blind: 10,
                ante: 0,
            },
        }
    }

    /// S5 — odd-chip split: seats 3 (SB), 5, 7 in hand; winners at 5 and 7;
    /// pot 101 splits 51/50 starting at seat 5 (first clockwise from SB=3).
    #[test]
    fn odd_chip_awarded_to_first_winner_clockwise_from_small_blind() {
        let mut five = PlayerState::new("p5".into(), 5, 0, false);
        five.hand = vec![Card::new(Rank::Ace, Suit::Spades), Card::new(Rank::Ace, Suit::Hearts)];
        let mut seven = PlayerState::new("p7".into(), 7, 0, false);
        seven.hand = vec![Card::new(Rank::Ace, Suit::Clubs), Card::new(Rank::Ace, Suit::Diamonds)];

        let community = vec![
            Card::new(Rank::King, Suit::Hearts),
            Card::new(Rank::King, Suit::Spades),
            Card::new(Rank::Two, Suit::Clubs),
            Card::new(Rank::Seven, Suit::Diamonds),
            Card::new(Rank::Nine, Suit::Hearts),
        ];
        let state = make_state(vec![five, seven], community, 3);
        let pot = Pot {
            amount: 101,
            eligible: vec!["p5".to_string(), "p7".to_string()],
        };

        let award = resolve_pot(&state, &pot);
        let p5 = award.winners.iter().find(|(uid, _)| uid == "p5").unwrap().1;
        let p7 = award.winners.iter().find(|(uid, _)| uid == "p7").unwrap().1;
        assert_eq!(p5, 51);
        assert_eq!(p7, 50);
    }

    #[test]
    fn uncontested_pot_awards_full_amount_without_reveal() {
        let mut winner = PlayerState::new("solo".into(), 1, 0, false);
        winner.hand = Vec::new();
        let state = make_state(vec![winner], Vec::new(), 1);
        let pot = Pot {
            amount: 500,
            eligible: vec!["solo".to_string()],
        };
        let award = resolve_pot(&state, &pot);
        assert_eq!(award.winners, vec![("solo".to_string(), 500)]);
    }
}
