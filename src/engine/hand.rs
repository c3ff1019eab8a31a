use tracing::{debug, warn};

use crate::cards::Deck;
use crate::domain::{Chips, SeatNumber, UserId};

use super::errors::{ActionError, HandError};
use super::seating::clockwise_order_from;
use super::showdown::resolve_showdown;
use super::state::{GameState, PlayerState};
use super::types::{GamePhase, HandStakes, PlayerAction};
use super::{pots::compute_pots, HandParticipant, LOG_TARGET};

/// Defensive clamp applied when a member's stack is missing/zero at hand
/// start — implemented, but always logged, never silent.
const DEFENSIVE_STACK_MULTIPLIER: Chips = 50;

/// Stateless facade over the hand state machine (C4).
pub struct HandEngine;

impl HandEngine {
    /// Starts a new hand with a freshly, cryptographically shuffled deck.
    pub fn start_hand(
        participants: Vec<HandParticipant>,
        stakes: HandStakes,
        previous_dealer_seat: Option<SeatNumber>,
        now: i64,
    ) -> Result<GameState, HandError> {
        Self::start_hand_with_deck(participants, stakes, previous_dealer_seat, Deck::new_shuffled(), now)
    }

    /// Starts a new hand with a caller-supplied deck — the seam tests use
    /// to pin outcomes with `Deck::new_shuffled_with_seed`.
    pub fn start_hand_with_deck(
        mut participants: Vec<HandParticipant>,
        stakes: HandStakes,
        previous_dealer_seat: Option<SeatNumber>,
        mut deck: Deck,
        now: i64,
    ) -> Result<GameState, HandError> {
        if participants.len() < 2 {
            return Err(HandError::NotEnoughParticipants);
        }
        participants.sort_by_key(|p| p.seat_number);

        for p in &mut participants {
            if p.stack == 0 {
                warn!(
                    target: LOG_TARGET,
                    user_id = %p.user_id,
                    "member has zero stack at hand start, applying defensive clamp"
                );
                p.stack = stakes.big_blind * DEFENSIVE_STACK_MULTIPLIER;
            }
        }

        let seats: Vec<SeatNumber> = participants.iter().map(|p| p.seat_number).collect();

        let dealer_seat = match previous_dealer_seat {
            None => *seats.iter().min().expect("non-empty participants"),
            Some(prev) => super::seating::next_seat_after(&seats, prev).expect("non-empty participants"),
        };

        let (small_blind_seat, big_blind_seat) = if participants.len() == 2 {
            let other = seats.iter().copied().find(|&s| s != dealer_seat).expect("two participants");
            (dealer_seat, other)
        } else {
            let sb = super::seating::next_seat_after(&seats, dealer_seat).expect("non-empty participants");
            let bb = super::seating::next_seat_after(&seats, sb).expect("non-empty participants");
            (sb, bb)
        };

        let mut player_states = std::collections::HashMap::new();
        for p in &participants {
            player_states.insert(
                p.user_id.clone(),
                PlayerState::new(p.user_id.clone(), p.seat_number, p.stack, p.is_sitting_out),
            );
        }

        // Step 4: antes.
        if stakes.ante > 0 {
            for p in player_states.values_mut() {
                if p.is_sitting_out {
                    continue;
                }
                let ante = stakes.ante.min(p.stack);
                p.stack -= ante;
                p.total_bet += ante;
                if p.stack == 0 {
                    p.is_all_in = true;
                }
            }
        }

        // Step 5: blinds.
        if let Some(sb) = player_states.values_mut().find(|p| p.seat_number == small_blind_seat) {
            sb.commit(stakes.small_blind);
        }
        if let Some(bb) = player_states.values_mut().find(|p| p.seat_number == big_blind_seat) {
            bb.commit(stakes.big_blind);
        }

        // Step 7: shuffle + deal, two hole cards each, clockwise from the
        // dealer's left, skipping sitting-out seats.
        let dealt_seats: Vec<SeatNumber> = participants
            .iter()
            .filter(|p| !p.is_sitting_out)
            .map(|p| p.seat_number)
            .collect();
        let deal_order = clockwise_order_from(&dealt_seats, dealer_seat);
        for _ in 0..2 {
            for &seat in &deal_order {
                let card = deck.draw().map_err(|_| HandError::DeckExhausted)?;
                if let Some(p) = player_states.values_mut().find(|p| p.seat_number == seat) {
                    p.hand.push(card);
                }
            }
        }

        let mut state = GameState {
            phase: GamePhase::Preflop,
            deck,
            community_cards: Vec::new(),
            pot: 0,
            current_bet: stakes.big_blind,
            min_raise_amount: stakes.big_blind,
            dealer_seat,
            small_blind_seat,
            big_blind_seat,
            current_player_seat: None,
            last_action_player_seat: Some(big_blind_seat),
            player_states,
            hand_history: Vec::new(),
            last_update_time: now,
            stakes,
        };

        recompute_pot(&mut state);
        state.current_player_seat = state.next_actionable_seat_after(big_blind_seat);
        state.record(format!(
            "hand started: dealer={dealer_seat} sb={small_blind_seat} bb={big_blind_seat}"
        ));
        debug!(target: LOG_TARGET, dealer_seat, small_blind_seat, big_blind_seat, "hand started");
        Ok(state)
    }

    /// Validates and applies a single player action, advancing the street
    /// or resolving the hand as needed (§4.4).
    pub fn apply_action(state: &mut GameState, user_id: &UserId, action: PlayerAction, now: i64) -> Result<(), HandError> {
        if !matches!(
            state.phase,
            GamePhase::Preflop | GamePhase::Flop | GamePhase::Turn | GamePhase::River
        ) {
            return Err(HandError::NotAcceptingActions);
        }

        let seat = state
            .player(user_id)
            .ok_or(HandError::UnknownParticipant)?
            .seat_number;

        if state.current_player_seat != Some(seat) {
            return Err(ActionError::NotYourTurn.into());
        }

        {
            let player = state.player(user_id).expect("checked above");
            if player.is_folded {
                return Err(ActionError::AlreadyFolded.into());
            }
            if player.is_all_in {
                return Err(ActionError::AlreadyAllIn.into());
            }
            if player.is_sitting_out {
                return Err(ActionError::SittingOut.into());
            }
        }

        apply_validated_action(state, user_id, seat, action)?;
        state.last_update_time = now;
        recompute_pot(state);

        if state.seats_still_in().len() <= 1 {
            end_hand_by_fold(state)?;
            return Ok(());
        }

        if is_betting_round_over(state) {
            advance_street(state)?;
        } else {
            state.current_player_seat = state.next_actionable_seat_after(seat);
        }
        Ok(())
    }
}

fn recompute_pot(state: &mut GameState) {
    state.pot = state.player_states.values().map(|p| p.total_bet).sum();
}

fn apply_validated_action(state: &mut GameState, user_id: &UserId, seat: SeatNumber, action: PlayerAction) -> Result<(), HandError> {
    let current_bet = state.current_bet;
    let min_raise_amount = state.min_raise_amount;
    let big_blind = state.stakes.big_blind;
    let last_aggressor_seat = state.last_action_player_seat;

    let player = state.player_mut(user_id).expect("existence checked by caller");
    let price_to_call = current_bet.saturating_sub(player.current_bet);
    let player_total_available = player.stack + player.current_bet;

    match action {
        PlayerAction::Fold => {
            player.is_folded = true;
            player.has_acted = true;
            state.record(format!("seat {seat} folds"));
        }
        PlayerAction::Check => {
            if price_to_call > 0 {
                return Err(ActionError::IllegalCheck.into());
            }
            player.has_acted = true;
            state.record(format!("seat {seat} checks"));
        }
        PlayerAction::Call => {
            if price_to_call == 0 {
                return Err(ActionError::IllegalCall.into());
            }
            let call_amount = price_to_call.min(player.stack);
            player.commit(call_amount);
            player.has_acted = true;
            state.record(format!("seat {seat} calls {call_amount}"));
        }
        PlayerAction::Bet { amount } => {
            if current_bet != 0 {
                return Err(ActionError::IllegalBet.into());
            }
            if amount > player_total_available {
                return Err(ActionError::AmountExceedsStack.into());
            }
            let is_all_in = amount == player_total_available;
            let min_bet = big_blind.min(player_total_available);
            if amount < min_bet && !is_all_in {
                return Err(ActionError::BetTooSmall { min: min_bet }.into());
            }
            let needed = amount - player.current_bet;
            player.commit(needed);
            player.has_acted = true;
            let increment = amount;
            state.record(format!("seat {seat} bets {amount}"));
            state.current_bet = amount;
            if increment >= min_raise_amount {
                state.min_raise_amount = increment;
            }
            state.last_action_player_seat = Some(seat);
            reset_has_acted_for_others(state, seat, None);
        }
        PlayerAction::Raise { amount } => {
            if current_bet == 0 {
                return Err(ActionError::IllegalRaise.into());
            }
            if amount > player_total_available {
                return Err(ActionError::AmountExceedsStack.into());
            }
            let is_all_in = amount == player_total_available;
            let min_target = current_bet.saturating_add(min_raise_amount);
            if amount <= current_bet {
                return Err(ActionError::RaiseTooSmall { min: min_target }.into());
            }
            if amount < min_target && !is_all_in {
                return Err(ActionError::RaiseTooSmall { min: min_target }.into());
            }
            let needed = amount - player.current_bet;
            player.commit(needed);
            player.has_acted = true;
            let increment = amount - current_bet;
            let is_full_raise = increment >= min_raise_amount;
            state.record(format!("seat {seat} raises to {amount}"));
            state.current_bet = amount;
            if is_full_raise {
                state.min_raise_amount = increment;
                state.last_action_player_seat = Some(seat);
                reset_has_acted_for_others(state, seat, None);
            } else {
                // Short all-in raise (invariant 13 / design note 9c): does not
                // reopen action for the prior aggressor who already matched.
                reset_has_acted_for_others(state, seat, last_aggressor_seat);
            }
        }
    }
    Ok(())
}

fn reset_has_acted_for_others(state: &mut GameState, actor_seat: SeatNumber, exempt_seat: Option<SeatNumber>) {
    for p in state.player_states.values_mut() {
        if p.seat_number == actor_seat {
            continue;
        }
        if Some(p.seat_number) == exempt_seat {
            continue;
        }
        if p.can_act() {
            p.has_acted = false;
        }
    }
}

/// Betting-round closure test (§4.4): the round is over when at most one
/// player remains, or every non-all-in player has acted and every
/// non-folded player has matched the current bet (or is all-in).
fn is_betting_round_over(state: &GameState) -> bool {
    let still_in: Vec<&PlayerState> = state
        .player_states
        .values()
        .filter(|p| !p.is_folded && !p.is_sitting_out)
        .collect();
    if still_in.len() <= 1 {
        return true;
    }
    let can_act: Vec<&PlayerState> = still_in.iter().copied().filter(|p| p.can_act()).collect();
    if !can_act.iter().all(|p| p.has_acted) {
        return false;
    }
    still_in
        .iter()
        .all(|p| p.current_bet == state.current_bet || p.is_all_in)
}

fn reset_for_new_street(state: &mut GameState) {
    for p in state.player_states.values_mut() {
        p.current_bet = 0;
        if p.can_act() {
            p.has_acted = false;
        }
    }
    state.current_bet = 0;
    state.min_raise_amount = state.stakes.big_blind;
    state.last_action_player_seat = None;
}

fn deal_community(state: &mut GameState, count: usize) -> Result<(), HandError> {
    state.deck.draw().map_err(|_| HandError::DeckExhausted)?; // burn
    for _ in 0..count {
        let card = state.deck.draw().map_err(|_| HandError::DeckExhausted)?;
        state.community_cards.push(card);
    }
    Ok(())
}

/// Street progression with no-betting acceleration (§4.4): advances through
/// flop/turn/river, dealing straight through to showdown without stopping
/// for a betting round when fewer than two players remain able to act.
fn advance_street(state: &mut GameState) -> Result<(), HandError> {
    loop {
        match state.phase {
            GamePhase::Preflop => {
                deal_community(state, 3)?;
                state.phase = GamePhase::Flop;
            }
            GamePhase::Flop => {
                deal_community(state, 1)?;
                state.phase = GamePhase::Turn;
            }
            GamePhase::Turn => {
                deal_community(state, 1)?;
                state.phase = GamePhase::River;
            }
            GamePhase::River => {
                return run_showdown(state);
            }
            _ => return Err(HandError::NotAcceptingActions),
        }
        reset_for_new_street(state);
        state.record(format!("street advances to {:?}", state.phase));
        debug!(target: LOG_TARGET, phase = ?state.phase, "street advanced");

        match state.next_actionable_seat_after(state.dealer_seat) {
            None => {
                state.current_player_seat = None;
                continue; // acceleration: no one can act, deal straight through
            }
            some => {
                state.current_player_seat = some;
                return Ok(());
            }
        }
    }
}

fn end_hand_by_fold(state: &mut GameState) -> Result<(), HandError> {
    state.record("hand ends uncontested, remaining player wins pot".to_string());
    run_showdown(state)
}

/// Resolves all pots and transitions to `end_hand` (§4.4 Showdown).
/// For an uncontested pot (one eligible player) no hand is evaluated.
fn run_showdown(state: &mut GameState) -> Result<(), HandError> {
    state.phase = GamePhase::Showdown;
    let pots = compute_pots(state);
    let awards = resolve_showdown(state, &pots);
    for award in &awards {
        for (user_id, amount) in &award.winners {
            if let Some(player) = state.player_mut(user_id) {
                player.stack += amount;
            }
        }
    }
    for p in state.player_states.values_mut() {
        p.hand.clear();
        p.current_bet = 0;
        p.total_bet = 0;
        p.has_acted = false;
        p.is_folded = false;
    }
    state.pot = 0;
    state.phase = GamePhase::EndHand;
    state.current_player_seat = None;
    state.record("hand ended");
    Ok(())
}
