use crate::domain::SeatNumber;

use super::state::GameState;

/// Returns the next occupied seat strictly after `from`, wrapping by seat
/// *number* rather than index so gaps in the seating chart (seats 1,3,5
/// occupied) behave correctly (§4.4 step 2).
pub fn next_seat_after(occupied: &[SeatNumber], from: SeatNumber) -> Option<SeatNumber> {
    if occupied.is_empty() {
        return None;
    }
    let mut sorted: Vec<SeatNumber> = occupied.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .copied()
        .find(|&s| s > from)
        .or_else(|| sorted.first().copied())
}

impl GameState {
    /// Next seat after `from` among players still in the hand who can act,
    /// or `None` if nobody qualifies.
    pub fn next_actionable_seat_after(&self, from: SeatNumber) -> Option<SeatNumber> {
        let mut candidates: Vec<SeatNumber> = self
            .player_states
            .values()
            .filter(|p| p.can_act())
            .map(|p| p.seat_number)
            .collect();
        candidates.sort_unstable();
        if candidates.is_empty() {
            return None;
        }
        let wrapped = candidates.iter().copied().find(|&s| s > from);
        wrapped.or(Some(candidates[0]))
    }
}

/// Full rotation of `seats` starting with the first seat after `start_after`
/// (wrapping), used to deal hole cards clockwise from the dealer.
pub fn clockwise_order_from(seats: &[SeatNumber], start_after: SeatNumber) -> Vec<SeatNumber> {
    let mut sorted = seats.to_vec();
    sorted.sort_unstable();
    let split = sorted.iter().position(|&s| s > start_after).unwrap_or(0);
    sorted.rotate_left(split);
    sorted
}
