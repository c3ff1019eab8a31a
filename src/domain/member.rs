use serde::{Deserialize, Serialize};

use super::{Chips, SeatNumber, UserId};

/// A room's public membership record (§3 RoomMemberInfo) — one per joined
/// user, independent of whether a hand is currently running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMemberInfo {
    pub user_id: UserId,
    pub username: String,
    pub seat_number: SeatNumber,
    pub current_stack: Chips,
    pub is_active: bool,
    pub wants_to_play_next_hand: bool,
}

impl RoomMemberInfo {
    pub fn new(user_id: UserId, username: String, seat_number: SeatNumber, starting_stack: Chips) -> Self {
        Self {
            user_id,
            username,
            seat_number,
            current_stack: starting_stack,
            is_active: true,
            wants_to_play_next_hand: true,
        }
    }

    /// A member is eligible to be dealt into the next hand when seated and
    /// opted in. No stack floor here — §4.8's `startGame` policy is just
    /// "≥ 2 ready players"; a short or zero stack is dealt in and hits the
    /// hand state machine's own defensive clamp (§9(a)) rather than being
    /// silently excluded here.
    pub fn is_eligible_for_next_hand(&self) -> bool {
        self.is_active && self.wants_to_play_next_hand
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_member_defaults_to_active_and_opted_in() {
        let m = RoomMemberInfo::new("u1".into(), "alice".into(), 3, 1000);
        assert!(m.is_active);
        assert!(m.wants_to_play_next_hand);
        assert_eq!(m.current_stack, 1000);
    }

    #[test]
    fn eligible_with_short_stack_leaves_the_clamp_to_the_hand_state_machine() {
        let mut m = RoomMemberInfo::new("u1".into(), "alice".into(), 0, 15);
        m.current_stack = 5;
        assert!(m.is_eligible_for_next_hand());
    }

    #[test]
    fn ineligible_when_sitting_out() {
        let mut m = RoomMemberInfo::new("u1".into(), "alice".into(), 0, 1000);
        m.wants_to_play_next_hand = false;
        assert!(!m.is_eligible_for_next_hand());
    }

    #[test]
    fn ineligible_when_inactive() {
        let mut m = RoomMemberInfo::new("u1".into(), "alice".into(), 0, 1000);
        m.is_active = false;
        assert!(!m.is_eligible_for_next_hand());
    }
}
