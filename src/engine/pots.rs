use serde::{Deserialize, Serialize};

use crate::domain::{Chips, UserId};

use super::state::GameState;

/// A pot layer (§4.3 C3): `amount` includes folded players' contributions;
/// `eligible` excludes them (and sitting-out players) — only live
/// contestants can win a layer, but their chips still count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pot {
    pub amount: Chips,
    pub eligible: Vec<UserId>,
}

/// Builds the ordered main/side pot sequence from `totalBet` per §4.3:
/// collect distinct positive bet levels ascending; at each level the
/// increment is `(level - prev) * contributors_at_or_above_level`,
/// eligibility for that layer is restricted to non-folded, non-sitting-out
/// contributors at or above the level.
pub fn compute_pots(state: &GameState) -> Vec<Pot> {
    let mut contributions: Vec<(&UserId, Chips, bool, bool)> = state
        .player_states
        .values()
        .map(|p| (&p.user_id, p.total_bet, p.is_folded, p.is_sitting_out))
        .collect();
    contributions.sort_by_key(|(uid, ..)| uid.clone());

    let mut levels: Vec<Chips> = contributions
        .iter()
        .map(|(_, total, ..)| *total)
        .filter(|&c| c > 0)
        .collect();
    levels.sort_unstable();
    levels.dedup();

    if levels.is_empty() {
        return Vec::new();
    }

    let mut pots = Vec::with_capacity(levels.len());
    let mut prev = 0;
    for level in levels {
        let contributors_at_level: Vec<&(&UserId, Chips, bool, bool)> = contributions
            .iter()
            .filter(|(_, total, ..)| *total >= level)
            .collect();
        let increment = level - prev;
        let amount = increment * contributors_at_level.len() as Chips;
        let eligible: Vec<UserId> = contributors_at_level
            .iter()
            .filter(|(_, _, folded, sitting_out)| !folded && !sitting_out)
            .map(|(uid, ..)| (*uid).clone())
            .collect();
        pots.push(Pot { amount, eligible });
        prev = level;
    }
    pots
}
