use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::deck::{Card, Rank};

/// The ten standard hand categories, ace-high numeric rank 1..10 as
/// required by §3's `PlayerState` showdown contract (GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RankCategory {
    HighCard = 1,
    Pair = 2,
    TwoPair = 3,
    ThreeOfAKind = 4,
    Straight = 5,
    Flush = 6,
    FullHouse = 7,
    FourOfAKind = 8,
    StraightFlush = 9,
    RoyalFlush = 10,
}

impl RankCategory {
    pub fn value(self) -> u8 {
        self as u8
    }
}

/// The full ordering key for a best-5-card hand: category, then kickers in
/// descending significance. `kickers` always has exactly 5 entries so two
/// `HandRank`s of the same category compare lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandRank {
    pub category: RankCategory,
    pub kickers: Vec<u8>,
}

impl PartialOrd for HandRank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HandRank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.category
            .cmp(&other.category)
            .then_with(|| self.kickers.cmp(&other.kickers))
    }
}

/// Evaluates the best 5-card hand out of up to 7 cards (2 hole + up to 5
/// community), per §4.2 C2. Panics if fewer than 5 cards are supplied —
/// callers only invoke this at or after the flop with hole cards present.
pub fn evaluate_best_hand(cards: &[Card]) -> HandRank {
    assert!(cards.len() >= 5, "need at least 5 cards to evaluate a hand");

    let mut best: Option<HandRank> = None;
    for combo in combinations(cards, 5) {
        let rank = evaluate_five(&combo);
        let is_better = match &best {
            Some(b) => rank > *b,
            None => true,
        };
        if is_better {
            best = Some(rank);
        }
    }
    best.expect("at least one 5-card combination exists")
}

/// A client-side preview of a hand's strength before there are enough cards
/// to evaluate (§4.2 edge case): with fewer than 5 cards there is no
/// five-card hand to rank, so the sorted available cards stand in as
/// `bestFive`. Never invoked during showdown — `resolve_showdown` only calls
/// `evaluate_best_hand` once the board has at least 3 community cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandPreview {
    NotEnoughCards { best_five: Vec<Card> },
    Ranked(HandRank),
}

pub fn preview_best_hand(cards: &[Card]) -> HandPreview {
    if cards.len() < 5 {
        let mut sorted = cards.to_vec();
        sorted.sort_by(|a, b| b.rank.value().cmp(&a.rank.value()));
        return HandPreview::NotEnoughCards { best_five: sorted };
    }
    HandPreview::Ranked(evaluate_best_hand(cards))
}

fn combinations(cards: &[Card], k: usize) -> Vec<Vec<Card>> {
    let n = cards.len();
    let mut result = Vec::new();
    let mut indices: Vec<usize> = (0..k).collect();
    if k > n {
        return result;
    }
    loop {
        result.push(indices.iter().map(|&i| cards[i]).collect());
        let mut i = k;
        loop {
            if i == 0 {
                return result;
            }
            i -= 1;
            if indices[i] != i + n - k {
                break;
            }
            if i == 0 {
                return result;
            }
        }
        indices[i] += 1;
        for j in (i + 1)..k {
            indices[j] = indices[j - 1] + 1;
        }
    }
}

fn evaluate_five(hand: &[Card]) -> HandRank {
    assert_eq!(hand.len(), 5);

    let mut values: Vec<u8> = hand.iter().map(|c| c.rank.value()).collect();
    values.sort_unstable_by(|a, b| b.cmp(a));

    let is_flush = hand.iter().all(|c| c.suit == hand[0].suit);
    let straight_high = straight_high_card(&values);

    if is_flush {
        if let Some(high) = straight_high {
            let category = if high == 14 {
                RankCategory::RoyalFlush
            } else {
                RankCategory::StraightFlush
            };
            return HandRank {
                category,
                kickers: vec![high, 0, 0, 0, 0],
            };
        }
    }

    let mut counts: Vec<(u8, usize)> = Vec::new();
    for &v in &values {
        if let Some(entry) = counts.iter_mut().find(|(val, _)| *val == v) {
            entry.1 += 1;
        } else {
            counts.push((v, 1));
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(b.0.cmp(&a.0)));

    let shape: Vec<usize> = counts.iter().map(|(_, c)| *c).collect();

    let kickers_from = |counts: &[(u8, usize)]| -> Vec<u8> {
        let mut k: Vec<u8> = counts.iter().map(|(v, _)| *v).collect();
        k.resize(5, 0);
        k
    };

    match shape.as_slice() {
        [4, 1] => HandRank {
            category: RankCategory::FourOfAKind,
            kickers: kickers_from(&counts),
        },
        [3, 2] => HandRank {
            category: RankCategory::FullHouse,
            kickers: kickers_from(&counts),
        },
        _ if is_flush => HandRank {
            category: RankCategory::Flush,
            kickers: values,
        },
        _ if straight_high.is_some() => HandRank {
            category: RankCategory::Straight,
            kickers: vec![straight_high.unwrap(), 0, 0, 0, 0],
        },
        [3, 1, 1] => HandRank {
            category: RankCategory::ThreeOfAKind,
            kickers: kickers_from(&counts),
        },
        [2, 2, 1] => HandRank {
            category: RankCategory::TwoPair,
            kickers: kickers_from(&counts),
        },
        [2, 1, 1, 1] => HandRank {
            category: RankCategory::Pair,
            kickers: kickers_from(&counts),
        },
        _ => HandRank {
            category: RankCategory::HighCard,
            kickers: values,
        },
    }
}

/// Returns the straight's high card value, handling the ace-low wheel
/// (A-2-3-4-5, where the straight's high card is the 5, not the ace) per
/// §4.2's special case. `values` must be sorted descending with duplicates
/// already ruled out by the caller context (a 5-unique-rank hand).
fn straight_high_card(values: &[u8]) -> Option<u8> {
    let mut unique: Vec<u8> = values.to_vec();
    unique.dedup();
    if unique.len() != 5 {
        return None;
    }
    if unique[0] - unique[4] == 4 {
        return Some(unique[0]);
    }
    // Wheel: A,5,4,3,2 sorted descending is [14,5,4,3,2].
    if unique == [14, 5, 4, 3, 2] {
        return Some(5);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::super::deck::Suit;
    use super::*;

    fn c(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    #[test]
    fn detects_royal_flush() {
        let hand = vec![
            c(Rank::Ace, Suit::Spades),
            c(Rank::King, Suit::Spades),
            c(Rank::Queen, Suit::Spades),
            c(Rank::Jack, Suit::Spades),
            c(Rank::Ten, Suit::Spades),
        ];
        assert_eq!(evaluate_five(&hand).category, RankCategory::RoyalFlush);
    }

    #[test]
    fn detects_ace_low_straight_wheel() {
        let hand = vec![
            c(Rank::Ace, Suit::Spades),
            c(Rank::Two, Suit::Hearts),
            c(Rank::Three, Suit::Clubs),
            c(Rank::Four, Suit::Diamonds),
            c(Rank::Five, Suit::Spades),
        ];
        let rank = evaluate_five(&hand);
        assert_eq!(rank.category, RankCategory::Straight);
        assert_eq!(rank.kickers[0], 5);
    }

    #[test]
    fn full_house_beats_flush() {
        let full_house = vec![
            c(Rank::Three, Suit::Spades),
            c(Rank::Three, Suit::Hearts),
            c(Rank::Three, Suit::Clubs),
            c(Rank::Nine, Suit::Diamonds),
            c(Rank::Nine, Suit::Spades),
        ];
        let flush = vec![
            c(Rank::Ace, Suit::Hearts),
            c(Rank::Jack, Suit::Hearts),
            c(Rank::Nine, Suit::Hearts),
            c(Rank::Seven, Suit::Hearts),
            c(Rank::Two, Suit::Hearts),
        ];
        assert!(evaluate_five(&full_house) > evaluate_five(&flush));
    }

    #[test]
    fn best_of_seven_picks_the_best_five() {
        // Board has a flush draw completed by one of two hole cards.
        let cards = vec![
            c(Rank::Ace, Suit::Hearts),
            c(Rank::King, Suit::Hearts),
            c(Rank::Queen, Suit::Hearts),
            c(Rank::Jack, Suit::Hearts),
            c(Rank::Two, Suit::Clubs),
            c(Rank::Ten, Suit::Hearts),
            c(Rank::Nine, Suit::Diamonds),
        ];
        let best = evaluate_best_hand(&cards);
        assert_eq!(best.category, RankCategory::RoyalFlush);
    }

    #[test]
    fn preview_with_fewer_than_five_cards_sorts_without_ranking() {
        let hole = vec![c(Rank::Seven, Suit::Hearts), c(Rank::King, Suit::Clubs)];
        let preview = preview_best_hand(&hole);
        match preview {
            HandPreview::NotEnoughCards { best_five } => {
                assert_eq!(best_five, vec![c(Rank::King, Suit::Clubs), c(Rank::Seven, Suit::Hearts)]);
            }
            HandPreview::Ranked(_) => panic!("expected NotEnoughCards with only 2 cards"),
        }
    }

    #[test]
    fn preview_with_five_or_more_cards_ranks() {
        let hand = vec![
            c(Rank::Ace, Suit::Spades),
            c(Rank::King, Suit::Spades),
            c(Rank::Queen, Suit::Spades),
            c(Rank::Jack, Suit::Spades),
            c(Rank::Ten, Suit::Spades),
        ];
        match preview_best_hand(&hand) {
            HandPreview::Ranked(rank) => assert_eq!(rank.category, RankCategory::RoyalFlush),
            HandPreview::NotEnoughCards { .. } => panic!("expected a ranked preview with 5 cards"),
        }
    }

    /// §8 property 5: evaluating a five-card hand is invariant to the order
    /// the cards are supplied in.
    #[test]
    fn evaluation_is_invariant_to_card_order() {
        let hand = vec![
            c(Rank::Nine, Suit::Hearts),
            c(Rank::King, Suit::Clubs),
            c(Rank::Nine, Suit::Spades),
            c(Rank::Two, Suit::Diamonds),
            c(Rank::King, Suit::Hearts),
        ];
        let mut permuted = hand.clone();
        permuted.reverse();
        assert_eq!(evaluate_five(&hand), evaluate_five(&permuted));

        permuted.swap(0, 3);
        assert_eq!(evaluate_five(&hand), evaluate_five(&permuted));
    }

    /// S4 — ace-low straight beats trips: board `2C 3D 4S 9H KC`, hole cards
    /// `AH 5D` (wheel, high 5) vs `KD KS` (trip kings).
    #[test]
    fn ace_low_straight_beats_trip_kings() {
        let board = vec![
            c(Rank::Two, Suit::Clubs),
            c(Rank::Three, Suit::Diamonds),
            c(Rank::Four, Suit::Spades),
            c(Rank::Nine, Suit::Hearts),
            c(Rank::King, Suit::Clubs),
        ];
        let mut wheel_hand = board.clone();
        wheel_hand.push(c(Rank::Ace, Suit::Hearts));
        wheel_hand.push(c(Rank::Five, Suit::Diamonds));

        let mut trips_hand = board.clone();
        trips_hand.push(c(Rank::King, Suit::Diamonds));
        trips_hand.push(c(Rank::King, Suit::Spades));

        let wheel = evaluate_best_hand(&wheel_hand);
        let trips = evaluate_best_hand(&trips_hand);
        assert_eq!(wheel.category, RankCategory::Straight);
        assert_eq!(wheel.kickers[0], 5);
        assert_eq!(trips.category, RankCategory::ThreeOfAKind);
        assert!(wheel > trips);
    }

    #[test]
    fn two_pair_kicker_breaks_ties() {
        let hand_a = vec![
            c(Rank::King, Suit::Spades),
            c(Rank::King, Suit::Hearts),
            c(Rank::Four, Suit::Clubs),
            c(Rank::Four, Suit::Diamonds),
            c(Rank::Ace, Suit::Spades),
        ];
        let hand_b = vec![
            c(Rank::King, Suit::Clubs),
            c(Rank::King, Suit::Diamonds),
            c(Rank::Four, Suit::Spades),
            c(Rank::Four, Suit::Hearts),
            c(Rank::Queen, Suit::Clubs),
        ];
        assert!(evaluate_five(&hand_a) > evaluate_five(&hand_b));
    }
}
