use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Card rank, ace-high by default (`value()` reflects that); the evaluator
/// handles the ace-low wheel (A-2-3-4-5) as a special case rather than here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    /// Ace-high numeric value, 2..=14.
    pub fn value(self) -> u8 {
        self as u8 + 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

impl Suit {
    const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }
}

impl std::fmt::Display for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rank = match self.rank {
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
        };
        let suit = match self.suit {
            Suit::Hearts => "h",
            Suit::Diamonds => "d",
            Suit::Clubs => "c",
            Suit::Spades => "s",
        };
        write!(f, "{rank}{suit}")
    }
}

/// A standard 52-card deck (§4.1 C1) that is dealt from and burned from the
/// top (`cards` is kept in draw order; `draw` pops from the back so removal
/// is O(1)).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    cards: Vec<Card>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DeckError {
    #[error("deck exhausted: no cards remain to draw")]
    Exhausted,
}

impl Deck {
    /// A fresh, unshuffled deck in canonical order.
    pub fn new_ordered() -> Self {
        let mut cards = Vec::with_capacity(52);
        for &suit in Suit::ALL.iter() {
            for &rank in Rank::ALL.iter() {
                cards.push(Card::new(rank, suit));
            }
        }
        Self { cards }
    }

    /// Shuffles with a cryptographically seeded RNG (production dealing).
    pub fn new_shuffled() -> Self {
        let mut deck = Self::new_ordered();
        let mut rng = StdRng::from_entropy();
        deck.cards.shuffle(&mut rng);
        deck
    }

    /// Shuffles with a caller-supplied seed, for deterministic tests.
    pub fn new_shuffled_with_seed(seed: u64) -> Self {
        let mut deck = Self::new_ordered();
        let mut rng = StdRng::seed_from_u64(seed);
        deck.cards.shuffle(&mut rng);
        deck
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    /// The cards not yet drawn, in draw order (top of deck last).
    pub fn remaining_cards(&self) -> &[Card] {
        &self.cards
    }

    /// Draws the next card (used for both dealing and burning — §4.3.5 of
    /// the hand state machine burns one card before each street).
    pub fn draw(&mut self) -> Result<Card, DeckError> {
        self.cards.pop().ok_or(DeckError::Exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_deck_has_52_unique_cards() {
        let deck = Deck::new_ordered();
        assert_eq!(deck.remaining(), 52);
        let unique: std::collections::HashSet<_> = deck.cards.iter().collect();
        assert_eq!(unique.len(), 52);
    }

    #[test]
    fn shuffle_is_a_permutation_not_a_resample() {
        let ordered = Deck::new_ordered();
        let shuffled = Deck::new_shuffled_with_seed(42);
        let mut a: Vec<_> = ordered.cards.clone();
        let mut b: Vec<_> = shuffled.cards.clone();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn same_seed_yields_same_order() {
        let d1 = Deck::new_shuffled_with_seed(7);
        let d2 = Deck::new_shuffled_with_seed(7);
        assert_eq!(d1.cards, d2.cards);
    }

    #[test]
    fn draw_removes_cards_until_exhausted() {
        let mut deck = Deck::new_ordered();
        for _ in 0..52 {
            assert!(deck.draw().is_ok());
        }
        assert_eq!(deck.draw(), Err(DeckError::Exhausted));
    }
}
