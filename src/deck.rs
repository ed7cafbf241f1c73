//! Card deck: 100 unique values, dealt one per agent at setup.

use rand::seq::SliceRandom;
use thiserror::Error;

/// Raised when a draw is attempted against an exhausted deck.
///
/// At setup time this is a configuration error: more than 100 agents
/// means some agent cannot receive a card, so construction aborts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("deck is empty — no card left to draw")]
pub struct EmptyDeckError;

/// Create a shuffled deck of the integers 1..=100.
pub fn create_deck() -> Vec<u8> {
    let mut deck: Vec<u8> = (1..=100).collect();
    deck.shuffle(&mut rand::rng());
    deck
}

/// Remove and return the top card of the deck.
pub fn draw(deck: &mut Vec<u8>) -> Result<u8, EmptyDeckError> {
    deck.pop().ok_or(EmptyDeckError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn deck_has_100_unique_cards_in_range() {
        let deck = create_deck();
        assert_eq!(deck.len(), 100);
        let unique: HashSet<u8> = deck.iter().copied().collect();
        assert_eq!(unique.len(), 100);
        assert!(deck.iter().all(|&c| (1..=100).contains(&c)));
    }

    #[test]
    fn draw_removes_one_card() {
        let mut deck = create_deck();
        let card = draw(&mut deck).unwrap();
        assert_eq!(deck.len(), 99);
        assert!(!deck.contains(&card));
    }

    #[test]
    fn draw_from_empty_deck_fails() {
        let mut deck = Vec::new();
        assert_eq!(draw(&mut deck), Err(EmptyDeckError));
    }

    #[test]
    fn full_deal_exhausts_deck() {
        let mut deck = create_deck();
        let mut dealt = HashSet::new();
        for _ in 0..100 {
            dealt.insert(draw(&mut deck).unwrap());
        }
        assert_eq!(dealt.len(), 100);
        assert_eq!(draw(&mut deck), Err(EmptyDeckError));
    }
}
