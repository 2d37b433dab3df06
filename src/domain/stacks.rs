use crate::domain::models::{StackCard, StackKind, Suit};
use std::collections::HashSet;
use thiserror::Error;

const MNEMONICA: [&str; 52] = [
    "4C", "2H", "7D", "3C", "4H", "6D", "AS", "5H", "9S", "2S", "QH", "3D", "QC", "8H", "6S",
    "5S", "9H", "KC", "2D", "JH", "3S", "8S", "6H", "10C", "5D", "KD", "2C", "3H", "8D", "5C",
    "KS", "JD", "8C", "10S", "KH", "JC", "7S", "10H", "AD", "4S", "7H", "4D", "AC", "9C", "JS",
    "QD", "10D", "6C", "AH", "9D", "QS", "7C",
];

const ARONSON: [&str; 52] = [
    "JS", "KD", "3C", "2H", "3S", "5H", "6D", "AS", "4H", "AC", "4C", "2S", "KC", "10H", "5D",
    "8S", "7D", "2C", "3H", "6C", "9D", "QS", "AH", "7C", "KH", "5S", "10D", "JH", "QD", "8C",
    "9S", "6S", "KS", "2D", "4D", "5C", "QH", "3D", "JC", "10C", "JD", "QC", "7H", "7S", "6H",
    "AD", "8D", "10S", "9H", "4S", "9C", "8H",
];

const DECK_VALUES: [&str; 13] = ["A", "2", "3", "4", "5", "6", "7", "8", "9", "10", "J", "Q", "K"];
const DECK_SUITS: [Suit; 4] = [Suit::Clubs, Suit::Hearts, Suit::Spades, Suit::Diamonds];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StackError {
    #[error("stack is empty")]
    Empty,
    #[error("position {0} appears more than once")]
    DuplicatePosition(u32),
    #[error("position {position} is outside 1..={len}")]
    PositionOutOfRange { position: u32, len: usize },
}

fn from_labels(labels: &[&str]) -> Vec<StackCard> {
    labels
        .iter()
        .zip(1u32..)
        .filter_map(|(label, position)| StackCard::from_label(position, label))
        .collect()
}

/// Built-in orderings; `Custom` has no built-in cards.
pub fn builtin_stack(kind: StackKind) -> Vec<StackCard> {
    match kind {
        StackKind::Mnemonica => from_labels(&MNEMONICA),
        StackKind::Aronson => from_labels(&ARONSON),
        StackKind::Custom => Vec::new(),
    }
}

/// Fresh-deck order used as the starting point for a custom stack.
pub fn new_deck_order() -> Vec<StackCard> {
    DECK_SUITS
        .iter()
        .flat_map(|suit| DECK_VALUES.iter().map(move |value| (*value, *suit)))
        .zip(1u32..)
        .map(|((value, suit), position)| StackCard::new(position, value, suit))
        .collect()
}

/// Renumbers positions after the editor reorders cards.
pub fn reindex(cards: &mut [StackCard]) {
    for (card, position) in cards.iter_mut().zip(1u32..) {
        card.position = position;
    }
}

/// Positions must be unique and contiguous from 1.
pub fn validate_stack(cards: &[StackCard]) -> Result<(), StackError> {
    if cards.is_empty() {
        return Err(StackError::Empty);
    }
    let mut seen = HashSet::with_capacity(cards.len());
    for card in cards {
        if card.position == 0 || card.position as usize > cards.len() {
            return Err(StackError::PositionOutOfRange {
                position: card.position,
                len: cards.len(),
            });
        }
        if !seen.insert(card.position) {
            return Err(StackError::DuplicatePosition(card.position));
        }
    }
    // In-range and unique over len cards implies contiguous.
    Ok(())
}
