//! Deck construction and shuffling.
//!
//! All functions here are pure given the random source passed in; seed a
//! `StdRng` to get a reproducible deck.

use crate::types::{Card, DeckSize, Rank, Suit};
use rand::seq::SliceRandom;
use rand::Rng;

/// Most jokers a deck can carry
pub const MAX_JOKERS: usize = 2;

const JOKER_SUFFIX_LEN: usize = 6;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// The canonical 52 cards, suit by suit, ace first
pub fn standard_cards() -> Vec<Card> {
    Suit::STANDARD
        .into_iter()
        .flat_map(|suit| Rank::STANDARD.into_iter().map(move |rank| Card::standard(suit, rank)))
        .collect()
}

/// Build a shuffled deck of `size` standard cards plus `jokers` jokers
///
/// A partial deck is a uniform random sample of the 52, not a fixed prefix.
/// `jokers` is clamped to `MAX_JOKERS`.
pub fn build_deck<R: Rng + ?Sized>(jokers: usize, size: DeckSize, rng: &mut R) -> Vec<Card> {
    let jokers = jokers.min(MAX_JOKERS);
    let mut cards = standard_cards();
    if size != DeckSize::Full {
        cards.shuffle(rng);
        cards.truncate(size.card_limit());
    }

    for index in 0..jokers {
        cards.push(Card::joker(joker_id(index, rng)));
    }

    cards.shuffle(rng);
    tracing::debug!(
        "Built {:?} deck with {} jokers ({} cards)",
        size,
        jokers,
        cards.len()
    );
    cards
}

/// Number of cards `build_deck` returns for these settings
pub fn deck_len(jokers: usize, size: DeckSize) -> usize {
    size.card_limit() + jokers.min(MAX_JOKERS)
}

fn joker_id<R: Rng + ?Sized>(index: usize, rng: &mut R) -> String {
    let suffix: String = (0..JOKER_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("Joker-{}-{}", index, suffix)
}
