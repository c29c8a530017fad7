//! Core domain types for the deck-of-cards workout.
//!
//! This module defines the fundamental types used throughout the system:
//! - Suits, ranks and cards
//! - Deck size presets
//! - Library enumerations (focus, level, weights)
//! - Rule and random-workout enumerations

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Suits and Ranks
// ============================================================================

/// Card suit; `Joker` is the sentinel suit carried by joker cards
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Suit {
    #[serde(rename = "♠")]
    Spades,
    #[serde(rename = "♥")]
    Hearts,
    #[serde(rename = "♦")]
    Diamonds,
    #[serde(rename = "♣")]
    Clubs,
    #[serde(rename = "JOKER")]
    Joker,
}

impl Suit {
    /// The four standard suits, in deck-building order
    pub const STANDARD: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    pub fn symbol(self) -> &'static str {
        match self {
            Suit::Spades => "♠",
            Suit::Hearts => "♥",
            Suit::Diamonds => "♦",
            Suit::Clubs => "♣",
            Suit::Joker => "JOKER",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Suit::Spades => "Spades",
            Suit::Hearts => "Hearts",
            Suit::Diamonds => "Diamonds",
            Suit::Clubs => "Clubs",
            Suit::Joker => "Joker",
        }
    }

    pub fn is_red(self) -> bool {
        matches!(self, Suit::Hearts | Suit::Diamonds)
    }

    /// Parse a suit from its symbol or its English name (case-insensitive)
    pub fn parse(s: &str) -> Option<Suit> {
        let s = s.trim();
        match s {
            "♠" => return Some(Suit::Spades),
            "♥" => return Some(Suit::Hearts),
            "♦" => return Some(Suit::Diamonds),
            "♣" => return Some(Suit::Clubs),
            _ => {}
        }
        match s.to_lowercase().as_str() {
            "spades" | "spade" => Some(Suit::Spades),
            "hearts" | "heart" => Some(Suit::Hearts),
            "diamonds" | "diamond" => Some(Suit::Diamonds),
            "clubs" | "club" => Some(Suit::Clubs),
            "joker" => Some(Suit::Joker),
            _ => None,
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Card rank, serialized as `A`, `2`..`10`, `J`, `Q`, `K` or `Joker`
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub enum Rank {
    Ace,
    Number(u8),
    Jack,
    Queen,
    King,
    Joker,
}

impl Rank {
    /// The thirteen standard ranks, ace first
    pub const STANDARD: [Rank; 13] = [
        Rank::Ace,
        Rank::Number(2),
        Rank::Number(3),
        Rank::Number(4),
        Rank::Number(5),
        Rank::Number(6),
        Rank::Number(7),
        Rank::Number(8),
        Rank::Number(9),
        Rank::Number(10),
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    pub fn label(self) -> String {
        match self {
            Rank::Ace => "A".into(),
            Rank::Number(n) => n.to_string(),
            Rank::Jack => "J".into(),
            Rank::Queen => "Q".into(),
            Rank::King => "K".into(),
            Rank::Joker => "Joker".into(),
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl From<Rank> for String {
    fn from(rank: Rank) -> Self {
        rank.label()
    }
}

impl TryFrom<String> for Rank {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        match value.trim() {
            "A" | "a" => Ok(Rank::Ace),
            "J" | "j" => Ok(Rank::Jack),
            "Q" | "q" => Ok(Rank::Queen),
            "K" | "k" => Ok(Rank::King),
            "Joker" | "joker" | "JOKER" => Ok(Rank::Joker),
            other => match other.parse::<u8>() {
                Ok(n) if (2..=10).contains(&n) => Ok(Rank::Number(n)),
                _ => Err(format!("unknown rank '{}'", other)),
            },
        }
    }
}

// ============================================================================
// Cards
// ============================================================================

/// A playing card in a generated deck
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
    pub id: String,
    pub is_red: bool,
}

impl Card {
    /// Build a standard (non-joker) card; the id is `rank + suit`
    pub fn standard(suit: Suit, rank: Rank) -> Self {
        Self {
            suit,
            rank,
            id: format!("{}{}", rank, suit),
            is_red: suit.is_red(),
        }
    }

    pub fn joker(id: String) -> Self {
        Self {
            suit: Suit::Joker,
            rank: Rank::Joker,
            id,
            is_red: false,
        }
    }

    pub fn is_joker(&self) -> bool {
        self.rank == Rank::Joker || self.suit == Suit::Joker
    }
}

// ============================================================================
// Deck Size
// ============================================================================

/// How much of the standard 52 goes into a deck
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeckSize {
    Quarter,
    Half,
    ThreeQuarters,
    #[default]
    Full,
}

impl DeckSize {
    pub const ALL: [DeckSize; 4] = [
        DeckSize::Quarter,
        DeckSize::Half,
        DeckSize::ThreeQuarters,
        DeckSize::Full,
    ];

    /// Number of standard cards kept for this size
    pub fn card_limit(self) -> usize {
        match self {
            DeckSize::Quarter => 13,
            DeckSize::Half => 26,
            DeckSize::ThreeQuarters => 39,
            DeckSize::Full => 52,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            DeckSize::Quarter => "quarter",
            DeckSize::Half => "half",
            DeckSize::ThreeQuarters => "threequarters",
            DeckSize::Full => "full",
        }
    }

    pub fn from_key(key: &str) -> Option<DeckSize> {
        DeckSize::ALL
            .into_iter()
            .find(|size| size.key().eq_ignore_ascii_case(key.trim()))
    }

    /// Unknown keys fall back to a full deck
    pub fn parse_or_full(key: &str) -> DeckSize {
        Self::from_key(key).unwrap_or(DeckSize::Full)
    }
}

// ============================================================================
// Library Enumerations
// ============================================================================

/// Body area a workout targets
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Focus {
    #[default]
    #[serde(rename = "Full Body")]
    FullBody,
    #[serde(rename = "Upper Body")]
    UpperBody,
    #[serde(rename = "Lower Body")]
    LowerBody,
    #[serde(rename = "Core")]
    Core,
}

impl Focus {
    pub const ALL: [Focus; 4] = [Focus::FullBody, Focus::UpperBody, Focus::LowerBody, Focus::Core];

    pub fn label(self) -> &'static str {
        match self {
            Focus::FullBody => "Full Body",
            Focus::UpperBody => "Upper Body",
            Focus::LowerBody => "Lower Body",
            Focus::Core => "Core",
        }
    }

    /// Parse a focus name, ignoring case, spaces, dashes and underscores
    pub fn parse(s: &str) -> Option<Focus> {
        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        match compact.as_str() {
            "fullbody" => Some(Focus::FullBody),
            "upperbody" => Some(Focus::UpperBody),
            "lowerbody" => Some(Focus::LowerBody),
            "core" => Some(Focus::Core),
            _ => None,
        }
    }
}

impl fmt::Display for Focus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Workout difficulty level, always within 1..=3
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(from = "u8", into = "u8")]
pub struct Level(u8);

impl Level {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 3;

    pub fn new(value: u8) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    /// Clamp an arbitrary number (possibly fractional or negative)
    pub fn from_f64(value: f64) -> Self {
        if !value.is_finite() {
            return Self(Self::MIN);
        }
        Self(value.round().clamp(Self::MIN as f64, Self::MAX as f64) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Level {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl From<u8> for Level {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level.0
    }
}

/// Whether a workout needs gym equipment
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Weights {
    Yes,
    #[default]
    No,
}

impl Weights {
    pub fn parse(s: &str) -> Option<Weights> {
        match s.trim().to_lowercase().as_str() {
            "yes" | "y" | "true" => Some(Weights::Yes),
            "no" | "n" | "false" => Some(Weights::No),
            _ => None,
        }
    }
}

// ============================================================================
// Rule and Random-Workout Enumerations
// ============================================================================

/// How J/Q/K are valued
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum FaceCardMode {
    /// J, Q and K are all worth 10
    Ten,
    /// J = 11, Q = 12, K = 13
    #[default]
    Progressive,
}

impl FaceCardMode {
    pub fn parse(s: &str) -> Option<FaceCardMode> {
        match s.trim().to_lowercase().as_str() {
            "ten" => Some(FaceCardMode::Ten),
            "progressive" => Some(FaceCardMode::Progressive),
            _ => None,
        }
    }
}

/// Whether the user has gym equipment for a random workout
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum GymAccess {
    Yes,
    #[default]
    No,
}

impl GymAccess {
    pub fn parse(s: &str) -> Option<GymAccess> {
        match s.trim().to_lowercase().as_str() {
            "yes" => Some(GymAccess::Yes),
            "no" => Some(GymAccess::No),
            _ => None,
        }
    }
}

/// A preset's joker slot: draws a random joker workout or stays empty
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum JokerSlot {
    #[default]
    #[serde(rename = "random")]
    Random,
    #[serde(rename = "none")]
    Empty,
}

impl JokerSlot {
    pub fn parse(s: &str) -> Option<JokerSlot> {
        match s.trim().to_lowercase().as_str() {
            "random" => Some(JokerSlot::Random),
            "none" => Some(JokerSlot::Empty),
            _ => None,
        }
    }
}

/// The two joker slots of a deck preset
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct JokerSlots {
    #[serde(rename = "1", default)]
    pub first: JokerSlot,
    #[serde(rename = "2", default)]
    pub second: JokerSlot,
}

impl JokerSlots {
    pub fn new(first: JokerSlot, second: JokerSlot) -> Self {
        Self { first, second }
    }

    /// Number of jokers a deck built from these slots carries
    pub fn joker_count(&self) -> usize {
        [self.first, self.second]
            .iter()
            .filter(|slot| **slot == JokerSlot::Random)
            .count()
    }

    /// Read slots from untyped JSON, keeping `fallback` for anything invalid
    pub fn from_value(value: &serde_json::Value, fallback: JokerSlots) -> JokerSlots {
        let slot = |key: &str, default: JokerSlot| {
            value
                .get(key)
                .and_then(|v| v.as_str())
                .and_then(JokerSlot::parse)
                .unwrap_or(default)
        };
        JokerSlots {
            first: slot("1", fallback.first),
            second: slot("2", fallback.second),
        }
    }
}
