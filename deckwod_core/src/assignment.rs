//! Workout labels and suit assignments.
//!
//! Internally a workout is a `(name, multiplier)` pair. On disk it is a
//! single string, `"Name"` or `"Name (Nx)"`, and a suit may instead be
//! assigned a focus placeholder, `"Focus: <Focus>"`. This module owns the
//! one parse/format pair for those strings.

use crate::types::{Focus, Suit};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Largest per-workout rep multiplier
pub const MAX_MULTIPLIER: u32 = 5;

const FOCUS_PREFIX: &str = "focus:";

/// Clamp a multiplier into `1..=MAX_MULTIPLIER`
pub fn clamp_multiplier(multiplier: u32) -> u32 {
    multiplier.clamp(1, MAX_MULTIPLIER)
}

/// A concrete workout with its rep multiplier
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WorkoutLabel {
    pub name: String,
    pub multiplier: u32,
}

impl WorkoutLabel {
    pub fn new(name: impl Into<String>, multiplier: u32) -> Self {
        Self {
            name: name.into().trim().to_string(),
            multiplier: clamp_multiplier(multiplier),
        }
    }

    /// Normalized key used to match workouts across saved and default data
    pub fn key(&self) -> String {
        workout_key(&self.name, self.multiplier)
    }
}

impl fmt::Display for WorkoutLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_workout_label(&self.name, self.multiplier))
    }
}

/// Format a workout and multiplier; a multiplier of 1 adds no suffix
pub fn format_workout_label(name: &str, multiplier: u32) -> String {
    let name = name.trim();
    let multiplier = clamp_multiplier(multiplier);
    if multiplier == 1 {
        name.to_string()
    } else {
        format!("{} ({}x)", name, multiplier)
    }
}

/// Parse a possible trailing `(Nx)` suffix off a raw workout string
///
/// Strings without a well-formed suffix are returned whole with multiplier 1.
/// Stacked suffixes collapse to the base name and the outermost multiplier,
/// so parsing a parsed name never changes it again.
pub fn parse_workout_label(raw: &str) -> WorkoutLabel {
    let trimmed = raw.trim();
    let Some((mut name, multiplier)) = split_multiplier_suffix(trimmed) else {
        return WorkoutLabel::new(trimmed, 1);
    };
    while let Some((inner, _)) = split_multiplier_suffix(name) {
        name = inner;
    }
    WorkoutLabel::new(name, multiplier)
}

fn split_multiplier_suffix(s: &str) -> Option<(&str, u32)> {
    let body = s.strip_suffix(')')?;
    let open = body.rfind('(')?;
    let name = body[..open].trim();
    if name.is_empty() {
        return None;
    }
    let inner = body[open + 1..].trim();
    let digits = inner
        .strip_suffix('x')
        .or_else(|| inner.strip_suffix('X'))?
        .trim();
    let multiplier = digits.parse::<u32>().ok().filter(|n| *n > 0)?;
    Some((name, multiplier))
}

/// Lowercased label used as the identity of a library row
pub fn workout_key(name: &str, multiplier: u32) -> String {
    format_workout_label(name, multiplier).to_lowercase()
}

// ============================================================================
// Assignments
// ============================================================================

/// What a suit is assigned: a concrete workout or a focus resolved per draw
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Assignment {
    Concrete(WorkoutLabel),
    Focus(Focus),
}

impl Assignment {
    pub fn concrete(name: impl Into<String>, multiplier: u32) -> Self {
        Assignment::Concrete(WorkoutLabel::new(name, multiplier))
    }

    /// Parse and normalize an on-disk value; empty input yields `None`
    ///
    /// `"Focus: <name>"` with an unrecognised focus stays a concrete label.
    pub fn parse(raw: &str) -> Option<Assignment> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.len() >= FOCUS_PREFIX.len()
            && trimmed.is_char_boundary(FOCUS_PREFIX.len())
            && trimmed[..FOCUS_PREFIX.len()].eq_ignore_ascii_case(FOCUS_PREFIX)
        {
            if let Some(focus) = Focus::parse(&trimmed[FOCUS_PREFIX.len()..]) {
                return Some(Assignment::Focus(focus));
            }
        }
        let label = parse_workout_label(trimmed);
        if label.name.is_empty() {
            return None;
        }
        Some(Assignment::Concrete(label))
    }

    /// The label shown for the suit before any draw-time resolution
    pub fn display_label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assignment::Concrete(label) => write!(f, "{}", label),
            Assignment::Focus(focus) => write!(f, "Focus: {}", focus),
        }
    }
}

impl From<Assignment> for String {
    fn from(assignment: Assignment) -> Self {
        assignment.to_string()
    }
}

impl TryFrom<String> for Assignment {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Assignment::parse(&value).ok_or_else(|| "empty assignment".to_string())
    }
}

// ============================================================================
// Suit Assignment Map
// ============================================================================

type SuitMap = BTreeMap<String, String>;

/// One assignment per standard suit, serialized as a map keyed by symbol
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SuitMap", into = "SuitMap")]
pub struct SuitAssignment {
    pub spades: Assignment,
    pub hearts: Assignment,
    pub diamonds: Assignment,
    pub clubs: Assignment,
}

impl SuitAssignment {
    /// Default assignment of the standard deck
    pub fn standard() -> Self {
        Self {
            spades: Assignment::concrete("Sit-ups", 1),
            hearts: Assignment::concrete("Push-ups", 1),
            diamonds: Assignment::concrete("Squats", 1),
            clubs: Assignment::concrete("Burpees", 1),
        }
    }

    /// Assignment for a standard suit; jokers have none
    pub fn get(&self, suit: Suit) -> Option<&Assignment> {
        match suit {
            Suit::Spades => Some(&self.spades),
            Suit::Hearts => Some(&self.hearts),
            Suit::Diamonds => Some(&self.diamonds),
            Suit::Clubs => Some(&self.clubs),
            Suit::Joker => None,
        }
    }

    /// Replace the assignment of a standard suit with a normalized value
    ///
    /// Returns `false` (and changes nothing) for jokers or empty input.
    pub fn set(&mut self, suit: Suit, raw: &str) -> bool {
        let Some(assignment) = Assignment::parse(raw) else {
            return false;
        };
        let slot = match suit {
            Suit::Spades => &mut self.spades,
            Suit::Hearts => &mut self.hearts,
            Suit::Diamonds => &mut self.diamonds,
            Suit::Clubs => &mut self.clubs,
            Suit::Joker => return false,
        };
        *slot = assignment;
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (Suit, &Assignment)> {
        Suit::STANDARD
            .into_iter()
            .zip([&self.spades, &self.hearts, &self.diamonds, &self.clubs])
    }

    /// Read untyped JSON, taking `fallback`'s value for any missing or empty suit
    pub fn from_value(value: &serde_json::Value, fallback: &SuitAssignment) -> SuitAssignment {
        let mut result = fallback.clone();
        if let Some(map) = value.as_object() {
            for (key, raw) in map {
                if let (Some(suit), Some(raw)) = (Suit::parse(key), raw.as_str()) {
                    result.set(suit, raw);
                }
            }
        }
        result
    }
}

impl Default for SuitAssignment {
    fn default() -> Self {
        Self::standard()
    }
}

impl From<SuitMap> for SuitAssignment {
    fn from(map: SuitMap) -> Self {
        let mut result = SuitAssignment::standard();
        for (key, raw) in &map {
            if let Some(suit) = Suit::parse(key) {
                result.set(suit, raw);
            }
        }
        result
    }
}

impl From<SuitAssignment> for SuitMap {
    fn from(assignment: SuitAssignment) -> Self {
        assignment
            .iter()
            .map(|(suit, value)| (suit.symbol().to_string(), value.to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_omits_unit_multiplier() {
        assert_eq!(format_workout_label("Squats", 1), "Squats");
        assert_eq!(format_workout_label("  Squats ", 2), "Squats (2x)");
    }

    #[test]
    fn test_parse_multiplier_suffix() {
        assert_eq!(parse_workout_label("Squats (2x)"), WorkoutLabel::new("Squats", 2));
        assert_eq!(parse_workout_label("Squats(3X)"), WorkoutLabel::new("Squats", 3));
        assert_eq!(parse_workout_label(" Squats ( 4 x ) "), WorkoutLabel::new("Squats", 4));
        assert_eq!(parse_workout_label("Squats"), WorkoutLabel::new("Squats", 1));
        // Not a multiplier suffix
        assert_eq!(
            parse_workout_label("Side Planks (30s each side)"),
            WorkoutLabel::new("Side Planks (30s each side)", 1)
        );
        assert_eq!(parse_workout_label("(2x)"), WorkoutLabel::new("(2x)", 1));
        assert_eq!(parse_workout_label("Squats (2x) (3x)"), WorkoutLabel::new("Squats", 3));
    }

    #[test]
    fn test_keys_collide_for_unit_multiplier() {
        assert_eq!(
            parse_workout_label("Squats").key(),
            parse_workout_label("squats (1x)").key()
        );
        assert_ne!(
            parse_workout_label("Squats").key(),
            parse_workout_label("Squats (2x)").key()
        );
    }

    #[test]
    fn test_multiplier_is_clamped() {
        assert_eq!(parse_workout_label("Squats (9x)").multiplier, MAX_MULTIPLIER);
    }

    #[test]
    fn test_assignment_parse() {
        assert_eq!(Assignment::parse("Focus: Core"), Some(Assignment::Focus(Focus::Core)));
        assert_eq!(
            Assignment::parse("focus: upper body"),
            Some(Assignment::Focus(Focus::UpperBody))
        );
        assert_eq!(
            Assignment::parse(" Lunges (2x) "),
            Some(Assignment::concrete("Lunges", 2))
        );
        assert_eq!(Assignment::parse("   "), None);
        assert!(matches!(
            Assignment::parse("Focus: Legs"),
            Some(Assignment::Concrete(_))
        ));
    }

    #[test]
    fn test_suit_assignment_serde_uses_symbols() {
        let mut suits = SuitAssignment::standard();
        assert!(suits.set(Suit::Spades, "Focus: Core"));
        assert!(!suits.set(Suit::Hearts, ""));
        assert!(!suits.set(Suit::Joker, "Burpees"));

        let json = serde_json::to_value(&suits).unwrap();
        assert_eq!(json["♠"], "Focus: Core");
        assert_eq!(json["♥"], "Push-ups");

        let parsed: SuitAssignment = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, suits);
    }

    #[test]
    fn test_suit_assignment_from_value_fills_missing() {
        let value = serde_json::json!({"spades": "Lunges (3x)", "♦": "", "♣": 42});
        let suits = SuitAssignment::from_value(&value, &SuitAssignment::standard());
        assert_eq!(suits.spades, Assignment::concrete("Lunges", 3));
        assert_eq!(suits.diamonds, Assignment::concrete("Squats", 1));
        assert_eq!(suits.clubs, Assignment::concrete("Burpees", 1));
    }
}
