//! Rep and exercise rules for drawn cards.
//!
//! Reps are `ceil(base × multiplier × difficulty)`, where the base comes
//! from the rank and the rule settings. Focus assignments and joker
//! workouts are sampled once when a card is drawn and cached on the
//! resulting [`DrawnCard`].

use crate::assignment::{Assignment, SuitAssignment, WorkoutLabel};
use crate::library::{default_joker_library, default_workout_library, LibraryRow};
use crate::types::{Card, FaceCardMode, Focus, Rank};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Label used when no joker workout can be found anywhere
pub const JOKER_PLACEHOLDER: &str = "Joker Workout";

/// Smallest and largest legacy difficulty multiplier accepted
pub const MIN_DIFFICULTY: f64 = 0.25;
pub const MAX_DIFFICULTY: f64 = 4.0;

/// Settings that turn a rank into a base rep count
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleSettings {
    #[serde(default)]
    pub ace_high: bool,
    #[serde(default)]
    pub face_card_mode: FaceCardMode,
    /// Global scalar from older settings; newer presets use per-workout multipliers
    #[serde(default = "default_difficulty")]
    pub difficulty: f64,
}

fn default_difficulty() -> f64 {
    1.0
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            ace_high: false,
            face_card_mode: FaceCardMode::default(),
            difficulty: default_difficulty(),
        }
    }
}

/// Clamp a difficulty scalar; non-finite input becomes 1
pub fn normalize_difficulty(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
    } else {
        default_difficulty()
    }
}

/// Base rep value of a rank before multipliers
pub fn base_value(rank: Rank, rules: &RuleSettings) -> u32 {
    match rank {
        Rank::Ace => {
            if rules.ace_high {
                14
            } else {
                1
            }
        }
        Rank::Number(n) => n as u32,
        Rank::Jack | Rank::Queen | Rank::King if rules.face_card_mode == FaceCardMode::Ten => 10,
        Rank::Jack => 11,
        Rank::Queen => 12,
        Rank::King => 13,
        Rank::Joker => 0,
    }
}

/// Reps for a card under a workout multiplier; jokers are always 0
pub fn reps_for(card: &Card, multiplier: u32, rules: &RuleSettings) -> u32 {
    if card.is_joker() {
        return 0;
    }
    let base = base_value(card.rank, rules) as f64;
    let raw = base * multiplier.max(1) as f64 * normalize_difficulty(rules.difficulty);
    // Snap off binary round-off so 10 × 1.1 is 11, not 12
    let reps = ((raw * 1e9).round() / 1e9).ceil();
    if reps.is_finite() && reps > 0.0 {
        reps as u32
    } else {
        0
    }
}

/// Resolve a suit assignment to a concrete workout
///
/// A focus samples uniformly from every row of `library` and the built-in
/// library with that focus. With no candidates the `"Focus: <name>"` label
/// itself is returned.
pub fn resolve_assignment<R: Rng + ?Sized>(
    assignment: &Assignment,
    library: &[LibraryRow],
    rng: &mut R,
) -> WorkoutLabel {
    match assignment {
        Assignment::Concrete(label) => label.clone(),
        Assignment::Focus(focus) => {
            let candidates = focus_candidates(*focus, library);
            match candidates.choose(rng) {
                Some(row) => WorkoutLabel::new(row.workout.clone(), row.multiplier),
                None => {
                    tracing::debug!("No workouts tagged {}, keeping placeholder", focus);
                    WorkoutLabel::new(assignment.to_string(), 1)
                }
            }
        }
    }
}

/// Rows of `library` unioned with the built-in library that carry `focus`
pub fn focus_candidates<'a>(focus: Focus, library: &'a [LibraryRow]) -> Vec<&'a LibraryRow> {
    let defaults: &'a [LibraryRow] = default_workout_library();
    let mut seen = HashSet::new();
    library
        .iter()
        .chain(defaults.iter())
        .filter(|row| row.focus == focus && !row.workout.trim().is_empty())
        .filter(|row| seen.insert(row.key()))
        .collect()
}

/// Pick a joker workout with layered fallback
///
/// Tries the included rows restricted to `session_pool` (when given), then
/// all included rows, then the built-in joker library, and finally the
/// literal placeholder.
pub fn joker_workout<R: Rng + ?Sized>(
    library: &[LibraryRow],
    session_pool: Option<&[String]>,
    rng: &mut R,
) -> String {
    let included: Vec<&LibraryRow> = library.iter().filter(|row| row.include).collect();

    if let Some(pool) = session_pool.filter(|pool| !pool.is_empty()) {
        let wanted: HashSet<String> = pool.iter().map(|label| label.trim().to_lowercase()).collect();
        let filtered: Vec<&LibraryRow> = included
            .iter()
            .copied()
            .filter(|row| wanted.contains(&row.key()))
            .collect();
        if let Some(row) = filtered.choose(rng) {
            return row.label();
        }
        tracing::debug!("Random-session joker pool matched nothing, widening");
    }

    if let Some(row) = included.choose(rng) {
        return row.label();
    }

    let defaults: Vec<&LibraryRow> = default_joker_library().iter().filter(|row| row.include).collect();
    if let Some(row) = defaults.choose(rng) {
        tracing::debug!("Joker library empty, using built-in jokers");
        return row.label();
    }

    JOKER_PLACEHOLDER.to_string()
}

/// Everything needed to resolve a draw
#[derive(Clone, Copy, Debug)]
pub struct DrawContext<'a> {
    pub suits: &'a SuitAssignment,
    pub workout_library: &'a [LibraryRow],
    pub joker_library: &'a [LibraryRow],
    pub session_jokers: Option<&'a [String]>,
    pub rules: &'a RuleSettings,
}

/// A drawn card with its exercise and reps fixed at draw time
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DrawnCard {
    pub card: Card,
    pub exercise: String,
    pub multiplier: u32,
    pub reps: u32,
}

impl DrawnCard {
    pub fn is_joker(&self) -> bool {
        self.card.is_joker()
    }
}

/// Resolve a card once; the result never re-samples when read again
pub fn draw_card<R: Rng + ?Sized>(card: Card, ctx: &DrawContext<'_>, rng: &mut R) -> DrawnCard {
    if card.is_joker() {
        let exercise = joker_workout(ctx.joker_library, ctx.session_jokers, rng);
        return DrawnCard {
            card,
            exercise,
            multiplier: 1,
            reps: 0,
        };
    }

    let label = match ctx.suits.get(card.suit) {
        Some(assignment) => resolve_assignment(assignment, ctx.workout_library, rng),
        None => WorkoutLabel::new(String::new(), 1),
    };
    let reps = reps_for(&card, label.multiplier, ctx.rules);
    DrawnCard {
        card,
        exercise: label.name,
        multiplier: label.multiplier,
        reps,
    }
}
