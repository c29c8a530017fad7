//! Random workout generation.
//!
//! A random workout picks suit assignments and a joker pool from the
//! libraries, filtered by the enabled levels and gym access. Every pool
//! falls back in layers (filtered rows, then included rows, then the
//! built-in library) so generation always produces something.

use crate::assignment::{Assignment, SuitAssignment};
use crate::library::{default_joker_library, default_workout_library, value_as_bool, value_as_f64, LibraryRow};
use crate::rules::RuleSettings;
use crate::session::SessionSetup;
use crate::types::{DeckSize, FaceCardMode, Focus, GymAccess, Level};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Label used when no workout can be found anywhere
pub const WORKOUT_PLACEHOLDER: &str = "Workout";

/// Name recorded in history for generated workouts
pub const RANDOM_WORKOUT_NAME: &str = "Random Workout";

/// Which difficulty levels a random workout may use
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LevelToggles {
    #[serde(rename = "1")]
    pub one: bool,
    #[serde(rename = "2")]
    pub two: bool,
    #[serde(rename = "3")]
    pub three: bool,
}

impl LevelToggles {
    pub fn allows(&self, level: Level) -> bool {
        match level.get() {
            1 => self.one,
            2 => self.two,
            _ => self.three,
        }
    }
}

impl Default for LevelToggles {
    fn default() -> Self {
        Self {
            one: true,
            two: true,
            three: false,
        }
    }
}

/// Settings for generating a random workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RandomWorkoutSettings {
    pub levels: LevelToggles,
    pub gym_access: GymAccess,
    pub deck_size: DeckSize,
    pub ace_high: bool,
    pub face_card_mode: FaceCardMode,
    pub num_jokers: u8,
    pub include_focus: bool,
}

impl Default for RandomWorkoutSettings {
    fn default() -> Self {
        Self {
            levels: LevelToggles::default(),
            gym_access: GymAccess::No,
            deck_size: DeckSize::Full,
            ace_high: false,
            face_card_mode: FaceCardMode::Progressive,
            num_jokers: 1,
            include_focus: false,
        }
    }
}

/// Fill missing or invalid fields of saved settings from the defaults
pub fn merge_random_settings(saved: &Value) -> RandomWorkoutSettings {
    let defaults = RandomWorkoutSettings::default();
    let Some(obj) = saved.as_object() else {
        return defaults;
    };

    let levels = match obj.get("levels") {
        Some(levels) => {
            let level = |key: &str, default: bool| levels.get(key).and_then(value_as_bool).unwrap_or(default);
            LevelToggles {
                one: level("1", defaults.levels.one),
                two: level("2", defaults.levels.two),
                three: level("3", defaults.levels.three),
            }
        }
        None => defaults.levels,
    };
    let string_field = |key: &str| obj.get(key).and_then(|v| v.as_str());

    RandomWorkoutSettings {
        levels,
        gym_access: string_field("gymAccess")
            .and_then(GymAccess::parse)
            .unwrap_or(defaults.gym_access),
        deck_size: string_field("deckSize")
            .and_then(DeckSize::from_key)
            .unwrap_or(defaults.deck_size),
        ace_high: obj
            .get("aceHigh")
            .and_then(value_as_bool)
            .unwrap_or(defaults.ace_high),
        face_card_mode: string_field("faceCardMode")
            .and_then(FaceCardMode::parse)
            .unwrap_or(defaults.face_card_mode),
        num_jokers: obj
            .get("numJokers")
            .and_then(value_as_f64)
            .filter(|n| n.is_finite())
            .map(|n| n.round().clamp(0.0, crate::deck::MAX_JOKERS as f64) as u8)
            .unwrap_or(defaults.num_jokers),
        include_focus: obj
            .get("includeFocus")
            .and_then(value_as_bool)
            .unwrap_or(defaults.include_focus),
    }
}

/// A generated workout ready to start a session
#[derive(Clone, Debug, PartialEq)]
pub struct RandomWorkout {
    pub suits: SuitAssignment,
    /// Joker labels this session may draw
    pub joker_pool: Vec<String>,
    pub deck_size: DeckSize,
    pub rules: RuleSettings,
    pub jokers: usize,
}

impl RandomWorkout {
    pub fn session_setup(&self, workout_library: &[LibraryRow], joker_library: &[LibraryRow]) -> SessionSetup {
        SessionSetup {
            workout_name: RANDOM_WORKOUT_NAME.to_string(),
            suits: self.suits.clone(),
            workout_library: workout_library.to_vec(),
            joker_library: joker_library.to_vec(),
            session_jokers: Some(self.joker_pool.clone()),
            rules: self.rules.clone(),
            jokers: self.jokers,
            deck_size: self.deck_size,
        }
    }
}

fn eligible<'a>(rows: &'a [LibraryRow], settings: &RandomWorkoutSettings) -> Vec<&'a LibraryRow> {
    rows.iter()
        .filter(|row| row.include && !row.workout.trim().is_empty())
        .filter(|row| settings.levels.allows(row.difficulty))
        .filter(|row| settings.gym_access == GymAccess::Yes || !row.needs_weights())
        .collect()
}

/// Filtered rows, else included rows, else included built-in rows
fn layered_pool<'a>(
    rows: &'a [LibraryRow],
    defaults: &'a [LibraryRow],
    settings: &RandomWorkoutSettings,
) -> Vec<&'a LibraryRow> {
    let filtered = eligible(rows, settings);
    if !filtered.is_empty() {
        return filtered;
    }
    let included: Vec<&LibraryRow> = rows.iter().filter(|row| row.include).collect();
    if !included.is_empty() {
        tracing::info!("No workouts match the random filters, using all included workouts");
        return included;
    }
    tracing::info!("Library has no included workouts, using built-in defaults");
    defaults.iter().filter(|row| row.include).collect()
}

/// Generate a random workout from the libraries
pub fn generate_random_workout<R: Rng + ?Sized>(
    settings: &RandomWorkoutSettings,
    workout_library: &[LibraryRow],
    joker_library: &[LibraryRow],
    rng: &mut R,
) -> RandomWorkout {
    let pool = layered_pool(workout_library, default_workout_library(), settings);

    let mut picks: Vec<Assignment> = if pool.is_empty() {
        vec![Assignment::concrete(WORKOUT_PLACEHOLDER, 1); 4]
    } else {
        let mut chosen: Vec<&LibraryRow> = pool.choose_multiple(rng, 4).copied().collect();
        chosen.shuffle(rng);
        (0..4)
            .map(|i| {
                let row = chosen[i % chosen.len()];
                Assignment::concrete(row.workout.clone(), row.multiplier)
            })
            .collect()
    };

    if settings.include_focus {
        let focuses: Vec<Focus> = Focus::ALL
            .into_iter()
            .filter(|focus| pool.iter().any(|row| row.focus == *focus))
            .collect();
        let focus = focuses.choose(rng).copied().unwrap_or(Focus::FullBody);
        let slot = rng.gen_range(0..picks.len());
        picks[slot] = Assignment::Focus(focus);
    }

    let mut picks = picks.into_iter();
    let mut next = || picks.next().unwrap_or_else(|| Assignment::concrete(WORKOUT_PLACEHOLDER, 1));
    let suits = SuitAssignment {
        spades: next(),
        hearts: next(),
        diamonds: next(),
        clubs: next(),
    };

    let joker_pool: Vec<String> = layered_pool(joker_library, default_joker_library(), settings)
        .into_iter()
        .map(LibraryRow::label)
        .collect();

    tracing::debug!("Generated random workout with {} joker options", joker_pool.len());

    RandomWorkout {
        suits,
        joker_pool,
        deck_size: settings.deck_size,
        rules: RuleSettings {
            ace_high: settings.ace_high,
            face_card_mode: settings.face_card_mode,
            difficulty: 1.0,
        },
        jokers: settings.num_jokers as usize,
    }
}
