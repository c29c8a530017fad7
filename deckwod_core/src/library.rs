//! Workout and joker libraries.
//!
//! This module provides:
//! - The built-in workout and joker libraries
//! - The lenient reader for saved library rows
//! - The merge that reconciles saved rows with newer defaults
//! - Row editing helpers that reject empty workout names

use crate::assignment::{clamp_multiplier, parse_workout_label, workout_key};
use crate::types::{Focus, Level, Weights};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// One workout in a library table
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LibraryRow {
    pub include: bool,
    pub workout: String,
    pub difficulty: Level,
    pub focus: Focus,
    pub weights: Weights,
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
}

fn default_multiplier() -> u32 {
    1
}

impl LibraryRow {
    pub fn new(include: bool, workout: &str, difficulty: u8, focus: Focus, weights: Weights) -> Self {
        Self {
            include,
            workout: workout.to_string(),
            difficulty: Level::new(difficulty),
            focus,
            weights,
            multiplier: 1,
        }
    }

    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = clamp_multiplier(multiplier);
        self
    }

    /// Normalized merge key
    pub fn key(&self) -> String {
        workout_key(&self.workout, self.multiplier)
    }

    /// Display label including any multiplier suffix
    pub fn label(&self) -> String {
        crate::assignment::format_workout_label(&self.workout, self.multiplier)
    }

    pub fn needs_weights(&self) -> bool {
        self.weights == Weights::Yes
    }
}

// ============================================================================
// Built-in Libraries
// ============================================================================

static DEFAULT_WORKOUT_LIBRARY: Lazy<Vec<LibraryRow>> = Lazy::new(|| {
    use Focus::*;
    use Weights::*;
    vec![
        LibraryRow::new(false, "Calf Raises", 1, LowerBody, No),
        LibraryRow::new(true, "Jumping Jacks", 1, FullBody, No),
        LibraryRow::new(true, "Leg Lifts", 1, Core, No),
        LibraryRow::new(true, "Lunges", 1, LowerBody, No),
        LibraryRow::new(true, "Push-ups", 1, UpperBody, No),
        LibraryRow::new(true, "Sit-ups", 1, Core, No),
        LibraryRow::new(true, "Squats", 1, LowerBody, No),
        LibraryRow::new(false, "Jump Squats", 2, LowerBody, No),
        LibraryRow::new(false, "Kettle Bell Swings", 2, FullBody, Yes),
        LibraryRow::new(true, "Russian Twists", 2, Core, No),
        LibraryRow::new(true, "Scissor Kicks", 2, Core, No),
        LibraryRow::new(false, "Weighted Lunges", 2, LowerBody, Yes),
        LibraryRow::new(false, "Box Jumps", 3, LowerBody, Yes),
        LibraryRow::new(true, "Burpees", 3, FullBody, No),
        LibraryRow::new(false, "Deadlifts", 3, FullBody, Yes),
        LibraryRow::new(false, "Dips", 3, UpperBody, Yes),
        LibraryRow::new(false, "Hand Release Push-ups", 3, UpperBody, No),
        LibraryRow::new(false, "Hanging Leg Raise", 3, Core, Yes),
        LibraryRow::new(false, "Mountain Climbers", 3, FullBody, No),
        LibraryRow::new(false, "Pullups", 3, UpperBody, Yes),
    ]
});

static DEFAULT_JOKER_LIBRARY: Lazy<Vec<LibraryRow>> = Lazy::new(|| {
    use Focus::*;
    use Weights::*;
    vec![
        LibraryRow::new(false, "1 min Farmer Carry", 1, FullBody, Yes),
        LibraryRow::new(false, "1 min High Knees", 1, FullBody, No),
        LibraryRow::new(true, "1 min Plank Hold", 1, FullBody, No),
        LibraryRow::new(true, "10 Close Grip Push-ups", 1, UpperBody, No),
        LibraryRow::new(false, "10 Wide Grip Push-ups", 1, UpperBody, No),
        LibraryRow::new(false, "2 min Rest", 1, FullBody, No),
        LibraryRow::new(true, "5 Burpees", 1, FullBody, No),
        LibraryRow::new(true, "Side Planks (30s each side)", 1, FullBody, No),
        LibraryRow::new(true, "2 min Plank Hold", 2, FullBody, No),
        LibraryRow::new(true, "20 Close Grip Push-ups", 2, UpperBody, No),
        LibraryRow::new(false, "40 Wide Grip Push-ups", 2, UpperBody, No),
        LibraryRow::new(false, "500m Row", 2, FullBody, Yes),
        LibraryRow::new(true, "Side Planks (60s each side)", 2, FullBody, No),
        LibraryRow::new(false, "1 mi run", 3, FullBody, No),
        LibraryRow::new(true, "20 burpees", 3, FullBody, No),
        LibraryRow::new(false, "3 min farmer carry", 3, FullBody, Yes),
        LibraryRow::new(true, "3 min plank hold", 3, FullBody, No),
        LibraryRow::new(true, "Side planks (90s each side)", 3, FullBody, No),
        LibraryRow::new(false, "Sled Push", 3, FullBody, Yes),
    ]
});

/// Built-in workout library
pub fn default_workout_library() -> &'static [LibraryRow] {
    &DEFAULT_WORKOUT_LIBRARY
}

/// Built-in joker library
pub fn default_joker_library() -> &'static [LibraryRow] {
    &DEFAULT_JOKER_LIBRARY
}

// ============================================================================
// Saved Rows
// ============================================================================

/// A library row as read from storage; every field may be missing
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SavedRow {
    pub include: Option<bool>,
    pub workout: Option<String>,
    pub difficulty: Option<Level>,
    pub focus: Option<Focus>,
    pub weights: Option<Weights>,
    pub multiplier: Option<u32>,
}

impl SavedRow {
    /// Read one saved row from untyped JSON
    ///
    /// Bare strings are accepted as included rows (older joker lists).
    /// Anything that is neither an object nor a string yields `None`.
    pub fn from_value(value: &Value) -> Option<SavedRow> {
        if let Some(s) = value.as_str() {
            return Some(SavedRow {
                include: Some(true),
                workout: Some(s.to_string()),
                ..Default::default()
            });
        }
        let obj = value.as_object()?;
        Some(SavedRow {
            include: obj.get("include").and_then(value_as_bool),
            workout: obj
                .get("workout")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            difficulty: obj
                .get("difficulty")
                .and_then(value_as_f64)
                .map(Level::from_f64),
            focus: obj
                .get("focus")
                .and_then(|v| v.as_str())
                .map(|s| Focus::parse(s).unwrap_or_default()),
            weights: obj.get("weights").and_then(|v| match v {
                Value::Bool(true) => Some(Weights::Yes),
                Value::Bool(false) => Some(Weights::No),
                other => other.as_str().and_then(Weights::parse),
            }),
            multiplier: obj
                .get("multiplier")
                .and_then(value_as_f64)
                .filter(|n| n.is_finite() && *n >= 1.0)
                .map(|n| clamp_multiplier(n.round() as u32)),
        })
    }

    /// Read a saved array; non-arrays and unreadable elements are skipped
    pub fn list_from_value(value: &Value) -> Vec<SavedRow> {
        value
            .as_array()
            .map(|items| items.iter().filter_map(SavedRow::from_value).collect())
            .unwrap_or_default()
    }
}

impl From<&LibraryRow> for SavedRow {
    fn from(row: &LibraryRow) -> Self {
        SavedRow {
            include: Some(row.include),
            workout: Some(row.workout.clone()),
            difficulty: Some(row.difficulty),
            focus: Some(row.focus),
            weights: Some(row.weights),
            multiplier: Some(row.multiplier),
        }
    }
}

pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

pub(crate) fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        _ => None,
    }
}

// ============================================================================
// Merge
// ============================================================================

/// Reconcile saved rows with the current default library
///
/// Saved rows come first in saved order: a row whose key matches a default
/// keeps the default's name and takes the saved settings, any other row is
/// kept as a custom workout. Defaults never seen among the saved rows are
/// appended untouched. Duplicate keys keep their first occurrence.
pub fn merge_library(defaults: &[LibraryRow], saved: &[SavedRow]) -> Vec<LibraryRow> {
    let mut default_index: HashMap<String, &LibraryRow> = HashMap::new();
    for row in defaults {
        default_index.entry(row.key()).or_insert(row);
    }

    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(defaults.len() + saved.len());

    for saved_row in saved {
        let Some(raw) = saved_row.workout.as_deref().map(str::trim) else {
            continue;
        };
        if raw.is_empty() {
            continue;
        }
        let parsed = parse_workout_label(raw);
        let multiplier = saved_row.multiplier.unwrap_or(parsed.multiplier);
        let key = workout_key(&parsed.name, multiplier);
        if !seen.insert(key.clone()) {
            continue;
        }

        let row = match default_index.get(&key) {
            Some(default_row) => LibraryRow {
                include: saved_row.include.unwrap_or(default_row.include),
                workout: default_row.workout.clone(),
                difficulty: saved_row.difficulty.unwrap_or(default_row.difficulty),
                focus: saved_row.focus.unwrap_or(default_row.focus),
                weights: saved_row.weights.unwrap_or(default_row.weights),
                multiplier,
            },
            None => LibraryRow {
                include: saved_row.include.unwrap_or(true),
                workout: parsed.name,
                difficulty: saved_row.difficulty.unwrap_or_default(),
                focus: saved_row.focus.unwrap_or_default(),
                weights: saved_row.weights.unwrap_or_default(),
                multiplier,
            },
        };
        merged.push(row);
    }

    for row in defaults {
        if seen.insert(row.key()) {
            merged.push(row.clone());
        }
    }

    tracing::debug!(
        "Merged library: {} saved rows, {} defaults -> {} rows",
        saved.len(),
        defaults.len(),
        merged.len()
    );
    merged
}

/// Merge untyped saved JSON against defaults; unreadable data merges as empty
pub fn merge_library_value(defaults: &[LibraryRow], saved: &Value) -> Vec<LibraryRow> {
    merge_library(defaults, &SavedRow::list_from_value(saved))
}

// ============================================================================
// Editing
// ============================================================================

/// Add a row; rejects empty names and keys already in the library
pub fn add_row(rows: &mut Vec<LibraryRow>, row: LibraryRow) -> bool {
    let Some(row) = normalize_row(row) else {
        tracing::debug!("Rejected library row with empty workout name");
        return false;
    };
    let key = row.key();
    if rows.iter().any(|existing| existing.key() == key) {
        tracing::debug!("Rejected duplicate library row '{}'", row.workout);
        return false;
    }
    rows.push(row);
    true
}

/// Replace the row at `index`; rejects empty names and out-of-range indexes
pub fn update_row(rows: &mut [LibraryRow], index: usize, row: LibraryRow) -> bool {
    let Some(row) = normalize_row(row) else {
        return false;
    };
    match rows.get_mut(index) {
        Some(slot) => {
            *slot = row;
            true
        }
        None => false,
    }
}

pub fn remove_row(rows: &mut Vec<LibraryRow>, index: usize) -> bool {
    if index < rows.len() {
        rows.remove(index);
        true
    } else {
        false
    }
}

pub fn toggle_include(rows: &mut [LibraryRow], index: usize) -> bool {
    match rows.get_mut(index) {
        Some(row) => {
            row.include = !row.include;
            true
        }
        None => false,
    }
}

/// Trim the name and fold any `(Nx)` suffix into the multiplier
/// Clean up a library after free-form edits: drop empty names, fold
/// `(Nx)` suffixes into the multiplier and keep the first row per key
pub fn normalize_library(rows: &mut Vec<LibraryRow>) {
    let before = rows.len();
    let mut seen = HashSet::new();
    let cleaned: Vec<LibraryRow> = rows
        .drain(..)
        .filter_map(normalize_row)
        .filter(|row| seen.insert(row.key()))
        .collect();
    *rows = cleaned;
    if rows.len() != before {
        tracing::debug!("Dropped {} invalid library rows", before - rows.len());
    }
}

fn normalize_row(mut row: LibraryRow) -> Option<LibraryRow> {
    let parsed = parse_workout_label(&row.workout);
    if parsed.name.is_empty() {
        return None;
    }
    if parsed.multiplier > 1 && row.multiplier <= 1 {
        row.multiplier = parsed.multiplier;
    }
    row.workout = parsed.name;
    row.multiplier = clamp_multiplier(row.multiplier);
    Some(row)
}
