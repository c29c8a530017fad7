//! Completed-workout history log.
//!
//! The log is newest-first and capped. Entries written by older versions
//! may lack detail fields, so loading skips unreadable entries and the
//! all-time summary falls back to what each entry does carry.

use crate::types::Suit;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// Default maximum number of history entries kept
pub const DEFAULT_MAX_HISTORY: usize = 50;

/// Per-suit total for one workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuitDetail {
    pub suit: Suit,
    #[serde(default)]
    pub workout: String,
    #[serde(default)]
    pub reps: u32,
}

/// One performed card, in draw order
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PerformedWorkout {
    pub workout: String,
    pub reps: u32,
}

/// Summary of a completed deck
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutHistoryEntry {
    pub id: i64,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub workout_name: String,
    #[serde(default)]
    pub suits: Vec<SuitDetail>,
    #[serde(default)]
    pub total_reps: u32,
    #[serde(default)]
    pub jokers: Vec<String>,
    #[serde(default)]
    pub performed_workouts: Vec<PerformedWorkout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cards_completed: Option<u32>,
}

impl WorkoutHistoryEntry {
    /// Cards completed, estimated for older entries that did not record it
    pub fn cards_completed_or_estimate(&self) -> u32 {
        self.cards_completed
            .unwrap_or_else(|| (self.performed_workouts.len() + self.jokers.len()) as u32)
    }

    /// Performed workouts, or the per-suit totals for older entries
    pub fn performed_or_suits(&self) -> Vec<PerformedWorkout> {
        if !self.performed_workouts.is_empty() {
            return self.performed_workouts.clone();
        }
        self.suits
            .iter()
            .map(|detail| PerformedWorkout {
                workout: if detail.workout.trim().is_empty() {
                    detail.suit.name().to_string()
                } else {
                    detail.workout.clone()
                },
                reps: detail.reps,
            })
            .collect()
    }
}

/// Pick an id from `now` that no existing entry uses
pub fn next_entry_id(now: DateTime<Utc>, existing: &[WorkoutHistoryEntry]) -> i64 {
    let taken: HashSet<i64> = existing.iter().map(|e| e.id).collect();
    let mut id = now.timestamp_millis();
    while taken.contains(&id) {
        id += 1;
    }
    id
}

/// Prepend an entry and drop the oldest entries beyond `cap`
pub fn push_capped(entries: &mut Vec<WorkoutHistoryEntry>, entry: WorkoutHistoryEntry, cap: usize) {
    entries.insert(0, entry);
    if entries.len() > cap {
        let dropped = entries.len() - cap;
        entries.truncate(cap);
        tracing::debug!("History over capacity, dropped {} oldest entries", dropped);
    }
}

/// Remove entries by id, returning how many were removed
pub fn delete_entries(entries: &mut Vec<WorkoutHistoryEntry>, ids: &[i64]) -> usize {
    let ids: HashSet<i64> = ids.iter().copied().collect();
    let before = entries.len();
    entries.retain(|entry| !ids.contains(&entry.id));
    before - entries.len()
}

/// Read a stored history, skipping unreadable entries and applying the cap
pub fn history_from_value(value: &Value, cap: usize) -> Vec<WorkoutHistoryEntry> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(items.len().min(cap));
    for (index, item) in items.iter().enumerate() {
        match serde_json::from_value::<WorkoutHistoryEntry>(item.clone()) {
            Ok(entry) if seen.insert(entry.id) => entries.push(entry),
            Ok(entry) => tracing::warn!("Skipping duplicate history entry {}", entry.id),
            Err(e) => tracing::warn!("Skipping unreadable history entry {}: {}", index, e),
        }
    }
    entries.truncate(cap);
    entries
}

/// Per-workout totals of one entry, sorted by label
pub fn summarize_suit_details(entry: &WorkoutHistoryEntry) -> Vec<(String, u32)> {
    let mut totals: BTreeMap<String, u32> = BTreeMap::new();
    for detail in &entry.suits {
        if detail.reps == 0 {
            continue;
        }
        let label = match detail.workout.trim() {
            "" => "Workout".to_string(),
            label => label.to_string(),
        };
        *totals.entry(label).or_default() += detail.reps;
    }
    totals.into_iter().collect()
}

/// Aggregate figures across the whole log
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllTimeSummary {
    pub total_reps: u64,
    /// Workout label and reps, most reps first, ties by label
    pub breakdown: Vec<(String, u64)>,
    pub jokers_completed: usize,
    pub cards_completed: u64,
}

pub fn all_time_summary(entries: &[WorkoutHistoryEntry]) -> AllTimeSummary {
    let mut totals: HashMap<String, u64> = HashMap::new();
    let mut summary = AllTimeSummary::default();

    for entry in entries {
        summary.total_reps += entry.total_reps as u64;
        summary.jokers_completed += entry.jokers.len();
        summary.cards_completed += entry.cards_completed_or_estimate() as u64;

        for item in entry.performed_or_suits() {
            if item.reps == 0 {
                continue;
            }
            let label = match item.workout.trim() {
                "" => "Workout".to_string(),
                label => label.to_string(),
            };
            *totals.entry(label).or_default() += item.reps as u64;
        }
    }

    let mut breakdown: Vec<(String, u64)> = totals.into_iter().collect();
    breakdown.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    summary.breakdown = breakdown;
    summary
}

/// Flat CSV row for history export
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    id: i64,
    completed_at: String,
    workout_name: &'a str,
    total_reps: u32,
    cards_completed: u32,
    jokers: String,
    workouts: String,
}

/// Write the history to a CSV file, one row per entry
pub fn write_csv(entries: &[WorkoutHistoryEntry], path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    for entry in entries {
        let workouts = summarize_suit_details(entry)
            .into_iter()
            .map(|(label, reps)| format!("{} - {}", label, reps))
            .collect::<Vec<_>>()
            .join("; ");
        writer.serialize(CsvRow {
            id: entry.id,
            completed_at: entry.completed_at.to_rfc3339(),
            workout_name: &entry.workout_name,
            total_reps: entry.total_reps,
            cards_completed: entry.cards_completed_or_estimate(),
            jokers: entry.jokers.join("; "),
            workouts,
        })?;
    }
    writer.flush()?;

    tracing::info!("Exported {} history entries to {:?}", entries.len(), path);
    Ok(entries.len())
}
