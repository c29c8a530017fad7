//! Persisted application settings.
//!
//! Settings are stored as independent slices, one JSON document per key.
//! Every slice has a normalize-or-default reader, so missing, corrupt or
//! outdated values never fail a load. The single-blob format written by
//! older versions is only consulted when no slice exists at all, and is
//! upgraded by feeding its fields through the same slice readers.
//!
//! [`SettingsStore`] owns the loaded state. Every change stages the slices
//! it touched on a debounced [`WriteQueue`]; callers drive it with
//! [`SettingsStore::tick`] and everything pending is written on drop.

use crate::assignment::SuitAssignment;
use crate::config::Config;
use crate::deck::MAX_JOKERS;
use crate::history::{history_from_value, next_entry_id, push_capped, WorkoutHistoryEntry, DEFAULT_MAX_HISTORY};
use crate::library::{default_joker_library, default_workout_library, merge_library_value, normalize_library, value_as_bool, value_as_f64, LibraryRow};
use crate::presets::{self, builtin_preset, find_preset, merge_deck_presets, DeckPreset, STANDARD_PRESET_ID};
use crate::random_workout::{generate_random_workout, merge_random_settings, RandomWorkoutSettings};
use crate::rules::{normalize_difficulty, RuleSettings};
use crate::session::SessionSetup;
use crate::store::{KvStore, WriteQueue};
use crate::types::{DeckSize, FaceCardMode, JokerSlots, Suit};
use crate::Result;
use rand::Rng;
use serde_json::{Map, Value};
use std::time::{Duration, Instant};

/// Storage keys of the persisted slices
pub mod keys {
    pub const DECK_PRESETS: &str = "deckPresets";
    pub const SELECTED_PRESET_ID: &str = "selectedPresetId";
    pub const NUM_JOKERS: &str = "numJokers";
    pub const DECK_SIZE: &str = "deckSize";
    pub const EX_MAP: &str = "exMap";
    pub const WORKOUT_LIBRARY: &str = "workoutLibrary";
    pub const JOKER_LIBRARY: &str = "jokerLibrary";
    pub const ACE_HIGH: &str = "aceHigh";
    pub const FACE_CARD_MODE: &str = "faceCardMode";
    pub const DIFFICULTY: &str = "difficulty";
    pub const JOKER_SLOTS: &str = "jokerSlots";
    pub const WORKOUT_HISTORY: &str = "workoutHistory";
    pub const KEEP_SCREEN_AWAKE: &str = "keepScreenAwake";
    pub const RANDOM_WORKOUT_SETTINGS: &str = "randomWorkoutSettings";

    /// Single-blob settings written by older versions
    pub const LEGACY: &str = "deckWorkoutSettings";

    pub const ALL: [&str; 14] = [
        DECK_PRESETS,
        SELECTED_PRESET_ID,
        NUM_JOKERS,
        DECK_SIZE,
        EX_MAP,
        WORKOUT_LIBRARY,
        JOKER_LIBRARY,
        ACE_HIGH,
        FACE_CARD_MODE,
        DIFFICULTY,
        JOKER_SLOTS,
        WORKOUT_HISTORY,
        KEEP_SCREEN_AWAKE,
        RANDOM_WORKOUT_SETTINGS,
    ];
}

/// The full in-memory settings state
#[derive(Clone, Debug, PartialEq)]
pub struct AppSettings {
    pub deck_presets: Vec<DeckPreset>,
    pub selected_preset_id: String,
    pub num_jokers: usize,
    pub deck_size: DeckSize,
    pub suits: SuitAssignment,
    pub workout_library: Vec<LibraryRow>,
    pub joker_library: Vec<LibraryRow>,
    pub rules: RuleSettings,
    pub joker_slots: JokerSlots,
    pub history: Vec<WorkoutHistoryEntry>,
    pub keep_screen_awake: bool,
    pub random_settings: RandomWorkoutSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self::from_source(|_| None, DEFAULT_MAX_HISTORY)
    }
}

impl AppSettings {
    /// Build settings from per-slice values, normalizing each one
    ///
    /// `source` returns the stored value of a slice key, or `None` when the
    /// slice is missing or unreadable.
    pub fn from_source<F>(source: F, max_history: usize) -> Self
    where
        F: Fn(&str) -> Option<Value>,
    {
        let deck_presets = merge_deck_presets(&source(keys::DECK_PRESETS).unwrap_or(Value::Null));

        let selected_preset_id = source(keys::SELECTED_PRESET_ID)
            .and_then(|v| v.as_str().map(str::trim).map(str::to_string))
            .filter(|id| find_preset(&deck_presets, id).is_some())
            .unwrap_or_else(|| STANDARD_PRESET_ID.to_string());
        let selected = find_preset(&deck_presets, &selected_preset_id)
            .cloned()
            .or_else(|| builtin_preset(STANDARD_PRESET_ID));
        let preset_suits = selected.as_ref().map(|p| p.suits.clone()).unwrap_or_default();
        let preset_slots = selected.as_ref().map(|p| p.joker_slots).unwrap_or_default();

        let joker_slots = source(keys::JOKER_SLOTS)
            .map(|v| JokerSlots::from_value(&v, preset_slots))
            .unwrap_or(preset_slots);

        let num_jokers = source(keys::NUM_JOKERS)
            .as_ref()
            .and_then(value_as_f64)
            .filter(|n| n.is_finite())
            .map(|n| n.round().clamp(0.0, MAX_JOKERS as f64) as usize)
            .unwrap_or_else(|| joker_slots.joker_count());

        let deck_size = source(keys::DECK_SIZE)
            .and_then(|v| v.as_str().and_then(DeckSize::from_key))
            .unwrap_or_default();

        let suits = source(keys::EX_MAP)
            .map(|v| SuitAssignment::from_value(&v, &preset_suits))
            .unwrap_or(preset_suits);

        let workout_library =
            merge_library_value(default_workout_library(), &source(keys::WORKOUT_LIBRARY).unwrap_or(Value::Null));
        let joker_library =
            merge_library_value(default_joker_library(), &source(keys::JOKER_LIBRARY).unwrap_or(Value::Null));

        let defaults = RuleSettings::default();
        let rules = RuleSettings {
            ace_high: source(keys::ACE_HIGH)
                .as_ref()
                .and_then(value_as_bool)
                .unwrap_or(defaults.ace_high),
            face_card_mode: source(keys::FACE_CARD_MODE)
                .and_then(|v| v.as_str().and_then(FaceCardMode::parse))
                .unwrap_or(defaults.face_card_mode),
            difficulty: source(keys::DIFFICULTY)
                .as_ref()
                .and_then(value_as_f64)
                .map(normalize_difficulty)
                .unwrap_or(defaults.difficulty),
        };

        let history = source(keys::WORKOUT_HISTORY)
            .map(|v| history_from_value(&v, max_history))
            .unwrap_or_default();

        let keep_screen_awake = source(keys::KEEP_SCREEN_AWAKE)
            .as_ref()
            .and_then(value_as_bool)
            .unwrap_or(false);

        let random_settings = merge_random_settings(&source(keys::RANDOM_WORKOUT_SETTINGS).unwrap_or(Value::Null));

        Self {
            deck_presets,
            selected_preset_id,
            num_jokers,
            deck_size,
            suits,
            workout_library,
            joker_library,
            rules,
            joker_slots,
            history,
            keep_screen_awake,
            random_settings,
        }
    }

    /// Upgrade the older single-blob format
    ///
    /// Its fields are mapped onto slice keys and read like any other slice;
    /// the legacy joker list becomes the saved joker library.
    pub fn from_legacy(blob: &Value, max_history: usize) -> Self {
        let mut slices = Map::new();
        if let Some(obj) = blob.as_object() {
            for (legacy_key, slice_key) in [
                ("numJokers", keys::NUM_JOKERS),
                ("exMap", keys::EX_MAP),
                ("jokerWorkouts", keys::JOKER_LIBRARY),
                ("difficulty", keys::DIFFICULTY),
                ("aceHigh", keys::ACE_HIGH),
            ] {
                if let Some(value) = obj.get(legacy_key) {
                    slices.insert(slice_key.to_string(), value.clone());
                }
            }
        }
        Self::from_source(|key| slices.get(key).cloned(), max_history)
    }

    /// Serialized value of one slice
    pub fn slice_value(&self, key: &str) -> Result<Option<Value>> {
        let value = match key {
            keys::DECK_PRESETS => serde_json::to_value(&self.deck_presets)?,
            keys::SELECTED_PRESET_ID => Value::from(self.selected_preset_id.clone()),
            keys::NUM_JOKERS => Value::from(self.num_jokers),
            keys::DECK_SIZE => serde_json::to_value(self.deck_size)?,
            keys::EX_MAP => serde_json::to_value(&self.suits)?,
            keys::WORKOUT_LIBRARY => serde_json::to_value(&self.workout_library)?,
            keys::JOKER_LIBRARY => serde_json::to_value(&self.joker_library)?,
            keys::ACE_HIGH => Value::from(self.rules.ace_high),
            keys::FACE_CARD_MODE => serde_json::to_value(self.rules.face_card_mode)?,
            keys::DIFFICULTY => Value::from(self.rules.difficulty),
            keys::JOKER_SLOTS => serde_json::to_value(self.joker_slots)?,
            keys::WORKOUT_HISTORY => serde_json::to_value(&self.history)?,
            keys::KEEP_SCREEN_AWAKE => Value::from(self.keep_screen_awake),
            keys::RANDOM_WORKOUT_SETTINGS => serde_json::to_value(&self.random_settings)?,
            _ => return Ok(None),
        };
        Ok(Some(value))
    }

    pub fn selected_preset(&self) -> Option<&DeckPreset> {
        find_preset(&self.deck_presets, &self.selected_preset_id)
    }
}

/// Loaded settings plus the store and write queue behind them
pub struct SettingsStore<S: KvStore> {
    store: S,
    queue: WriteQueue,
    settings: AppSettings,
    max_history: usize,
}

impl<S: KvStore> SettingsStore<S> {
    /// Load settings using the configured debounce and history cap
    pub fn open(store: S, config: &Config) -> Self {
        Self::with_options(store, config.persistence.debounce(), config.history.max_entries)
    }

    pub fn with_options(store: S, debounce: Duration, max_history: usize) -> Self {
        let mut this = Self {
            store,
            queue: WriteQueue::new(debounce),
            settings: AppSettings::default(),
            max_history: max_history.max(1),
        };
        this.load();
        this
    }

    /// Re-read every slice from the store, discarding unsaved changes
    pub fn load(&mut self) {
        self.queue = WriteQueue::new(self.queue.delay());
        let has_slices = keys::ALL.iter().any(|key| self.store.contains(key));

        if has_slices {
            let store = &self.store;
            self.settings = AppSettings::from_source(|key| read_slice(store, key), self.max_history);
            tracing::info!("Loaded settings ({} history entries)", self.settings.history.len());
        } else if let Some(blob) = read_slice(&self.store, keys::LEGACY) {
            self.settings = AppSettings::from_legacy(&blob, self.max_history);
            tracing::info!("Upgraded legacy settings to per-slice storage");
            for key in keys::ALL {
                self.stage(key);
            }
        } else {
            self.settings = AppSettings::from_source(|_| None, self.max_history);
            tracing::info!("No saved settings, using defaults");
        }
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.queue.is_empty()
    }

    fn slice_json(&self, key: &str) -> Result<Option<String>> {
        match self.settings.slice_value(key)? {
            Some(value) => Ok(Some(serde_json::to_string(&value)?)),
            None => Ok(None),
        }
    }

    fn stage(&mut self, key: &'static str) {
        match self.slice_json(key) {
            Ok(Some(json)) => self.queue.stage(key, json),
            Ok(None) => tracing::warn!("Unknown settings slice {}", key),
            Err(e) => tracing::warn!("Failed to serialize slice {}: {}", key, e),
        }
    }

    /// Write pending slices whose debounce delay has passed
    pub fn tick(&mut self, now: Instant) -> usize {
        self.queue.flush_due(&mut self.store, now)
    }

    /// Write every pending slice now
    pub fn flush(&mut self) -> usize {
        self.queue.flush(&mut self.store)
    }

    // ------------------------------------------------------------------
    // Deck settings
    // ------------------------------------------------------------------

    pub fn set_num_jokers(&mut self, jokers: usize) {
        self.settings.num_jokers = jokers.min(MAX_JOKERS);
        self.stage(keys::NUM_JOKERS);
    }

    pub fn set_deck_size(&mut self, deck_size: DeckSize) {
        self.settings.deck_size = deck_size;
        self.stage(keys::DECK_SIZE);
    }

    /// Assign a suit; empty input leaves the previous value in place
    pub fn set_suit(&mut self, suit: Suit, raw: &str) -> bool {
        if !self.settings.suits.set(suit, raw) {
            return false;
        }
        self.stage(keys::EX_MAP);
        true
    }

    pub fn set_rules(&mut self, rules: RuleSettings) {
        self.settings.rules = RuleSettings {
            difficulty: normalize_difficulty(rules.difficulty),
            ..rules
        };
        self.stage(keys::ACE_HIGH);
        self.stage(keys::FACE_CARD_MODE);
        self.stage(keys::DIFFICULTY);
    }

    pub fn set_keep_screen_awake(&mut self, keep_awake: bool) {
        self.settings.keep_screen_awake = keep_awake;
        self.stage(keys::KEEP_SCREEN_AWAKE);
    }

    pub fn set_random_settings(&mut self, settings: RandomWorkoutSettings) {
        let value = serde_json::to_value(&settings).unwrap_or(Value::Null);
        self.settings.random_settings = merge_random_settings(&value);
        self.stage(keys::RANDOM_WORKOUT_SETTINGS);
    }

    // ------------------------------------------------------------------
    // Presets
    // ------------------------------------------------------------------

    /// Apply a preset's suits and joker slots; unknown ids change nothing
    pub fn select_preset(&mut self, id: &str) -> bool {
        let Some(preset) = find_preset(&self.settings.deck_presets, id).cloned() else {
            tracing::warn!("Unknown preset {}", id);
            return false;
        };
        self.settings.selected_preset_id = preset.id;
        self.settings.suits = preset.suits;
        self.settings.joker_slots = preset.joker_slots;
        self.settings.num_jokers = preset.joker_slots.joker_count();
        for key in [keys::SELECTED_PRESET_ID, keys::EX_MAP, keys::JOKER_SLOTS, keys::NUM_JOKERS] {
            self.stage(key);
        }
        true
    }

    /// Save the current suits and joker slots as a new preset and select it
    pub fn create_preset(&mut self, name: &str) -> Option<String> {
        let id = presets::create_preset(
            &mut self.settings.deck_presets,
            name,
            self.settings.suits.clone(),
            self.settings.joker_slots,
        )?;
        self.settings.selected_preset_id = id.clone();
        self.stage(keys::DECK_PRESETS);
        self.stage(keys::SELECTED_PRESET_ID);
        Some(id)
    }

    /// Overwrite a preset with the current suits and joker slots
    pub fn save_to_preset(&mut self, id: &str) -> bool {
        let suits = self.settings.suits.clone();
        let slots = self.settings.joker_slots;
        let Some(preset) = self.settings.deck_presets.iter_mut().find(|p| p.id == id) else {
            return false;
        };
        preset.suits = suits;
        preset.joker_slots = slots;
        self.stage(keys::DECK_PRESETS);
        true
    }

    /// Delete a user preset; selecting falls back to the standard preset
    pub fn delete_preset(&mut self, id: &str) -> bool {
        if !presets::delete_preset(&mut self.settings.deck_presets, id) {
            return false;
        }
        self.stage(keys::DECK_PRESETS);
        if self.settings.selected_preset_id == id {
            self.select_preset(STANDARD_PRESET_ID);
        }
        true
    }

    pub fn reset_builtin_preset(&mut self, id: &str) -> bool {
        if !presets::reset_builtin(&mut self.settings.deck_presets, id) {
            return false;
        }
        self.stage(keys::DECK_PRESETS);
        true
    }

    // ------------------------------------------------------------------
    // Libraries
    // ------------------------------------------------------------------

    /// Edit the workout library in place, then normalize and stage it
    pub fn edit_workout_library<T>(&mut self, edit: impl FnOnce(&mut Vec<LibraryRow>) -> T) -> T {
        let result = edit(&mut self.settings.workout_library);
        normalize_library(&mut self.settings.workout_library);
        self.stage(keys::WORKOUT_LIBRARY);
        result
    }

    /// Edit the joker library in place, then normalize and stage it
    pub fn edit_joker_library<T>(&mut self, edit: impl FnOnce(&mut Vec<LibraryRow>) -> T) -> T {
        let result = edit(&mut self.settings.joker_library);
        normalize_library(&mut self.settings.joker_library);
        self.stage(keys::JOKER_LIBRARY);
        result
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Prepend a completed workout to the capped history; returns its id
    ///
    /// The id is re-derived against the stored log so it is unique there.
    pub fn record_workout(&mut self, mut entry: WorkoutHistoryEntry) -> i64 {
        entry.id = next_entry_id(entry.completed_at, &self.settings.history);
        let id = entry.id;
        push_capped(&mut self.settings.history, entry, self.max_history);
        self.stage(keys::WORKOUT_HISTORY);
        tracing::info!("Recorded workout {} ({} in history)", id, self.settings.history.len());
        id
    }

    pub fn delete_history(&mut self, ids: &[i64]) -> usize {
        let removed = crate::history::delete_entries(&mut self.settings.history, ids);
        if removed > 0 {
            self.stage(keys::WORKOUT_HISTORY);
        }
        removed
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// Setup for a session over the current deck settings
    pub fn session_setup(&self) -> SessionSetup {
        let workout_name = self
            .settings
            .selected_preset()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "Custom".to_string());
        SessionSetup {
            workout_name,
            suits: self.settings.suits.clone(),
            workout_library: self.settings.workout_library.clone(),
            joker_library: self.settings.joker_library.clone(),
            session_jokers: None,
            rules: self.settings.rules.clone(),
            jokers: self.settings.num_jokers,
            deck_size: self.settings.deck_size,
        }
    }

    /// Setup for a freshly generated random workout
    pub fn random_session_setup<R: Rng + ?Sized>(&self, rng: &mut R) -> SessionSetup {
        let workout = generate_random_workout(
            &self.settings.random_settings,
            &self.settings.workout_library,
            &self.settings.joker_library,
            rng,
        );
        workout.session_setup(&self.settings.workout_library, &self.settings.joker_library)
    }
}

impl<S: KvStore> Drop for SettingsStore<S> {
    fn drop(&mut self) {
        if !self.queue.is_empty() {
            self.flush();
        }
    }
}

/// Read and parse one slice; corrupt JSON is logged and treated as missing
fn read_slice<S: KvStore + ?Sized>(store: &S, key: &str) -> Option<Value> {
    match store.get(key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring corrupt settings slice {}: {}", key, e);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("Failed to read settings slice {}: {}", key, e);
            None
        }
    }
}
