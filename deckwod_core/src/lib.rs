#![forbid(unsafe_code)]

//! Core domain model and business logic for the deckwod deck-of-cards workout.
//!
//! This crate provides:
//! - Domain types (cards, suits, deck sizes, library enumerations)
//! - Deck building and shuffling
//! - Rep rules and draw-time exercise resolution
//! - Workout libraries, deck presets and random workouts
//! - Session tracking with undo and the capped history log
//! - Persistence (per-slice settings store, debounced writes, config)

pub mod types;
pub mod error;
pub mod assignment;
pub mod library;
pub mod deck;
pub mod rules;
pub mod presets;
pub mod random_workout;
pub mod session;
pub mod history;
pub mod store;
pub mod settings;
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use assignment::{Assignment, SuitAssignment, WorkoutLabel};
pub use library::LibraryRow;
pub use deck::build_deck;
pub use rules::{draw_card, reps_for, DrawnCard, RuleSettings};
pub use presets::DeckPreset;
pub use random_workout::{generate_random_workout, RandomWorkoutSettings};
pub use session::{DrawOutcome, Phase, Session, SessionSetup, Showing};
pub use history::WorkoutHistoryEntry;
pub use store::{FileStore, KvStore, MemoryStore};
pub use settings::{AppSettings, SettingsStore};
pub use config::Config;
