//! Session tracking for one run through a deck.
//!
//! A session moves `Idle → InProgress → Complete`. Each draw adds its
//! contribution to the running totals and is pushed on an undo stack so
//! the last draw can be taken back exactly. Drawing past the last card
//! shows the end sentinel and yields the history entry once. A draw that
//! was taken back is replayed unchanged when its card comes up again.

use crate::assignment::SuitAssignment;
use crate::deck::build_deck;
use crate::history::{next_entry_id, PerformedWorkout, SuitDetail, WorkoutHistoryEntry};
use crate::library::LibraryRow;
use crate::rules::{base_value, draw_card, DrawContext, DrawnCard, RuleSettings};
use crate::types::{Card, DeckSize, Rank, Suit};
use crate::Result;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use uuid::Uuid;

/// Lifecycle of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    InProgress,
    Complete,
}

/// What is currently face up
#[derive(Clone, Debug, PartialEq)]
pub enum Showing {
    /// Card back before the first draw
    Back,
    Card(DrawnCard),
    /// Terminal card after the deck ran out
    End,
}

impl Showing {
    pub fn reps(&self) -> u32 {
        match self {
            Showing::Card(drawn) => drawn.reps,
            Showing::Back | Showing::End => 0,
        }
    }

    pub fn exercise(&self) -> &str {
        match self {
            Showing::Card(drawn) => &drawn.exercise,
            Showing::Back | Showing::End => "",
        }
    }
}

/// Result of a draw
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOutcome {
    Drawn(DrawnCard),
    /// The deck just ran out; carries the entry to record
    Completed(WorkoutHistoryEntry),
    /// Already complete, nothing changed
    Finished,
}

/// Everything a session needs to build and resolve its deck
#[derive(Clone, Debug)]
pub struct SessionSetup {
    pub workout_name: String,
    pub suits: SuitAssignment,
    pub workout_library: Vec<LibraryRow>,
    pub joker_library: Vec<LibraryRow>,
    /// Restricts joker picks to these labels (random workouts)
    pub session_jokers: Option<Vec<String>>,
    pub rules: RuleSettings,
    pub jokers: usize,
    pub deck_size: DeckSize,
}

/// Running totals of a session
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionTotals {
    pub suit_reps: BTreeMap<Suit, u32>,
    pub jokers: Vec<String>,
    pub performed: Vec<PerformedWorkout>,
    pub cards_completed: u32,
}

impl SessionTotals {
    pub fn total_reps(&self) -> u32 {
        self.suit_reps.values().sum()
    }

    fn add(&mut self, drawn: &DrawnCard) {
        self.cards_completed += 1;
        if drawn.is_joker() {
            self.jokers.push(drawn.exercise.clone());
        } else {
            *self.suit_reps.entry(drawn.card.suit).or_default() += drawn.reps;
            self.performed.push(PerformedWorkout {
                workout: drawn.exercise.clone(),
                reps: drawn.reps,
            });
        }
    }

    fn subtract(&mut self, drawn: &DrawnCard) {
        self.cards_completed = self.cards_completed.saturating_sub(1);
        if drawn.is_joker() {
            self.jokers.pop();
        } else {
            if let Some(reps) = self.suit_reps.get_mut(&drawn.card.suit) {
                *reps = reps.saturating_sub(drawn.reps);
            }
            self.performed.pop();
        }
    }
}

/// One run through a deck
#[derive(Clone, Debug)]
pub struct Session {
    id: Uuid,
    setup: SessionSetup,
    deck: VecDeque<Card>,
    showing: Showing,
    draws: Vec<DrawnCard>,
    /// Draws taken back by `previous`, reused when their card comes up again
    undone: Vec<DrawnCard>,
    totals: SessionTotals,
    phase: Phase,
    flushed: bool,
}

impl Session {
    /// Start a session with a freshly built deck
    pub fn new<R: Rng + ?Sized>(setup: SessionSetup, rng: &mut R) -> Self {
        let deck = build_deck(setup.jokers, setup.deck_size, rng);
        Self::with_deck(setup, deck)
    }

    /// Start a session over a given deck
    pub fn with_deck(setup: SessionSetup, deck: Vec<Card>) -> Self {
        Self {
            id: Uuid::new_v4(),
            setup,
            deck: deck.into(),
            showing: Showing::Back,
            draws: Vec::new(),
            undone: Vec::new(),
            totals: SessionTotals::default(),
            phase: Phase::Idle,
            flushed: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn showing(&self) -> &Showing {
        &self.showing
    }

    pub fn totals(&self) -> &SessionTotals {
        &self.totals
    }

    pub fn setup(&self) -> &SessionSetup {
        &self.setup
    }

    pub fn remaining(&self) -> usize {
        self.deck.len()
    }

    pub fn draws(&self) -> &[DrawnCard] {
        &self.draws
    }

    /// Draw the next card, or finish the session when the deck is empty
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> DrawOutcome {
        let Some(card) = self.deck.pop_front() else {
            self.showing = Showing::End;
            if self.flushed {
                return DrawOutcome::Finished;
            }
            self.flushed = true;
            self.phase = Phase::Complete;
            let entry = self.history_entry(Utc::now(), &[]);
            tracing::info!(
                "Deck complete: {} cards, {} reps",
                entry.cards_completed_or_estimate(),
                entry.total_reps
            );
            return DrawOutcome::Completed(entry);
        };

        let drawn = match self.undone.pop() {
            Some(cached) if cached.card.id == card.id => cached,
            stale => {
                if stale.is_some() {
                    self.undone.clear();
                }
                let ctx = DrawContext {
                    suits: &self.setup.suits,
                    workout_library: &self.setup.workout_library,
                    joker_library: &self.setup.joker_library,
                    session_jokers: self.setup.session_jokers.as_deref(),
                    rules: &self.setup.rules,
                };
                draw_card(card, &ctx, rng)
            }
        };
        tracing::debug!("Drew {} -> {} x{}", drawn.card.id, drawn.exercise, drawn.reps);

        self.totals.add(&drawn);
        self.draws.push(drawn.clone());
        self.showing = Showing::Card(drawn.clone());
        self.phase = Phase::InProgress;
        DrawOutcome::Drawn(drawn)
    }

    /// Whether `previous` would do anything
    pub fn can_go_back(&self) -> bool {
        self.draws.len() >= 2 && self.showing != Showing::End
    }

    /// Take back the last draw and show the one before it
    ///
    /// Returns `false` without changing anything when fewer than two cards
    /// have been drawn or the end card is showing.
    pub fn previous(&mut self) -> bool {
        if !self.can_go_back() {
            return false;
        }
        let Some(last) = self.draws.pop() else {
            return false;
        };
        self.totals.subtract(&last);
        self.deck.push_front(last.card.clone());
        self.undone.push(last);
        if let Some(prior) = self.draws.last() {
            self.showing = Showing::Card(prior.clone());
        }
        true
    }

    /// Back to idle with a new deck and zeroed totals
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let deck = build_deck(self.setup.jokers, self.setup.deck_size, rng);
        self.reset_with_deck(deck);
    }

    pub fn reset_with_deck(&mut self, deck: Vec<Card>) {
        self.id = Uuid::new_v4();
        self.deck = deck.into();
        self.showing = Showing::Back;
        self.draws.clear();
        self.undone.clear();
        self.totals = SessionTotals::default();
        self.phase = Phase::Idle;
        self.flushed = false;
        tracing::debug!("Session reset with {} cards", self.deck.len());
    }

    /// Rebuild the deck for new joker/size settings, resetting the run
    pub fn reconfigure<R: Rng + ?Sized>(&mut self, jokers: usize, deck_size: DeckSize, rng: &mut R) {
        self.setup.jokers = jokers;
        self.setup.deck_size = deck_size;
        self.reset(rng);
    }

    /// Build the history entry for the current totals
    pub fn history_entry(&self, now: DateTime<Utc>, existing: &[WorkoutHistoryEntry]) -> WorkoutHistoryEntry {
        let suits = self
            .setup
            .suits
            .iter()
            .map(|(suit, assignment)| SuitDetail {
                suit,
                workout: assignment.display_label(),
                reps: self.totals.suit_reps.get(&suit).copied().unwrap_or(0),
            })
            .collect();

        WorkoutHistoryEntry {
            id: next_entry_id(now, existing),
            completed_at: now,
            workout_name: self.setup.workout_name.clone(),
            suits,
            total_reps: self.totals.total_reps(),
            jokers: self.totals.jokers.clone(),
            performed_workouts: self.totals.performed.clone(),
            cards_completed: Some(self.totals.cards_completed),
        }
    }

    /// Snapshot of the session for export
    pub fn export_snapshot(&self) -> SessionSnapshot {
        let exercise_map = self
            .setup
            .suits
            .iter()
            .map(|(suit, assignment)| (suit.symbol().to_string(), assignment.display_label()))
            .collect();
        let value_map = Rank::STANDARD
            .into_iter()
            .map(|rank| (rank.label(), base_value(rank, &self.setup.rules)))
            .collect();

        SessionSnapshot {
            date: Utc::now(),
            session_id: self.id,
            workout_name: self.setup.workout_name.clone(),
            history: self.draws.clone(),
            exercise_map,
            value_map,
            difficulty: self.setup.rules.difficulty,
        }
    }
}

/// Write-only export of a session
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub date: DateTime<Utc>,
    pub session_id: Uuid,
    pub workout_name: String,
    pub history: Vec<DrawnCard>,
    pub exercise_map: BTreeMap<String, String>,
    pub value_map: BTreeMap<String, u32>,
    pub difficulty: f64,
}

impl SessionSnapshot {
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        tracing::info!("Exported session {} to {:?}", self.session_id, path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{default_joker_library, default_workout_library};
    use crate::rules::reps_for;
    use crate::types::FaceCardMode;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn setup(jokers: usize, deck_size: DeckSize) -> SessionSetup {
        SessionSetup {
            workout_name: "Standard".into(),
            suits: SuitAssignment::standard(),
            workout_library: default_workout_library().to_vec(),
            joker_library: default_joker_library().to_vec(),
            session_jokers: None,
            rules: RuleSettings {
                ace_high: false,
                face_card_mode: FaceCardMode::Progressive,
                difficulty: 1.0,
            },
            jokers,
            deck_size,
        }
    }

    fn draw_until_complete(session: &mut Session, rng: &mut StdRng) -> (Vec<DrawnCard>, WorkoutHistoryEntry) {
        let mut drawn = Vec::new();
        loop {
            match session.draw(rng) {
                DrawOutcome::Drawn(card) => drawn.push(card),
                DrawOutcome::Completed(entry) => return (drawn, entry),
                DrawOutcome::Finished => panic!("session finished without completing"),
            }
        }
    }

    #[test]
    fn test_full_deck_run_completes_once() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut session = Session::new(setup(0, DeckSize::Full), &mut rng);
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.showing(), &Showing::Back);

        session.draw(&mut rng);
        assert_eq!(session.phase(), Phase::InProgress);

        let (mut drawn, entry) = draw_until_complete(&mut session, &mut rng);
        drawn.insert(0, session.draws()[0].clone());
        assert_eq!(session.phase(), Phase::Complete);
        assert_eq!(drawn.len(), 52);

        let rules = &session.setup().rules;
        let expected: u32 = drawn.iter().map(|d| reps_for(&d.card, d.multiplier, rules)).sum();
        assert_eq!(entry.total_reps, expected);
        // 4 suits x (1 + 2..=10 + 11 + 12 + 13)
        assert_eq!(entry.total_reps, 4 * 91);
        assert_eq!(entry.cards_completed, Some(52));

        assert_eq!(session.draw(&mut rng), DrawOutcome::Finished);
        assert_eq!(session.draw(&mut rng), DrawOutcome::Finished);
        assert_eq!(session.showing(), &Showing::End);
    }

    #[test]
    fn test_quarter_deck_example() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut session = Session::new(setup(0, DeckSize::Quarter), &mut rng);
        assert_eq!(session.remaining(), 13);

        let (drawn, entry) = draw_until_complete(&mut session, &mut rng);
        assert_eq!(drawn.len(), 13);
        assert_eq!(entry.cards_completed, Some(13));
        assert!(entry.jokers.is_empty());
        assert_eq!(entry.performed_workouts.len(), 13);
        assert_eq!(entry.suits.len(), 4);
    }

    #[test]
    fn test_jokers_recorded() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut session = Session::new(setup(2, DeckSize::Quarter), &mut rng);
        let (drawn, entry) = draw_until_complete(&mut session, &mut rng);
        assert_eq!(drawn.len(), 15);
        assert_eq!(entry.jokers.len(), 2);
        assert_eq!(entry.cards_completed, Some(15));
        assert_eq!(entry.performed_workouts.len(), 13);
    }

    #[test]
    fn test_previous_needs_two_draws() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut session = Session::new(setup(0, DeckSize::Full), &mut rng);
        assert!(!session.previous());

        session.draw(&mut rng);
        let before = session.totals().clone();
        assert!(!session.previous());
        assert_eq!(session.totals(), &before);
        assert_eq!(session.remaining(), 51);
    }

    #[test]
    fn test_previous_reverses_last_draw_exactly() {
        let mut rng = StdRng::seed_from_u64(77);
        let mut session = Session::new(setup(1, DeckSize::Half), &mut rng);

        session.draw(&mut rng);
        let first_shown = session.showing().clone();
        let totals_after_one = session.totals().clone();
        let remaining_after_one = session.remaining();

        let second = match session.draw(&mut rng) {
            DrawOutcome::Drawn(card) => card,
            other => panic!("unexpected {:?}", other),
        };

        assert!(session.previous());
        assert_eq!(session.showing(), &first_shown);
        assert_eq!(session.totals(), &totals_after_one);
        assert_eq!(session.remaining(), remaining_after_one);

        // The card goes back on top and is drawn again next
        match session.draw(&mut rng) {
            DrawOutcome::Drawn(card) => assert_eq!(card.card.id, second.card.id),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_previous_is_noop_on_end_card() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut session = Session::new(setup(0, DeckSize::Quarter), &mut rng);
        draw_until_complete(&mut session, &mut rng);
        assert!(!session.previous());
        assert_eq!(session.showing(), &Showing::End);
    }

    #[test]
    fn test_reset_from_any_phase() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut session = Session::new(setup(0, DeckSize::Quarter), &mut rng);
        draw_until_complete(&mut session, &mut rng);

        session.reset(&mut rng);
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.showing(), &Showing::Back);
        assert_eq!(session.totals(), &SessionTotals::default());
        assert_eq!(session.remaining(), 13);

        // A reset session completes again
        let (_, entry) = draw_until_complete(&mut session, &mut rng);
        assert_eq!(entry.cards_completed, Some(13));
    }

    #[test]
    fn test_reconfigure_rebuilds_deck() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut session = Session::new(setup(0, DeckSize::Quarter), &mut rng);
        session.draw(&mut rng);
        session.reconfigure(2, DeckSize::Half, &mut rng);
        assert_eq!(session.remaining(), 28);
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn test_focus_resolution_cached_on_card() {
        let mut rng = StdRng::seed_from_u64(12);
        let mut s = setup(0, DeckSize::Full);
        s.suits.set(Suit::Spades, "Focus: Core");
        let deck = vec![
            Card::standard(Suit::Spades, Rank::Number(3)),
            Card::standard(Suit::Spades, Rank::Number(4)),
        ];
        let mut session = Session::with_deck(s, deck);

        let first = match session.draw(&mut rng) {
            DrawOutcome::Drawn(card) => card,
            other => panic!("unexpected {:?}", other),
        };
        let row = default_workout_library()
            .iter()
            .find(|r| r.workout == first.exercise)
            .unwrap();
        assert_eq!(row.focus, crate::types::Focus::Core);

        session.draw(&mut rng);
        assert!(session.previous());
        // Going back shows the cached resolution, not a new sample
        assert_eq!(session.showing().exercise(), first.exercise);
        assert_eq!(session.showing(), &Showing::Card(first));
    }

    #[test]
    fn test_redraw_after_previous_keeps_resolution() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut s = setup(1, DeckSize::Full);
            s.suits.set(Suit::Spades, "Focus: Core");
            let deck = vec![
                Card::standard(Suit::Spades, Rank::Number(3)),
                Card::joker("Joker-0-abc123".into()),
                Card::standard(Suit::Spades, Rank::Number(5)),
            ];
            let mut session = Session::with_deck(s, deck);

            session.draw(&mut rng);
            let second = match session.draw(&mut rng) {
                DrawOutcome::Drawn(card) => card,
                other => panic!("unexpected {:?}", other),
            };
            assert!(session.previous());
            assert_eq!(session.remaining(), 2);

            let redrawn = match session.draw(&mut rng) {
                DrawOutcome::Drawn(card) => card,
                other => panic!("unexpected {:?}", other),
            };
            assert_eq!(redrawn, second, "seed {}", seed);
            assert_eq!(session.totals().jokers, vec![second.exercise.clone()]);

            // Going back twice then forward replays both draws in order
            let third = match session.draw(&mut rng) {
                DrawOutcome::Drawn(card) => card,
                other => panic!("unexpected {:?}", other),
            };
            assert!(session.previous());
            assert!(session.previous());
            assert_eq!(session.draw(&mut rng), DrawOutcome::Drawn(second.clone()));
            assert_eq!(session.draw(&mut rng), DrawOutcome::Drawn(third));
        }
    }

    #[test]
    fn test_reset_discards_undone_draws() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut session = Session::new(setup(2, DeckSize::Quarter), &mut rng);
        session.draw(&mut rng);
        session.draw(&mut rng);
        assert!(session.previous());

        let deck = vec![Card::standard(Suit::Hearts, Rank::Number(2))];
        session.reset_with_deck(deck);
        match session.draw(&mut rng) {
            DrawOutcome::Drawn(card) => assert_eq!(card.exercise, "Push-ups"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_export_snapshot() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut session = Session::new(setup(0, DeckSize::Quarter), &mut rng);
        session.draw(&mut rng);
        session.draw(&mut rng);

        let snapshot = session.export_snapshot();
        assert_eq!(snapshot.history.len(), 2);
        assert_eq!(snapshot.value_map["K"], 13);
        assert_eq!(snapshot.exercise_map["♥"], "Push-ups");

        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("session.json");
        snapshot.write_to(&path).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["difficulty"], 1.0);
        assert_eq!(json["history"].as_array().unwrap().len(), 2);
        assert!(json["exerciseMap"].is_object());
        assert!(json["valueMap"].is_object());
    }
}
