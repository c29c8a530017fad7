//! Integration tests for the deckwod binary.
//!
//! These tests verify end-to-end behavior including:
//! - Running a deck and recording history
//! - Session export
//! - Preset, library and random workout listings
//! - History CSV export

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to get the path to the CLI binary
fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("deckwod"))
}

fn read_history(data_dir: &Path) -> Vec<Value> {
    let path = data_dir.join("settings/workoutHistory.json");
    let contents = fs::read_to_string(&path).expect("Failed to read history");
    let value: Value = serde_json::from_str(&contents).expect("History is not JSON");
    value.as_array().expect("History is not a list").clone()
}

fn auto_run(data_dir: &Path, extra: &[&str]) -> assert_cmd::assert::Assert {
    cli()
        .arg("run")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--auto")
        .args(extra)
        .assert()
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Deck-of-cards workout tracker"));
}

#[test]
fn test_auto_run_records_history() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    auto_run(data_dir, &["--deck-size", "quarter", "--jokers", "0", "--seed", "7"])
        .success()
        .stdout(predicate::str::contains("DECK COMPLETE"))
        .stdout(predicate::str::contains("Workout saved to history"));

    let history = read_history(data_dir);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["cardsCompleted"], 13);
    assert_eq!(history[0]["workoutName"], "Standard");
    assert_eq!(history[0]["jokers"].as_array().unwrap().len(), 0);

    // Run options are saved as settings
    let deck_size = fs::read_to_string(data_dir.join("settings/deckSize.json")).unwrap();
    assert_eq!(deck_size, "\"quarter\"");
}

#[test]
fn test_history_is_newest_first() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    auto_run(data_dir, &["--deck-size", "quarter", "--jokers", "0"]).success();
    auto_run(data_dir, &["--deck-size", "half", "--jokers", "2"]).success();

    let history = read_history(data_dir);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["cardsCompleted"], 28);
    assert_eq!(history[0]["jokers"].as_array().unwrap().len(), 2);
    assert_eq!(history[1]["cardsCompleted"], 13);
    assert_ne!(history[0]["id"], history[1]["id"]);
}

#[test]
fn test_preset_selection() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    auto_run(data_dir, &["--preset", "crush-core", "--deck-size", "quarter", "--seed", "3"])
        .success()
        .stdout(predicate::str::contains("CRUSH CORE"));

    let history = read_history(data_dir);
    assert_eq!(history[0]["workoutName"], "Crush Core");
    // Crush Core carries two jokers
    assert_eq!(history[0]["cardsCompleted"], 15);
}

#[test]
fn test_unknown_preset_fails() {
    let temp_dir = setup_test_dir();

    auto_run(temp_dir.path(), &["--preset", "nope"])
        .failure()
        .stderr(predicate::str::contains("Unknown preset"));
}

#[test]
fn test_unknown_deck_size_fails() {
    let temp_dir = setup_test_dir();

    auto_run(temp_dir.path(), &["--deck-size", "eighth"])
        .failure()
        .stderr(predicate::str::contains("Unknown deck size"));
}

#[test]
fn test_export_session() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let export_path = data_dir.join("out/session.json");

    cli()
        .arg("run")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--auto")
        .arg("--deck-size")
        .arg("quarter")
        .arg("--jokers")
        .arg("1")
        .arg("--export")
        .arg(&export_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Session exported"));

    let snapshot: Value = serde_json::from_str(&fs::read_to_string(&export_path).unwrap()).unwrap();
    assert_eq!(snapshot["history"].as_array().unwrap().len(), 14);
    assert_eq!(snapshot["exerciseMap"]["♠"], "Sit-ups");
    assert_eq!(snapshot["valueMap"]["K"], 13);
    assert_eq!(snapshot["difficulty"], 1.0);
}

#[test]
fn test_interactive_run() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    // Two draws, one step back, then quit before the deck runs out
    cli()
        .arg("run")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--jokers")
        .arg("0")
        .arg("--deck-size")
        .arg("quarter")
        .write_stdin("\n\np\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Back to:"))
        .stdout(predicate::str::contains("12 cards left"));

    assert!(!data_dir.join("settings/workoutHistory.json").exists());

    // Thirteen cards then one more draw completes the deck
    cli()
        .arg("run")
        .arg("--data-dir")
        .arg(data_dir)
        .write_stdin("\n".repeat(14) + "\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("DECK COMPLETE"))
        .stdout(predicate::str::contains("Deck complete. 'r' to start over"));

    let history = read_history(data_dir);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["cardsCompleted"], 13);
}

#[test]
fn test_list_presets() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("presets")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("* Standard (standard)"))
        .stdout(predicate::str::contains("Crush Core (crush-core)"))
        .stdout(predicate::str::contains("Focus: Core"));
}

#[test]
fn test_list_library() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("library")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Kettle Bell Swings"));

    cli()
        .arg("library")
        .arg("--jokers")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("5 Burpees"));
}

#[test]
fn test_random_workout() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("random")
        .arg("--seed")
        .arg("11")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("RANDOM WORKOUT"))
        .stdout(predicate::str::contains("Joker pool:"));
}

#[test]
fn test_random_workout_auto_run_records_history() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let output = cli()
        .arg("random")
        .arg("--auto")
        .arg("--seed")
        .arg("11")
        .arg("--data-dir")
        .arg(data_dir)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("RANDOM WORKOUT"));
    assert!(stdout.contains("DECK COMPLETE"));
    let pool: Vec<&str> = stdout
        .lines()
        .find_map(|line| line.strip_prefix("Joker pool: "))
        .unwrap()
        .split(", ")
        .collect();

    let history = read_history(data_dir);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["workoutName"], "Random Workout");
    let jokers = history[0]["jokers"].as_array().unwrap();
    assert_eq!(jokers.len(), 1);
    for joker in jokers {
        assert!(pool.contains(&joker.as_str().unwrap()), "{} not in {:?}", joker, pool);
    }
}

#[test]
fn test_history_csv_export() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli()
        .arg("history")
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("No workouts recorded yet."));

    auto_run(data_dir, &["--deck-size", "quarter", "--jokers", "0"]).success();

    let csv_path = data_dir.join("history.csv");
    cli()
        .arg("history")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--csv")
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("All time:"))
        .stdout(predicate::str::contains("Exported 1 workouts"));

    let csv = fs::read_to_string(&csv_path).unwrap();
    assert!(csv.starts_with("id,completed_at,workout_name,total_reps,cards_completed,jokers,workouts"));
    assert_eq!(csv.lines().count(), 2);
}
