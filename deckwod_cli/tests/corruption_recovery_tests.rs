//! Corruption recovery tests for deckwod.
//!
//! These tests verify the system can handle:
//! - Corrupted settings slices
//! - Slices holding values of the wrong shape
//! - Settings written in the older single-blob format
//! - Partial history entries

use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("deckwod"))
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn write_slice(data_dir: &Path, key: &str, contents: &str) {
    let dir = data_dir.join("settings");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{}.json", key)), contents).expect("Failed to write slice");
}

fn read_slice(data_dir: &Path, key: &str) -> Value {
    let contents = fs::read_to_string(data_dir.join("settings").join(format!("{}.json", key)))
        .expect("Failed to read slice");
    serde_json::from_str(&contents).expect("Slice is not JSON")
}

fn auto_quarter_run(data_dir: &Path) {
    cli()
        .arg("run")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--auto")
        .arg("--deck-size")
        .arg("quarter")
        .assert()
        .success();
}

#[test]
fn test_corrupted_slices_use_defaults() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    write_slice(data_dir, "numJokers", "{ invalid json }}}}");
    write_slice(data_dir, "exMap", "[1, 2");
    write_slice(data_dir, "workoutLibrary", "");

    auto_quarter_run(data_dir);

    let history = read_slice(data_dir, "workoutHistory");
    // Default joker count is one
    assert_eq!(history[0]["cardsCompleted"], 14);
    let workouts: Vec<&str> = history[0]["suits"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["workout"].as_str().unwrap())
        .collect();
    assert_eq!(workouts, vec!["Sit-ups", "Push-ups", "Squats", "Burpees"]);
}

#[test]
fn test_wrong_shape_values_are_normalized() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    write_slice(data_dir, "numJokers", "\"2\"");
    write_slice(data_dir, "deckSize", "\"gigantic\"");
    write_slice(data_dir, "selectedPresetId", "\"deleted-preset\"");
    write_slice(data_dir, "exMap", r#"{"♠": "Lunges (2x)", "♥": "", "★": "Nope"}"#);

    cli()
        .arg("run")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--auto")
        .arg("--seed")
        .arg("5")
        .assert()
        .success();

    let history = read_slice(data_dir, "workoutHistory");
    // Unknown deck size falls back to a full deck
    assert_eq!(history[0]["cardsCompleted"], 54);
    assert_eq!(history[0]["workoutName"], "Standard");
    assert_eq!(history[0]["suits"][0]["workout"], "Lunges (2x)");
    assert_eq!(history[0]["suits"][1]["workout"], "Push-ups");
}

#[test]
fn test_corrupted_history_is_replaced() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    write_slice(data_dir, "workoutHistory", "{ not valid json at all }");

    auto_quarter_run(data_dir);

    let history = read_slice(data_dir, "workoutHistory");
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[test]
fn test_partial_history_entries_skipped() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    write_slice(
        data_dir,
        "workoutHistory",
        r#"[
            {"id": 1700000000000, "completedAt": "2023-11-14T22:13:20Z", "totalReps": 91,
             "suits": [{"suit": "♠", "workout": "Sit-ups", "reps": 91}]},
            {"id": "partial"},
            "garbage"
        ]"#,
    );

    cli()
        .arg("history")
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicates::str::contains("All time: 91 reps"));

    auto_quarter_run(data_dir);

    let history = read_slice(data_dir, "workoutHistory");
    let entries = history.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1]["id"], 1700000000000i64);
}

#[test]
fn test_legacy_settings_upgraded() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    write_slice(
        data_dir,
        "deckWorkoutSettings",
        r#"{"numJokers": 0, "exMap": {"♣": "Mountain Climbers"}, "jokerWorkouts": ["Bear Crawls"], "aceHigh": true}"#,
    );

    auto_quarter_run(data_dir);

    let history = read_slice(data_dir, "workoutHistory");
    assert_eq!(history[0]["cardsCompleted"], 13);
    assert_eq!(history[0]["suits"][3]["workout"], "Mountain Climbers");

    // The upgrade is written out as slices
    assert_eq!(read_slice(data_dir, "numJokers"), 0);
    assert_eq!(read_slice(data_dir, "aceHigh"), true);
    assert_eq!(read_slice(data_dir, "jokerLibrary")[0]["workout"], "Bear Crawls");
}

#[test]
fn test_empty_settings_directory() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    fs::create_dir_all(data_dir.join("settings")).unwrap();

    cli()
        .arg("presets")
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success();
}
