//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with the settings directory pointed at a
//! temporary directory.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(config_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_roundbell"))
        .args(args)
        .env("ROUNDBELL_CONFIG_DIR", config_dir)
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn test_preset_list() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["preset", "list"]);
    assert_eq!(code, 0);
    for name in ["beginner", "intermediate", "advanced"] {
        assert!(stdout.contains(name), "missing {name} in {stdout}");
    }
}

#[test]
fn test_preset_list_json() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["preset", "list", "--json"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let presets = parsed.as_array().unwrap();
    assert_eq!(presets.len(), 3);
    assert_eq!(presets[2]["name"], "advanced");
    assert_eq!(presets[2]["config"]["totalRounds"], 12);
}

#[test]
fn test_preset_show_unknown() {
    let dir = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["preset", "show", "olympic"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error: Unknown preset: olympic"), "{stderr}");
}

#[test]
fn test_config_path_follows_env() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["config", "path"]);
    assert_eq!(code, 0);
    assert_eq!(
        stdout.trim(),
        dir.path().join("config.toml").display().to_string()
    );
}

#[test]
fn test_config_set_and_get() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["config", "get", "timer.work_duration"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "180");

    let (stdout, _, code) = run_cli(dir.path(), &["config", "set", "timer.work_duration", "90"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");
    assert!(dir.path().join("config.toml").exists());

    let (stdout, _, code) = run_cli(dir.path(), &["config", "get", "timer.work_duration"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "90");
}

#[test]
fn test_config_set_rejects_out_of_range() {
    let dir = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["config", "set", "timer.rest_duration", "0"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"), "{stderr}");
    assert!(!dir.path().join("config.toml").exists());

    let (_, _, code) = run_cli(dir.path(), &["config", "get", "timer.nope"]);
    assert_eq!(code, 1);
}

#[test]
fn test_config_list_and_reset() {
    let dir = TempDir::new().unwrap();
    run_cli(dir.path(), &["config", "set", "audio.volume", "30"]);
    let (stdout, _, code) = run_cli(dir.path(), &["config", "list"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("audio.volume = 30"), "{stdout}");
    assert!(stdout.contains("engine.tick_interval_ms = 100"), "{stdout}");

    let (_, _, code) = run_cli(dir.path(), &["config", "reset"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(dir.path(), &["config", "get", "audio.volume"]);
    assert_eq!(stdout.trim(), "80");
}

#[test]
fn test_run_rejects_short_work_phase() {
    let dir = TempDir::new().unwrap();
    let (stdout, stderr, code) = run_cli(dir.path(), &["run", "--work", "5"]);
    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(
        stderr.contains("workDuration must be between 10 and 600"),
        "{stderr}"
    );
}

#[test]
fn test_run_short_workout() {
    let dir = TempDir::new().unwrap();
    let (stdout, stderr, code) = run_cli(
        dir.path(),
        &[
            "run", "--rounds", "1", "--work", "10", "--prep", "0", "--tick-ms", "250", "--cues",
        ],
    );
    assert_eq!(code, 0, "{stderr}");

    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let types: Vec<&str> = events.iter().map(|e| e["type"].as_str().unwrap()).collect();
    assert!(types.contains(&"started"));
    assert!(!types.contains(&"warning"));

    let last = events.last().unwrap();
    assert_eq!(last["type"], "workoutComplete");
    assert_eq!(last["stateSnapshot"]["phase"], "complete");
    assert_eq!(last["cues"], serde_json::json!(["workoutComplete", "celebration"]));
}
