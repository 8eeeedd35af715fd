//! Acceptance tests for the callsight binary
//!
//! Each test seeds a JSONL event log through the real file destination of
//! callsight-core, then drives the compiled binary against it.

use assert_cmd::Command;
use callsight_core::{CallParams, FileConfig, Tracker, TrackerConfig, TrackingMode};
use std::path::PathBuf;
use tempfile::TempDir;

/// Write a three-event session log (start, one function call, end) and
/// return its path.
fn seed_event_log(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("events.jsonl");

    let config = TrackerConfig {
        mode: TrackingMode::File,
        file: FileConfig {
            path: Some(path.clone()),
        },
        ..Default::default()
    };
    let tracker = Tracker::with_config(config);

    tracker.start_session(Some("maya"));
    let _ = tracker.track_call(
        "create_meeting",
        CallParams::new().arg("title", &"standup"),
        || Ok::<_, String>("scheduled"),
    );
    let _ = tracker.track_call("cancel_meeting", CallParams::new(), || {
        Err::<(), _>("not found".to_string())
    });
    tracker.end_session();
    tracker.flush();

    path
}

#[test]
fn test_replay_renders_session_lines() {
    let dir = TempDir::new().unwrap();
    let log = seed_event_log(&dir);

    let output = Command::cargo_bin("callsight")
        .unwrap()
        .args(["replay", "--no-color"])
        .arg(&log)
        .assert()
        .success();

    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("🚀 Session Started"));
    assert!(stdout.contains("✅ create_meeting()"));
    assert!(stdout.contains("❌ cancel_meeting()"));
    assert!(stdout.contains("Error: not found"));
    assert!(stdout.contains("🏁 Session Ended"));
}

#[test]
fn test_replay_quiet_hides_calls() {
    let dir = TempDir::new().unwrap();
    let log = seed_event_log(&dir);

    let output = Command::cargo_bin("callsight")
        .unwrap()
        .args(["replay", "--quiet", "--no-color"])
        .arg(&log)
        .assert()
        .success();

    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("Session Started"));
    assert!(!stdout.contains("create_meeting"));
}

#[test]
fn test_summary_json_counts() {
    let dir = TempDir::new().unwrap();
    let log = seed_event_log(&dir);

    let output = Command::cargo_bin("callsight")
        .unwrap()
        .args(["summary", "--json"])
        .arg(&log)
        .assert()
        .success();

    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let summary: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(summary["function_calls"], 2);
    assert_eq!(summary["llm_calls"], 0);
    assert_eq!(summary["errors"], 0);
    assert!(summary["total_time_seconds"].is_number());
}

#[test]
fn test_missing_file_fails() {
    Command::cargo_bin("callsight")
        .unwrap()
        .args(["replay", "/nonexistent/events.jsonl"])
        .assert()
        .failure();
}
