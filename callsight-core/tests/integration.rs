//! Integration tests for the tracking pipeline
//!
//! These drive a real `Tracker` end to end: wrappers → emission → buffer →
//! renderer/destination, asserting the observable properties of the system.

use std::sync::{Arc, Mutex};

use callsight_core::{
    CallParams, ConsoleRenderer, Event, EventKind, Render, SessionSummary, Tracker, TrackerConfig,
    TrackingMode, Verbosity,
};

/// Renderer that records every forwarded event kind and stays silent.
#[derive(Default)]
struct RecordingRenderer {
    seen: Arc<Mutex<Vec<String>>>,
}

impl Render for RecordingRenderer {
    fn render_event(&self, event: &Event, _config: &TrackerConfig) -> Option<String> {
        self.seen.lock().unwrap().push(event.kind.name().to_string());
        None
    }

    fn render_summary(&self, _summary: &SessionSummary, _config: &TrackerConfig) -> Option<String> {
        None
    }
}

/// Tracker in console mode with a recording renderer; wrappers run, nothing
/// prints.
fn recording_tracker() -> (Tracker, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let renderer = RecordingRenderer { seen: seen.clone() };
    let tracker = Tracker::with_renderer(TrackerConfig::default(), Box::new(renderer));
    (tracker, seen)
}

fn sample_api_call(success: bool) -> EventKind {
    EventKind::ApiCall {
        api_name: "calendar".to_string(),
        endpoint: "/v3/events".to_string(),
        method: "GET".to_string(),
        status_code: Some(if success { 200 } else { 500 }),
        response_time_ms: 40.0,
        success,
        request_size: None,
        response_size: Some(1024),
        error_message: if success {
            None
        } else {
            Some("server error".to_string())
        },
    }
}

#[test]
fn test_events_kept_in_emission_order_with_session_ids() {
    let (tracker, _seen) = recording_tracker();
    let id = tracker.start_session(Some("maya"));

    let _ = tracker.track_call("first", CallParams::new(), || Ok::<_, String>(1));
    tracker.emit(sample_api_call(true));
    let _ = tracker.track_call("second", CallParams::new(), || Ok::<_, String>(2));

    let events = tracker.get_events();
    let kinds: Vec<&str> = events.iter().map(|e| e.kind.name()).collect();
    assert_eq!(
        kinds,
        ["session_start", "function_call", "api_call", "function_call"]
    );
    assert!(events.iter().all(|e| e.session_id == id));

    // Timestamps are non-decreasing in emission order
    for pair in events.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }

    // Event ids are unique
    let mut ids: Vec<&String> = events.iter().map(|e| &e.event_id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), events.len());
}

#[test]
fn test_start_session_resets_buffer() {
    let (tracker, _seen) = recording_tracker();
    tracker.start_session(None);
    tracker.emit(sample_api_call(true));

    let second = tracker.start_session(None);
    let events = tracker.get_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind.name(), "session_start");
    assert_eq!(events[0].session_id, second);
}

#[test]
fn test_summary_counts_failed_calls_as_calls_not_errors() {
    let (tracker, _seen) = recording_tracker();
    tracker.start_session(None);

    let _ = tracker.track_call("works", CallParams::new(), || Ok::<_, String>(()));
    let _ = tracker.track_call("breaks", CallParams::new(), || {
        Err::<(), _>("boom".to_string())
    });

    tracker.end_session();
    let summary = tracker.get_summary();
    assert_eq!(summary.function_calls, 2);
    assert_eq!(summary.errors, 0);
}

#[test]
fn test_wrapper_reraises_and_emits_single_failure_event() {
    let (tracker, seen) = recording_tracker();
    tracker.start_session(None);

    let result: Result<(), String> = tracker.track_call(
        "create_meeting",
        CallParams::new().arg("title", &"standup"),
        || Err("calendar unavailable".to_string()),
    );

    // The original error comes back unchanged
    assert_eq!(result.unwrap_err(), "calendar unavailable");

    // Exactly one FunctionCall event, marked failed, with the message
    let events = tracker.get_events();
    let calls: Vec<&Event> = events
        .iter()
        .filter(|e| e.kind.name() == "function_call")
        .collect();
    assert_eq!(calls.len(), 1);
    match &calls[0].kind {
        EventKind::FunctionCall {
            success,
            error_message,
            return_value,
            ..
        } => {
            assert!(!success);
            assert!(return_value.is_none());
            assert_eq!(error_message.as_deref(), Some("calendar unavailable"));
        }
        other => panic!("unexpected event kind: {}", other.name()),
    }

    // And it was forwarded to the renderer exactly once
    let forwarded = seen.lock().unwrap();
    assert_eq!(
        forwarded
            .iter()
            .filter(|kind| kind.as_str() == "function_call")
            .count(),
        1
    );
}

#[test]
fn test_disabled_tracking_is_transparent() {
    let tracker = Tracker::with_config(TrackerConfig {
        mode: TrackingMode::Disabled,
        ..Default::default()
    });

    let mut invocations = 0;
    let result: Result<u32, String> = tracker.track_call("noop", CallParams::new(), || {
        invocations += 1;
        Ok(7)
    });
    assert_eq!(result.unwrap(), 7);
    assert_eq!(invocations, 1);

    let llm: Result<String, String> =
        tracker.track_llm("gemini-pro", "hello there", || Ok("hi".to_string()));
    assert_eq!(llm.unwrap(), "hi");

    // No events were recorded at all
    assert!(tracker.get_events().is_empty());
}

#[test]
fn test_llm_wrapper_estimates_tokens_and_cost() {
    let (tracker, _seen) = recording_tracker();
    tracker.start_session(None);
    let rate = tracker.config().cost_per_1k_tokens;

    let prompt = "please find a free slot for the team sync tomorrow"; // 10 words
    let response = "tomorrow at ten works best".to_string(); // 5 words

    let result: Result<String, String> =
        tracker.track_llm("models/gemini-pro", prompt, || Ok(response.clone()));
    assert!(result.is_ok());

    let events = tracker.get_events();
    let llm = events
        .iter()
        .find(|e| e.kind.name() == "llm_call")
        .expect("llm event missing");

    match &llm.kind {
        EventKind::LlmCall {
            model_name,
            prompt_length,
            response_length,
            tokens_used,
            estimated_cost,
            success,
            ..
        } => {
            assert_eq!(model_name, "gemini-pro");
            assert_eq!(*prompt_length, prompt.chars().count());
            assert_eq!(*response_length, response.chars().count());
            assert_eq!(*tokens_used, Some(15));
            let expected = 15.0 / 1000.0 * rate;
            assert!((estimated_cost.unwrap() - expected).abs() < 1e-12);
            assert!(success);
        }
        other => panic!("unexpected event kind: {}", other.name()),
    }
}

#[test]
fn test_llm_wrapper_failure_event() {
    let (tracker, _seen) = recording_tracker();
    tracker.start_session(None);

    let result: Result<String, String> =
        tracker.track_llm("gemini-pro", "hello", || Err("quota exceeded".to_string()));
    assert_eq!(result.unwrap_err(), "quota exceeded");

    let events = tracker.get_events();
    match &events.last().unwrap().kind {
        EventKind::LlmCall {
            success,
            tokens_used,
            estimated_cost,
            error_message,
            ..
        } => {
            assert!(!success);
            assert!(tokens_used.is_none());
            assert!(estimated_cost.is_none());
            assert_eq!(error_message.as_deref(), Some("quota exceeded"));
        }
        other => panic!("unexpected event kind: {}", other.name()),
    }
}

#[test]
fn test_summary_duration_from_lifecycle_timestamps() {
    let (tracker, _seen) = recording_tracker();
    tracker.start_session(None);

    let start_ts = tracker.get_events()[0].timestamp;
    let mut end = Event::new(EventKind::SessionEnd);
    end.timestamp = start_ts + chrono::Duration::seconds(5);
    tracker.emit_event(end);

    let summary = tracker.get_summary();
    assert_eq!(summary.total_time_seconds, Some(5.0));
}

#[test]
fn test_quiet_console_rendering() {
    let mut config = TrackerConfig {
        use_colors: false,
        verbosity: Verbosity::Quiet,
        ..Default::default()
    };
    config.mode = TrackingMode::Console;

    let ok_call = Event::new(EventKind::FunctionCall {
        function_name: "tick".to_string(),
        parameters: Default::default(),
        execution_time_ms: 1.0,
        success: true,
        return_value: None,
        error_message: None,
    });
    assert!(ConsoleRenderer.render_event(&ok_call, &config).is_none());

    let error = Event::new(EventKind::Error {
        error_type: "Timeout".to_string(),
        error_message: "upstream stalled".to_string(),
        stack_trace: None,
        function_name: None,
        context: Default::default(),
    });
    assert!(ConsoleRenderer.render_event(&error, &config).is_some());
}

#[test]
fn test_file_destination_receives_serialized_events() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");

    let config = TrackerConfig {
        mode: TrackingMode::File,
        file: callsight_core::FileConfig {
            path: Some(path.clone()),
        },
        ..Default::default()
    };
    let tracker = Tracker::with_config(config);

    tracker.start_session(Some("maya"));
    let _ = tracker.track_call("list_meetings", CallParams::new(), || {
        Ok::<_, String>(vec!["standup"])
    });
    tracker.end_session();
    tracker.flush();

    let content = std::fs::read_to_string(&path).unwrap();
    let events: Vec<Event> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    let kinds: Vec<&str> = events.iter().map(|e| e.kind.name()).collect();
    assert_eq!(kinds, ["session_start", "function_call", "session_end"]);
    assert_eq!(events[0].session_id, events[1].session_id);
}
