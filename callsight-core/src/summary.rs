//! End-of-session aggregation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{Event, EventKind};

/// Aggregates for one session's event buffer.
///
/// Failed function/LLM/API calls stay in their own kind's count; `errors`
/// counts only [`EventKind::Error`] events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// The currently active session id (empty once the session has ended)
    pub session_id: String,
    /// SessionEnd − SessionStart, when both are present
    pub total_time_seconds: Option<f64>,
    pub function_calls: usize,
    pub llm_calls: usize,
    pub api_calls: usize,
    pub errors: usize,
    /// Sum of `estimated_cost` across LLM call events
    pub total_estimated_cost: f64,
    pub session_start: Option<DateTime<Utc>>,
    pub session_end: Option<DateTime<Utc>>,
}

impl SessionSummary {
    /// Fold an event sequence into a summary in a single pass.
    ///
    /// An empty slice yields a zero summary. The first SessionStart and the
    /// first SessionEnd bound the duration.
    pub fn from_events(session_id: impl Into<String>, events: &[Event]) -> Self {
        let mut summary = SessionSummary {
            session_id: session_id.into(),
            ..Default::default()
        };

        for event in events {
            match &event.kind {
                EventKind::SessionStart { .. } => {
                    if summary.session_start.is_none() {
                        summary.session_start = Some(event.timestamp);
                    }
                }
                EventKind::SessionEnd => {
                    if summary.session_end.is_none() {
                        summary.session_end = Some(event.timestamp);
                    }
                }
                EventKind::FunctionCall { .. } => summary.function_calls += 1,
                EventKind::LlmCall { estimated_cost, .. } => {
                    summary.llm_calls += 1;
                    summary.total_estimated_cost += estimated_cost.unwrap_or(0.0);
                }
                EventKind::ApiCall { .. } => summary.api_calls += 1,
                EventKind::Error { .. } => summary.errors += 1,
            }
        }

        if let (Some(start), Some(end)) = (summary.session_start, summary.session_end) {
            let elapsed = end.signed_duration_since(start);
            summary.total_time_seconds = Some(elapsed.num_milliseconds() as f64 / 1000.0);
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use indexmap::IndexMap;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn event_at(kind: EventKind, secs: i64) -> Event {
        let mut event = Event::new(kind);
        event.timestamp = at(secs);
        event
    }

    fn function_call(success: bool) -> EventKind {
        EventKind::FunctionCall {
            function_name: "list_meetings".to_string(),
            parameters: IndexMap::new(),
            execution_time_ms: 3.2,
            success,
            return_value: None,
            error_message: if success {
                None
            } else {
                Some("boom".to_string())
            },
        }
    }

    #[test]
    fn test_empty_buffer_gives_zero_summary() {
        let summary = SessionSummary::from_events("", &[]);
        assert_eq!(summary, SessionSummary::default());
    }

    #[test]
    fn test_counts_per_kind() {
        let events = vec![
            event_at(EventKind::SessionStart { user_id: None }, 0),
            event_at(function_call(true), 1),
            event_at(function_call(false), 2),
            event_at(
                EventKind::LlmCall {
                    model_name: "gemini-pro".to_string(),
                    prompt_length: 20,
                    response_length: 10,
                    tokens_used: Some(6),
                    estimated_cost: Some(0.006),
                    response_time_ms: 210.0,
                    success: true,
                    user_input: None,
                    llm_response: None,
                    error_message: None,
                },
                3,
            ),
            event_at(
                EventKind::ApiCall {
                    api_name: "calendar".to_string(),
                    endpoint: "/v3/events".to_string(),
                    method: "GET".to_string(),
                    status_code: Some(200),
                    response_time_ms: 88.0,
                    success: true,
                    request_size: None,
                    response_size: Some(512),
                    error_message: None,
                },
                4,
            ),
        ];

        let summary = SessionSummary::from_events("s-1", &events);
        assert_eq!(summary.function_calls, 2);
        assert_eq!(summary.llm_calls, 1);
        assert_eq!(summary.api_calls, 1);
        // Failed function calls do not count as errors
        assert_eq!(summary.errors, 0);
        assert!((summary.total_estimated_cost - 0.006).abs() < 1e-12);
        assert!(summary.session_end.is_none());
        assert!(summary.total_time_seconds.is_none());
    }

    #[test]
    fn test_duration_between_first_start_and_first_end() {
        let events = vec![
            event_at(EventKind::SessionStart { user_id: None }, 0),
            event_at(EventKind::SessionEnd, 5),
        ];

        let summary = SessionSummary::from_events("s-2", &events);
        assert_eq!(summary.total_time_seconds, Some(5.0));
        assert_eq!(summary.session_start, Some(at(0)));
        assert_eq!(summary.session_end, Some(at(5)));
    }

    #[test]
    fn test_error_events_counted_separately() {
        let events = vec![event_at(
            EventKind::Error {
                error_type: "ValueError".to_string(),
                error_message: "bad input".to_string(),
                stack_trace: None,
                function_name: Some("parse_command".to_string()),
                context: IndexMap::new(),
            },
            1,
        )];

        let summary = SessionSummary::from_events("s-3", &events);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.function_calls, 0);
    }
}
