//! Typed event model for session tracking.
//!
//! One [`Event`] records one observed occurrence: a call, an error, or a
//! session lifecycle transition. Events are pure data; construction stamps
//! the id and timestamp, the registry stamps the session id at emission.
//!
//! The model serializes to a flat JSON mapping (the variant fields inline
//! next to `event_id`/`session_id`/`timestamp`, discriminated by
//! `event_type`), which is the wire shape both export destinations consume.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound on the string a [`Describe`] impl produces for one value.
pub const DESCRIBE_MAX_LEN: usize = 120;

/// How a value presents itself in call-parameter and return-value logs.
///
/// The blanket impl renders any `Debug` type and truncates the result to
/// [`DESCRIBE_MAX_LEN`] characters, so large opaque arguments cannot flood
/// the event stream.
pub trait Describe {
    fn describe(&self) -> String;
}

impl<T: fmt::Debug + ?Sized> Describe for T {
    fn describe(&self) -> String {
        truncate(&format!("{:?}", self), DESCRIBE_MAX_LEN)
    }
}

/// Truncate to `max` characters, appending an ellipsis when cut.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max).collect();
        out.push('…');
        out
    }
}

/// Ordered, named call arguments for a [`EventKind::FunctionCall`] event.
///
/// Built explicitly at the instrumentation site; the receiver/handle argument
/// of a call is simply never added, so it cannot leak into the event stream.
#[derive(Debug, Clone, Default)]
pub struct CallParams(IndexMap<String, String>);

impl CallParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one named argument through its [`Describe`] rendering.
    pub fn arg(mut self, name: impl Into<String>, value: &dyn Describe) -> Self {
        self.0.insert(name.into(), value.describe());
        self
    }

    /// Record a pre-rendered argument value verbatim.
    pub fn raw(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn into_map(self) -> IndexMap<String, String> {
        self.0
    }
}

/// An immutable record of one observed occurrence within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier (UUID v4), unique within a process lifetime
    pub event_id: String,
    /// Owning session; empty until stamped by the registry at emission
    pub session_id: String,
    /// Creation timestamp
    pub timestamp: DateTime<Utc>,
    /// Kind-specific payload
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    /// Create a new event with a fresh id and the current timestamp.
    ///
    /// The session id is stamped when the event passes through
    /// [`Tracker::emit_event`](crate::Tracker::emit_event).
    pub fn new(kind: EventKind) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            session_id: String::new(),
            timestamp: Utc::now(),
            kind,
        }
    }
}

/// One variant per kind of observed occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EventKind {
    /// First event of a session
    SessionStart { user_id: Option<String> },

    /// Last event of a session
    SessionEnd,

    /// Produced by [`Tracker::track_call`](crate::Tracker::track_call)
    FunctionCall {
        function_name: String,
        /// Insertion-ordered name → rendered value
        parameters: IndexMap<String, String>,
        execution_time_ms: f64,
        success: bool,
        return_value: Option<String>,
        error_message: Option<String>,
    },

    /// Produced by [`Tracker::track_llm`](crate::Tracker::track_llm)
    LlmCall {
        model_name: String,
        /// Prompt length in characters
        prompt_length: usize,
        /// Response length in characters
        response_length: usize,
        /// Whitespace-split estimate, prompt + response
        tokens_used: Option<u32>,
        /// `(tokens_used / 1000) × cost_per_1k_tokens`; an approximation,
        /// not billing-accurate
        estimated_cost: Option<f64>,
        response_time_ms: f64,
        success: bool,
        user_input: Option<String>,
        llm_response: Option<String>,
        error_message: Option<String>,
    },

    /// Emitted by integrating code; no wrapper produces these automatically
    ApiCall {
        api_name: String,
        endpoint: String,
        method: String,
        status_code: Option<u16>,
        response_time_ms: f64,
        success: bool,
        request_size: Option<u64>,
        response_size: Option<u64>,
        error_message: Option<String>,
    },

    /// May be emitted independently of any wrapped call
    Error {
        error_type: String,
        error_message: String,
        stack_trace: Option<String>,
        function_name: Option<String>,
        /// Free-form context, insertion-ordered
        context: IndexMap<String, String>,
    },
}

impl EventKind {
    /// The serialized discriminant tag for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::SessionStart { .. } => "session_start",
            EventKind::SessionEnd => "session_end",
            EventKind::FunctionCall { .. } => "function_call",
            EventKind::LlmCall { .. } => "llm_call",
            EventKind::ApiCall { .. } => "api_call",
            EventKind::Error { .. } => "error",
        }
    }
}
