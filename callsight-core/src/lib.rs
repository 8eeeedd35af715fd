//! # callsight-core
//!
//! In-process observability for interactive agent applications.
//!
//! A [`Tracker`] owns one logical session at a time: instrumented calls run
//! through [`Tracker::track_call`] / [`Tracker::track_llm`], each emission
//! lands in the session buffer, and the configured destination (console
//! renderer, JSONL file, or webhook) receives it in real time. At session
//! end the buffer folds into a [`SessionSummary`].
//!
//! The observed call's outcome always flows back unchanged; tracking
//! failures are swallowed at the emit boundary and surface only in the
//! internal diagnostics log.
//!
//! ## Example
//!
//! ```rust,no_run
//! use callsight_core::{CallParams, Tracker};
//!
//! let tracker = Tracker::new();
//! tracker.start_session(Some("maya"));
//!
//! let result: Result<u32, std::io::Error> = tracker.track_call(
//!     "count_meetings",
//!     CallParams::new().arg("day", &"tuesday"),
//!     || Ok(3),
//! );
//! assert_eq!(result.unwrap(), 3);
//!
//! tracker.end_session();
//! tracker.publish_summary();
//! ```

// Re-export commonly used items at the crate root
pub use config::{
    ColorScheme, FileConfig, LoggingConfig, TrackerConfig, TrackingMode, Verbosity, WebhookConfig,
};
pub use error::{Error, Result};
pub use event::{CallParams, Describe, Event, EventKind, DESCRIBE_MAX_LEN};
pub use render::{ConsoleRenderer, Render, COST_ALERT_THRESHOLD};
pub use session::Tracker;
pub use summary::SessionSummary;
pub use track::{LlmModel, LlmResponse, UNKNOWN_MODEL};

// Public modules
pub mod config;
pub mod error;
pub mod event;
mod export;
pub mod logging;
pub mod render;
pub mod session;
pub mod summary;
pub mod track;
