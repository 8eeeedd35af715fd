//! Error types for callsight-core
//!
//! These cover the tracking infrastructure only. Errors from instrumented
//! calls are never converted into this type; they flow back to the original
//! caller untouched.

use thiserror::Error;

/// Main error type for the callsight-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Export destination error (file or webhook)
    #[error("export error: {0}")]
    Export(String),
}

/// Result type alias for callsight-core
pub type Result<T> = std::result::Result<T, Error>;
