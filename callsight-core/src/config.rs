//! Configuration for the tracking system
//!
//! A [`TrackerConfig`] is plain data: the destination mode, the verbosity
//! level, display toggles, color names, the cost rate constant, and the
//! export destination settings. It is owned by the
//! [`Tracker`](crate::Tracker) and mutated only through its setters; the
//! renderer and the emit path read snapshots of it.
//!
//! An optional TOML file can seed the defaults. This module follows the XDG
//! Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/callsight/` (~/.config/callsight/)
//! - State/Logs: `$XDG_STATE_HOME/callsight/` (~/.local/state/callsight/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Where rendered/serialized events are sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    /// Colorized lines on stdout
    Console,
    /// JSONL append to a configured path
    File,
    /// Batched POSTs to a configured URL
    Webhook,
    /// No instrumentation, no output
    Disabled,
}

impl TrackingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingMode::Console => "console",
            TrackingMode::File => "file",
            TrackingMode::Webhook => "webhook",
            TrackingMode::Disabled => "disabled",
        }
    }

    /// Whether the wrappers should measure and emit at all.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, TrackingMode::Disabled)
    }
}

impl std::str::FromStr for TrackingMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "console" => Ok(TrackingMode::Console),
            "file" => Ok(TrackingMode::File),
            "webhook" => Ok(TrackingMode::Webhook),
            "disabled" => Ok(TrackingMode::Disabled),
            _ => Err(format!("unknown tracking mode: {}", s)),
        }
    }
}

/// How much detail the renderer produces per event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// Only session start/end and errors
    Quiet,
    /// Function, LLM, and API call lines
    Normal,
    /// Everything, including parameter dumps and input previews
    Verbose,
}

impl Verbosity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
        }
    }
}

impl std::str::FromStr for Verbosity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "quiet" => Ok(Verbosity::Quiet),
            "normal" => Ok(Verbosity::Normal),
            "verbose" => Ok(Verbosity::Verbose),
            _ => Err(format!("unknown verbosity: {}", s)),
        }
    }
}

/// Color names for console output, one per event kind.
///
/// Names are resolved by the `colored` crate; failures fall back to white.
#[derive(Debug, Clone, Deserialize)]
pub struct ColorScheme {
    #[serde(default = "default_session_color")]
    pub session: String,
    #[serde(default = "default_function_color")]
    pub function: String,
    #[serde(default = "default_llm_color")]
    pub llm: String,
    #[serde(default = "default_api_color")]
    pub api: String,
    #[serde(default = "default_error_color")]
    pub error: String,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            session: default_session_color(),
            function: default_function_color(),
            llm: default_llm_color(),
            api: default_api_color(),
            error: default_error_color(),
        }
    }
}

fn default_session_color() -> String {
    "cyan".to_string()
}

fn default_function_color() -> String {
    "green".to_string()
}

fn default_llm_color() -> String {
    "blue".to_string()
}

fn default_api_color() -> String {
    "yellow".to_string()
}

fn default_error_color() -> String {
    "red".to_string()
}

/// File destination settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    /// Path to the JSONL event log; required for [`TrackingMode::File`]
    pub path: Option<PathBuf>,
}

/// Webhook destination settings
///
/// When the mode is [`TrackingMode::Webhook`], events are batched per
/// session and POSTed to `url` as JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Destination URL; required for [`TrackingMode::Webhook`]
    pub url: Option<String>,

    /// Optional bearer token sent in the Authorization header
    pub api_key: Option<String>,

    /// Events per POST (max 50, default 20)
    #[serde(default = "default_webhook_batch_size")]
    pub batch_size: usize,

    /// HTTP request timeout in seconds
    #[serde(default = "default_webhook_timeout")]
    pub timeout_secs: u64,

    /// Max retry attempts for transient failures
    #[serde(default = "default_webhook_max_retries")]
    pub max_retries: usize,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            batch_size: default_webhook_batch_size(),
            timeout_secs: default_webhook_timeout(),
            max_retries: default_webhook_max_retries(),
        }
    }
}

impl WebhookConfig {
    /// Check if the webhook destination is usable
    pub fn is_ready(&self) -> bool {
        self.url.is_some()
    }

    /// Validate settings, returning an error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.url.is_none() {
            return Err(Error::Config(
                "webhook.url is required for the webhook destination".to_string(),
            ));
        }
        if self.batch_size == 0 || self.batch_size > 50 {
            return Err(Error::Config(
                "webhook.batch_size must be between 1 and 50".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_webhook_batch_size() -> usize {
    20
}

fn default_webhook_timeout() -> u64 {
    30
}

fn default_webhook_max_retries() -> usize {
    3
}

/// Logging configuration for the library's internal diagnostics
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

/// Main configuration record
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// Destination mode
    #[serde(default = "default_mode")]
    pub mode: TrackingMode,

    /// Verbosity level
    #[serde(default = "default_verbosity")]
    pub verbosity: Verbosity,

    /// Include parameter dumps in verbose function lines
    #[serde(default = "default_true")]
    pub show_parameters: bool,

    /// Append `(12.3ms)` durations to call lines
    #[serde(default = "default_true")]
    pub show_execution_time: bool,

    /// Prefix lines with `[HH:MM:SS]`
    #[serde(default = "default_true")]
    pub show_timestamps: bool,

    /// ANSI colors on/off
    #[serde(default = "default_true")]
    pub use_colors: bool,

    /// Per-kind color names
    #[serde(default)]
    pub colors: ColorScheme,

    /// Cost estimate rate for LLM calls, dollars per thousand tokens.
    /// An approximation knob, not a billing figure.
    #[serde(default = "default_cost_per_1k_tokens")]
    pub cost_per_1k_tokens: f64,

    /// File destination settings
    #[serde(default)]
    pub file: FileConfig,

    /// Webhook destination settings
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Internal diagnostics logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            verbosity: default_verbosity(),
            show_parameters: true,
            show_execution_time: true,
            show_timestamps: true,
            use_colors: true,
            colors: ColorScheme::default(),
            cost_per_1k_tokens: default_cost_per_1k_tokens(),
            file: FileConfig::default(),
            webhook: WebhookConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_mode() -> TrackingMode {
    TrackingMode::Console
}

fn default_verbosity() -> Verbosity {
    Verbosity::Normal
}

fn default_true() -> bool {
    true
}

fn default_cost_per_1k_tokens() -> f64 {
    0.001
}

impl TrackerConfig {
    /// Load configuration from the default path, falling back to defaults
    /// when no file exists.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::debug!("no config file found at {:?}, using defaults", config_path);
            return Ok(TrackerConfig::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: TrackerConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/callsight/config.toml`
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("callsight").join("config.toml")
    }

    /// Returns the state directory path (for internal logs)
    ///
    /// `$XDG_STATE_HOME/callsight/`
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("callsight")
    }

    /// Returns the internal diagnostics log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("callsight.log")
    }
}
