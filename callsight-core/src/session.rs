//! Process session registry
//!
//! The [`Tracker`] owns the active-session marker, the event buffer, the
//! configuration record, and the export sinks, all behind mutexes so
//! concurrent emitters interleave without lost updates. It is an explicit
//! object: call sites receive a `&Tracker` (usually through an `Arc`)
//! instead of reaching for a process global.
//!
//! `emit` never blocks on anything but its own locks and never fails:
//! rendering and export errors are logged and discarded at this boundary so
//! observability cannot break the observed system.

use std::io::Write;
use std::sync::{Mutex, MutexGuard};

use indexmap::IndexMap;

use crate::config::{TrackerConfig, TrackingMode, Verbosity};
use crate::event::{Event, EventKind};
use crate::export::{FileSink, WebhookSink};
use crate::render::{ConsoleRenderer, Render};
use crate::summary::SessionSummary;

#[derive(Default)]
struct SessionState {
    /// Active session id; empty when no session is open
    current_id: String,
    /// Event buffer, insertion order = emission order
    events: Vec<Event>,
}

#[derive(Default)]
struct ExportSinks {
    file: Option<FileSink>,
    webhook: Option<WebhookSink>,
}

/// Session registry and emission hub.
pub struct Tracker {
    state: Mutex<SessionState>,
    config: Mutex<TrackerConfig>,
    sinks: Mutex<ExportSinks>,
    renderer: Box<dyn Render>,
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracker {
    /// Tracker with default configuration and the console renderer.
    pub fn new() -> Self {
        Self::with_config(TrackerConfig::default())
    }

    pub fn with_config(config: TrackerConfig) -> Self {
        Self::with_renderer(config, Box::new(ConsoleRenderer))
    }

    /// Inject an alternative renderer behind the [`Render`] seam.
    pub fn with_renderer(config: TrackerConfig, renderer: Box<dyn Render>) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            config: Mutex::new(config),
            sinks: Mutex::new(ExportSinks::default()),
            renderer,
        }
    }

    // Lock helpers tolerate poisoning: a panicking emitter elsewhere must
    // not take tracking down with it.
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_config(&self) -> MutexGuard<'_, TrackerConfig> {
        self.config.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_sinks(&self) -> MutexGuard<'_, ExportSinks> {
        self.sinks.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ============================================
    // Session lifecycle
    // ============================================

    /// Start a new tracking session, discarding any previous buffer.
    ///
    /// Calling this while a session is active silently drops the old
    /// session's events.
    pub fn start_session(&self, user_id: Option<&str>) -> String {
        let session_id = uuid::Uuid::new_v4().to_string();

        let event = {
            let mut state = self.lock_state();
            state.current_id = session_id.clone();
            state.events.clear();

            let mut event = Event::new(EventKind::SessionStart {
                user_id: user_id.map(str::to_owned),
            });
            event.session_id = session_id.clone();
            state.events.push(event.clone());
            event
        };

        self.forward(&event);
        session_id
    }

    /// End the current tracking session.
    ///
    /// The buffer is retained for summary queries until the next
    /// `start_session`. With no active session this still appends a
    /// SessionEnd stamped with the empty sentinel id and returns it.
    pub fn end_session(&self) -> String {
        let (event, ended) = {
            let mut state = self.lock_state();
            let ended = std::mem::take(&mut state.current_id);

            let mut event = Event::new(EventKind::SessionEnd);
            event.session_id = ended.clone();
            state.events.push(event.clone());
            (event, ended)
        };

        self.forward(&event);
        self.flush();
        ended
    }

    // ============================================
    // Emission
    // ============================================

    /// Emit a freshly constructed event of the given kind.
    pub fn emit(&self, kind: EventKind) {
        self.emit_event(Event::new(kind));
    }

    /// Stamp, buffer, and forward an event.
    ///
    /// Auto-starts a session when none is active. Never fails; destination
    /// errors are swallowed here.
    pub fn emit_event(&self, mut event: Event) {
        let needs_session = self.lock_state().current_id.is_empty();
        if needs_session {
            self.start_session(None);
        }

        let stamped = {
            let mut state = self.lock_state();
            event.session_id = state.current_id.clone();
            state.events.push(event.clone());
            event
        };

        self.forward(&stamped);
    }

    /// Emit an [`EventKind::Error`] independently of any wrapped call.
    pub fn record_error(
        &self,
        error_type: &str,
        message: &str,
        function_name: Option<&str>,
        context: IndexMap<String, String>,
    ) {
        self.emit(EventKind::Error {
            error_type: error_type.to_string(),
            error_message: message.to_string(),
            stack_trace: None,
            function_name: function_name.map(str::to_owned),
            context,
        });
    }

    /// Route one event to the configured destination, swallowing failures.
    fn forward(&self, event: &Event) {
        let config = self.config();

        match config.mode {
            TrackingMode::Disabled => {}

            TrackingMode::Console => {
                if let Some(line) = self.renderer.render_event(event, &config) {
                    let mut out = std::io::stdout().lock();
                    let _ = writeln!(out, "{}", line);
                }
            }

            TrackingMode::File => {
                let mut sinks = self.lock_sinks();
                if let Some(sink) = Self::file_sink(&mut sinks, &config) {
                    if let Err(e) = sink.write_event(event) {
                        tracing::warn!(error = %e, "failed to append event to tracking log");
                    }
                }
            }

            TrackingMode::Webhook => {
                let mut sinks = self.lock_sinks();
                if let Some(sink) = Self::webhook_sink(&mut sinks, &config) {
                    if let Err(e) = sink.queue(event) {
                        tracing::warn!(error = %e, "failed to queue event for webhook delivery");
                    }
                }
            }
        }
    }

    /// Lazily (re)open the file sink; follows path changes in config.
    fn file_sink<'a>(
        sinks: &'a mut ExportSinks,
        config: &TrackerConfig,
    ) -> Option<&'a mut FileSink> {
        let path = config.file.path.as_deref()?;

        let reopen = !matches!(&sinks.file, Some(sink) if sink.path() == path);
        if reopen {
            match FileSink::open(path) {
                Ok(sink) => sinks.file = Some(sink),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        path = %path.display(),
                        "failed to open tracking log file"
                    );
                    return None;
                }
            }
        }
        sinks.file.as_mut()
    }

    /// Lazily create the webhook sink from config.
    fn webhook_sink<'a>(
        sinks: &'a mut ExportSinks,
        config: &TrackerConfig,
    ) -> Option<&'a mut WebhookSink> {
        if sinks.webhook.is_none() {
            match WebhookSink::new(config.webhook.clone()) {
                Ok(Some(sink)) => sinks.webhook = Some(sink),
                Ok(None) => {
                    tracing::debug!("webhook destination not configured; event dropped");
                    return None;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to initialize webhook sink");
                    return None;
                }
            }
        }
        sinks.webhook.as_mut()
    }

    // ============================================
    // Queries
    // ============================================

    /// Defensive copy of the current buffer, in emission order.
    pub fn get_events(&self) -> Vec<Event> {
        self.lock_state().events.clone()
    }

    /// Fold the buffer into a summary.
    pub fn get_summary(&self) -> SessionSummary {
        let state = self.lock_state();
        SessionSummary::from_events(state.current_id.clone(), &state.events)
    }

    /// Compute the summary and send it to the configured destination.
    pub fn publish_summary(&self) {
        let summary = self.get_summary();
        let config = self.config();

        match config.mode {
            TrackingMode::Disabled => {}

            TrackingMode::Console => {
                if let Some(report) = self.renderer.render_summary(&summary, &config) {
                    let mut out = std::io::stdout().lock();
                    let _ = writeln!(out, "{}", report);
                }
            }

            TrackingMode::File => {
                let mut sinks = self.lock_sinks();
                if let Some(sink) = Self::file_sink(&mut sinks, &config) {
                    if let Err(e) = sink.write_summary(&summary) {
                        tracing::warn!(error = %e, "failed to append summary to tracking log");
                    }
                }
            }

            TrackingMode::Webhook => {
                let mut sinks = self.lock_sinks();
                if let Some(sink) = Self::webhook_sink(&mut sinks, &config) {
                    if let Err(e) = sink.send_summary(&summary) {
                        tracing::warn!(error = %e, "failed to post summary to webhook");
                    }
                }
            }
        }
    }

    /// Drain export sinks (webhook batches, file buffers).
    pub fn flush(&self) {
        let mut sinks = self.lock_sinks();
        if let Some(sink) = sinks.file.as_mut() {
            if let Err(e) = sink.flush() {
                tracing::warn!(error = %e, "file sink flush failed");
            }
        }
        if let Some(sink) = sinks.webhook.as_mut() {
            if let Err(e) = sink.flush_all() {
                tracing::warn!(error = %e, "webhook sink flush failed");
            }
        }
    }

    // ============================================
    // Configuration surface
    // ============================================

    /// Snapshot of the current configuration.
    pub fn config(&self) -> TrackerConfig {
        self.lock_config().clone()
    }

    /// Whether the wrappers should measure and emit at all.
    pub fn is_enabled(&self) -> bool {
        self.lock_config().mode.is_enabled()
    }

    pub fn set_mode(&self, mode: TrackingMode) {
        self.lock_config().mode = mode;
    }

    pub fn set_verbosity(&self, verbosity: Verbosity) {
        self.lock_config().verbosity = verbosity;
    }

    pub fn set_show_parameters(&self, on: bool) {
        self.lock_config().show_parameters = on;
    }

    pub fn set_show_execution_time(&self, on: bool) {
        self.lock_config().show_execution_time = on;
    }

    pub fn set_show_timestamps(&self, on: bool) {
        self.lock_config().show_timestamps = on;
    }

    pub fn set_use_colors(&self, on: bool) {
        self.lock_config().use_colors = on;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A tracker that buffers but renders nothing, for quiet tests.
    fn silent_tracker() -> Tracker {
        let config = TrackerConfig {
            mode: TrackingMode::Disabled,
            ..Default::default()
        };
        Tracker::with_config(config)
    }

    #[test]
    fn test_start_session_stamps_and_buffers() {
        let tracker = silent_tracker();
        let id = tracker.start_session(Some("maya"));

        let events = tracker.get_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].session_id, id);
        assert!(matches!(
            &events[0].kind,
            EventKind::SessionStart { user_id: Some(u) } if u == "maya"
        ));
    }

    #[test]
    fn test_start_session_discards_previous_buffer() {
        let tracker = silent_tracker();
        let first = tracker.start_session(None);
        tracker.emit(EventKind::SessionEnd);

        let second = tracker.start_session(None);
        assert_ne!(first, second);

        let events = tracker.get_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].session_id, second);
    }

    #[test]
    fn test_end_session_without_active_session_uses_sentinel() {
        let tracker = silent_tracker();
        let ended = tracker.end_session();
        assert_eq!(ended, "");

        let events = tracker.get_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0].kind, EventKind::SessionEnd));
        assert_eq!(events[0].session_id, "");
    }

    #[test]
    fn test_emit_auto_starts_session() {
        let tracker = silent_tracker();
        tracker.record_error("ValueError", "bad date", None, IndexMap::new());

        let events = tracker.get_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0].kind, EventKind::SessionStart { .. }));
        assert!(matches!(events[1].kind, EventKind::Error { .. }));
        assert_eq!(events[0].session_id, events[1].session_id);
        assert!(!events[1].session_id.is_empty());
    }

    #[test]
    fn test_buffer_retained_after_end_for_summary() {
        let tracker = silent_tracker();
        let id = tracker.start_session(None);
        tracker.record_error("IoError", "disk gone", None, IndexMap::new());
        let ended = tracker.end_session();
        assert_eq!(id, ended);

        let summary = tracker.get_summary();
        assert_eq!(summary.errors, 1);
        // Active marker cleared, so the echoed id is the sentinel
        assert_eq!(summary.session_id, "");
        assert!(summary.total_time_seconds.is_some());
    }

    #[test]
    fn test_setters_mutate_config() {
        let tracker = silent_tracker();
        assert!(!tracker.is_enabled());

        tracker.set_mode(TrackingMode::Console);
        tracker.set_verbosity(Verbosity::Verbose);
        tracker.set_show_timestamps(false);
        tracker.set_use_colors(false);

        let config = tracker.config();
        assert!(tracker.is_enabled());
        assert_eq!(config.mode, TrackingMode::Console);
        assert_eq!(config.verbosity, Verbosity::Verbose);
        assert!(!config.show_timestamps);
        assert!(!config.use_colors);
    }
}
