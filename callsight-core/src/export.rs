//! Export destinations for serialized events
//!
//! Two sinks back the file and webhook tracking modes. Both are driven by
//! the [`Tracker`](crate::Tracker) emit path, which swallows every error
//! these sinks return; a destination failure can never reach the
//! instrumented caller.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::WebhookConfig;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::summary::SessionSummary;

// ============================================
// File destination
// ============================================

/// Appends one JSON line per event to a log file.
pub(crate) struct FileSink {
    path: PathBuf,
    file: File,
}

impl FileSink {
    /// Open (creating parent directories as needed) in append mode.
    pub(crate) fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn write_event(&mut self, event: &Event) -> Result<()> {
        let line = serde_json::to_string(event)?;
        writeln!(self.file, "{}", line)?;
        Ok(())
    }

    /// Summaries share the log; replay tooling skips lines that are not
    /// events.
    pub(crate) fn write_summary(&mut self, summary: &SessionSummary) -> Result<()> {
        let line = serde_json::to_string(summary)?;
        writeln!(self.file, "{}", line)?;
        Ok(())
    }

    pub(crate) fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

// ============================================
// Webhook destination
// ============================================

/// Event envelope POSTed to the webhook.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct WebhookEvent {
    /// Event kind tag (session_start, function_call, ...)
    #[serde(rename = "type")]
    event_type: String,

    /// When the event was produced in-process
    emitted_at: DateTime<Utc>,

    /// Content-based hash for receiver-side deduplication (32-char hex)
    event_hash: String,

    /// The serialized event itself
    data: serde_json::Value,
}

impl WebhookEvent {
    fn from_event(event: &Event) -> Result<Self> {
        let data = serde_json::to_value(event)?;
        let event_type = event.kind.name().to_string();
        let event_hash = compute_event_hash(&event_type, &event.timestamp, &data);
        Ok(Self {
            event_type,
            emitted_at: event.timestamp,
            event_hash,
            data,
        })
    }
}

/// Compute a content-based hash for event deduplication
///
/// Returns a 32-character hex digest of SHA-256(type + timestamp + data).
fn compute_event_hash(
    event_type: &str,
    emitted_at: &DateTime<Utc>,
    data: &serde_json::Value,
) -> String {
    let content = serde_json::to_string(data).unwrap_or_default();
    let hash_input = format!("{}:{}:{}", event_type, emitted_at.to_rfc3339(), content);

    let mut hasher = Sha256::new();
    hasher.update(hash_input.as_bytes());
    let result = hasher.finalize();

    hex::encode(&result[..16])
}

/// Batch of events POSTed in one request
#[derive(Debug, Serialize)]
struct EventBatch {
    session_id: String,
    events: Vec<WebhookEvent>,
}

/// Batches events per session and POSTs them to the configured URL.
///
/// A synchronous facade over a current-thread tokio runtime so the emit
/// path never needs an async context. Batches that still fail after
/// retries are dropped with a warning; the registry buffer retains the
/// events locally.
pub(crate) struct WebhookSink {
    config: WebhookConfig,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    url: String,
    /// Buffered envelopes per session
    buffers: HashMap<String, Vec<WebhookEvent>>,
}

impl WebhookSink {
    /// Create a sink from configuration.
    ///
    /// Returns `None` when no webhook URL is configured.
    pub(crate) fn new(config: WebhookConfig) -> Result<Option<Self>> {
        if !config.is_ready() {
            return Ok(None);
        }
        config.validate()?;

        let url = config
            .url
            .clone()
            .ok_or_else(|| Error::Config("webhook.url is required".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(api_key) = &config.api_key {
            let auth_value = format!("Bearer {}", api_key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| Error::Config(format!("invalid api_key: {}", e)))?,
            );
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Export(format!("failed to create runtime: {}", e)))?;

        Ok(Some(Self {
            config,
            client,
            runtime,
            url,
            buffers: HashMap::new(),
        }))
    }

    /// Queue one event; sends a batch when the session's buffer fills.
    ///
    /// Returns the number of events sent (0 while still buffering).
    pub(crate) fn queue(&mut self, event: &Event) -> Result<usize> {
        let envelope = WebhookEvent::from_event(event)?;
        let session_id = event.session_id.clone();

        let buffer = self.buffers.entry(session_id.clone()).or_default();
        buffer.push(envelope);

        if buffer.len() >= self.config.batch_size {
            return self.flush_session(&session_id);
        }
        Ok(0)
    }

    /// Flush all pending events for one session.
    fn flush_session(&mut self, session_id: &str) -> Result<usize> {
        let events: Vec<WebhookEvent> = match self.buffers.get_mut(session_id) {
            Some(buffer) if !buffer.is_empty() => buffer.drain(..).collect(),
            _ => return Ok(0),
        };

        let batch = EventBatch {
            session_id: session_id.to_string(),
            events,
        };
        let sent = batch.events.len();

        match self.runtime.block_on(self.send_with_retry(&batch)) {
            Ok(()) => {
                tracing::debug!(
                    session_id = %batch.session_id,
                    events = sent,
                    "published event batch to webhook"
                );
                Ok(sent)
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %batch.session_id,
                    error = %e,
                    "failed to publish event batch to webhook"
                );
                // Batch is dropped rather than blocking the emit path; the
                // session buffer still holds the events locally.
                Ok(0)
            }
        }
    }

    /// Flush all pending events across all sessions.
    pub(crate) fn flush_all(&mut self) -> Result<usize> {
        let session_ids: Vec<String> = self.buffers.keys().cloned().collect();
        let mut total = 0;
        for session_id in session_ids {
            total += self.flush_session(&session_id)?;
        }
        Ok(total)
    }

    /// Post the end-of-session summary after draining pending events.
    pub(crate) fn send_summary(&mut self, summary: &SessionSummary) -> Result<()> {
        self.flush_all()?;

        let payload = serde_json::json!({
            "session_id": summary.session_id,
            "summary": summary,
        });

        self.runtime.block_on(async {
            let response = self
                .client
                .post(&self.url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| Error::Export(format!("HTTP request failed: {}", e)))?;

            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unknown".to_string());
                Err(Error::Export(format!("webhook error ({}): {}", status, body)))
            }
        })
    }

    /// Number of events waiting across all session buffers.
    pub(crate) fn pending_count(&self) -> usize {
        self.buffers.values().map(|b| b.len()).sum()
    }

    /// Send one batch with retries for transient failures
    ///
    /// Retries 5xx, timeout, and connection errors with exponential backoff.
    async fn send_with_retry(&self, batch: &EventBatch) -> Result<()> {
        let mut last_error = None;
        let mut delay = Duration::from_millis(500);

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::debug!(
                    "retrying webhook post (attempt {}/{}), waiting {:?}",
                    attempt + 1,
                    self.config.max_retries + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, Duration::from_secs(30));
            }

            match self.send(batch).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    if is_retryable_error(&e) {
                        tracing::warn!("transient error posting events: {}", e);
                        last_error = Some(e);
                        continue;
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Export("max retries exceeded".to_string())))
    }

    async fn send(&self, batch: &EventBatch) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(batch)
            .send()
            .await
            .map_err(|e| Error::Export(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Error::Export(format!("webhook error ({}): {}", status, body)))
        }
    }
}

/// Check if an error is retryable (transient)
fn is_retryable_error(error: &Error) -> bool {
    match error {
        Error::Export(msg) => {
            // Retry on 5xx errors
            msg.contains("50") && (msg.contains("webhook error") || msg.contains("HTTP"))
                // Retry on network/timeout errors
                || msg.contains("timeout")
                || msg.contains("connection")
                || msg.contains("request failed")
        }
        _ => false,
    }
}
