//! Instrumentation wrappers
//!
//! Both wrappers follow the same discipline: time the call, build an event,
//! emit it exactly once on success and on failure, and hand the original
//! outcome back unchanged. The observed call's error is never altered or
//! suppressed; the tracking side-channel is fully defensive.

use std::fmt::Display;
use std::time::Instant;

use crate::event::{CallParams, Describe, EventKind};
use crate::session::Tracker;

/// Sentinel used when a model handle cannot name itself.
pub const UNKNOWN_MODEL: &str = "unknown_model";

/// A handle that can name the model behind an LLM call.
pub trait LlmModel {
    fn model_name(&self) -> Option<String>;
}

impl LlmModel for str {
    fn model_name(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl LlmModel for String {
    fn model_name(&self) -> Option<String> {
        Some(self.clone())
    }
}

/// A response that exposes its generated text.
pub trait LlmResponse {
    fn text(&self) -> &str;
}

impl LlmResponse for String {
    fn text(&self) -> &str {
        self
    }
}

impl LlmResponse for &str {
    fn text(&self) -> &str {
        self
    }
}

/// Normalize a raw model name: strip any path-like prefix
/// (`models/gemini-pro` → `gemini-pro`) and fall back to the sentinel when
/// absent or empty.
pub(crate) fn normalize_model_name(raw: Option<String>) -> String {
    let Some(name) = raw else {
        return UNKNOWN_MODEL.to_string();
    };
    match name.rsplit('/').next() {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => UNKNOWN_MODEL.to_string(),
    }
}

/// Whitespace-split token estimate over prompt plus response.
pub(crate) fn estimate_tokens(prompt: &str, response: &str) -> u32 {
    (prompt.split_whitespace().count() + response.split_whitespace().count()) as u32
}

impl Tracker {
    /// Run a call under instrumentation.
    ///
    /// With tracking disabled the callable runs directly, unmeasured.
    /// Otherwise the elapsed wall-clock time, outcome, and described return
    /// value (or error message) are captured into one FunctionCall event,
    /// emitted whether the call succeeds or fails. The original `Result` is
    /// returned untouched.
    pub fn track_call<T, E, F>(&self, function_name: &str, params: CallParams, call: F) -> Result<T, E>
    where
        T: std::fmt::Debug,
        E: Display,
        F: FnOnce() -> Result<T, E>,
    {
        if !self.is_enabled() {
            return call();
        }

        let started = Instant::now();
        let outcome = call();
        let execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        let kind = match &outcome {
            Ok(value) => EventKind::FunctionCall {
                function_name: function_name.to_string(),
                parameters: params.into_map(),
                execution_time_ms,
                success: true,
                return_value: Some(value.describe()),
                error_message: None,
            },
            Err(error) => EventKind::FunctionCall {
                function_name: function_name.to_string(),
                parameters: params.into_map(),
                execution_time_ms,
                success: false,
                return_value: None,
                error_message: Some(error.to_string()),
            },
        };
        self.emit(kind);

        outcome
    }

    /// Run an LLM call of shape (model handle, prompt) → response-with-text
    /// under instrumentation.
    ///
    /// Token counts are whitespace-split estimates over prompt + response;
    /// the cost is `(tokens / 1000) × cost_per_1k_tokens` from the
    /// configuration. Both are approximations, not billing figures.
    pub fn track_llm<M, R, E, F>(&self, model: &M, prompt: &str, call: F) -> Result<R, E>
    where
        M: LlmModel + ?Sized,
        R: LlmResponse,
        E: Display,
        F: FnOnce() -> Result<R, E>,
    {
        if !self.is_enabled() {
            return call();
        }

        let model_name = normalize_model_name(model.model_name());
        let cost_per_1k = self.config().cost_per_1k_tokens;
        let prompt_length = prompt.chars().count();

        let started = Instant::now();
        let outcome = call();
        let response_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        let kind = match &outcome {
            Ok(response) => {
                let text = response.text();
                let tokens = estimate_tokens(prompt, text);
                EventKind::LlmCall {
                    model_name,
                    prompt_length,
                    response_length: text.chars().count(),
                    tokens_used: Some(tokens),
                    estimated_cost: Some(f64::from(tokens) / 1000.0 * cost_per_1k),
                    response_time_ms,
                    success: true,
                    user_input: Some(prompt.to_string()),
                    llm_response: Some(text.to_string()),
                    error_message: None,
                }
            }
            Err(error) => EventKind::LlmCall {
                model_name,
                prompt_length,
                response_length: 0,
                tokens_used: None,
                estimated_cost: None,
                response_time_ms,
                success: false,
                user_input: Some(prompt.to_string()),
                llm_response: None,
                error_message: Some(error.to_string()),
            },
        };
        self.emit(kind);

        outcome
    }
}
