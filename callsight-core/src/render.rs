//! Console rendering for tracking events
//!
//! Rendering is a pure function of `(event, config)`; the registry owns the
//! actual writing. The [`Render`] trait is the seam the registry depends on,
//! so alternative renderers can be injected without touching the emit path.

use colored::{Color, Colorize};

use crate::config::{TrackerConfig, TrackingMode, Verbosity};
use crate::event::{truncate, Event, EventKind};
use crate::summary::SessionSummary;

/// Total estimated cost above which the summary line switches to the error
/// color.
pub const COST_ALERT_THRESHOLD: f64 = 0.10;

/// Turns an event or summary into formatted text, or nothing.
pub trait Render: Send + Sync {
    fn render_event(&self, event: &Event, config: &TrackerConfig) -> Option<String>;
    fn render_summary(&self, summary: &SessionSummary, config: &TrackerConfig) -> Option<String>;
}

/// The default line-oriented console renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleRenderer;

fn paint(text: String, color_name: &str, use_colors: bool) -> String {
    if !use_colors {
        return text;
    }
    text.as_str().color(Color::from(color_name)).to_string()
}

fn timestamp_prefix(event: &Event, config: &TrackerConfig) -> String {
    if config.show_timestamps {
        format!("[{}] ", event.timestamp.format("%H:%M:%S"))
    } else {
        String::new()
    }
}

fn duration_suffix(time_ms: f64, config: &TrackerConfig) -> String {
    if config.show_execution_time {
        format!(" ({:.1}ms)", time_ms)
    } else {
        String::new()
    }
}

impl Render for ConsoleRenderer {
    fn render_event(&self, event: &Event, config: &TrackerConfig) -> Option<String> {
        // Console lines only exist in console mode; Disabled is never console.
        if config.mode != TrackingMode::Console {
            return None;
        }

        let ts = timestamp_prefix(event, config);

        match &event.kind {
            EventKind::SessionStart { .. } => {
                let mut message = format!("{}🚀 Session Started", ts);
                if config.verbosity == Verbosity::Verbose {
                    let short_id: String = event.session_id.chars().take(8).collect();
                    message.push_str(&format!(" | ID: {}", short_id));
                }
                Some(paint(message, &config.colors.session, config.use_colors))
            }

            EventKind::SessionEnd => Some(paint(
                format!("{}🏁 Session Ended", ts),
                &config.colors.session,
                config.use_colors,
            )),

            EventKind::FunctionCall {
                function_name,
                parameters,
                execution_time_ms,
                success,
                error_message,
                ..
            } => {
                if config.verbosity == Verbosity::Quiet {
                    return None;
                }

                let status = if *success { "✅" } else { "❌" };
                let mut message = format!(
                    "{}{} {}(){}",
                    ts,
                    status,
                    function_name,
                    duration_suffix(*execution_time_ms, config)
                );

                if config.show_parameters
                    && config.verbosity == Verbosity::Verbose
                    && !parameters.is_empty()
                {
                    let rendered: Vec<String> = parameters
                        .iter()
                        .map(|(name, value)| format!("{}={}", name, truncate(value, 50)))
                        .collect();
                    message.push_str(&format!(" | Params: {}", rendered.join(", ")));
                }

                if !*success {
                    if let Some(err) = error_message {
                        message.push_str(&format!(" | Error: {}", err));
                    }
                }

                let color = if *success {
                    &config.colors.function
                } else {
                    &config.colors.error
                };
                Some(paint(message, color, config.use_colors))
            }

            EventKind::LlmCall {
                model_name,
                tokens_used,
                estimated_cost,
                response_time_ms,
                success,
                user_input,
                error_message,
                ..
            } => {
                if config.verbosity == Verbosity::Quiet {
                    return None;
                }

                let status = if *success { "🤖" } else { "❌" };
                let mut message = format!(
                    "{}{} LLM Call ({}){}",
                    ts,
                    status,
                    model_name,
                    duration_suffix(*response_time_ms, config)
                );

                if let Some(tokens) = tokens_used {
                    if *tokens > 0 {
                        message.push_str(&format!(" | Tokens: {}", tokens));
                    }
                }
                if let Some(cost) = estimated_cost {
                    if *cost > 0.0 {
                        message.push_str(&format!(" | Cost: ${:.4}", cost));
                    }
                }

                if config.verbosity == Verbosity::Verbose {
                    if let Some(input) = user_input {
                        message.push_str(&format!(" | Input: '{}'", truncate(input, 100)));
                    }
                }

                if !*success {
                    if let Some(err) = error_message {
                        message.push_str(&format!(" | Error: {}", err));
                    }
                }

                let color = if *success {
                    &config.colors.llm
                } else {
                    &config.colors.error
                };
                Some(paint(message, color, config.use_colors))
            }

            EventKind::ApiCall {
                api_name,
                endpoint,
                method,
                status_code,
                response_time_ms,
                success,
                error_message,
                ..
            } => {
                if config.verbosity == Verbosity::Quiet {
                    return None;
                }

                let status = if *success { "🌐" } else { "❌" };
                let mut message = format!(
                    "{}{} API Call ({}){}",
                    ts,
                    status,
                    api_name,
                    duration_suffix(*response_time_ms, config)
                );

                if let Some(code) = status_code {
                    message.push_str(&format!(" | {} {}", method, code));
                }

                if config.verbosity == Verbosity::Verbose && !endpoint.is_empty() {
                    message.push_str(&format!(" | {}", endpoint));
                }

                if !*success {
                    if let Some(err) = error_message {
                        message.push_str(&format!(" | Error: {}", err));
                    }
                }

                let color = if *success {
                    &config.colors.api
                } else {
                    &config.colors.error
                };
                Some(paint(message, color, config.use_colors))
            }

            // Errors render at every verbosity level.
            EventKind::Error {
                error_type,
                error_message,
                stack_trace,
                function_name,
                ..
            } => {
                let mut message = format!("{}💥 ERROR: {}", ts, error_type);
                if let Some(func) = function_name {
                    message.push_str(&format!(" in {}()", func));
                }
                message.push_str(&format!(" | {}", error_message));

                if config.verbosity == Verbosity::Verbose {
                    if let Some(stack) = stack_trace {
                        message.push_str(&format!("\nStack trace: {}", stack));
                    }
                }

                Some(paint(message, &config.colors.error, config.use_colors))
            }
        }
    }

    fn render_summary(&self, summary: &SessionSummary, config: &TrackerConfig) -> Option<String> {
        if config.mode != TrackingMode::Console {
            return None;
        }

        let rule = "=".repeat(50);
        let mut lines = vec![
            String::new(),
            rule.clone(),
            paint(
                "📊 SESSION SUMMARY".to_string(),
                &config.colors.session,
                config.use_colors,
            ),
            rule.clone(),
        ];

        if let Some(seconds) = summary.total_time_seconds {
            lines.push(format!("⏱️  Duration: {:.1} seconds", seconds));
        }

        lines.push(format!("🔧 Function calls: {}", summary.function_calls));
        lines.push(format!("🤖 LLM calls: {}", summary.llm_calls));
        lines.push(format!("🌐 API calls: {}", summary.api_calls));

        if summary.errors > 0 {
            lines.push(paint(
                format!("💥 Errors: {}", summary.errors),
                &config.colors.error,
                config.use_colors,
            ));
        }

        if summary.total_estimated_cost > 0.0 {
            let color = if summary.total_estimated_cost > COST_ALERT_THRESHOLD {
                &config.colors.error
            } else {
                &config.colors.function
            };
            lines.push(paint(
                format!(
                    "💰 Total estimated cost: ${:.4}",
                    summary.total_estimated_cost
                ),
                color,
                config.use_colors,
            ));
        }

        lines.push(format!("{}\n", rule));
        Some(lines.join("\n"))
    }
}
