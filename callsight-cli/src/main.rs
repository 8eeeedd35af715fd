//! callsight - replay and summarize exported event logs
//!
//! The file destination of `callsight-core` appends one JSON event per
//! line. This binary re-renders such a log through the console renderer
//! (chronological replay) or folds it into the end-of-session summary.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use callsight_core::{
    ConsoleRenderer, Event, Render, SessionSummary, TrackerConfig, TrackingMode, Verbosity,
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "callsight")]
#[command(about = "Replay and summarize exported callsight event logs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Re-render an exported JSONL event log to the console
    Replay {
        /// Path to the exported event log
        file: PathBuf,

        /// Show parameter dumps, input previews, and stack traces
        #[arg(long, conflicts_with = "quiet")]
        verbose: bool,

        /// Only session boundaries and errors
        #[arg(long)]
        quiet: bool,

        /// Disable ANSI colors
        #[arg(long)]
        no_color: bool,
    },

    /// Print the session summary for an exported event log
    Summary {
        /// Path to the exported event log
        file: PathBuf,

        /// Emit the summary as JSON instead of the console report
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Replay {
            file,
            verbose,
            quiet,
            no_color,
        } => replay(&file, verbose, quiet, no_color),
        Command::Summary { file, json } => summarize(&file, json),
    }
}

/// Read events from a JSONL log, skipping lines that are not events
/// (summaries share the log file).
fn read_events(path: &Path) -> Result<Vec<Event>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;

    let mut events = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Event>(&line) {
            Ok(event) => events.push(event),
            Err(e) => eprintln!(
                "warning: {}:{}: skipping non-event line: {}",
                path.display(),
                lineno + 1,
                e
            ),
        }
    }
    Ok(events)
}

fn replay(path: &Path, verbose: bool, quiet: bool, no_color: bool) -> Result<()> {
    let events = read_events(path)?;
    if events.is_empty() {
        anyhow::bail!("no events found in {}", path.display());
    }

    let config = TrackerConfig {
        mode: TrackingMode::Console,
        verbosity: if verbose {
            Verbosity::Verbose
        } else if quiet {
            Verbosity::Quiet
        } else {
            Verbosity::Normal
        },
        use_colors: !no_color,
        ..Default::default()
    };

    for event in &events {
        if let Some(line) = ConsoleRenderer.render_event(event, &config) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn summarize(path: &Path, json: bool) -> Result<()> {
    let events = read_events(path)?;

    let session_id = events
        .iter()
        .map(|e| &e.session_id)
        .find(|id| !id.is_empty())
        .cloned()
        .unwrap_or_default();
    let summary = SessionSummary::from_events(session_id, &events);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        let config = TrackerConfig::default();
        if let Some(report) = ConsoleRenderer.render_summary(&summary, &config) {
            println!("{}", report);
        }
    }
    Ok(())
}
