// src/utils/logging.rs
#![allow(dead_code)]
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Local};
use tracing_subscriber::{fmt, EnvFilter};

/// Name of the per-run log file written into the date folder.
pub const RUN_LOG_FILE: &str = "Log.log";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Sets up the logging framework using tracing_subscriber.
/// Reads log level filters from the `RUST_LOG` environment variable.
/// Defaults to "info" if `RUST_LOG` is not set.
pub fn setup_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info")); // Default to INFO level

    fmt()
        .with_env_filter(filter)
        .init();

    tracing::debug!("Logging setup complete.");
}

/// Marker recorded with every run-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutcome {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
    pub outcome: LogOutcome,
}

impl LogEntry {
    /// Renders the `YYYY-MM-DD HH:MM:SS - <message>` line used in the log file.
    pub fn render(&self) -> String {
        format!(
            "{} - {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.message
        )
    }
}

/// Ordered, append-only log for one retrieve+ingest run.
///
/// Entries accumulate in memory from run start; once `attach_file` points the
/// log at the run's `Log.log`, buffered entries are flushed and every later
/// entry is appended as it arrives. Every entry is also mirrored to `tracing`
/// at the level matching its outcome.
pub struct RunLog {
    entries: Vec<LogEntry>,
    sink: Option<File>,
}

impl RunLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            sink: None,
        }
    }

    /// Attaches the persisted log file, flushing everything buffered so far.
    /// The file is opened in append mode: re-running against an existing
    /// folder never rewrites earlier lines.
    pub fn attach_file(&mut self, path: &Path) -> std::io::Result<()> {
        let mut file = OpenOptions::new().append(true).create(true).open(path)?;
        for entry in &self.entries {
            writeln!(file, "{}", entry.render())?;
        }
        self.sink = Some(file);
        Ok(())
    }

    pub fn success<S: Into<String>>(&mut self, message: S) {
        self.push(LogOutcome::Success, message.into());
    }

    pub fn warning<S: Into<String>>(&mut self, message: S) {
        self.push(LogOutcome::Warning, message.into());
    }

    pub fn error<S: Into<String>>(&mut self, message: S) {
        self.push(LogOutcome::Error, message.into());
    }

    fn push(&mut self, outcome: LogOutcome, message: String) {
        match outcome {
            LogOutcome::Success => tracing::info!("{}", message),
            LogOutcome::Warning => tracing::warn!("{}", message),
            LogOutcome::Error => tracing::error!("{}", message),
        }

        let entry = LogEntry {
            timestamp: Local::now(),
            message,
            outcome,
        };

        if let Some(file) = self.sink.as_mut() {
            // Sink failures must not take the run down with them.
            if let Err(e) = writeln!(file, "{}", entry.render()) {
                tracing::warn!("Failed to append to run log: {}", e);
            }
        }

        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Last `n` rendered lines, for the notification summary.
    pub fn tail(&self, n: usize) -> Vec<String> {
        let start = self.entries.len().saturating_sub(n);
        self.entries[start..].iter().map(LogEntry::render).collect()
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}
