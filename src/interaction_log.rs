//! Append-only log of prompt/completion pairs.
//!
//! Each session call appends one human-readable block. Writing is
//! best-effort from the caller's point of view: [`InteractionLog::append`]
//! reports failures, and callers decide to warn and move on.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("Failed to write interaction log {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One logged call.
#[derive(Debug, Clone)]
pub struct LogEntry<'a> {
    pub timestamp: DateTime<Utc>,
    pub function: &'a str,
    pub context: &'a Value,
    pub prompt: &'a str,
    pub completion: &'a str,
}

impl<'a> LogEntry<'a> {
    /// Entry stamped with the current time.
    pub fn now(function: &'a str, context: &'a Value, prompt: &'a str, completion: &'a str) -> Self {
        Self {
            timestamp: Utc::now(),
            function,
            context,
            prompt,
            completion,
        }
    }

    /// Render the block exactly as it is written to disk.
    pub fn render(&self) -> String {
        format!(
            "===== {} | {} =====\nContext: {}\n--- Prompt ---\n{}\n--- Completion ---\n{}\n\n",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.function,
            self.context,
            self.prompt,
            self.completion
        )
    }
}

/// Interaction log file handle.
#[derive(Debug, Clone)]
pub struct InteractionLog {
    path: PathBuf,
}

impl InteractionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry, creating the file and its directory if needed.
    pub fn append(&self, entry: &LogEntry<'_>) -> Result<(), LogError> {
        let io_err = |source: std::io::Error| LogError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        file.write_all(entry.render().as_bytes()).map_err(io_err)?;

        debug!("Logged {} call to {}", entry.function, self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_render_block_format() {
        let context = json!({"swarm": "release"});
        let entry = LogEntry {
            timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            function: "launch_session",
            context: &context,
            prompt: "Ship it",
            completion: "Shipped",
        };

        assert_eq!(
            entry.render(),
            "===== 2025-03-01T12:00:00.000Z | launch_session =====\n\
             Context: {\"swarm\":\"release\"}\n\
             --- Prompt ---\nShip it\n\
             --- Completion ---\nShipped\n\n"
        );
    }

    #[test]
    fn test_append_accumulates_entries() {
        let dir = tempfile::tempdir().unwrap();
        let log = InteractionLog::new(dir.path().join("nested/interactions.log"));
        let context = json!({});

        log.append(&LogEntry::now("first", &context, "p1", "c1")).unwrap();
        log.append(&LogEntry::now("second", &context, "p2", "c2")).unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(content.matches("=====").count(), 4);
        let first = content.find("| first").unwrap();
        let second = content.find("| second").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_append_reports_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the log file should be makes opening it fail.
        let path = dir.path().join("log");
        std::fs::create_dir(&path).unwrap();

        let log = InteractionLog::new(&path);
        let context = json!({});
        let err = log
            .append(&LogEntry::now("launch_session", &context, "p", "c"))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to write interaction log"));
    }
}
