//! Append-only structured log sinks: one world-wide log and one per-actor
//! log, each rotated once it would exceed a byte-size budget.
//!
//! Lines are plain UTF-8 of the shape `HH:mm:ss.fff|TYPE key=value
//! key=value …` (spec §6's logging-output contract). This is deliberately
//! not routed through `tracing` — `tracing`/`tracing-subscriber` remain
//! the ambient logging stack for ordinary diagnostic output (see
//! `goap-sim`'s `main.rs`), while these sinks produce the stable,
//! machine-parseable per-event record the simulation's own log files are
//! specified to contain.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::Mutex;

/// Errors opening or rotating a log file.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// The underlying file operation failed.
    #[error("log io error at {path}: {source}")]
    Io {
        /// The path the operation was attempted against.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// A single `key=value` field in a log line.
#[derive(Debug, Clone)]
pub struct Field {
    /// Field name.
    pub key: String,
    /// Field value, already formatted as its final string form.
    pub value: String,
}

impl Field {
    /// Build a field from any displayable value.
    pub fn new(key: impl Into<String>, value: impl std::fmt::Display) -> Self {
        Self { key: key.into(), value: value.to_string() }
    }
}

/// Render one log line: `HH:mm:ss.fff|TYPE key=value key=value …`.
#[must_use]
pub fn format_line(event_type: &str, fields: &[Field]) -> String {
    let timestamp = Utc::now().format("%H:%M:%S%.3f");
    let mut line = format!("{timestamp}|{event_type}");
    for field in fields {
        line.push(' ');
        line.push_str(&field.key);
        line.push('=');
        line.push_str(&field.value);
    }
    line.push('\n');
    line
}

struct RotatingFile {
    path: PathBuf,
    file: File,
    written_bytes: u64,
    max_bytes: u64,
}

impl RotatingFile {
    fn open(path: PathBuf, max_bytes: u64) -> Result<Self, LoggingError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LoggingError::Io { path: path.clone(), source })?;
        let written_bytes = file.metadata().map(|m| m.len()).unwrap_or(0);
        Ok(Self { path, file, written_bytes, max_bytes })
    }

    fn write_line(&mut self, line: &str) -> Result<(), LoggingError> {
        #[allow(clippy::cast_possible_truncation)]
        let incoming = line.len() as u64;
        if self.written_bytes.saturating_add(incoming) > self.max_bytes {
            self.rotate()?;
        }
        self.file
            .write_all(line.as_bytes())
            .map_err(|source| LoggingError::Io { path: self.path.clone(), source })?;
        self.written_bytes = self.written_bytes.saturating_add(incoming);
        Ok(())
    }

    fn rotate(&mut self) -> Result<(), LoggingError> {
        let backup = rotated_path(&self.path);
        std::fs::rename(&self.path, &backup).map_err(|source| LoggingError::Io { path: self.path.clone(), source })?;
        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| LoggingError::Io { path: self.path.clone(), source })?;
        self.written_bytes = 0;
        Ok(())
    }
}

fn rotated_path(path: &Path) -> PathBuf {
    let mut rotated = path.as_os_str().to_owned();
    rotated.push(".1");
    PathBuf::from(rotated)
}

/// The byte budget at which a log file is rotated (spec §6: 75 MiB).
pub const DEFAULT_ROTATION_BYTES: u64 = 75 * 1024 * 1024;

/// The world-wide event log: commits, conflicts, quest events, and
/// anything not scoped to one actor.
pub struct WorldLogger {
    file: Mutex<RotatingFile>,
}

impl WorldLogger {
    /// Open (or create) the world log at `path`, rotating at `max_bytes`.
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64) -> Result<Self, LoggingError> {
        Ok(Self { file: Mutex::new(RotatingFile::open(path.into(), max_bytes)?) })
    }

    /// Log one event with the given type and fields.
    pub fn log(&self, event_type: &str, fields: &[Field]) {
        let line = format_line(event_type, fields);
        if self.file.lock().write_line(&line).is_err() {
            tracing::warn!(event_type, "failed to write world log line");
        }
    }
}

/// One actor's own rotated log, for its loop-state transitions and plan
/// summaries.
pub struct PerActorLogger {
    actor_id: String,
    file: Mutex<RotatingFile>,
}

impl PerActorLogger {
    /// Open (or create) `<log_dir>/<actor_id>.log`, rotating at
    /// `max_bytes`.
    pub fn open(log_dir: impl AsRef<Path>, actor_id: impl Into<String>, max_bytes: u64) -> Result<Self, LoggingError> {
        let actor_id = actor_id.into();
        let path = log_dir.as_ref().join(format!("{actor_id}.log"));
        Ok(Self { actor_id, file: Mutex::new(RotatingFile::open(path, max_bytes)?) })
    }

    /// The actor this logger is scoped to.
    #[must_use]
    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    /// Log one event with the given type and fields.
    pub fn log(&self, event_type: &str, fields: &[Field]) {
        let line = format_line(event_type, fields);
        if self.file.lock().write_line(&line).is_err() {
            tracing::warn!(actor_id = %self.actor_id, event_type, "failed to write actor log line");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_line_matches_the_documented_shape() {
        let line = format_line("PLAN", &[Field::new("goal", "forage"), Field::new("steps", 3)]);
        assert!(line.contains("|PLAN goal=forage steps=3"));
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn world_logger_appends_lines() -> Result<(), LoggingError> {
        let dir = tempfile::tempdir().map_err(|source| LoggingError::Io { path: PathBuf::new(), source })?;
        let path = dir.path().join("world.log");
        let logger = WorldLogger::open(&path, DEFAULT_ROTATION_BYTES)?;
        logger.log("COMMIT", &[Field::new("tick", 1)]);
        logger.log("COMMIT", &[Field::new("tick", 2)]);
        let contents = std::fs::read_to_string(&path).map_err(|source| LoggingError::Io { path, source })?;
        assert_eq!(contents.lines().count(), 2);
        Ok(())
    }

    #[test]
    fn rotation_moves_existing_contents_to_backup_file() -> Result<(), LoggingError> {
        let dir = tempfile::tempdir().map_err(|source| LoggingError::Io { path: PathBuf::new(), source })?;
        let logger = PerActorLogger::open(dir.path(), "alice", 10)?;
        logger.log("START", &[]);
        logger.log("END", &[]);
        let backup = dir.path().join("alice.log.1");
        assert!(backup.exists());
        Ok(())
    }
}
