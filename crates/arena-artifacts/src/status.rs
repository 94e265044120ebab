// SPDX-License-Identifier: MIT OR Apache-2.0
//! Live-status file writing.
//!
//! `match_status.json` is the one file readers poll while the writer
//! still owns the directory, so every update goes through
//! temp-plus-rename. Observer callbacks swallow I/O failures after
//! logging them: a status hiccup must never kill a match.

use std::path::PathBuf;

use tracing::warn;

use arena_core::{MatchEndReason, MatchLifecycle, MatchStatus, to_canonical_value};
use arena_runtime::MatchObserver;

use crate::match_dir::now_rfc3339;
use crate::write::{ArtifactError, write_atomic};

/// Name of the live-status file inside a match directory.
pub const STATUS_FILE: &str = "match_status.json";

/// Keeps `match_status.json` current across a match's lifecycle.
#[derive(Debug, Clone)]
pub struct StatusWriter {
    dir: PathBuf,
}

impl StatusWriter {
    /// Create a writer for the given match directory.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write a status record atomically.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] on serialization or I/O failure.
    pub fn write(&self, status: &MatchStatus) -> Result<(), ArtifactError> {
        let value = to_canonical_value(status)?;
        let mut text = arena_core::canonicalize(&value)?;
        text.push('\n');
        write_atomic(&self.dir.join(STATUS_FILE), text.as_bytes())
    }

    /// Record the `waiting` state before the runner takes over.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] on serialization or I/O failure.
    pub fn write_waiting(&self, match_id: &str) -> Result<(), ArtifactError> {
        self.write(&MatchStatus {
            match_id: match_id.to_string(),
            status: MatchLifecycle::Waiting,
            turn: 0,
            updated_at: now_rfc3339(),
            error: None,
        })
    }

    /// Record a failure with its message.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] on serialization or I/O failure.
    pub fn write_failed(&self, match_id: &str, message: &str) -> Result<(), ArtifactError> {
        self.write(&MatchStatus {
            match_id: match_id.to_string(),
            status: MatchLifecycle::Failed,
            turn: 0,
            updated_at: now_rfc3339(),
            error: Some(message.to_string()),
        })
    }

    fn try_write(&self, status: &MatchStatus) {
        if let Err(e) = self.write(status) {
            warn!(dir = %self.dir.display(), error = %e, "status update failed");
        }
    }
}

impl MatchObserver for StatusWriter {
    fn match_started(&self, match_id: &str) {
        self.try_write(&MatchStatus {
            match_id: match_id.to_string(),
            status: MatchLifecycle::Running,
            turn: 0,
            updated_at: now_rfc3339(),
            error: None,
        });
    }

    fn turn_started(&self, match_id: &str, turn: u32) {
        self.try_write(&MatchStatus {
            match_id: match_id.to_string(),
            status: MatchLifecycle::Running,
            turn,
            updated_at: now_rfc3339(),
            error: None,
        });
    }

    fn match_ended(&self, match_id: &str, reason: MatchEndReason) {
        let status = match reason {
            MatchEndReason::SetupFailed => MatchLifecycle::Failed,
            _ => MatchLifecycle::Completed,
        };
        self.try_write(&MatchStatus {
            match_id: match_id.to_string(),
            status,
            turn: 0,
            updated_at: now_rfc3339(),
            error: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_writes_land_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let writer = StatusWriter::new(dir.path());
        writer.write_waiting("m1").unwrap();

        let text = std::fs::read_to_string(dir.path().join(STATUS_FILE)).unwrap();
        assert!(text.ends_with('\n'));
        let status: MatchStatus = serde_json::from_str(&text).unwrap();
        assert_eq!(status.status, MatchLifecycle::Waiting);

        writer.match_started("m1");
        writer.turn_started("m1", 3);
        let text = std::fs::read_to_string(dir.path().join(STATUS_FILE)).unwrap();
        let status: MatchStatus = serde_json::from_str(&text).unwrap();
        assert_eq!(status.status, MatchLifecycle::Running);
        assert_eq!(status.turn, 3);

        writer.match_ended("m1", MatchEndReason::Completed);
        let text = std::fs::read_to_string(dir.path().join(STATUS_FILE)).unwrap();
        let status: MatchStatus = serde_json::from_str(&text).unwrap();
        assert_eq!(status.status, MatchLifecycle::Completed);
    }

    #[test]
    fn setup_failure_maps_to_failed() {
        let dir = tempfile::tempdir().unwrap();
        let writer = StatusWriter::new(dir.path());
        writer.match_ended("m1", MatchEndReason::SetupFailed);
        let text = std::fs::read_to_string(dir.path().join(STATUS_FILE)).unwrap();
        let status: MatchStatus = serde_json::from_str(&text).unwrap();
        assert_eq!(status.status, MatchLifecycle::Failed);
    }
}
