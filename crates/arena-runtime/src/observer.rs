// SPDX-License-Identifier: MIT OR Apache-2.0
//! Progress observer for live-status consumers.
//!
//! The runner reports lifecycle transitions through this seam so the
//! artifact layer can keep `match_status.json` current without the
//! runner knowing about the filesystem.

use arena_core::MatchEndReason;

/// Receives lifecycle notifications from the match runner.
///
/// All methods default to no-ops; implementors override what they need.
pub trait MatchObserver: Send + Sync {
    /// The match entered the turn loop.
    fn match_started(&self, match_id: &str) {
        let _ = match_id;
    }

    /// A new turn began.
    fn turn_started(&self, match_id: &str, turn: u32) {
        let _ = (match_id, turn);
    }

    /// The match finished (including setup failures).
    fn match_ended(&self, match_id: &str, reason: MatchEndReason) {
        let _ = (match_id, reason);
    }
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl MatchObserver for NullObserver {}
