// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = "Artifact writer for Agent Arena."]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! arena-artifacts
//!
//! Turns in-memory match and tournament results into content-addressed
//! directories. Write order is part of the contract: `match.jsonl`
//! exists before `match_summary.json` references its hash, and every
//! per-match hash exists before the truth-bundle post-pass rewrites the
//! tournament manifest. The live-status file is the only thing written
//! while a match is still running, and it goes through temp-plus-rename
//! so readers never see a torn write.

/// Broadcast manifest construction.
pub mod broadcast;
/// Per-match directory writing.
pub mod match_dir;
/// Live-status file writing.
pub mod status;
/// Tournament bundle writing and the truth-bundle post-pass.
pub mod tournament_dir;
/// Canonical and atomic file primitives.
pub mod write;

pub use broadcast::build_broadcast_manifest;
pub use match_dir::{
    MatchContext, agent_spec, scenario_ref, write_match_artifacts, write_verification_result,
};
pub use status::StatusWriter;
pub use tournament_dir::{TournamentBundle, tournament_id, write_tournament_artifacts};
pub use write::{ArtifactError, write_atomic, write_canonical_file};
