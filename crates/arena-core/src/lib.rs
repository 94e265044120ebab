// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = "The stable contract for Agent Arena."]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! arena-core
//!
//! Everything a reader needs to reproduce or re-verify a match lives here:
//! the event model, the manifest and summary shapes, canonical JSON, the
//! hashing discipline, and the deterministic RNG. Every other crate in the
//! workspace depends on this one; if you only take one dependency, take
//! this one.

/// Canonical JSON and JSONL serialization.
pub mod canon;
/// Storage-root resolution (the single environment boundary).
pub mod env;
/// The match event stream: tagged variants, strict and lenient parsers.
pub mod event;
/// SHA-256 hashing over files, manifest cores, and truth bundles.
pub mod hash;
/// Manifest, summary, broadcast, and status shapes.
pub mod manifest;
/// Recursive `_private` redaction for spectator-facing JSON.
pub mod redact;
/// Deterministic mulberry32 PRNG and seed derivation.
pub mod rng;
/// Standings rows and the round-robin points table.
pub mod standings;

pub use canon::{CanonError, canonicalize, canonicalize_jsonl, finite, to_canonical_value};
pub use env::{DATA_DIR_ENV, DEFAULT_DATA_DIR, storage_root};
pub use event::{
    LogParseError, MatchEndReason, MatchEvent, MatchEventKind, events_to_jsonl, parse_match_log,
    parse_match_log_lenient,
};
pub use hash::{
    HASH_PREFIX, hash_file, hash_manifest_core, manifest_core, sha256_hex, truth_bundle_hash,
};
pub use manifest::{
    AgentSpec, BroadcastFileEntry, BroadcastManifest, FileClass, MatchConfigManifest, MatchHashes,
    MatchLifecycle, MatchManifest, MatchStatus, MatchSummary, RunnerInfo, ScenarioRef,
    SeedDerivationInputs, TournamentManifest, TournamentMatchEntry,
};
pub use redact::redact_private;
pub use rng::{DeterministicRng, derive_match_seed, fnv1a32};
pub use standings::{StandingsRow, compute_standings};

/// Name of the runner embedded in every match manifest.
pub const RUNNER_NAME: &str = "agent-arena";

/// Version of the harness, taken from the crate version at compile time.
pub const RUNNER_VERSION: &str = env!("CARGO_PKG_VERSION");
