// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = "Bundle, match, and receipt verification."]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! arena-verify
//!
//! Re-derives everything a bundle claims about itself (log hashes,
//! manifest hashes, the truth-bundle hash, standings, signatures) and
//! reports per-check results. Verifiers never throw on a bad bundle:
//! structural problems, hash mismatches, and invalid signatures are all
//! recorded as check outcomes, and the exit-code mapping (0 pass,
//! 1 mismatch, 2 structural) lives on the report.

/// Bundle validation: the seven named checks.
pub mod bundle;
/// Event-stream invariants shared by match and bundle checks.
pub mod invariants;
/// Per-match verification.
pub mod match_check;
/// Check results and reports.
pub mod report;
/// Per-tournament verification.
pub mod tournament_check;

pub use bundle::{BundleOptions, validate_bundle};
pub use invariants::check_event_invariants;
pub use match_check::verify_match;
pub use report::{CheckResult, CheckStatus, VerificationReport};
pub use tournament_check::verify_tournament;
