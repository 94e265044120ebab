// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = "Match and tournament runners for Agent Arena."]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! arena-runtime
//!
//! The deterministic turn loop and everything that feeds it: the
//! scenario and agent seams, the per-match seed derivation tree, the
//! timeout race, forfeits, decoder forensics, and the round-robin
//! tournament scheduler. Artifact writing lives in `arena-artifacts`;
//! this crate only produces in-memory results.

/// The agent seam: replies, context, setup.
pub mod agent;
/// Progress observer for live-status consumers.
pub mod observer;
/// Scenario and agent registries keyed by short stable strings.
pub mod registry;
/// The match runner: turn loop, timeouts, forfeits, forensics.
pub mod runner;
/// The scenario seam: pure functions over JSON state.
pub mod scenario;
/// Round-robin tournament planning and execution.
pub mod tournament;

pub use agent::{Agent, AgentContext, AgentKind, AgentReply, AgentSetup};
pub use observer::{MatchObserver, NullObserver};
pub use registry::{AgentFactory, AgentRegistry, ResolveError, ScenarioRegistry};
pub use runner::{MatchConfig, MatchError, MatchResult, Provenance, run_match};
pub use scenario::{Adjudication, Scenario, ScenarioError};
pub use tournament::{
    MatchRecord, PlannedMatch, Seat, TournamentConfig, TournamentError, TournamentRun,
    plan_round_robin, run_tournament,
};
