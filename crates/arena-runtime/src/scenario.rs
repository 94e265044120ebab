// SPDX-License-Identifier: MIT OR Apache-2.0
//! The scenario seam.
//!
//! A scenario is a rulebook: pure functions over a JSON state value.
//! The runner owns the turn loop and never inspects state directly;
//! hidden information stays inside the state and only leaves through
//! `reveal` (under `_private`) or never at all. Observations, actions,
//! feedback, and summaries are all `serde_json::Value`, so one schema
//! per scenario is the only typing boundary agents see.

use std::collections::BTreeMap;

use serde_json::Value;

/// Errors from scenario state handling.
///
/// The runner treats these as fatal for the match: a scenario that
/// cannot read state it produced is a rulebook bug, not a game event.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// State failed to deserialize into the rulebook's shape.
    #[error("scenario state is malformed: {0}")]
    State(#[from] serde_json::Error),
    /// The rulebook was asked about an agent it does not know.
    #[error("unknown agent `{0}` in scenario state")]
    UnknownAgent(String),
}

/// A ruling on one submitted action.
#[derive(Debug, Clone)]
pub struct Adjudication {
    /// The successor state.
    pub state: Value,
    /// Whether the action was accepted.
    pub valid: bool,
    /// Feedback delivered back to the agent (and the event stream).
    pub feedback: Value,
}

/// A turn-based game with hidden state, exposed as pure functions.
///
/// Implementations must be deterministic: the same `scenario_seed` and
/// agent list always produce the same state, and every method is a pure
/// function of its arguments.
pub trait Scenario: Send + Sync {
    /// Display name, e.g. `"Number Guess"`.
    fn name(&self) -> &str;

    /// Registry key, e.g. `"numberGuess"`.
    fn key(&self) -> &str;

    /// Rulebook version, part of the scenario content hash.
    fn version(&self) -> &str;

    /// Build the initial state for the given agents.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] if the agent list is unusable.
    fn init(&self, scenario_seed: u32, agent_ids: &[String]) -> Result<Value, ScenarioError>;

    /// What `agent_id` can see. Never includes hidden state.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] if the state is malformed.
    fn observe(&self, state: &Value, agent_id: &str) -> Result<Value, ScenarioError>;

    /// Rule on an action and produce the successor state.
    ///
    /// Invalid actions are a game event (`valid: false`), not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] if the state is malformed.
    fn adjudicate(
        &self,
        state: &Value,
        agent_id: &str,
        action: &Value,
    ) -> Result<Adjudication, ScenarioError>;

    /// Whether the game is over.
    fn is_terminal(&self, state: &Value) -> bool;

    /// Public summary for the event stream. Must not contain any key
    /// from [`hidden_keys`](Self::hidden_keys).
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] if the state is malformed.
    fn summarize(&self, state: &Value) -> Result<Value, ScenarioError>;

    /// Final score per agent.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] if the state is malformed.
    fn score(&self, state: &Value) -> Result<BTreeMap<String, f64>, ScenarioError>;

    /// Hidden final state for `MatchEnded.details._private`, if any.
    fn reveal(&self, state: &Value) -> Option<Value>;

    /// The safe no-op action used on timeouts and decoder fallback.
    fn default_action(&self) -> Value;

    /// The one-shot `gameRules` briefing embedded in the turn-1
    /// observation. Deterministic and seed-independent.
    fn briefing(&self) -> Value;

    /// Top-level state keys that must never appear in summaries.
    fn hidden_keys(&self) -> &[&str];

    /// JSON Schema document describing a valid action.
    fn action_schema(&self) -> Value;
}
