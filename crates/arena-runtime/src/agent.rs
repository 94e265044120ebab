// SPDX-License-Identifier: MIT OR Apache-2.0
//! The agent seam.
//!
//! Agents own their state for the duration of one match and are
//! reconstructed per match. The runner hands each agent its own derived
//! RNG stream through [`AgentContext`]; an agent that needs randomness
//! draws from there and nowhere else, which is what makes reruns
//! bit-identical.

use async_trait::async_trait;
use serde_json::Value;

use arena_core::DeterministicRng;

/// What kind of agent this is; drives the adjudication path recorded in
/// the event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    /// Deterministic in-process agent returning structured actions.
    Scripted,
    /// Gateway-backed agent returning free-form text.
    Llm,
}

impl AgentKind {
    /// Wire name used in manifests.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scripted => "scripted",
            Self::Llm => "llm",
        }
    }
}

/// An agent's answer for one turn.
#[derive(Debug, Clone)]
pub enum AgentReply {
    /// A structured action, adjudicated directly.
    Action(Value),
    /// Free-form text, run through the tolerant decoder first.
    Text(String),
}

/// Identity and seed handed to an agent at match start.
#[derive(Debug, Clone)]
pub struct AgentSetup {
    /// The agent's id within the match.
    pub agent_id: String,
    /// The agent's derived seed.
    pub seed: u32,
}

/// Per-call context: the agent's own RNG stream plus turn bookkeeping.
pub struct AgentContext<'a> {
    /// The agent's derived RNG stream.
    pub rng: &'a mut DeterministicRng,
    /// 1-based turn number.
    pub turn: u32,
    /// The acting agent's id.
    pub agent_id: &'a str,
}

/// A match participant.
///
/// `act` may suspend (gateway-backed agents await network I/O); the
/// runner races it against the turn deadline and drops the future on
/// expiry, so implementations must not rely on running to completion
/// for their own consistency.
#[async_trait]
pub trait Agent: Send {
    /// The agent's id within the match.
    fn id(&self) -> &str;

    /// Scripted or gateway-backed.
    fn kind(&self) -> AgentKind;

    /// Called once before turn 1.
    ///
    /// # Errors
    ///
    /// An error here aborts the match as a setup failure.
    fn init(&mut self, setup: &AgentSetup) -> anyhow::Result<()> {
        let _ = setup;
        Ok(())
    }

    /// Produce a reply for the given observation.
    ///
    /// # Errors
    ///
    /// Errors are recorded as `AgentError` events; the match continues.
    async fn act(
        &mut self,
        observation: &Value,
        ctx: &mut AgentContext<'_>,
    ) -> anyhow::Result<AgentReply>;
}
