// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = "Built-in agents for Agent Arena."]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! arena-agents
//!
//! The scripted lineup (`random`, `baseline`) plus the gateway seam for
//! text-producing agents. Scripted agents answer with structured
//! actions and draw all randomness from their derived stream; text
//! agents return raw text that the runner pushes through the tolerant
//! decoder. The HTTP gateway is a thin adapter; nothing in it carries
//! match semantics.

mod gateway;
mod scripted;
mod text;

pub use gateway::{AgentGateway, GatewayRequest, HttpGateway, ScriptedGateway};
pub use scripted::{BaselineAgent, RandomAgent};
pub use text::TextAgent;

use arena_runtime::{AgentFactory, AgentKind, AgentRegistry};

/// Version stamped into manifests for built-in agents.
pub const AGENT_VERSION: &str = "1.0.0";

/// Register the scripted lineup under its stable keys.
pub fn register_scripted(registry: &mut AgentRegistry) {
    registry.register(
        "random",
        AgentFactory::new(AgentKind::Scripted, AGENT_VERSION, |id| {
            Box::new(RandomAgent::new(id))
        }),
    );
    registry.register(
        "baseline",
        AgentFactory::new(AgentKind::Scripted, AGENT_VERSION, |id| {
            Box::new(BaselineAgent::new(id))
        }),
    );
}
