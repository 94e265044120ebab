// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = "Built-in scenario rulebooks for Agent Arena."]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! arena-scenarios
//!
//! Three rulebooks implementing the scenario contract: a hidden-number
//! guessing duel, a solo dungeon crawl (run competitively as paired
//! solos), and a shared-pool resource game. Each owns its game state as
//! a typed struct serialized through the contract's JSON state value,
//! declares its hidden keys, and ships an action schema for the
//! tolerant decoder.

mod heist;
mod number_guess;
mod resource_rivals;

pub use heist::HeistScenario;
pub use number_guess::NumberGuessScenario;
pub use resource_rivals::ResourceRivalsScenario;

use arena_runtime::ScenarioRegistry;

/// Version of the scenario interface contract recorded in manifests.
pub const SCENARIO_CONTRACT_VERSION: &str = "1";

/// Register every built-in rulebook.
pub fn register_builtins(registry: &mut ScenarioRegistry) {
    registry.register(NumberGuessScenario);
    registry.register(HeistScenario);
    registry.register(ResourceRivalsScenario);
}
