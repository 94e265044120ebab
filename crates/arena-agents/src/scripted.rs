// SPDX-License-Identifier: MIT OR Apache-2.0
//! The scripted lineup.
//!
//! Scripted agents recognise a scenario by the shape of its
//! observation, not by name: any rulebook exposing a `range` plays like
//! number-guess, anything with `exits` like a crawl, anything with
//! `maxClaim` like a pool game. Randomness comes exclusively from the
//! agent's derived stream, which is what keeps reruns identical.

use async_trait::async_trait;
use serde_json::{Value, json};

use arena_runtime::{Agent, AgentContext, AgentKind, AgentReply, AgentSetup};

/// Picks a uniformly random legal-looking action each turn.
#[derive(Debug)]
pub struct RandomAgent {
    id: String,
}

impl RandomAgent {
    /// Create a random agent with the given match-local id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl Agent for RandomAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Scripted
    }

    async fn act(
        &mut self,
        observation: &Value,
        ctx: &mut AgentContext<'_>,
    ) -> anyhow::Result<AgentReply> {
        if let Some(range) = observation.get("range") {
            let min = range.get("min").and_then(Value::as_i64).unwrap_or(1);
            let max = range.get("max").and_then(Value::as_i64).unwrap_or(100);
            let span = (max - min + 1).max(1) as usize;
            let value = min + ctx.rng.next_index(span) as i64;
            return Ok(AgentReply::Action(json!({"type": "guess", "value": value})));
        }

        if let Some(exits) = observation.get("exits").and_then(Value::as_array) {
            let mut candidates: Vec<Value> = Vec::new();
            if let Some(items) = observation.get("visibleItems").and_then(Value::as_array) {
                for item in items {
                    candidates.push(json!({"type": "pickup", "itemId": item}));
                }
            }
            for exit in exits {
                candidates.push(json!({"type": "move", "toRoomId": exit}));
            }
            if candidates.is_empty() {
                return Ok(AgentReply::Action(json!({"type": "wait"})));
            }
            let pick = ctx.rng.next_index(candidates.len());
            return Ok(AgentReply::Action(candidates.swap_remove(pick)));
        }

        if let Some(max_claim) = observation.get("maxClaim").and_then(Value::as_i64) {
            let amount = ctx.rng.next_index((max_claim + 1).max(1) as usize) as i64;
            return Ok(AgentReply::Action(json!({"type": "claim", "amount": amount})));
        }

        Ok(AgentReply::Action(json!({"type": "wait"})))
    }
}

/// Deterministic heuristics: bisection, greedy looting, steady claims.
#[derive(Debug)]
pub struct BaselineAgent {
    id: String,
    low: i64,
    high: i64,
}

impl BaselineAgent {
    /// Create a baseline agent with the given match-local id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            low: 1,
            high: 100,
        }
    }
}

#[async_trait]
impl Agent for BaselineAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Scripted
    }

    fn init(&mut self, _setup: &AgentSetup) -> anyhow::Result<()> {
        self.low = 1;
        self.high = 100;
        Ok(())
    }

    async fn act(
        &mut self,
        observation: &Value,
        _ctx: &mut AgentContext<'_>,
    ) -> anyhow::Result<AgentReply> {
        if let Some(range) = observation.get("range") {
            if observation.get("solved").and_then(Value::as_bool) == Some(true) {
                return Ok(AgentReply::Action(json!({"type": "wait"})));
            }
            // Narrow our window from the last round of feedback.
            let last_guess = observation.get("lastGuess").and_then(Value::as_i64);
            let feedback = observation.get("lastFeedback").and_then(Value::as_str);
            if let (Some(guess), Some(direction)) = (last_guess, feedback) {
                match direction {
                    "higher" => self.low = self.low.max(guess + 1),
                    "lower" => self.high = self.high.min(guess - 1),
                    _ => {}
                }
            }
            let min = range.get("min").and_then(Value::as_i64).unwrap_or(1);
            let max = range.get("max").and_then(Value::as_i64).unwrap_or(100);
            self.low = self.low.max(min);
            self.high = self.high.min(max);
            let mid = (self.low + self.high) / 2;
            return Ok(AgentReply::Action(json!({"type": "guess", "value": mid})));
        }

        if observation.get("exits").is_some() {
            if let Some(items) = observation.get("visibleItems").and_then(Value::as_array)
                && let Some(item) = items.first()
            {
                return Ok(AgentReply::Action(json!({"type": "pickup", "itemId": item})));
            }
            let holds_keycard = observation
                .get("inventory")
                .and_then(Value::as_array)
                .is_some_and(|inv| inv.iter().any(|i| i.as_str().is_some_and(|s| s.contains("keycard"))));
            let exits: Vec<&str> = observation
                .get("exits")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            // Push forward; only enter the vault once the keycard is held.
            let forward = exits
                .iter()
                .rev()
                .find(|e| **e != "vault" || holds_keycard);
            if let Some(room) = forward {
                return Ok(AgentReply::Action(json!({"type": "move", "toRoomId": room})));
            }
            return Ok(AgentReply::Action(json!({"type": "wait"})));
        }

        if observation.get("maxClaim").is_some() {
            return Ok(AgentReply::Action(json!({"type": "claim", "amount": 3})));
        }

        Ok(AgentReply::Action(json!({"type": "wait"})))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::DeterministicRng;

    async fn act_once(agent: &mut dyn Agent, observation: Value, seed: u32) -> Value {
        let mut rng = DeterministicRng::new(seed);
        let mut ctx = AgentContext {
            rng: &mut rng,
            turn: 1,
            agent_id: "t",
        };
        match agent.act(&observation, &mut ctx).await.unwrap() {
            AgentReply::Action(v) => v,
            AgentReply::Text(_) => panic!("scripted agents answer with actions"),
        }
    }

    #[tokio::test]
    async fn random_agent_guesses_in_range() {
        let mut agent = RandomAgent::new("r");
        for seed in 0..20 {
            let action = act_once(
                &mut agent,
                serde_json::json!({"range": {"min": 1, "max": 100}}),
                seed,
            )
            .await;
            assert_eq!(action["type"], "guess");
            let value = action["value"].as_i64().unwrap();
            assert!((1..=100).contains(&value));
        }
    }

    #[tokio::test]
    async fn random_agent_is_deterministic_per_seed() {
        let mut a = RandomAgent::new("r");
        let mut b = RandomAgent::new("r");
        let obs = serde_json::json!({"range": {"min": 1, "max": 100}});
        assert_eq!(
            act_once(&mut a, obs.clone(), 7).await,
            act_once(&mut b, obs, 7).await
        );
    }

    #[tokio::test]
    async fn baseline_bisects_from_feedback() {
        let mut agent = BaselineAgent::new("b");
        let first = act_once(
            &mut agent,
            serde_json::json!({"range": {"min": 1, "max": 100}, "solved": false}),
            0,
        )
        .await;
        assert_eq!(first["value"], 50);

        let second = act_once(
            &mut agent,
            serde_json::json!({
                "range": {"min": 1, "max": 100},
                "solved": false,
                "lastGuess": 50,
                "lastFeedback": "higher"
            }),
            0,
        )
        .await;
        assert_eq!(second["value"], 75);
    }

    #[tokio::test]
    async fn baseline_picks_up_before_moving() {
        let mut agent = BaselineAgent::new("b");
        let action = act_once(
            &mut agent,
            serde_json::json!({
                "exits": ["room-1", "room-3"],
                "visibleItems": ["keycard-1"],
                "inventory": []
            }),
            0,
        )
        .await;
        assert_eq!(action["type"], "pickup");
        assert_eq!(action["itemId"], "keycard-1");
    }

    #[tokio::test]
    async fn baseline_avoids_vault_without_keycard() {
        let mut agent = BaselineAgent::new("b");
        let action = act_once(
            &mut agent,
            serde_json::json!({
                "exits": ["room-3", "vault"],
                "visibleItems": [],
                "inventory": []
            }),
            0,
        )
        .await;
        assert_eq!(action, serde_json::json!({"type": "move", "toRoomId": "room-3"}));

        let with_key = act_once(
            &mut agent,
            serde_json::json!({
                "exits": ["room-3", "vault"],
                "visibleItems": [],
                "inventory": ["keycard-1"]
            }),
            0,
        )
        .await;
        assert_eq!(with_key, serde_json::json!({"type": "move", "toRoomId": "vault"}));
    }

    #[tokio::test]
    async fn baseline_claims_steadily() {
        let mut agent = BaselineAgent::new("b");
        let action = act_once(&mut agent, serde_json::json!({"maxClaim": 10}), 0).await;
        assert_eq!(action, serde_json::json!({"type": "claim", "amount": 3}));
    }
}
