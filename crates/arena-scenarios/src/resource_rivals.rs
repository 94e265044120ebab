// SPDX-License-Identifier: MIT OR Apache-2.0
//! Resource Rivals: graze a shared pool without collapsing it.
//!
//! Each round every agent claims up to [`MAX_CLAIM`] units. If the
//! round's combined claims fit inside the hidden reserve, everyone is
//! paid; overgrazing pays nobody and still drains the pool. The reserve
//! size is drawn from the scenario seed and never observed directly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use arena_core::DeterministicRng;
use arena_runtime::{Adjudication, Scenario, ScenarioError};

/// Largest single-round claim.
const MAX_CLAIM: i64 = 10;

/// The resource-rivals rulebook.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceRivalsScenario;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RivalsState {
    agents: Vec<String>,
    /// Remaining pool. Hidden.
    reserve: i64,
    /// Claims lodged this round, cleared when the round settles.
    pending_claims: BTreeMap<String, i64>,
    /// Paid-out totals per agent.
    totals: BTreeMap<String, i64>,
    /// Claims from the last settled round, shown to everyone.
    last_round_claims: BTreeMap<String, i64>,
    rounds_settled: u32,
}

impl RivalsState {
    fn parse(state: &Value) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_value(state.clone())?)
    }

    fn to_value(&self) -> Result<Value, ScenarioError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Settle the round once every agent has lodged a claim.
    fn maybe_settle(&mut self) {
        if self.pending_claims.len() < self.agents.len() {
            return;
        }
        let total: i64 = self.pending_claims.values().sum();
        if total <= self.reserve {
            for (agent, claim) in &self.pending_claims {
                *self.totals.entry(agent.clone()).or_insert(0) += claim;
            }
        }
        // Overgrazing pays nobody; the pool drains either way.
        self.reserve -= total;
        self.last_round_claims = std::mem::take(&mut self.pending_claims);
        self.rounds_settled += 1;
    }
}

impl Scenario for ResourceRivalsScenario {
    fn name(&self) -> &str {
        "Resource Rivals"
    }

    fn key(&self) -> &str {
        "resourceRivals"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn init(&self, scenario_seed: u32, agent_ids: &[String]) -> Result<Value, ScenarioError> {
        let mut rng = DeterministicRng::new(scenario_seed);
        let reserve = 80 + rng.next_index(41) as i64;
        RivalsState {
            agents: agent_ids.to_vec(),
            reserve,
            pending_claims: BTreeMap::new(),
            totals: agent_ids.iter().map(|a| (a.clone(), 0)).collect(),
            last_round_claims: BTreeMap::new(),
            rounds_settled: 0,
        }
        .to_value()
    }

    fn observe(&self, state: &Value, agent_id: &str) -> Result<Value, ScenarioError> {
        let s = RivalsState::parse(state)?;
        Ok(json!({
            "maxClaim": MAX_CLAIM,
            "yourTotal": s.totals.get(agent_id).copied().unwrap_or(0),
            "lastRoundClaims": s.last_round_claims,
            "roundsPlayed": s.rounds_settled,
            "poolExhausted": s.reserve <= 0,
        }))
    }

    fn adjudicate(
        &self,
        state: &Value,
        agent_id: &str,
        action: &Value,
    ) -> Result<Adjudication, ScenarioError> {
        let mut s = RivalsState::parse(state)?;
        if !s.agents.iter().any(|a| a == agent_id) {
            return Err(ScenarioError::UnknownAgent(agent_id.to_string()));
        }

        let kind = action.get("type").and_then(Value::as_str);
        let claim = match kind {
            Some("wait") => 0,
            Some("claim") => {
                let Some(amount) = action.get("amount").and_then(Value::as_i64) else {
                    return Ok(Adjudication {
                        state: s.to_value()?,
                        valid: false,
                        feedback: json!({"error": "claim needs an integer amount"}),
                    });
                };
                if !(0..=MAX_CLAIM).contains(&amount) {
                    return Ok(Adjudication {
                        state: s.to_value()?,
                        valid: false,
                        feedback: json!({"error": format!("claim must be 0..={MAX_CLAIM}")}),
                    });
                }
                amount
            }
            _ => {
                return Ok(Adjudication {
                    state: s.to_value()?,
                    valid: false,
                    feedback: json!({"error": "unknown action type"}),
                });
            }
        };

        s.pending_claims.insert(agent_id.to_string(), claim);
        s.maybe_settle();
        Ok(Adjudication {
            state: s.to_value()?,
            valid: true,
            feedback: json!({"claimed": claim}),
        })
    }

    fn is_terminal(&self, state: &Value) -> bool {
        state
            .get("reserve")
            .and_then(Value::as_i64)
            .is_some_and(|r| r <= 0)
    }

    fn summarize(&self, state: &Value) -> Result<Value, ScenarioError> {
        let s = RivalsState::parse(state)?;
        Ok(json!({
            "totals": s.totals,
            "lastRoundClaims": s.last_round_claims,
            "roundsPlayed": s.rounds_settled,
        }))
    }

    fn score(&self, state: &Value) -> Result<BTreeMap<String, f64>, ScenarioError> {
        let s = RivalsState::parse(state)?;
        Ok(s.agents
            .iter()
            .map(|a| (a.clone(), s.totals.get(a).copied().unwrap_or(0) as f64))
            .collect())
    }

    fn reveal(&self, state: &Value) -> Option<Value> {
        let reserve = state.get("reserve")?.clone();
        Some(json!({"reserve": reserve}))
    }

    fn default_action(&self) -> Value {
        json!({"type": "wait"})
    }

    fn briefing(&self) -> Value {
        json!({
            "game": "Resource Rivals",
            "objective": "Claim from a shared pool of unknown size. If the \
                          round's combined claims exceed what is left, nobody \
                          is paid and the pool still drains.",
            "actions": [
                {"type": "claim", "amount": format!("0..={MAX_CLAIM}")},
                {"type": "wait"}
            ],
            "scoring": "Your paid-out total when the pool runs dry."
        })
    }

    fn hidden_keys(&self) -> &[&str] {
        &["reserve"]
    }

    fn action_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["type"],
            "oneOf": [
                {
                    "properties": {
                        "type": {"const": "claim"},
                        "amount": {"type": "integer", "minimum": 0, "maximum": MAX_CLAIM}
                    },
                    "required": ["type", "amount"],
                    "additionalProperties": false
                },
                {
                    "properties": {"type": {"const": "wait"}},
                    "required": ["type"],
                    "additionalProperties": false
                }
            ]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> Vec<String> {
        vec!["a".to_string(), "b".to_string()]
    }

    #[test]
    fn rounds_settle_when_everyone_has_claimed() {
        let scenario = ResourceRivalsScenario;
        let state = scenario.init(3, &ids()).unwrap();
        let after_a = scenario
            .adjudicate(&state, "a", &json!({"type": "claim", "amount": 4}))
            .unwrap();
        assert_eq!(after_a.state["roundsSettled"], 0);
        let after_b = scenario
            .adjudicate(&after_a.state, "b", &json!({"type": "claim", "amount": 2}))
            .unwrap();
        assert_eq!(after_b.state["roundsSettled"], 1);
        assert_eq!(after_b.state["totals"]["a"], 4);
        assert_eq!(after_b.state["totals"]["b"], 2);
    }

    #[test]
    fn overgrazing_pays_nobody_but_drains_the_pool() {
        let scenario = ResourceRivalsScenario;
        let mut state = scenario.init(3, &ids()).unwrap();
        state["reserve"] = json!(5);
        let after_a = scenario
            .adjudicate(&state, "a", &json!({"type": "claim", "amount": 10}))
            .unwrap();
        let after_b = scenario
            .adjudicate(&after_a.state, "b", &json!({"type": "claim", "amount": 10}))
            .unwrap();
        assert_eq!(after_b.state["totals"]["a"], 0);
        assert_eq!(after_b.state["totals"]["b"], 0);
        assert!(scenario.is_terminal(&after_b.state));
    }

    #[test]
    fn claims_above_the_cap_are_invalid() {
        let scenario = ResourceRivalsScenario;
        let state = scenario.init(3, &ids()).unwrap();
        let ruling = scenario
            .adjudicate(&state, "a", &json!({"type": "claim", "amount": 11}))
            .unwrap();
        assert!(!ruling.valid);
    }

    #[test]
    fn observation_and_summary_hide_the_reserve() {
        let scenario = ResourceRivalsScenario;
        let state = scenario.init(3, &ids()).unwrap();
        assert!(scenario.observe(&state, "a").unwrap().get("reserve").is_none());
        assert!(scenario.summarize(&state).unwrap().get("reserve").is_none());
    }
}
