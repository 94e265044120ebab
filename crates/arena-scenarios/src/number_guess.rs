// SPDX-License-Identifier: MIT OR Apache-2.0
//! Number-guess: find the hidden number before your rival does.
//!
//! The secret is drawn from the scenario seed at init and never leaves
//! the state except through `reveal`. Feedback is directional
//! (`higher`/`lower`/`correct`); the first correct guess ends the game.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use arena_core::DeterministicRng;
use arena_runtime::{Adjudication, Scenario, ScenarioError};

/// Inclusive lower bound of the secret.
const RANGE_MIN: i64 = 1;
/// Inclusive upper bound of the secret.
const RANGE_MAX: i64 = 100;

/// The number-guess rulebook.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberGuessScenario;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GuessState {
    secret_number: i64,
    agents: Vec<String>,
    guess_counts: BTreeMap<String, u32>,
    last_guess: BTreeMap<String, i64>,
    last_feedback: BTreeMap<String, String>,
    solved_by: Option<String>,
}

impl GuessState {
    fn parse(state: &Value) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_value(state.clone())?)
    }

    fn to_value(&self) -> Result<Value, ScenarioError> {
        Ok(serde_json::to_value(self)?)
    }
}

impl Scenario for NumberGuessScenario {
    fn name(&self) -> &str {
        "Number Guess"
    }

    fn key(&self) -> &str {
        "numberGuess"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn init(&self, scenario_seed: u32, agent_ids: &[String]) -> Result<Value, ScenarioError> {
        let mut rng = DeterministicRng::new(scenario_seed);
        let span = (RANGE_MAX - RANGE_MIN + 1) as usize;
        let secret_number = RANGE_MIN + rng.next_index(span) as i64;
        GuessState {
            secret_number,
            agents: agent_ids.to_vec(),
            guess_counts: agent_ids.iter().map(|a| (a.clone(), 0)).collect(),
            last_guess: BTreeMap::new(),
            last_feedback: BTreeMap::new(),
            solved_by: None,
        }
        .to_value()
    }

    fn observe(&self, state: &Value, agent_id: &str) -> Result<Value, ScenarioError> {
        let s = GuessState::parse(state)?;
        Ok(json!({
            "range": {"min": RANGE_MIN, "max": RANGE_MAX},
            "yourGuesses": s.guess_counts.get(agent_id).copied().unwrap_or(0),
            "lastGuess": s.last_guess.get(agent_id),
            "lastFeedback": s.last_feedback.get(agent_id),
            "solved": s.solved_by.is_some(),
        }))
    }

    fn adjudicate(
        &self,
        state: &Value,
        agent_id: &str,
        action: &Value,
    ) -> Result<Adjudication, ScenarioError> {
        let mut s = GuessState::parse(state)?;
        if !s.agents.iter().any(|a| a == agent_id) {
            return Err(ScenarioError::UnknownAgent(agent_id.to_string()));
        }

        let kind = action.get("type").and_then(Value::as_str);
        let adjudication = match kind {
            Some("wait") => Adjudication {
                state: s.to_value()?,
                valid: true,
                feedback: json!({"skipped": true}),
            },
            Some("guess") => {
                let Some(value) = action.get("value").and_then(Value::as_i64) else {
                    return Ok(Adjudication {
                        state: s.to_value()?,
                        valid: false,
                        feedback: json!({"error": "guess needs an integer value"}),
                    });
                };
                if !(RANGE_MIN..=RANGE_MAX).contains(&value) {
                    return Ok(Adjudication {
                        state: s.to_value()?,
                        valid: false,
                        feedback: json!({"error": "guess out of range"}),
                    });
                }
                *s.guess_counts.entry(agent_id.to_string()).or_insert(0) += 1;
                s.last_guess.insert(agent_id.to_string(), value);
                let result = match value.cmp(&s.secret_number) {
                    std::cmp::Ordering::Less => "higher",
                    std::cmp::Ordering::Greater => "lower",
                    std::cmp::Ordering::Equal => "correct",
                };
                s.last_feedback
                    .insert(agent_id.to_string(), result.to_string());
                if result == "correct" && s.solved_by.is_none() {
                    s.solved_by = Some(agent_id.to_string());
                }
                Adjudication {
                    state: s.to_value()?,
                    valid: true,
                    feedback: json!({"result": result}),
                }
            }
            _ => Adjudication {
                state: s.to_value()?,
                valid: false,
                feedback: json!({"error": "unknown action type"}),
            },
        };
        Ok(adjudication)
    }

    fn is_terminal(&self, state: &Value) -> bool {
        state
            .get("solvedBy")
            .is_some_and(|v| !v.is_null())
    }

    fn summarize(&self, state: &Value) -> Result<Value, ScenarioError> {
        let s = GuessState::parse(state)?;
        Ok(json!({
            "guessCounts": s.guess_counts,
            "solvedBy": s.solved_by,
        }))
    }

    fn score(&self, state: &Value) -> Result<BTreeMap<String, f64>, ScenarioError> {
        let s = GuessState::parse(state)?;
        Ok(s.agents
            .iter()
            .map(|a| {
                let score = if s.solved_by.as_deref() == Some(a.as_str()) {
                    let used = f64::from(s.guess_counts.get(a).copied().unwrap_or(1));
                    (100.0 - used).max(1.0)
                } else {
                    0.0
                };
                (a.clone(), score)
            })
            .collect())
    }

    fn reveal(&self, state: &Value) -> Option<Value> {
        let secret = state.get("secretNumber")?.clone();
        Some(json!({"secretNumber": secret}))
    }

    fn default_action(&self) -> Value {
        json!({"type": "wait"})
    }

    fn briefing(&self) -> Value {
        json!({
            "game": "Number Guess",
            "objective": format!(
                "Guess the hidden number between {RANGE_MIN} and {RANGE_MAX}. \
                 Feedback tells you whether the secret is higher or lower."
            ),
            "actions": [
                {"type": "guess", "value": "integer in range"},
                {"type": "wait"}
            ],
            "scoring": "First correct guess wins; fewer guesses score higher."
        })
    }

    fn hidden_keys(&self) -> &[&str] {
        &["secretNumber"]
    }

    fn action_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["type"],
            "oneOf": [
                {
                    "properties": {
                        "type": {"const": "guess"},
                        "value": {"type": "integer", "minimum": RANGE_MIN, "maximum": RANGE_MAX}
                    },
                    "required": ["type", "value"],
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
    fn init_is_deterministic_and_secret_in_range() {
        let s1 = NumberGuessScenario.init(42, &ids()).unwrap();
        let s2 = NumberGuessScenario.init(42, &ids()).unwrap();
        assert_eq!(s1, s2);
        let secret = s1["secretNumber"].as_i64().unwrap();
        assert!((RANGE_MIN..=RANGE_MAX).contains(&secret));
    }

    #[test]
    fn observation_never_contains_secret() {
        let state = NumberGuessScenario.init(42, &ids()).unwrap();
        let obs = NumberGuessScenario.observe(&state, "a").unwrap();
        assert!(obs.get("secretNumber").is_none());
    }

    #[test]
    fn directional_feedback_and_terminal_on_correct() {
        let scenario = NumberGuessScenario;
        let state = scenario.init(42, &ids()).unwrap();
        let secret = state["secretNumber"].as_i64().unwrap();

        let low_guess = json!({"type": "guess", "value": RANGE_MIN});
        let ruling = scenario.adjudicate(&state, "a", &low_guess).unwrap();
        assert!(ruling.valid);
        if secret > RANGE_MIN {
            assert_eq!(ruling.feedback["result"], "higher");
        }

        let exact = json!({"type": "guess", "value": secret});
        let ruling = scenario.adjudicate(&state, "a", &exact).unwrap();
        assert_eq!(ruling.feedback["result"], "correct");
        assert!(scenario.is_terminal(&ruling.state));
        let scores = scenario.score(&ruling.state).unwrap();
        assert!(scores["a"] > scores["b"]);
    }

    #[test]
    fn out_of_range_guess_is_invalid_but_not_an_error() {
        let scenario = NumberGuessScenario;
        let state = scenario.init(7, &ids()).unwrap();
        let ruling = scenario
            .adjudicate(&state, "a", &json!({"type": "guess", "value": 9999}))
            .unwrap();
        assert!(!ruling.valid);
    }

    #[test]
    fn summary_omits_hidden_keys() {
        let scenario = NumberGuessScenario;
        let state = scenario.init(7, &ids()).unwrap();
        let summary = scenario.summarize(&state).unwrap();
        for key in scenario.hidden_keys() {
            assert!(summary.get(*key).is_none());
        }
    }

    #[test]
    fn reveal_exposes_the_secret() {
        let scenario = NumberGuessScenario;
        let state = scenario.init(7, &ids()).unwrap();
        let revealed = scenario.reveal(&state).unwrap();
        assert!(revealed["secretNumber"].is_i64());
    }

    #[test]
    fn briefing_is_seed_independent() {
        assert_eq!(
            NumberGuessScenario.briefing(),
            NumberGuessScenario.briefing()
        );
    }
}
