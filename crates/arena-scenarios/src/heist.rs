// SPDX-License-Identifier: MIT OR Apache-2.0
//! Heist: a solo dungeon crawl against the clock.
//!
//! Five rooms in a corridor; a keycard and a gem are hidden along the
//! way, and the vault at the end holds the treasure. The vault only
//! opens for a keycard holder. Item placement comes from the scenario
//! seed and stays hidden until the agent stands in the right room.
//!
//! With two agents the runner plays this competitively: two
//! independent solos over the same layout, merged into one record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use arena_core::DeterministicRng;
use arena_runtime::{Adjudication, Scenario, ScenarioError};

/// Corridor layout, entrance first. The last room is the vault.
const ROOMS: [&str; 5] = ["room-1", "room-2", "room-3", "room-4", "vault"];

/// The treasure waiting in the vault.
const TREASURE: &str = "treasure-1";
/// Opens the vault.
const KEYCARD: &str = "keycard-1";
/// Optional loot along the corridor.
const GEM: &str = "gem-1";

fn item_value(item: &str) -> f64 {
    match item {
        TREASURE => 100.0,
        GEM => 40.0,
        KEYCARD => 5.0,
        _ => 0.0,
    }
}

/// The heist rulebook.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeistScenario;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeistState {
    agents: Vec<String>,
    /// Current room per agent.
    positions: BTreeMap<String, String>,
    /// Items held per agent.
    inventories: BTreeMap<String, Vec<String>>,
    /// Remaining item placements. Hidden.
    item_locations: BTreeMap<String, String>,
    /// Set once the treasure has been taken.
    treasure_taken: bool,
}

impl HeistState {
    fn parse(state: &Value) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_value(state.clone())?)
    }

    fn to_value(&self) -> Result<Value, ScenarioError> {
        Ok(serde_json::to_value(self)?)
    }

    fn holds(&self, agent_id: &str, item: &str) -> bool {
        self.inventories
            .get(agent_id)
            .is_some_and(|inv| inv.iter().any(|i| i == item))
    }
}

fn room_index(room: &str) -> Option<usize> {
    ROOMS.iter().position(|r| *r == room)
}

fn exits(room: &str) -> Vec<&'static str> {
    let Some(idx) = room_index(room) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    if idx > 0 {
        out.push(ROOMS[idx - 1]);
    }
    if idx + 1 < ROOMS.len() {
        out.push(ROOMS[idx + 1]);
    }
    out
}

impl Scenario for HeistScenario {
    fn name(&self) -> &str {
        "Heist"
    }

    fn key(&self) -> &str {
        "heist"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn init(&self, scenario_seed: u32, agent_ids: &[String]) -> Result<Value, ScenarioError> {
        let mut rng = DeterministicRng::new(scenario_seed);
        // Keycard somewhere mid-corridor, gem anywhere before the vault.
        let keycard_room = ROOMS[1 + rng.next_index(3)];
        let gem_room = ROOMS[rng.next_index(4)];

        let mut item_locations = BTreeMap::new();
        item_locations.insert(KEYCARD.to_string(), keycard_room.to_string());
        item_locations.insert(GEM.to_string(), gem_room.to_string());
        item_locations.insert(TREASURE.to_string(), "vault".to_string());

        HeistState {
            agents: agent_ids.to_vec(),
            positions: agent_ids
                .iter()
                .map(|a| (a.clone(), ROOMS[0].to_string()))
                .collect(),
            inventories: agent_ids.iter().map(|a| (a.clone(), Vec::new())).collect(),
            item_locations,
            treasure_taken: false,
        }
        .to_value()
    }

    fn observe(&self, state: &Value, agent_id: &str) -> Result<Value, ScenarioError> {
        let s = HeistState::parse(state)?;
        let room = s
            .positions
            .get(agent_id)
            .cloned()
            .ok_or_else(|| ScenarioError::UnknownAgent(agent_id.to_string()))?;
        let visible: Vec<&String> = s
            .item_locations
            .iter()
            .filter(|(_, loc)| **loc == room)
            .map(|(item, _)| item)
            .collect();
        Ok(json!({
            "room": room,
            "exits": exits(&room),
            "visibleItems": visible,
            "inventory": s.inventories.get(agent_id),
            "treasureTaken": s.treasure_taken,
        }))
    }

    fn adjudicate(
        &self,
        state: &Value,
        agent_id: &str,
        action: &Value,
    ) -> Result<Adjudication, ScenarioError> {
        let mut s = HeistState::parse(state)?;
        let Some(room) = s.positions.get(agent_id).cloned() else {
            return Err(ScenarioError::UnknownAgent(agent_id.to_string()));
        };

        let kind = action.get("type").and_then(Value::as_str);
        let adjudication = match kind {
            Some("wait") => Adjudication {
                state: s.to_value()?,
                valid: true,
                feedback: json!({"waited": true}),
            },
            Some("move") => {
                let target = action
                    .get("toRoomId")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                if !exits(&room).iter().any(|e| *e == target) {
                    return Ok(Adjudication {
                        state: s.to_value()?,
                        valid: false,
                        feedback: json!({"error": format!("no exit from {room} to {target}")}),
                    });
                }
                if target == "vault" && !s.holds(agent_id, KEYCARD) {
                    return Ok(Adjudication {
                        state: s.to_value()?,
                        valid: false,
                        feedback: json!({"error": "the vault door needs a keycard"}),
                    });
                }
                s.positions.insert(agent_id.to_string(), target.clone());
                Adjudication {
                    state: s.to_value()?,
                    valid: true,
                    feedback: json!({"movedTo": target}),
                }
            }
            Some("pickup") => {
                let item = action
                    .get("itemId")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                if s.item_locations.get(&item).map(String::as_str) != Some(room.as_str()) {
                    return Ok(Adjudication {
                        state: s.to_value()?,
                        valid: false,
                        feedback: json!({"error": format!("{item} is not here")}),
                    });
                }
                s.item_locations.remove(&item);
                if let Some(inv) = s.inventories.get_mut(agent_id) {
                    inv.push(item.clone());
                }
                if item == TREASURE {
                    s.treasure_taken = true;
                }
                Adjudication {
                    state: s.to_value()?,
                    valid: true,
                    feedback: json!({"pickedUp": item}),
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
            .get("treasureTaken")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    fn summarize(&self, state: &Value) -> Result<Value, ScenarioError> {
        let s = HeistState::parse(state)?;
        Ok(json!({
            "positions": s.positions,
            "inventories": s.inventories,
            "treasureTaken": s.treasure_taken,
        }))
    }

    fn score(&self, state: &Value) -> Result<BTreeMap<String, f64>, ScenarioError> {
        let s = HeistState::parse(state)?;
        Ok(s.agents
            .iter()
            .map(|a| {
                let loot: f64 = s
                    .inventories
                    .get(a)
                    .map(|inv| inv.iter().map(|i| item_value(i)).sum())
                    .unwrap_or(0.0);
                (a.clone(), loot)
            })
            .collect())
    }

    fn reveal(&self, state: &Value) -> Option<Value> {
        let locations = state.get("itemLocations")?.clone();
        Some(json!({"itemLocations": locations}))
    }

    fn default_action(&self) -> Value {
        json!({"type": "wait"})
    }

    fn briefing(&self) -> Value {
        json!({
            "game": "Heist",
            "objective": "Work down the corridor, find the keycard, open the \
                          vault, and take the treasure. Loot adds to your score.",
            "rooms": ROOMS,
            "actions": [
                {"type": "move", "toRoomId": "an adjacent room"},
                {"type": "pickup", "itemId": "an item in your room"},
                {"type": "wait"}
            ],
            "scoring": "Sum of the value of everything you hold at the end."
        })
    }

    fn hidden_keys(&self) -> &[&str] {
        &["itemLocations"]
    }

    fn action_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["type"],
            "oneOf": [
                {
                    "properties": {
                        "type": {"const": "move"},
                        "toRoomId": {"type": "string"}
                    },
                    "required": ["type", "toRoomId"],
                    "additionalProperties": false
                },
                {
                    "properties": {
                        "type": {"const": "pickup"},
                        "itemId": {"type": "string"}
                    },
                    "required": ["type", "itemId"],
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

    fn solo() -> Vec<String> {
        vec!["a".to_string()]
    }

    #[test]
    fn layout_is_seed_deterministic() {
        let s1 = HeistScenario.init(9, &solo()).unwrap();
        let s2 = HeistScenario.init(9, &solo()).unwrap();
        assert_eq!(s1, s2);
        assert_ne!(
            s1["itemLocations"],
            HeistScenario.init(10, &solo()).unwrap()["itemLocations"]
        );
    }

    #[test]
    fn vault_requires_keycard() {
        let scenario = HeistScenario;
        let mut state = scenario.init(1, &solo()).unwrap();
        // Walk to room-4 by force.
        state["positions"]["a"] = json!("room-4");
        let ruling = scenario
            .adjudicate(&state, "a", &json!({"type": "move", "toRoomId": "vault"}))
            .unwrap();
        assert!(!ruling.valid);
    }

    #[test]
    fn pickup_and_treasure_terminal() {
        let scenario = HeistScenario;
        let mut state = scenario.init(1, &solo()).unwrap();
        state["positions"]["a"] = json!("vault");
        state["inventories"]["a"] = json!([KEYCARD]);
        let ruling = scenario
            .adjudicate(&state, "a", &json!({"type": "pickup", "itemId": TREASURE}))
            .unwrap();
        assert!(ruling.valid);
        assert!(scenario.is_terminal(&ruling.state));
        let scores = scenario.score(&ruling.state).unwrap();
        assert!(scores["a"] >= 100.0);
    }

    #[test]
    fn moving_between_adjacent_rooms_works() {
        let scenario = HeistScenario;
        let state = scenario.init(1, &solo()).unwrap();
        let ruling = scenario
            .adjudicate(&state, "a", &json!({"type": "move", "toRoomId": "room-2"}))
            .unwrap();
        assert!(ruling.valid);
        assert_eq!(ruling.state["positions"]["a"], "room-2");

        let ruling = scenario
            .adjudicate(&state, "a", &json!({"type": "move", "toRoomId": "room-4"}))
            .unwrap();
        assert!(!ruling.valid);
    }

    #[test]
    fn summary_hides_item_locations() {
        let scenario = HeistScenario;
        let state = scenario.init(1, &solo()).unwrap();
        let summary = scenario.summarize(&state).unwrap();
        assert!(summary.get("itemLocations").is_none());
    }

    #[test]
    fn default_action_is_wait() {
        assert_eq!(HeistScenario.default_action(), json!({"type": "wait"}));
    }
}
