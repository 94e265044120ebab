// SPDX-License-Identifier: MIT OR Apache-2.0
//! Round-robin tournament planning and execution.
//!
//! Every unordered pair of competitors plays once per round. Match
//! seeds derive from `(tournamentSeed, matchKey)` alone, so the plan is
//! reproducible without running anything. Matches run strictly
//! sequentially: the ordering of artifact writes is part of the
//! determinism contract.

use tracing::info;

use arena_core::derive_match_seed;

use crate::agent::Agent;
use crate::observer::MatchObserver;
use crate::registry::{AgentRegistry, ResolveError};
use crate::runner::{MatchConfig, MatchError, MatchResult, run_match};
use crate::scenario::Scenario;

/// Inputs to [`run_tournament`].
#[derive(Debug, Clone)]
pub struct TournamentConfig {
    /// Root seed every match seed derives from.
    pub tournament_seed: u32,
    /// Rounds of the full round-robin.
    pub rounds: u32,
    /// Turn limit per match.
    pub max_turns: u32,
    /// Per-agent-call deadline in milliseconds; 0 disables.
    pub max_turn_time_ms: u64,
    /// Consecutive timeouts that trigger a forfeit.
    pub max_consecutive_timeouts: u32,
    /// Agent registry keys, in registration order.
    pub agent_keys: Vec<String>,
    /// Mode profile recorded in manifests.
    pub mode_profile: Option<String>,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            tournament_seed: 0,
            rounds: 1,
            max_turns: 20,
            max_turn_time_ms: 0,
            max_consecutive_timeouts: 3,
            agent_keys: Vec::new(),
            mode_profile: None,
        }
    }
}

/// One seat in a planned match: registry key plus competitor id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    /// Agent registry key.
    pub agent_key: String,
    /// Stable competitor id (`{key}-{index}`).
    pub competitor_id: String,
}

/// One scheduled match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMatch {
    /// Tournament-local match key.
    pub match_key: String,
    /// Seed derived from the tournament seed and match key.
    pub seed: u32,
    /// 1-based round number.
    pub round: u32,
    /// Seat order, post swap. This is the authoritative agent order.
    pub seats: Vec<Seat>,
}

impl PlannedMatch {
    /// The competitor ids, in seat order.
    #[must_use]
    pub fn agent_ids(&self) -> Vec<String> {
        self.seats.iter().map(|s| s.competitor_id.clone()).collect()
    }
}

/// A planned match paired with its result.
#[derive(Debug)]
pub struct MatchRecord {
    /// The schedule entry.
    pub planned: PlannedMatch,
    /// The runner's output.
    pub result: MatchResult,
}

/// Output of [`run_tournament`], ready for the artifact writer.
#[derive(Debug)]
pub struct TournamentRun {
    /// The configuration the tournament ran under.
    pub config: TournamentConfig,
    /// Scenario display name.
    pub scenario_name: String,
    /// Competitor ids, in registration order.
    pub competitor_ids: Vec<String>,
    /// Every match, in schedule order.
    pub records: Vec<MatchRecord>,
}

/// Errors from tournament execution.
#[derive(Debug, thiserror::Error)]
pub enum TournamentError {
    /// Fewer than two agents were supplied.
    #[error("a tournament needs at least two agents")]
    NotEnoughAgents,
    /// An agent key did not resolve.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// A match failed at the harness level.
    #[error(transparent)]
    Match(#[from] MatchError),
}

/// Produce the deterministic schedule for a configuration.
///
/// For every unordered pair `(i, j)`, `i < j`, and every round `r`:
/// `matchKey = "RR:{A}-vs-{B}:round{r+1}"` (ids in index order), and
/// the seat order swaps when `(r + i + j) % 2 == 1` to remove
/// first-move bias across rounds.
#[must_use]
pub fn plan_round_robin(config: &TournamentConfig) -> Vec<PlannedMatch> {
    let competitors: Vec<Seat> = config
        .agent_keys
        .iter()
        .enumerate()
        .map(|(index, key)| Seat {
            agent_key: key.clone(),
            competitor_id: format!("{key}-{index}"),
        })
        .collect();

    let mut planned = Vec::new();
    for round in 0..config.rounds {
        for i in 0..competitors.len() {
            for j in (i + 1)..competitors.len() {
                let a = &competitors[i];
                let b = &competitors[j];
                let match_key = format!(
                    "RR:{}-vs-{}:round{}",
                    a.competitor_id,
                    b.competitor_id,
                    round + 1
                );
                let seed = derive_match_seed(config.tournament_seed, &match_key);
                let swap = (round as usize + i + j) % 2 == 1;
                let seats = if swap {
                    vec![b.clone(), a.clone()]
                } else {
                    vec![a.clone(), b.clone()]
                };
                planned.push(PlannedMatch {
                    match_key,
                    seed,
                    round: round + 1,
                    seats,
                });
            }
        }
    }
    planned
}

/// Run the full round-robin, delegating each match to the match runner.
///
/// # Errors
///
/// Returns [`TournamentError`] on unresolvable agents or harness-level
/// match failures. Individual agent misbehaviour is captured per match.
pub async fn run_tournament(
    scenario: &dyn Scenario,
    agents: &AgentRegistry,
    config: &TournamentConfig,
    observer: &dyn MatchObserver,
) -> Result<TournamentRun, TournamentError> {
    if config.agent_keys.len() < 2 {
        return Err(TournamentError::NotEnoughAgents);
    }

    let planned = plan_round_robin(config);
    info!(
        tournament_seed = config.tournament_seed,
        matches = planned.len(),
        scenario = scenario.key(),
        "tournament planned"
    );

    let mut records = Vec::with_capacity(planned.len());
    for plan in planned {
        let mut instances: Vec<Box<dyn Agent>> = Vec::with_capacity(plan.seats.len());
        for seat in &plan.seats {
            let factory = agents.get(&seat.agent_key)?;
            instances.push(factory.make(seat.competitor_id.clone()));
        }
        let match_config = MatchConfig {
            seed: plan.seed,
            max_turns: config.max_turns,
            match_id: None,
            provenance: None,
            mode_profile: config.mode_profile.clone(),
            division_config: None,
            max_turn_time_ms: config.max_turn_time_ms,
            max_consecutive_timeouts: config.max_consecutive_timeouts,
        };
        let result = run_match(scenario, instances, &match_config, observer).await?;
        info!(match_key = %plan.match_key, match_id = %result.match_id, "tournament match finished");
        records.push(MatchRecord {
            planned: plan,
            result,
        });
    }

    let competitor_ids = config
        .agent_keys
        .iter()
        .enumerate()
        .map(|(index, key)| format!("{key}-{index}"))
        .collect();

    Ok(TournamentRun {
        config: config.clone(),
        scenario_name: scenario.name().to_string(),
        competitor_ids,
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rounds: u32) -> TournamentConfig {
        TournamentConfig {
            tournament_seed: 101,
            rounds,
            max_turns: 20,
            agent_keys: vec!["random".into(), "baseline".into()],
            ..TournamentConfig::default()
        }
    }

    #[test]
    fn plan_is_deterministic() {
        assert_eq!(plan_round_robin(&config(2)), plan_round_robin(&config(2)));
    }

    #[test]
    fn match_keys_use_index_order_regardless_of_swap() {
        let plan = plan_round_robin(&config(2));
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].match_key, "RR:random-0-vs-baseline-1:round1");
        assert_eq!(plan[1].match_key, "RR:random-0-vs-baseline-1:round2");
    }

    #[test]
    fn seat_order_swaps_between_rounds() {
        let plan = plan_round_robin(&config(2));
        // Pair (0, 1): round 0 -> swap ((0 + 0 + 1) % 2 == 1), round 1 -> no swap.
        assert_eq!(plan[0].agent_ids(), vec!["baseline-1", "random-0"]);
        assert_eq!(plan[1].agent_ids(), vec!["random-0", "baseline-1"]);
    }

    #[test]
    fn seeds_come_from_the_match_key() {
        let plan = plan_round_robin(&config(1));
        assert_eq!(
            plan[0].seed,
            derive_match_seed(101, "RR:random-0-vs-baseline-1:round1")
        );
    }

    #[test]
    fn three_agents_play_all_pairs() {
        let cfg = TournamentConfig {
            agent_keys: vec!["a".into(), "b".into(), "c".into()],
            ..config(1)
        };
        let plan = plan_round_robin(&cfg);
        assert_eq!(plan.len(), 3);
        let keys: Vec<&str> = plan.iter().map(|p| p.match_key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "RR:a-0-vs-b-1:round1",
                "RR:a-0-vs-c-2:round1",
                "RR:b-1-vs-c-2:round1"
            ]
        );
    }
}
