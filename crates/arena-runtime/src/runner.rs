// SPDX-License-Identifier: MIT OR Apache-2.0
//! The match runner.
//!
//! A single-threaded cooperative turn loop: turns proceed sequentially,
//! agent calls may suspend but never interleave with other turns, and
//! `seq` is assigned at emission time. Reruns with the same
//! `(seed, agent order, scenario version)` are byte-identical because
//! every stream of randomness is derived here, in a fixed order:
//! match id first, then one seed per agent in supplied order, then the
//! scenario seed.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use arena_core::{DeterministicRng, MatchEndReason, MatchEvent, MatchEventKind};
use arena_decode::{CompiledSchema, DecodeLimits, DecodeOutcome, SchemaError, decode_action};

use crate::agent::{Agent, AgentContext, AgentKind, AgentReply, AgentSetup};
use crate::observer::{MatchObserver, NullObserver};
use crate::scenario::{Scenario, ScenarioError};

/// Optional provenance stamped into `MatchStarted`.
#[derive(Debug, Clone, Default)]
pub struct Provenance {
    /// Engine git commit.
    pub engine_commit: Option<String>,
    /// Engine version string.
    pub engine_version: Option<String>,
}

/// Inputs to [`run_match`].
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// The match seed; root of the derivation tree.
    pub seed: u32,
    /// Turn limit.
    pub max_turns: u32,
    /// Override for the generated match id. The id generation still
    /// consumes its RNG outputs so agent seeds do not shift.
    pub match_id: Option<String>,
    /// Provenance stamped into `MatchStarted` when present.
    pub provenance: Option<Provenance>,
    /// Mode profile recorded in manifests.
    pub mode_profile: Option<String>,
    /// Opaque division configuration recorded in manifests.
    pub division_config: Option<Value>,
    /// Per-agent-call deadline in milliseconds; 0 disables the race.
    pub max_turn_time_ms: u64,
    /// Consecutive timeouts that trigger a forfeit; 0 disables.
    pub max_consecutive_timeouts: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            max_turns: 20,
            match_id: None,
            provenance: None,
            mode_profile: None,
            division_config: None,
            max_turn_time_ms: 0,
            max_consecutive_timeouts: 3,
        }
    }
}

/// Everything the artifact layer needs about a finished match.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// The match id shared by every event.
    pub match_id: String,
    /// The match seed.
    pub seed: u32,
    /// Final scores (forfeit adjustment applied).
    pub scores: BTreeMap<String, f64>,
    /// The totally ordered event stream.
    pub events: Vec<MatchEvent>,
    /// Turns played.
    pub turns: u32,
    /// Why the match ended.
    pub reason: MatchEndReason,
    /// The timeout configuration the match ran under.
    pub max_turn_time_ms: u64,
    /// Timeout count per agent.
    pub timeouts_per_agent: BTreeMap<String, u32>,
    /// Agent that forfeited, if any.
    pub forfeited_by: Option<String>,
    /// Failure annotations for the summary.
    pub failure_modes: Vec<String>,
    /// Setup failure message when `reason` is `setupFailed`.
    pub setup_error: Option<String>,
}

/// Fatal errors from [`run_match`].
///
/// Timeouts, agent exceptions, and decode failures are *not* errors;
/// they are recorded in the event stream and the match continues.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// No agents were supplied.
    #[error("a match needs at least one agent")]
    NoAgents,
    /// The scenario could not read state it produced.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    /// The scenario's action schema failed to compile.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Run one match to completion.
///
/// When the scenario is `Heist` and exactly two agents are supplied,
/// the runner executes two independent solo runs and merges them into
/// one record (competitive mode); otherwise all agents share one board.
///
/// # Errors
///
/// Returns [`MatchError`] for harness-level failures only. Agent
/// misbehaviour and preflight failures are captured in the result.
pub async fn run_match(
    scenario: &dyn Scenario,
    agents: Vec<Box<dyn Agent>>,
    config: &MatchConfig,
    observer: &dyn MatchObserver,
) -> Result<MatchResult, MatchError> {
    if agents.is_empty() {
        return Err(MatchError::NoAgents);
    }
    if scenario.name() == "Heist" && agents.len() == 2 {
        return run_competitive(scenario, agents, config, observer).await;
    }

    let mut master = DeterministicRng::new(config.seed);
    let generated = master.generate_match_id();
    let match_id = config.match_id.clone().unwrap_or(generated);
    let agent_seeds: Vec<u32> = agents.iter().map(|_| master.derive_seed()).collect();
    let scenario_seed = master.derive_seed();

    run_solo(
        scenario,
        agents,
        config,
        observer,
        match_id,
        agent_seeds,
        scenario_seed,
    )
    .await
}

/// Dense-`seq` event accumulator.
struct EventLog {
    match_id: String,
    events: Vec<MatchEvent>,
}

impl EventLog {
    fn new(match_id: String) -> Self {
        Self {
            match_id,
            events: Vec::new(),
        }
    }

    fn emit(&mut self, kind: MatchEventKind) {
        let seq = self.events.len() as u64;
        self.events.push(MatchEvent {
            seq,
            match_id: self.match_id.clone(),
            kind,
        });
    }
}

/// Outcome of one raced agent call.
enum AgentCall {
    Reply(AgentReply),
    Timeout,
    Failed(String),
}

#[allow(clippy::too_many_lines)]
async fn run_solo(
    scenario: &dyn Scenario,
    mut agents: Vec<Box<dyn Agent>>,
    config: &MatchConfig,
    observer: &dyn MatchObserver,
    match_id: String,
    agent_seeds: Vec<u32>,
    scenario_seed: u32,
) -> Result<MatchResult, MatchError> {
    let agent_ids: Vec<String> = agents.iter().map(|a| a.id().to_string()).collect();
    let schema = CompiledSchema::compile(&scenario.action_schema())?;
    let limits = DecodeLimits::default();

    // Preflight: agent init, then scenario init.
    for (agent, seed) in agents.iter_mut().zip(&agent_seeds) {
        let setup = AgentSetup {
            agent_id: agent.id().to_string(),
            seed: *seed,
        };
        if let Err(e) = agent.init(&setup) {
            let message = format!("agent `{}` failed to initialise: {e:#}", setup.agent_id);
            return Ok(setup_failed(
                &match_id, config, &agent_ids, message, observer,
            ));
        }
    }
    let mut state = match scenario.init(scenario_seed, &agent_ids) {
        Ok(state) => state,
        Err(e) => {
            let message = format!("scenario `{}` failed to initialise: {e}", scenario.key());
            return Ok(setup_failed(
                &match_id, config, &agent_ids, message, observer,
            ));
        }
    };

    let mut log = EventLog::new(match_id.clone());
    log.emit(MatchEventKind::MatchStarted {
        seed: config.seed,
        agent_ids: agent_ids.clone(),
        scenario_name: scenario.name().to_string(),
        max_turns: config.max_turns,
        engine_commit: config
            .provenance
            .as_ref()
            .and_then(|p| p.engine_commit.clone()),
        engine_version: config
            .provenance
            .as_ref()
            .and_then(|p| p.engine_version.clone()),
    });
    observer.match_started(&match_id);
    info!(
        match_id = %match_id,
        seed = config.seed,
        scenario = scenario.key(),
        agents = agent_ids.len(),
        "match started"
    );

    let mut rngs: Vec<DeterministicRng> =
        agent_seeds.iter().map(|s| DeterministicRng::new(*s)).collect();
    let mut timeouts_per_agent: BTreeMap<String, u32> =
        agent_ids.iter().map(|id| (id.clone(), 0)).collect();
    let mut consecutive_timeouts = vec![0u32; agents.len()];
    let mut forfeited_by: Option<String> = None;
    let mut failure_modes: Vec<String> = Vec::new();
    let mut turns = 0u32;

    'outer: while turns < config.max_turns && !scenario.is_terminal(&state) {
        turns += 1;
        log.emit(MatchEventKind::TurnStarted { turn: turns });
        observer.turn_started(&match_id, turns);
        debug!(match_id = %match_id, turn = turns, "turn started");

        for idx in 0..agents.len() {
            if scenario.is_terminal(&state) {
                break;
            }
            let agent_id = agent_ids[idx].clone();
            let is_text = agents[idx].kind() == AgentKind::Llm;

            let mut observation = scenario.observe(&state, &agent_id)?;
            if turns == 1
                && let Value::Object(map) = &mut observation
            {
                map.insert("gameRules".to_string(), scenario.briefing());
            }
            log.emit(MatchEventKind::ObservationEmitted {
                agent_id: agent_id.clone(),
                turn: turns,
                observation: observation.clone(),
            });

            let call = {
                let mut ctx = AgentContext {
                    rng: &mut rngs[idx],
                    turn: turns,
                    agent_id: &agent_id,
                };
                let fut = agents[idx].act(&observation, &mut ctx);
                if config.max_turn_time_ms > 0 {
                    match tokio::time::timeout(
                        Duration::from_millis(config.max_turn_time_ms),
                        fut,
                    )
                    .await
                    {
                        Ok(Ok(reply)) => AgentCall::Reply(reply),
                        Ok(Err(e)) => AgentCall::Failed(format!("{e:#}")),
                        Err(_) => AgentCall::Timeout,
                    }
                } else {
                    match fut.await {
                        Ok(reply) => AgentCall::Reply(reply),
                        Err(e) => AgentCall::Failed(format!("{e:#}")),
                    }
                }
            };

            // Resolve the call into an action plus optional forensics.
            let (action, forensics): (Value, Option<DecodeOutcome>) = match call {
                AgentCall::Timeout => {
                    warn!(match_id = %match_id, agent = %agent_id, turn = turns, "agent timed out");
                    log.emit(MatchEventKind::AgentError {
                        agent_id: agent_id.clone(),
                        turn: turns,
                        message: format!(
                            "agent `{agent_id}` exceeded {} ms",
                            config.max_turn_time_ms
                        ),
                        error_type: Some("timeout".to_string()),
                    });
                    if let Some(count) = timeouts_per_agent.get_mut(&agent_id) {
                        *count += 1;
                    }
                    consecutive_timeouts[idx] += 1;
                    note(&mut failure_modes, format!("timeout:{agent_id}"));
                    (scenario.default_action(), None)
                }
                AgentCall::Failed(message) => {
                    warn!(match_id = %match_id, agent = %agent_id, turn = turns, %message, "agent call failed");
                    log.emit(MatchEventKind::AgentError {
                        agent_id: agent_id.clone(),
                        turn: turns,
                        message,
                        error_type: None,
                    });
                    consecutive_timeouts[idx] = 0;
                    note(&mut failure_modes, format!("agent-error:{agent_id}"));
                    // No action this turn; state does not advance.
                    continue;
                }
                AgentCall::Reply(reply) => {
                    consecutive_timeouts[idx] = 0;
                    match reply {
                        AgentReply::Action(action) => (action, None),
                        AgentReply::Text(raw) => {
                            let outcome = decode_action(
                                &raw,
                                &schema,
                                &scenario.default_action(),
                                &limits,
                            );
                            log.emit(MatchEventKind::AgentRawOutput {
                                agent_id: agent_id.clone(),
                                turn: turns,
                                raw_sha256: outcome.raw_sha256.clone(),
                                raw_bytes: outcome.raw_bytes,
                                truncated: outcome.truncated,
                                private: Some(json!({ "raw": outcome.raw_preview })),
                            });
                            if !outcome.ok {
                                note(&mut failure_modes, format!("decoder-fallback:{agent_id}"));
                            }
                            (outcome.action.clone(), Some(outcome))
                        }
                    }
                }
            };

            // Forensic fields echoed into the submission and ruling.
            let timed_out = consecutive_timeouts[idx] > 0;
            let method = forensics.as_ref().map_or_else(
                || timed_out.then(|| "fallback".to_string()),
                |f| {
                    Some(
                        f.method
                            .map_or("fallback", |m| m.as_str())
                            .to_string(),
                    )
                },
            );
            let adjudication_path = if let Some(f) = &forensics {
                Some(if f.ok { "text+tolerant_decode" } else { "fallback" }.to_string())
            } else if is_text {
                Some(if timed_out { "fallback" } else { "structured" }.to_string())
            } else if timed_out {
                Some("fallback".to_string())
            } else {
                None
            };
            let fallback_reason = forensics
                .as_ref()
                .and_then(|f| f.fallback_reason)
                .map(|r| r.as_str().to_string());
            let candidate_action = forensics.as_ref().and_then(|f| f.candidate_action.clone());
            let warnings = forensics
                .as_ref()
                .map(|f| f.warnings.clone())
                .filter(|w| !w.is_empty());
            let errors = forensics
                .as_ref()
                .map(|f| f.errors.clone())
                .filter(|e| !e.is_empty());

            log.emit(MatchEventKind::ActionSubmitted {
                agent_id: agent_id.clone(),
                turn: turns,
                action: action.clone(),
                method: method.clone(),
                adjudication_path: adjudication_path.clone(),
            });

            let ruling = scenario.adjudicate(&state, &agent_id, &action)?;
            log.emit(MatchEventKind::ActionAdjudicated {
                agent_id: agent_id.clone(),
                turn: turns,
                valid: ruling.valid,
                feedback: ruling.feedback.clone(),
                method,
                fallback_reason: fallback_reason.clone(),
                chosen_action: forensics.as_ref().map(|_| action.clone()),
                candidate_action: candidate_action.clone(),
                adjudication_path,
                warnings,
                errors,
            });
            if !ruling.valid && fallback_reason.is_some() {
                log.emit(MatchEventKind::InvalidAction {
                    agent_id: agent_id.clone(),
                    turn: turns,
                    reason: fallback_reason.unwrap_or_else(|| "invalid".to_string()),
                    attempted_action: candidate_action.unwrap_or_else(|| action.clone()),
                });
            }
            state = ruling.state;

            if config.max_consecutive_timeouts > 0
                && consecutive_timeouts[idx] >= config.max_consecutive_timeouts
            {
                forfeited_by = Some(agent_id.clone());
                warn!(match_id = %match_id, agent = %agent_id, "forfeit: consecutive timeout limit reached");
                break;
            }
        }

        let summary = scenario.summarize(&state)?;
        log.emit(MatchEventKind::StateUpdated {
            turn: turns,
            summary,
        });

        if forfeited_by.is_some() {
            break 'outer;
        }
    }

    let mut scores = scenario.score(&state)?;
    apply_forfeit_adjustment(&mut scores, forfeited_by.as_deref());
    let reason = if forfeited_by.is_some() {
        MatchEndReason::AgentForfeited
    } else if scenario.is_terminal(&state) {
        MatchEndReason::Completed
    } else {
        MatchEndReason::MaxTurnsReached
    };
    let details = scenario
        .reveal(&state)
        .map(|hidden| json!({ "_private": hidden }));

    log.emit(MatchEventKind::MatchEnded {
        reason,
        scores: scores.clone(),
        turns,
        details,
    });
    observer.match_ended(&match_id, reason);
    info!(match_id = %match_id, ?reason, turns, "match ended");

    Ok(MatchResult {
        match_id,
        seed: config.seed,
        scores,
        events: log.events,
        turns,
        reason,
        max_turn_time_ms: config.max_turn_time_ms,
        timeouts_per_agent,
        forfeited_by,
        failure_modes,
        setup_error: None,
    })
}

/// Heist competitive mode: two independent solo runs, one record.
///
/// Both solos share the generated match id and the scenario seed (same
/// dungeon), each agent keeps its own derived stream, and the merged
/// stream is re-`seq`ed densely. A pure function of the two solo
/// results.
async fn run_competitive(
    scenario: &dyn Scenario,
    mut agents: Vec<Box<dyn Agent>>,
    config: &MatchConfig,
    observer: &dyn MatchObserver,
) -> Result<MatchResult, MatchError> {
    let mut master = DeterministicRng::new(config.seed);
    let generated = master.generate_match_id();
    let match_id = config.match_id.clone().unwrap_or(generated);
    let seed_a = master.derive_seed();
    let seed_b = master.derive_seed();
    let scenario_seed = master.derive_seed();

    // Supplied order is authoritative: A runs first.
    let agent_b = agents.pop().ok_or(MatchError::NoAgents)?;
    let agent_a = agents.pop().ok_or(MatchError::NoAgents)?;

    observer.match_started(&match_id);
    let solo_a = run_solo(
        scenario,
        vec![agent_a],
        config,
        &NullObserver,
        match_id.clone(),
        vec![seed_a],
        scenario_seed,
    )
    .await?;
    let solo_b = run_solo(
        scenario,
        vec![agent_b],
        config,
        &NullObserver,
        match_id.clone(),
        vec![seed_b],
        scenario_seed,
    )
    .await?;

    let result = merge_competitive(scenario, config, &match_id, solo_a, solo_b);
    observer.match_ended(&match_id, result.reason);
    Ok(result)
}

fn merge_competitive(
    scenario: &dyn Scenario,
    config: &MatchConfig,
    match_id: &str,
    solo_a: MatchResult,
    solo_b: MatchResult,
) -> MatchResult {
    let agent_ids: Vec<String> = solo_a
        .timeouts_per_agent
        .keys()
        .chain(solo_b.timeouts_per_agent.keys())
        .cloned()
        .collect();

    if solo_a.reason == MatchEndReason::SetupFailed || solo_b.reason == MatchEndReason::SetupFailed
    {
        let message = solo_a
            .setup_error
            .or(solo_b.setup_error)
            .unwrap_or_else(|| "solo run setup failed".to_string());
        let mut log = EventLog::new(match_id.to_string());
        log.emit(MatchEventKind::MatchSetupFailed {
            message: message.clone(),
            details: None,
        });
        let scores: BTreeMap<String, f64> =
            agent_ids.iter().map(|id| (id.clone(), 0.0)).collect();
        log.emit(MatchEventKind::MatchEnded {
            reason: MatchEndReason::SetupFailed,
            scores: scores.clone(),
            turns: 0,
            details: None,
        });
        return MatchResult {
            match_id: match_id.to_string(),
            seed: config.seed,
            scores,
            events: log.events,
            turns: 0,
            reason: MatchEndReason::SetupFailed,
            max_turn_time_ms: config.max_turn_time_ms,
            timeouts_per_agent: agent_ids.iter().map(|id| (id.clone(), 0)).collect(),
            forfeited_by: None,
            failure_modes: Vec::new(),
            setup_error: Some(message),
        };
    }

    let mut log = EventLog::new(match_id.to_string());
    log.emit(MatchEventKind::MatchStarted {
        seed: config.seed,
        agent_ids: agent_ids.clone(),
        scenario_name: scenario.name().to_string(),
        max_turns: config.max_turns,
        engine_commit: config
            .provenance
            .as_ref()
            .and_then(|p| p.engine_commit.clone()),
        engine_version: config
            .provenance
            .as_ref()
            .and_then(|p| p.engine_version.clone()),
    });

    let mut private_details = serde_json::Map::new();
    for solo in [&solo_a, &solo_b] {
        let body_end = solo.events.len().saturating_sub(1);
        for event in &solo.events[1..body_end] {
            log.emit(event.kind.clone());
        }
        if let Some(MatchEvent {
            kind: MatchEventKind::MatchEnded {
                details: Some(details),
                ..
            },
            ..
        }) = solo.events.last()
            && let Some(private) = details.get("_private")
            && let Some(id) = solo.timeouts_per_agent.keys().next()
        {
            private_details.insert(id.clone(), private.clone());
        }
    }

    let mut scores: BTreeMap<String, f64> = BTreeMap::new();
    scores.extend(solo_a.scores.clone());
    scores.extend(solo_b.scores.clone());
    let forfeited_by = solo_a.forfeited_by.clone().or(solo_b.forfeited_by.clone());
    apply_forfeit_adjustment(&mut scores, forfeited_by.as_deref());

    let turns = solo_a.turns.max(solo_b.turns);
    let reason = if forfeited_by.is_some() {
        MatchEndReason::AgentForfeited
    } else if solo_a.reason == MatchEndReason::Completed
        && solo_b.reason == MatchEndReason::Completed
    {
        MatchEndReason::Completed
    } else {
        MatchEndReason::MaxTurnsReached
    };
    let details = if private_details.is_empty() {
        None
    } else {
        Some(json!({ "_private": Value::Object(private_details) }))
    };

    log.emit(MatchEventKind::MatchEnded {
        reason,
        scores: scores.clone(),
        turns,
        details,
    });

    let mut timeouts_per_agent = solo_a.timeouts_per_agent.clone();
    timeouts_per_agent.extend(solo_b.timeouts_per_agent.clone());
    let mut failure_modes = solo_a.failure_modes.clone();
    for mode in solo_b.failure_modes {
        note(&mut failure_modes, mode);
    }

    MatchResult {
        match_id: match_id.to_string(),
        seed: config.seed,
        scores,
        events: log.events,
        turns,
        reason,
        max_turn_time_ms: config.max_turn_time_ms,
        timeouts_per_agent,
        forfeited_by,
        failure_modes,
        setup_error: None,
    }
}

/// Build the two-event log for a preflight failure.
fn setup_failed(
    match_id: &str,
    config: &MatchConfig,
    agent_ids: &[String],
    message: String,
    observer: &dyn MatchObserver,
) -> MatchResult {
    warn!(match_id = %match_id, %message, "match setup failed");
    let mut log = EventLog::new(match_id.to_string());
    log.emit(MatchEventKind::MatchSetupFailed {
        message: message.clone(),
        details: None,
    });
    let scores: BTreeMap<String, f64> = agent_ids.iter().map(|id| (id.clone(), 0.0)).collect();
    log.emit(MatchEventKind::MatchEnded {
        reason: MatchEndReason::SetupFailed,
        scores: scores.clone(),
        turns: 0,
        details: None,
    });
    observer.match_ended(match_id, MatchEndReason::SetupFailed);
    MatchResult {
        match_id: match_id.to_string(),
        seed: config.seed,
        scores,
        events: log.events,
        turns: 0,
        reason: MatchEndReason::SetupFailed,
        max_turn_time_ms: config.max_turn_time_ms,
        timeouts_per_agent: agent_ids.iter().map(|id| (id.clone(), 0)).collect(),
        forfeited_by: None,
        failure_modes: Vec::new(),
        setup_error: Some(message),
    }
}

/// Lift every non-forfeiting agent at or below the forfeiter's score.
fn apply_forfeit_adjustment(scores: &mut BTreeMap<String, f64>, forfeited_by: Option<&str>) {
    let Some(forfeiter) = forfeited_by else {
        return;
    };
    let forfeit_score = scores.get(forfeiter).copied().unwrap_or(0.0);
    for (id, score) in scores.iter_mut() {
        if id != forfeiter && *score <= forfeit_score {
            *score = forfeit_score + 1.0;
        }
    }
}

/// Push an annotation once.
fn note(modes: &mut Vec<String>, mode: String) {
    if !modes.contains(&mode) {
        modes.push(mode);
    }
}
