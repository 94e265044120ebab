// SPDX-License-Identifier: MIT OR Apache-2.0
//! Standings rows and the round-robin points table.
//!
//! Shared between the tournament runner (which writes `standings.json`)
//! and the bundle validator (which recomputes it from match summaries);
//! the two must agree element-wise.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::manifest::MatchSummary;

/// One row of the tournament table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingsRow {
    /// Competitor id.
    pub agent_id: String,
    /// 3 per win, 1 per draw, 0 per loss.
    pub points: u32,
    /// Matches won.
    pub wins: u32,
    /// Matches drawn.
    pub draws: u32,
    /// Matches lost.
    pub losses: u32,
    /// Total score accumulated by this agent.
    pub score_for: f64,
    /// Total score accumulated by its opponents.
    pub score_against: f64,
    /// `score_for - score_against`.
    pub score_diff: f64,
}

/// Per-agent accumulator used while folding summaries.
#[derive(Debug, Default, Clone)]
struct Tally {
    points: u32,
    wins: u32,
    draws: u32,
    losses: u32,
    score_for: f64,
    score_against: f64,
}

/// Fold match summaries into the standings table.
///
/// Rows sort by `points desc, scoreDiff desc, agentId asc`. Matches with
/// other than two participants are skipped; the round-robin scheduler
/// never produces them.
#[must_use]
pub fn compute_standings(summaries: &[MatchSummary]) -> Vec<StandingsRow> {
    let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();

    for summary in summaries {
        if summary.agent_ids.len() != 2 {
            continue;
        }
        let a = &summary.agent_ids[0];
        let b = &summary.agent_ids[1];
        let score_a = summary.scores.get(a).copied().unwrap_or(0.0);
        let score_b = summary.scores.get(b).copied().unwrap_or(0.0);

        {
            let t = tallies.entry(a.clone()).or_default();
            t.score_for += score_a;
            t.score_against += score_b;
        }
        {
            let t = tallies.entry(b.clone()).or_default();
            t.score_for += score_b;
            t.score_against += score_a;
        }

        if score_a > score_b {
            award(&mut tallies, a, b);
        } else if score_b > score_a {
            award(&mut tallies, b, a);
        } else {
            for id in [a, b] {
                let t = tallies.entry(id.clone()).or_default();
                t.points += 1;
                t.draws += 1;
            }
        }
    }

    let mut rows: Vec<StandingsRow> = tallies
        .into_iter()
        .map(|(agent_id, t)| StandingsRow {
            agent_id,
            points: t.points,
            wins: t.wins,
            draws: t.draws,
            losses: t.losses,
            score_for: t.score_for,
            score_against: t.score_against,
            score_diff: t.score_for - t.score_against,
        })
        .collect();

    rows.sort_by(|x, y| {
        y.points
            .cmp(&x.points)
            .then_with(|| y.score_diff.total_cmp(&x.score_diff))
            .then_with(|| x.agent_id.cmp(&y.agent_id))
    });
    rows
}

fn award(tallies: &mut BTreeMap<String, Tally>, winner: &str, loser: &str) {
    {
        let t = tallies.entry(winner.to_string()).or_default();
        t.points += 3;
        t.wins += 1;
    }
    let t = tallies.entry(loser.to_string()).or_default();
    t.losses += 1;
}
