//! Outcome aggregation from recorded trials.
//!
//! Turns the raw per-trial records into the report callers consume: the
//! affirmative win probability, the unit-total distribution, and a win
//! probability plus margin distribution per sub-contest.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::SimulationConfig;
use crate::normal::Normal;
use crate::types::Race;

use super::engine::TrialRecord;

// ── Report types ────────────────────────────────────────────────────

/// Aggregate result of a simulation run.
#[derive(Clone, Debug, Serialize)]
pub struct RaceOutcome {
    pub trials: usize,
    pub seed: u64,

    /// Fraction of trials where the affirmative unit total strictly exceeded
    /// the majority threshold. A trial landing exactly on the threshold
    /// counts as a loss.
    pub win_probability: f64,

    /// Distribution of affirmative unit totals across trials.
    pub unit_totals: Normal,

    pub sub_contests: BTreeMap<String, SubContestOutcome>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SubContestOutcome {
    /// Fraction of trials with a positive margin.
    pub win_probability: f64,

    /// Distribution of this sub-contest's margin across trials.
    pub margin: Normal,
}

// ── Aggregation ─────────────────────────────────────────────────────

pub(super) fn aggregate_outcome(
    race: &Race,
    records: &[TrialRecord],
    config: &SimulationConfig,
) -> RaceOutcome {
    let trials = records.len();

    let unit_totals: Vec<f64> = records.iter().map(|r| f64::from(r.unit_total)).collect();
    let wins = records
        .iter()
        .filter(|r| r.unit_total > config.majority_threshold)
        .count();

    // Margins were recorded in the race's sorted-name order; transpose the
    // per-trial rows into one sample column per sub-contest.
    let mut sub_contests = BTreeMap::new();
    for (index, name) in race.sub_contests.keys().enumerate() {
        let margins: Vec<f64> = records.iter().map(|r| r.margins[index]).collect();
        let positive = margins.iter().filter(|&&m| m > 0.0).count();

        sub_contests.insert(
            name.clone(),
            SubContestOutcome {
                win_probability: positive as f64 / trials as f64,
                margin: Normal::from_samples(&margins),
            },
        );
    }

    RaceOutcome {
        trials,
        seed: config.seed,
        win_probability: wins as f64 / trials as f64,
        unit_totals: Normal::from_samples(&unit_totals),
        sub_contests,
    }
}
