//! Parallel trial loop.
//!
//! Each trial is one simulated universe: a shared national "scenario" shock is
//! drawn first and threaded into every sub-contest of that trial, which is what
//! correlates sub-contest outcomes within a universe. Trials are independent of
//! each other and run on rayon workers, each with its own `SmallRng` stream
//! seeded from `base_seed + trial_index` so runs reproduce under a fixed seed
//! regardless of worker scheduling.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::calibrate::calibrate_environments;
use crate::config::SimulationConfig;
use crate::error::ModelError;
use crate::normal::Normal;
use crate::predict::{predict, Draw, EnvironmentLink, EnvironmentSource, PredictOptions};
use crate::types::{Race, SubContest};

use super::statistics::{aggregate_outcome, RaceOutcome};

/// Share of each sub-contest prediction taken from the trial's national
/// result rather than the sub-contest's own polls.
const ENVIRONMENT_PERCENTAGE: f64 = 0.5;

/// One trial's raw output: affirmative unit total plus per-sub-contest margins
/// in the race's fixed (sorted-name) order.
pub(super) struct TrialRecord {
    pub unit_total: u32,
    pub margins: Vec<f64>,
}

/// Calibrate environments, then run `config.trials` parallel trials and
/// aggregate them into a [`RaceOutcome`].
///
/// Per-trial errors are not skipped: a single malformed sub-contest aborts
/// the whole run, since a partial elector count would be meaningless.
pub fn simulate(race: &mut Race, config: &SimulationConfig) -> Result<RaceOutcome, ModelError> {
    calibrate_environments(race, &config.calibration);
    let race: &Race = race;

    // Preflight the invariant every trial relies on, so a race with an
    // uncalibratable sub-contest fails before burning 10k trials.
    for sub in race.sub_contests.values() {
        if sub.contest.environment.is_none() && sub.contest.predicted_environment.is_none() {
            return Err(ModelError::MissingEnvironment(sub.contest.name.clone()));
        }
    }

    let subs: Vec<&SubContest> = race.sub_contests.values().collect();

    let records: Vec<TrialRecord> = (0..config.trials)
        .into_par_iter()
        .map(|i| {
            let mut rng = SmallRng::seed_from_u64(config.seed.wrapping_add(i as u64));
            run_trial(race, &subs, &mut rng)
        })
        .collect::<Result<_, _>>()?;

    Ok(aggregate_outcome(race, &records, config))
}

/// One simulated universe.
fn run_trial(
    race: &Race,
    subs: &[&SubContest],
    rng: &mut SmallRng,
) -> Result<TrialRecord, ModelError> {
    // Shared scenario shock, in standard deviations.
    let scenario = Normal::STANDARD.sample(rng, 0.0);

    let national_options = PredictOptions {
        draw: Draw::Shift(scenario),
        ..Default::default()
    };
    let national_result = predict(&race.national, &national_options, rng)?;

    let mut unit_total = 0u32;
    let mut margins = Vec::with_capacity(subs.len());

    for sub in subs {
        // Idiosyncratic shock scaled to this sub-contest's own lean variance,
        // stacked on the shared scenario.
        let lean_std = sub
            .contest
            .environment
            .or(sub.contest.predicted_environment)
            .map(|n| n.std)
            .unwrap_or(0.0);
        let favorability = scenario + Normal::STANDARD.sample(rng, 0.0) * lean_std;

        let options = PredictOptions {
            environment: Some(EnvironmentLink {
                source: EnvironmentSource::Precomputed(national_result),
                weight: ENVIRONMENT_PERCENTAGE,
            }),
            draw: Draw::Shift(favorability),
            ..Default::default()
        };
        let margin = predict(&sub.contest, &options, rng)?;

        if margin > 0.0 {
            unit_total += sub.electors;
        }
        margins.push(margin);
    }

    Ok(TrialRecord { unit_total, margins })
}
