//! Environment calibration: derive each sub-contest's historical lean
//! relative to the national vote.
//!
//! For every year in a sub-contest's series, the raw margin and its shift from
//! that year's national margin are blended by `popular_vote_factor`, weighted
//! by recency, and the weighted pairs are fitted into one Normal stored as the
//! sub-contest's `environment`. The auxiliary down-ballot series contributes
//! the same way at a subordinated weight (`auxiliary_ratio / 2`).
//!
//! Calibration runs once per simulation, before any trial; its outputs are
//! read-only from then on.

use std::collections::BTreeMap;

use crate::config::CalibrationConfig;
use crate::normal::Normal;
use crate::types::{Race, SubContest, VoteResult};

/// Per-year recency weights over a series spanning `earliest..=cutoff`.
/// The cutoff year weighs 1.0; older years decay linearly down to the
/// `recency_factor` floor.
#[derive(Clone, Copy)]
struct YearWeights {
    earliest: i32,
    cutoff: i32,
    recency_factor: f64,
}

impl YearWeights {
    fn new(years: impl Iterator<Item = i32>, recency_factor: f64) -> Option<Self> {
        let (mut earliest, mut cutoff) = (i32::MAX, i32::MIN);
        for year in years {
            earliest = earliest.min(year);
            cutoff = cutoff.max(year);
        }
        if earliest > cutoff {
            return None;
        }
        Some(Self {
            earliest,
            cutoff,
            recency_factor,
        })
    }

    fn weight(&self, year: i32) -> f64 {
        let old_factor = if self.cutoff == self.earliest {
            1.0
        } else {
            1.0 - f64::from(self.cutoff - year) / f64::from(self.cutoff - self.earliest)
        };
        old_factor * (1.0 - self.recency_factor) + self.recency_factor
    }
}

/// Sum rollup sub-contests' results per year and reduce to margin shares.
fn national_margins<'a, F>(race: &'a Race, series: F) -> BTreeMap<i32, f64>
where
    F: Fn(&'a SubContest) -> Option<&'a BTreeMap<i32, VoteResult>>,
{
    let mut sums: BTreeMap<i32, VoteResult> = BTreeMap::new();

    for sub in race.sub_contests.values() {
        if !sub.national_rollup {
            continue;
        }
        let Some(results) = series(sub) else { continue };
        for (&year, result) in results {
            let entry = sums
                .entry(year)
                .or_insert_with(|| VoteResult::new(0.0, 0.0, 0.0));
            entry.dem += result.dem;
            entry.rep += result.rep;
            entry.other += result.other;
        }
    }

    sums.into_iter()
        .map(|(year, total)| (year, total.margin_share()))
        .collect()
}

/// Set `environment` on every sub-contest of the race from its historical
/// series. A sub-contest with no usable history is left uncalibrated
/// (`environment` stays `None`); the simulation rejects it later rather than
/// inventing a lean.
pub fn calibrate_environments(race: &mut Race, config: &CalibrationConfig) {
    let main_margins = national_margins(race, |sub| Some(&sub.past_national_results));
    let aux_margins = national_margins(race, |sub| sub.past_secondary_results.as_ref());

    let main_weights = YearWeights::new(main_margins.keys().copied(), config.recency_factor);
    let aux_weights = YearWeights::new(aux_margins.keys().copied(), config.recency_factor);

    for sub in race.sub_contests.values_mut() {
        let mut values = Vec::new();
        let mut weights = Vec::new();

        if let Some(year_weights) = main_weights {
            collect_series(
                &sub.past_national_results,
                &main_margins,
                year_weights,
                config.popular_vote_factor,
                1.0,
                &mut values,
                &mut weights,
            );
        }

        if let (Some(secondary), Some(year_weights)) = (&sub.past_secondary_results, aux_weights) {
            collect_series(
                secondary,
                &aux_margins,
                year_weights,
                config.popular_vote_factor,
                config.auxiliary_ratio / 2.0,
                &mut values,
                &mut weights,
            );
        }

        if values.is_empty() {
            sub.contest.environment = None;
            continue;
        }

        // Lengths are built in lockstep, so this cannot fail.
        sub.contest.environment = Normal::from_weighted_samples(&values, &weights).ok();
    }
}

/// Append one series' (blended value, weight) pairs.
fn collect_series(
    results: &BTreeMap<i32, VoteResult>,
    reference_margins: &BTreeMap<i32, f64>,
    year_weights: YearWeights,
    popular_vote_factor: f64,
    weight_scale: f64,
    values: &mut Vec<f64>,
    weights: &mut Vec<f64>,
) {
    for (year, result) in results {
        let Some(&national) = reference_margins.get(year) else {
            continue;
        };
        let margin = result.margin_share();
        let shifted_margin = margin - national;

        values.push(margin * (1.0 - popular_vote_factor) + shifted_margin * popular_vote_factor);
        weights.push(year_weights.weight(*year) * weight_scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Contest;

    fn race_with(subs: Vec<SubContest>) -> Race {
        let mut race = Race::new(Contest::new("popular vote"));
        for sub in subs {
            race.add_sub_contest(sub);
        }
        race
    }

    fn sub_with_history(name: &str, history: &[(i32, VoteResult)]) -> SubContest {
        let mut sub = SubContest::new(name, 1);
        for &(year, result) in history {
            sub.past_national_results.insert(year, result);
        }
        sub
    }

    #[test]
    fn year_weight_is_one_at_cutoff_and_floored_at_earliest() {
        let weights = YearWeights::new([2016, 2020].into_iter(), 0.3).unwrap();
        assert!((weights.weight(2020) - 1.0).abs() < 1e-12);
        assert!((weights.weight(2016) - 0.3).abs() < 1e-12);
        // Midpoint decays linearly: old_factor 0.5 → 0.5 * 0.7 + 0.3.
        assert!((weights.weight(2018) - 0.65).abs() < 1e-12);
    }

    #[test]
    fn single_year_race_gets_point_mass_lean() {
        // One sub-contest = the whole nation, so its shift is 0 and the
        // blended value is margin * (1 - pvf).
        let result = VoteResult::new(550.0, 450.0, 0.0); // margin_share 0.1
        let mut race = race_with(vec![sub_with_history("A", &[(2020, result)])]);

        let config = CalibrationConfig {
            popular_vote_factor: 0.7,
            recency_factor: 0.3,
            auxiliary_ratio: 0.3,
        };
        calibrate_environments(&mut race, &config);

        let env = race.sub_contests["A"].contest.environment.unwrap();
        assert!((env.mean - 0.1 * 0.3).abs() < 1e-12);
        assert_eq!(env.std, 0.0);
    }

    #[test]
    fn shift_measures_divergence_from_national() {
        // Two equal-turnout subs in 2020: A at +0.2, B at -0.2, nation at 0.
        // With popular_vote_factor 1 the blended value is the shift itself.
        let mut race = race_with(vec![
            sub_with_history("A", &[(2020, VoteResult::new(600.0, 400.0, 0.0))]),
            sub_with_history("B", &[(2020, VoteResult::new(400.0, 600.0, 0.0))]),
        ]);

        let config = CalibrationConfig {
            popular_vote_factor: 1.0,
            recency_factor: 0.3,
            auxiliary_ratio: 0.3,
        };
        calibrate_environments(&mut race, &config);

        let a = race.sub_contests["A"].contest.environment.unwrap();
        let b = race.sub_contests["B"].contest.environment.unwrap();
        assert!((a.mean - 0.2).abs() < 1e-12);
        assert!((b.mean + 0.2).abs() < 1e-12);
    }

    #[test]
    fn non_rollup_subs_are_excluded_from_national_sums() {
        let mut district = sub_with_history("A 1st", &[(2020, VoteResult::new(900.0, 100.0, 0.0))]);
        district.national_rollup = false;

        let mut race = race_with(vec![
            sub_with_history("A", &[(2020, VoteResult::new(500.0, 500.0, 0.0))]),
            district,
        ]);

        let config = CalibrationConfig {
            popular_vote_factor: 1.0,
            ..CalibrationConfig::default()
        };
        calibrate_environments(&mut race, &config);

        // National margin comes from A alone (0.0), so the district's shift
        // equals its own margin.
        let env = race.sub_contests["A 1st"].contest.environment.unwrap();
        assert!((env.mean - 0.8).abs() < 1e-12);
    }

    #[test]
    fn auxiliary_series_is_subordinated() {
        // Main series says +0.1, auxiliary says -0.1. The aux weight is
        // scaled by auxiliary_ratio / 2, pulling the mean only slightly.
        let mut sub = sub_with_history("A", &[(2020, VoteResult::new(550.0, 450.0, 0.0))]);
        let mut secondary = BTreeMap::new();
        secondary.insert(2020, VoteResult::new(450.0, 550.0, 0.0));
        sub.past_secondary_results = Some(secondary);

        let mut race = race_with(vec![sub]);
        let config = CalibrationConfig {
            popular_vote_factor: 0.0, // keep raw margins
            recency_factor: 0.3,
            auxiliary_ratio: 0.3,
        };
        calibrate_environments(&mut race, &config);

        let env = race.sub_contests["A"].contest.environment.unwrap();
        // Weighted mean of +0.1 (weight 1.0) and -0.1 (weight 0.15).
        let expected = (0.1 * 1.0 + (-0.1) * 0.15) / 1.15;
        assert!((env.mean - expected).abs() < 1e-12);
    }

    #[test]
    fn sub_without_history_stays_uncalibrated() {
        let mut race = race_with(vec![
            sub_with_history("A", &[(2020, VoteResult::new(550.0, 450.0, 0.0))]),
            SubContest::new("B", 3),
        ]);
        calibrate_environments(&mut race, &CalibrationConfig::default());
        assert!(race.sub_contests["B"].contest.environment.is_none());
    }
}
