//! Contest prediction: blend poll evidence with an environment signal and
//! collapse the result to a single margin.
//!
//! The environment link either carries a precomputed parent result (the per
//! trial national draw) or a parent contest to evaluate recursively. Recursive
//! evaluation always uses a deterministic quantile draw — a random draw there
//! would compound independent randomness invisibly across levels.

use rand::rngs::SmallRng;

use crate::error::ModelError;
use crate::normal::Normal;
use crate::types::{Contest, Poll};

/// Residual polling error beyond sample spread, folded into every poll-based
/// Normal in quadrature.
pub const POLL_NOISE_FLOOR: f64 = 0.01;

/// Parent-link recursion limit. Parent chains are expected to be shallow and
/// acyclic; hitting this means a configuration cycle.
const MAX_ENVIRONMENT_DEPTH: usize = 8;

/// How the final blended Normal is collapsed to a scalar.
#[derive(Clone, Copy, Debug)]
pub enum Draw {
    /// Deterministic: `mean + std * q`.
    Quantile(f64),
    /// Random Box–Muller draw shifted by this many standard deviations.
    Shift(f64),
}

impl Default for Draw {
    fn default() -> Self {
        // Plain unshifted random draw.
        Draw::Shift(0.0)
    }
}

/// Where the environment's reference result comes from.
#[derive(Clone, Copy, Debug)]
pub enum EnvironmentSource<'a> {
    /// Already computed by the caller (e.g. this trial's national result).
    Precomputed(f64),
    /// Evaluate the parent contest at the given quantile (0 = parent mean).
    Parent { contest: &'a Contest, quantile: f64 },
}

/// An environment signal and how strongly it pulls the prediction.
#[derive(Clone, Copy, Debug)]
pub struct EnvironmentLink<'a> {
    pub source: EnvironmentSource<'a>,
    /// Blending weight in 0..1: share of the prediction taken from the
    /// environment-adjusted estimate rather than the polls.
    pub weight: f64,
}

/// Options for a single prediction call.
pub struct PredictOptions<'a> {
    pub environment: Option<EnvironmentLink<'a>>,
    pub draw: Draw,
    /// Correction hook applied to each poll's raw margin before the poll-based
    /// Normal is built. Extension point for historical-bias correction, which
    /// is computed by the bias loader but has no settled blending formula yet.
    pub margin_adjust: Option<&'a dyn Fn(&Poll, f64) -> f64>,
}

impl Default for PredictOptions<'_> {
    fn default() -> Self {
        Self {
            environment: None,
            draw: Draw::default(),
            margin_adjust: None,
        }
    }
}

/// Predict a contest, returning the dem advantage in one instance of it.
///
/// Fails with [`ModelError::NoEvidence`] when the contest has no polls and no
/// environment link, and with [`ModelError::MissingEnvironment`] when a link
/// is supplied but the contest defines neither environment field.
pub fn predict(
    contest: &Contest,
    options: &PredictOptions,
    rng: &mut SmallRng,
) -> Result<f64, ModelError> {
    predict_at_depth(contest, options, rng, 0)
}

fn predict_at_depth(
    contest: &Contest,
    options: &PredictOptions,
    rng: &mut SmallRng,
    depth: usize,
) -> Result<f64, ModelError> {
    if options.environment.is_none() && contest.polls.is_empty() {
        return Err(ModelError::NoEvidence(contest.name.clone()));
    }

    // Poll-based estimate. With zero polls the environment branch below fully
    // determines the outcome, so the placeholder never leaks through.
    let mut blended = if contest.polls.is_empty() {
        Normal::new(0.0, 0.0)
    } else {
        let margins: Vec<f64> = contest
            .polls
            .iter()
            .map(|poll| {
                let raw = poll.result.margin();
                match options.margin_adjust {
                    Some(adjust) => adjust(poll, raw),
                    None => raw,
                }
            })
            .collect();
        Normal::from_samples(&margins).with_added_deviation(POLL_NOISE_FLOOR)
    };

    if let Some(link) = &options.environment {
        let environment_result = match link.source {
            EnvironmentSource::Precomputed(result) => result,
            EnvironmentSource::Parent { contest: parent, quantile } => {
                if depth + 1 >= MAX_ENVIRONMENT_DEPTH {
                    return Err(ModelError::EnvironmentDepthExceeded {
                        contest: contest.name.clone(),
                        max: MAX_ENVIRONMENT_DEPTH,
                    });
                }
                let parent_options = PredictOptions {
                    environment: None,
                    draw: Draw::Quantile(quantile),
                    margin_adjust: options.margin_adjust,
                };
                predict_at_depth(parent, &parent_options, rng, depth + 1)?
            }
        };

        let environment_normal = contest
            .predicted_environment
            .or(contest.environment)
            .ok_or_else(|| ModelError::MissingEnvironment(contest.name.clone()))?;

        // Environment-adjusted estimate: reference result plus one draw from
        // this contest's lean distribution.
        let estimate = environment_result + environment_normal.sample(rng, 0.0);

        blended = if contest.polls.is_empty() {
            Normal::new(estimate, 0.0)
        } else {
            let p = link.weight;
            Normal::new(
                estimate * p + blended.mean * (1.0 - p),
                blended.std * (1.0 - p),
            )
        };

        // The environment's own uncertainty enters here, not in the blend.
        blended = blended.with_added_deviation(environment_normal.std);
    }

    Ok(match options.draw {
        Draw::Quantile(q) => blended.mean + blended.std * q,
        Draw::Shift(shift) => blended.sample(rng, shift),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VoteResult;
    use rand::SeedableRng;
    use std::time::SystemTime;

    fn poll(dem: f64, rep: f64) -> Poll {
        Poll {
            source: "test".to_string(),
            date: SystemTime::UNIX_EPOCH,
            result: VoteResult::new(dem, rep, 1.0 - dem - rep),
        }
    }

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    #[test]
    fn no_polls_no_environment_is_an_error() {
        let contest = Contest::new("empty");
        let err = predict(&contest, &PredictOptions::default(), &mut rng()).unwrap_err();
        assert_eq!(err, ModelError::NoEvidence("empty".to_string()));
    }

    #[test]
    fn quantile_zero_returns_poll_mean() {
        let mut contest = Contest::new("polled");
        contest.push_poll(poll(0.52, 0.46));
        contest.push_poll(poll(0.48, 0.50));

        let options = PredictOptions {
            draw: Draw::Quantile(0.0),
            ..Default::default()
        };
        let result = predict(&contest, &options, &mut rng()).unwrap();
        // Margins are +0.06 and -0.02; the noise floor widens std, not mean.
        assert!((result - 0.02).abs() < 1e-12);
    }

    #[test]
    fn quantile_walks_the_blended_std() {
        let mut contest = Contest::new("polled");
        contest.push_poll(poll(0.52, 0.46));

        // Single poll: spread 0, so std is exactly the noise floor.
        let options = PredictOptions {
            draw: Draw::Quantile(2.0),
            ..Default::default()
        };
        let result = predict(&contest, &options, &mut rng()).unwrap();
        assert!((result - (0.06 + 2.0 * POLL_NOISE_FLOOR)).abs() < 1e-12);
    }

    #[test]
    fn environment_link_requires_an_environment() {
        let mut contest = Contest::new("no-lean");
        contest.push_poll(poll(0.5, 0.5));

        let options = PredictOptions {
            environment: Some(EnvironmentLink {
                source: EnvironmentSource::Precomputed(0.0),
                weight: 0.5,
            }),
            ..Default::default()
        };
        let err = predict(&contest, &options, &mut rng()).unwrap_err();
        assert_eq!(err, ModelError::MissingEnvironment("no-lean".to_string()));
    }

    #[test]
    fn pollless_contest_follows_environment_exactly() {
        // Zero polls + point-mass lean: the outcome is reference + lean mean,
        // deterministically.
        let mut contest = Contest::new("unpolled");
        contest.environment = Some(Normal::new(0.03, 0.0));

        let options = PredictOptions {
            environment: Some(EnvironmentLink {
                source: EnvironmentSource::Precomputed(0.01),
                weight: 0.5,
            }),
            draw: Draw::Quantile(0.0),
            ..Default::default()
        };
        let result = predict(&contest, &options, &mut rng()).unwrap();
        assert!((result - 0.04).abs() < 1e-12);
    }

    #[test]
    fn predicted_environment_takes_precedence() {
        let mut contest = Contest::new("trended");
        contest.environment = Some(Normal::new(-0.10, 0.0));
        contest.predicted_environment = Some(Normal::new(0.05, 0.0));

        let options = PredictOptions {
            environment: Some(EnvironmentLink {
                source: EnvironmentSource::Precomputed(0.0),
                weight: 1.0,
            }),
            draw: Draw::Quantile(0.0),
            ..Default::default()
        };
        let result = predict(&contest, &options, &mut rng()).unwrap();
        assert!((result - 0.05).abs() < 1e-12);
    }

    #[test]
    fn blend_weights_polls_against_environment() {
        let mut contest = Contest::new("blended");
        contest.push_poll(poll(0.55, 0.45)); // margin +0.10
        contest.environment = Some(Normal::new(0.0, 0.0));

        let options = PredictOptions {
            environment: Some(EnvironmentLink {
                // Environment estimate is exactly 0.02 (point-mass lean at 0).
                source: EnvironmentSource::Precomputed(0.02),
                weight: 0.25,
            }),
            draw: Draw::Quantile(0.0),
            ..Default::default()
        };
        let result = predict(&contest, &options, &mut rng()).unwrap();
        assert!((result - (0.02 * 0.25 + 0.10 * 0.75)).abs() < 1e-12);
    }

    #[test]
    fn parent_link_resolves_recursively_at_quantile() {
        let mut parent = Contest::new("national");
        parent.push_poll(poll(0.51, 0.49)); // margin +0.02

        let mut child = Contest::new("child");
        child.environment = Some(Normal::new(0.01, 0.0));

        let options = PredictOptions {
            environment: Some(EnvironmentLink {
                source: EnvironmentSource::Parent {
                    contest: &parent,
                    quantile: 0.0,
                },
                weight: 0.5,
            }),
            draw: Draw::Quantile(0.0),
            ..Default::default()
        };
        let result = predict(&child, &options, &mut rng()).unwrap();
        // Parent evaluates to its poll mean 0.02; child adds its 0.01 lean.
        assert!((result - 0.03).abs() < 1e-12);
    }

    #[test]
    fn margin_adjust_hook_shifts_poll_margins() {
        let mut contest = Contest::new("corrected");
        contest.push_poll(poll(0.52, 0.48)); // raw margin +0.04

        let debias = |_: &Poll, raw: f64| raw - 0.03;
        let options = PredictOptions {
            draw: Draw::Quantile(0.0),
            margin_adjust: Some(&debias),
            ..Default::default()
        };
        let result = predict(&contest, &options, &mut rng()).unwrap();
        assert!((result - 0.01).abs() < 1e-12);
    }
}
