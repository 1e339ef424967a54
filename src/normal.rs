//! Normal-distribution primitives for margin modeling.
//!
//! Every belief about a contest margin (dem − rep advantage) is carried as a
//! univariate Gaussian. Two construction quirks are deliberate and load-bearing
//! for the calibration math:
//!
//! - [`Normal::from_samples`] uses the population estimator (divide by N, not
//!   N−1), so a single sample yields `std = 0`.
//! - [`Normal::from_weighted_samples`] normalizes squared deviations by the
//!   *average* weight and then divides by N. This controls how much a sparse
//!   historical series (say, one midterm year) shrinks uncertainty relative to
//!   a dense one, and must not be "fixed" to the textbook formula.
//!
//! Composition returns new values rather than mutating in place, so a `Normal`
//! can be shared across trials and contests without aliasing surprises.

use rand::rngs::SmallRng;
use rand::Rng;
use serde::Serialize;

use crate::error::ModelError;

/// A univariate Gaussian over a margin value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Normal {
    pub mean: f64,
    pub std: f64,
}

impl Normal {
    /// The unit Gaussian, used for scenario and idiosyncratic shocks.
    pub const STANDARD: Normal = Normal {
        mean: 0.0,
        std: 1.0,
    };

    pub fn new(mean: f64, std: f64) -> Self {
        Self { mean, std }
    }

    /// Fit a Normal to raw samples: arithmetic mean, population standard
    /// deviation (squared-deviation sum divided by N).
    ///
    /// `values` must be non-empty.
    pub fn from_samples(values: &[f64]) -> Normal {
        debug_assert!(!values.is_empty(), "from_samples on empty slice");

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let diffs_squared: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();

        Normal {
            mean,
            std: (diffs_squared / n).sqrt(),
        }
    }

    /// Fit a Normal where each sample carries a weight (weights needn't sum
    /// to one). Mean is the weighted average; each squared deviation is scaled
    /// by `weight / average_weight` before the /N normalization, so uniform
    /// weights reduce exactly to [`Normal::from_samples`].
    pub fn from_weighted_samples(values: &[f64], weights: &[f64]) -> Result<Normal, ModelError> {
        if values.len() != weights.len() {
            return Err(ModelError::LengthMismatch {
                values: values.len(),
                weights: weights.len(),
            });
        }
        debug_assert!(!values.is_empty(), "from_weighted_samples on empty slice");

        let n = values.len() as f64;
        let total_weight: f64 = weights.iter().sum();
        let avg_weight = total_weight / n;

        let mean: f64 = values
            .iter()
            .zip(weights)
            .map(|(v, w)| v * w / total_weight)
            .sum();

        let diffs_squared: f64 = values
            .iter()
            .zip(weights)
            .map(|(v, w)| (v - mean).powi(2) * w / avg_weight)
            .sum();

        Ok(Normal {
            mean,
            std: (diffs_squared / n).sqrt(),
        })
    }

    /// Fold an independent error source into this one: same mean,
    /// `std = sqrt(std² + extra_std²)` (quadrature).
    #[must_use]
    pub fn with_added_deviation(self, extra_std: f64) -> Normal {
        Normal {
            mean: self.mean,
            std: (self.std * self.std + extra_std * extra_std).sqrt(),
        }
    }

    /// P(X ≤ value) via the Abramowitz–Stegun 7.1.26 rational approximation
    /// to erf (max absolute error ~1.5e-7).
    pub fn cdf(&self, value: f64) -> f64 {
        if self.std == 0.0 {
            // Degenerate point mass.
            return match value.partial_cmp(&self.mean) {
                Some(std::cmp::Ordering::Less) => 0.0,
                Some(std::cmp::Ordering::Greater) => 1.0,
                _ => 0.5,
            };
        }

        let x = (value - self.mean) / (self.std * std::f64::consts::SQRT_2);
        let sign = if x >= 0.0 { 1.0 } else { -1.0 };
        let x = x.abs();

        const A1: f64 = 0.254829592;
        const A2: f64 = -0.284496736;
        const A3: f64 = 1.421413741;
        const A4: f64 = -1.453152027;
        const A5: f64 = 1.061405429;
        const P: f64 = 0.3275911;

        let t = 1.0 / (1.0 + P * x);
        let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();
        let erf = sign * y;

        0.5 * (1.0 + erf)
    }

    /// Draw one Gaussian variate via the Box–Muller transform, shifted by
    /// `shift` standard deviations before scaling: `(z + shift) * std + mean`.
    ///
    /// A deterministic quantile evaluation is `mean + std * q`; this method is
    /// for the random path only.
    pub fn sample(&self, rng: &mut SmallRng, shift: f64) -> f64 {
        let u: f64 = 1.0 - rng.random::<f64>();
        let v: f64 = rng.random::<f64>();
        let z = (-2.0 * u.ln()).sqrt() * (std::f64::consts::TAU * v).cos();

        (z + shift) * self.std + self.mean
    }
}
