//! Error types for the forecasting core.
//!
//! All three failure kinds are raised synchronously at the point of violation
//! and never retried internally. The simulation loop deliberately does not
//! catch per-trial errors: a partial elector count is meaningless, so a single
//! malformed sub-contest aborts the whole run.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    /// The contest has no polls and no environment link was supplied.
    #[error("cannot predict contest `{0}`: no polls and no environment link")]
    NoEvidence(String),

    /// An environment link was requested but the contest defines neither
    /// `environment` nor `predicted_environment`.
    #[error("contest `{0}` defines no environment to integrate")]
    MissingEnvironment(String),

    /// Parent-contest recursion ran past the depth limit, which in an acyclic
    /// configuration is unreachable.
    #[error("environment recursion exceeded depth {max} at contest `{contest}`")]
    EnvironmentDepthExceeded { contest: String, max: usize },

    /// Sample and weight slices of unequal length in weighted-normal
    /// construction.
    #[error("sample count {values} does not match weight count {weights}")]
    LengthMismatch { values: usize, weights: usize },
}
