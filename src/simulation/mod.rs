//! Monte Carlo simulation of a race.
//!
//! - [`engine`]: parallel trial loop (calibrate once, run N correlated trials)
//! - [`statistics`]: aggregate recorded trials into the outcome report

pub mod engine;
pub mod statistics;

pub use engine::simulate;
pub use statistics::{RaceOutcome, SubContestOutcome};
