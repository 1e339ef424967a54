//! # Statecast — Monte Carlo election forecasting engine
//!
//! Forecasts a multi-contest election (a national popular vote plus linked
//! sub-contests such as states in an electoral college) from polling data and
//! historical results, producing win probabilities and outcome distributions
//! over thousands of correlated trials.
//!
//! ## Pipeline
//!
//! | Stage | Module | Description |
//! |-------|--------|-------------|
//! | 1 | [`calibrate`] | Derive each sub-contest's historical lean ("environment") relative to the national vote from weighted multi-year results |
//! | 2 | [`predict`] | Blend a contest's poll evidence with its environment signal into one Gaussian and collapse it to a margin |
//! | 3 | [`simulation`] | Run N seeded parallel trials, each drawing one national scenario shared across sub-contests, and aggregate the outcome distribution |
//!
//! [`normal`] holds the Gaussian primitives everything above is built on;
//! [`types`] holds the contest/poll/race data model that collaborators
//! (loaders, poll ingestion) populate before calling in.
//!
//! Randomness is explicit throughout: every sampling path takes a seeded
//! `SmallRng`, and the simulation derives one independent stream per trial
//! from its base seed, so a fixed seed reproduces a run exactly.

pub mod calibrate;
pub mod config;
pub mod error;
pub mod normal;
pub mod predict;
pub mod simulation;
pub mod types;
