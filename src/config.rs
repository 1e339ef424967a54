//! Run configuration with source defaults and env-var overrides.
//!
//! `STATECAST_TRIALS` and `STATECAST_SEED` override the trial count and base
//! seed; rayon worker count is the stock `RAYON_NUM_THREADS` behavior.

/// Knobs for historical-lean calibration.
#[derive(Clone, Copy, Debug)]
pub struct CalibrationConfig {
    /// How much a historical margin is "nationalized" (replaced by its shift
    /// from that year's national margin) before entering the lean estimate.
    /// 0 keeps raw margins, 1 keeps only the divergence.
    pub popular_vote_factor: f64,

    /// Floor on how much weight older years retain. The most recent year
    /// always weighs 1.0; the earliest decays linearly down to this value.
    pub recency_factor: f64,

    /// Weight multiplier for the auxiliary down-ballot series relative to the
    /// main series (applied as `auxiliary_ratio / 2`).
    pub auxiliary_ratio: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            popular_vote_factor: 0.7,
            recency_factor: 0.3,
            auxiliary_ratio: 0.3,
        }
    }
}

/// Knobs for the Monte Carlo run.
#[derive(Clone, Copy, Debug)]
pub struct SimulationConfig {
    /// Number of simulated universes.
    pub trials: usize,

    /// Base seed; trial i uses stream `seed.wrapping_add(i)`.
    pub seed: u64,

    /// A trial counts as an affirmative win only when the affirmative unit
    /// total strictly exceeds this. Landing exactly on it is a loss (known
    /// convention, not a vetted tie rule).
    pub majority_threshold: u32,

    pub calibration: CalibrationConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            trials: 10_000,
            seed: 42,
            // 538-elector college: win means 270+, exactly 269 loses.
            majority_threshold: 269,
            calibration: CalibrationConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Defaults with `STATECAST_TRIALS` / `STATECAST_SEED` applied on top.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(trials) = read_env("STATECAST_TRIALS") {
            config.trials = trials;
        }
        if let Some(seed) = read_env("STATECAST_SEED") {
            config.seed = seed;
        }
        config
    }
}

fn read_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}
