//! Core data structures: vote results, polls, contests, and the race.
//!
//! Collaborators (file loaders, poll ingestion) build these in memory before
//! any prediction call; the prediction path itself never mutates polls. The
//! only field the core writes is each sub-contest's `environment`, set once
//! per run by [`crate::calibrate::calibrate_environments`].

use std::collections::BTreeMap;
use std::time::SystemTime;

use serde::Serialize;

use crate::normal::Normal;

/// A vote tally, either as shares (polls) or absolute counts (history).
/// Callers treat `dem + rep + other` as the whole electorate; nothing here
/// enforces a sum-to-one invariant.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct VoteResult {
    pub dem: f64,
    pub rep: f64,
    pub other: f64,
}

impl VoteResult {
    pub fn new(dem: f64, rep: f64, other: f64) -> Self {
        Self { dem, rep, other }
    }

    pub fn total(&self) -> f64 {
        self.dem + self.rep + self.other
    }

    /// Signed dem advantage. The form used for share-valued poll results.
    pub fn margin(&self) -> f64 {
        self.dem - self.rep
    }

    /// Signed dem advantage as a share of the whole tally. The form used for
    /// absolute-count historical results.
    pub fn margin_share(&self) -> f64 {
        (self.dem - self.rep) / self.total()
    }
}

/// A poll source. `historical_bias` is the mean of (poll margin − resolved
/// result margin) over that source's past races; positive means the source
/// historically overstated the dem margin.
#[derive(Clone, Debug)]
pub struct Pollster {
    pub name: String,
    pub historical_bias: f64,
}

/// Explicit name→pollster table, passed to callers that want bias data rather
/// than living in process-global state.
#[derive(Clone, Debug, Default)]
pub struct PollsterDirectory {
    pollsters: BTreeMap<String, Pollster>,
}

impl PollsterDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pollster: Pollster) {
        self.pollsters.insert(pollster.name.clone(), pollster);
    }

    pub fn get(&self, name: &str) -> Option<&Pollster> {
        self.pollsters.get(name)
    }

    /// Build the directory from resolved historical races: one
    /// `(source, poll_margin, resolved_margin)` entry per matched poll.
    /// Each source's bias is the plain average of its poll-vs-result deltas.
    pub fn from_resolved_races<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, f64, f64)>,
    {
        let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for (name, poll_margin, resolved_margin) in pairs {
            let entry = sums.entry(name).or_insert((0.0, 0));
            entry.0 += poll_margin - resolved_margin;
            entry.1 += 1;
        }

        let mut directory = Self::new();
        for (name, (delta_sum, count)) in sums {
            directory.insert(Pollster {
                name,
                historical_bias: delta_sum / count as f64,
            });
        }
        directory
    }
}

/// One survey's reported result for a contest.
#[derive(Clone, Debug)]
pub struct Poll {
    /// Name of the source, resolvable through a [`PollsterDirectory`].
    pub source: String,
    pub date: SystemTime,
    pub result: VoteResult,
}

/// An entity being predicted: the national popular vote or any sub-contest.
///
/// `environment` is the historically-derived lean relative to the parent;
/// `predicted_environment` is an optional forward-looking override that takes
/// precedence when present. A contest with no polls and neither environment
/// field set is not predictable.
#[derive(Clone, Debug, Default)]
pub struct Contest {
    pub name: String,
    pub environment: Option<Normal>,
    pub predicted_environment: Option<Normal>,
    pub polls: Vec<Poll>,
}

impl Contest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn push_poll(&mut self, poll: Poll) {
        self.polls.push(poll);
    }
}

/// A sub-contest (e.g. a state): a [`Contest`] plus its unit weight and
/// historical result series.
#[derive(Clone, Debug)]
pub struct SubContest {
    pub contest: Contest,

    /// Unit weight toward the race total (elector count).
    pub electors: u32,

    /// Main historical series, year → absolute-count result.
    pub past_national_results: BTreeMap<i32, VoteResult>,

    /// Auxiliary down-ballot series used to refine the lean estimate.
    pub past_secondary_results: Option<BTreeMap<i32, VoteResult>>,

    /// Whether this sub-contest's history counts toward the per-year national
    /// sums. District-level entries overlap their at-large parent and must be
    /// excluded to avoid double counting.
    pub national_rollup: bool,
}

impl SubContest {
    pub fn new(name: impl Into<String>, electors: u32) -> Self {
        Self {
            contest: Contest::new(name),
            electors,
            past_national_results: BTreeMap::new(),
            past_secondary_results: None,
            national_rollup: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.contest.name
    }
}

/// The top-level aggregate being simulated: one national contest plus the
/// linked sub-contests keyed by name.
#[derive(Clone, Debug, Default)]
pub struct Race {
    pub national: Contest,
    pub sub_contests: BTreeMap<String, SubContest>,
}

impl Race {
    pub fn new(national: Contest) -> Self {
        Self {
            national,
            sub_contests: BTreeMap::new(),
        }
    }

    pub fn add_sub_contest(&mut self, sub: SubContest) {
        self.sub_contests.insert(sub.contest.name.clone(), sub);
    }

    /// Total unit weight across sub-contests.
    pub fn total_electors(&self) -> u32 {
        self.sub_contests.values().map(|s| s.electors).sum()
    }
}
