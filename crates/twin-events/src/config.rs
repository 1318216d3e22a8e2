//! Episode configuration sent with a reset request.
//!
//! An episode config is fixed for the lifetime of a run; it only changes by
//! resetting the simulation with a new one.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing-time distribution of a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcDist {
    /// Uniform on `[0, 2 * mean)`.
    #[default]
    Uniform,
    /// Exponential with the given mean.
    Exp,
}

/// One distribution for the whole line, or one per station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProcDists {
    All(ProcDist),
    PerStation(Vec<ProcDist>),
}

impl Default for ProcDists {
    fn default() -> Self {
        ProcDists::All(ProcDist::Uniform)
    }
}

/// Parameters of one simulation episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeConfig {
    /// Random seed; `None` lets the server pick one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub n_jobs: u32,
    pub n_stations: usize,
    /// Capacity of each inter-station buffer (`n_stations - 1` entries).
    pub buffer_caps: Vec<u32>,
    /// Mean processing time per station.
    pub proc_means: Vec<f64>,
    pub proc_dists: ProcDists,
    /// Smoothing factor of the utilization moving average.
    pub util_alpha: f64,
    /// Probability that a started job triggers a breakdown.
    pub fail_rate: f64,
    /// Simulated time a repair takes.
    pub repair_time: f64,
    /// Size of the repair crew.
    pub workers: usize,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            seed: None,
            n_jobs: 100,
            n_stations: 3,
            buffer_caps: vec![5, 5],
            proc_means: vec![4.0, 5.0, 4.5],
            proc_dists: ProcDists::default(),
            util_alpha: 0.1,
            fail_rate: 0.01,
            repair_time: 60.0,
            workers: 3,
        }
    }
}

impl EpisodeConfig {
    /// Checks the shape constraints the server enforces on reset.
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if self.n_stations < 1 {
            return Err(InvalidConfig::new("need at least one station"));
        }
        if self.buffer_caps.len() != self.n_stations - 1 {
            return Err(InvalidConfig::new(format!(
                "buffer_caps has {} entries, expected {}",
                self.buffer_caps.len(),
                self.n_stations - 1
            )));
        }
        if self.proc_means.len() != self.n_stations {
            return Err(InvalidConfig::new(format!(
                "proc_means has {} entries, expected {}",
                self.proc_means.len(),
                self.n_stations
            )));
        }
        if let ProcDists::PerStation(dists) = &self.proc_dists {
            if dists.len() != self.n_stations {
                return Err(InvalidConfig::new(format!(
                    "proc_dists has {} entries, expected {}",
                    dists.len(),
                    self.n_stations
                )));
            }
        }
        if !(self.util_alpha > 0.0 && self.util_alpha <= 1.0) {
            return Err(InvalidConfig::new("util_alpha must be in (0, 1]"));
        }
        if self.fail_rate < 0.0 || self.repair_time < 0.0 {
            return Err(InvalidConfig::new(
                "fail_rate and repair_time must not be negative",
            ));
        }
        Ok(())
    }

    /// Resizes the per-station vectors to a new station count.
    ///
    /// New stations copy the last existing mean and capacity.
    pub fn with_stations(mut self, n_stations: usize) -> Self {
        let n = n_stations.max(1);
        let last_mean = self.proc_means.last().copied().unwrap_or(4.0);
        let last_cap = self.buffer_caps.last().copied().unwrap_or(5);
        self.proc_means.resize(n, last_mean);
        self.buffer_caps.resize(n - 1, last_cap);
        if let ProcDists::PerStation(dists) = &mut self.proc_dists {
            let last = dists.last().copied().unwrap_or_default();
            dists.resize(n, last);
        }
        self.n_stations = n;
        self
    }
}

/// Reason an episode config was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidConfig(pub String);

impl InvalidConfig {
    fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

impl fmt::Display for InvalidConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid episode config: {}", self.0)
    }
}

impl std::error::Error for InvalidConfig {}
