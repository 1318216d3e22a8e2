//! Episode summary counters.

use serde::{Deserialize, Serialize};

/// Cumulative statistics for the running episode.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    pub total_jobs: u64,
    pub jobs_completed: u64,
    /// Simulated time elapsed so far.
    #[serde(default)]
    pub makespan: f64,
    #[serde(default)]
    pub avg_wip: f64,
    #[serde(default)]
    pub avg_util: f64,
    #[serde(default)]
    pub throughput_rate: f64,
    #[serde(default)]
    pub down_stations: u32,
    #[serde(default)]
    pub workers_available: usize,
    #[serde(default)]
    pub workers_total: usize,
}

impl Summary {
    /// True once every job of a non-empty episode has left the line.
    pub fn is_complete(&self) -> bool {
        self.total_jobs > 0 && self.jobs_completed >= self.total_jobs
    }

    /// Completed fraction in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.total_jobs == 0 {
            0.0
        } else {
            (self.jobs_completed as f64 / self.total_jobs as f64).min(1.0)
        }
    }
}
