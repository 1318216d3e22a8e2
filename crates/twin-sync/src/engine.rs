//! Contract of the remote simulation engine.

use std::future::Future;

use twin_events::{EpisodeConfig, Snapshot, Summary};

use crate::error::TransportError;

/// A discrete-event simulation reachable through request/response calls.
///
/// Every call may fail; callers decide whether to surface or swallow the
/// error, nothing is retried here. Futures are `Send` so the control loop
/// can run on a multi-threaded runtime.
pub trait SimEngine: Send + Sync + 'static {
    /// Starts a new episode and returns its initial snapshot.
    fn reset(
        &self,
        config: &EpisodeConfig,
    ) -> impl Future<Output = Result<Snapshot, TransportError>> + Send;

    /// Applies a speed multiplier and advances to the next decision point.
    fn step(&self, speed_mult: f64)
        -> impl Future<Output = Result<Snapshot, TransportError>> + Send;

    /// Reads the current snapshot without advancing.
    fn state(&self) -> impl Future<Output = Result<Snapshot, TransportError>> + Send;

    /// Reads the cumulative episode counters.
    fn summary(&self) -> impl Future<Output = Result<Summary, TransportError>> + Send;
}
