//! Passive state polling.
//!
//! When another client drives the simulation, the viewer can still follow
//! along by reading `/sim/state` on an interval. Failures here are never
//! fatal: the last known state stays on screen.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use twin_events::Snapshot;

use crate::engine::SimEngine;
use crate::store::SharedStore;

/// Result of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A new snapshot was ingested.
    Updated,
    /// The server state matches what is already shown.
    Unchanged,
    /// The request failed; the store was left alone.
    Failed,
}

/// Reads server state into the store without advancing the simulation.
pub struct Poller<E> {
    engine: Arc<E>,
    store: SharedStore,
    running: AtomicBool,
}

impl<E: SimEngine> Poller<E> {
    pub fn new(engine: Arc<E>, store: SharedStore) -> Self {
        Self {
            engine,
            store,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Fetches the state once and ingests it if it is news.
    pub async fn poll_once(&self) -> PollOutcome {
        let epoch = self.store.lock().epoch();
        let snapshot = match self.engine.state().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "state poll failed, keeping last known state");
                return PollOutcome::Failed;
            }
        };

        let mut store = self.store.lock();
        if !is_news(store.current(), &snapshot) {
            return PollOutcome::Unchanged;
        }
        if store.ingest_in_epoch(epoch, snapshot) {
            debug!(revision = store.revision(), "polled new state");
            PollOutcome::Updated
        } else {
            PollOutcome::Unchanged
        }
    }

    /// Polls every `interval` until [`Poller::stop`] is called.
    pub async fn run(&self, interval: Duration) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(interval_ms = interval.as_millis() as u64, "passive polling started");
        while self.running.load(Ordering::SeqCst) {
            self.poll_once().await;
            tokio::time::sleep(interval).await;
        }
        info!("passive polling stopped");
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// A polled snapshot is news when nothing is shown yet, or when it is not
/// older than the current one and its end time or event differs.
///
/// An older snapshot is a response that was overtaken by a step.
fn is_news(current: Option<&Snapshot>, polled: &Snapshot) -> bool {
    match current {
        None => true,
        Some(current) if polled.t_end < current.t_end => false,
        Some(current) => current.t_end != polled.t_end || current.event != polled.event,
    }
}
