//! Snapshot history and the derived failure log.
//!
//! The store keeps exactly two snapshots: the newest one and the one before
//! it. That pair is all the interpolator needs. Failure events are pulled
//! out of each ingested snapshot into a short ring buffer for display, and
//! every event is queued with its revision so a frame that lands after
//! several ingests can still apply each one.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use twin_events::{SimEvent, Snapshot, Summary};

/// Number of failure events kept for display.
pub const FAILURE_LOG_CAPACITY: usize = 8;

/// Number of recent events kept for frame-side consumers.
pub const EVENT_QUEUE_CAPACITY: usize = 64;

/// A station breakdown observed in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FailureEvent {
    /// `t_end` of the snapshot that reported it.
    pub time: f64,
    pub station: usize,
}

/// A snapshot event together with the store revision it arrived at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoredEvent {
    pub revision: u64,
    /// `t_end` of the snapshot that carried it.
    pub t_end: f64,
    pub event: SimEvent,
}

/// Current and previous snapshot plus derived history.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: Option<Snapshot>,
    previous: Option<Snapshot>,
    summary: Option<Summary>,
    failures: VecDeque<FailureEvent>,
    events: VecDeque<StoredEvent>,
    /// Bumped on every ingest and reset.
    revision: u64,
    /// Bumped on every reset.
    epoch: u64,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `snapshot` as current, shifting the old current to previous.
    pub fn ingest(&mut self, snapshot: Snapshot) {
        if let Some(station) = snapshot.failed_station() {
            self.failures.push_back(FailureEvent {
                time: snapshot.t_end,
                station,
            });
            while self.failures.len() > FAILURE_LOG_CAPACITY {
                self.failures.pop_front();
            }
        }
        self.revision += 1;
        if let Some(event) = snapshot.event {
            self.events.push_back(StoredEvent {
                revision: self.revision,
                t_end: snapshot.t_end,
                event,
            });
            while self.events.len() > EVENT_QUEUE_CAPACITY {
                self.events.pop_front();
            }
        }
        self.previous = self.current.replace(snapshot);
    }

    /// Ingests only if no reset happened since `epoch` was read.
    ///
    /// Returns false and leaves the store untouched for a stale snapshot.
    pub fn ingest_in_epoch(&mut self, epoch: u64, snapshot: Snapshot) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.ingest(snapshot);
        true
    }

    /// Forgets all snapshots, the summary, the failure log, and queued events.
    pub fn reset(&mut self) {
        self.current = None;
        self.previous = None;
        self.summary = None;
        self.failures.clear();
        self.events.clear();
        self.revision += 1;
        self.epoch += 1;
    }

    pub fn set_summary(&mut self, summary: Summary) {
        self.summary = Some(summary);
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.current.as_ref()
    }

    pub fn previous(&self) -> Option<&Snapshot> {
        self.previous.as_ref()
    }

    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    /// Failure log, oldest first.
    pub fn failures(&self) -> &VecDeque<FailureEvent> {
        &self.failures
    }

    /// Queued events that arrived after revision `seen`, oldest first.
    ///
    /// `None` means nothing has been seen yet and returns every queued event.
    pub fn events_since(&self, seen: Option<u64>) -> impl Iterator<Item = &StoredEvent> + '_ {
        self.events
            .iter()
            .filter(move |e| seen.map_or(true, |seen| e.revision > seen))
    }

    pub fn has_snapshot(&self) -> bool {
        self.current.is_some()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Store handle shared by the control loop and the frame driver.
///
/// Both mutators go through this mutex. It is never held across an
/// `.await`.
#[derive(Debug, Clone, Default)]
pub struct SharedStore(Arc<Mutex<SnapshotStore>>);

impl SharedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the store.
    ///
    /// A poisoned lock is recovered: the store holds plain values that stay
    /// consistent even if a holder panicked.
    pub fn lock(&self) -> MutexGuard<'_, SnapshotStore> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
