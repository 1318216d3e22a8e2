//! Per-frame glue between the store and the renderer.
//!
//! The renderer calls [`FrameDriver::advance`] once per frame with the
//! locked store. New snapshots restart the blend clock and feed the worker
//! dispatcher; every frame then advances both by the frame time and returns
//! an owned [`FrameView`] the renderer can read after the lock is released.

use serde::{Deserialize, Serialize};

use twin_events::{Snapshot, Station, Summary};

use crate::blend::{blend_buffers, crossfade_stations, BlendClock, BufferLevel};
use crate::dispatch::{Dispatch, Worker, WorkerDispatch};
use crate::layout::FloorLayout;
use crate::store::{FailureEvent, SnapshotStore};

/// Line-wide aggregates of the current snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LineTotals {
    pub t_end: f64,
    pub throughput: u64,
    pub wip: u64,
    pub blocked: u32,
    pub starved: u32,
    pub down: u32,
    pub workers_available: usize,
    pub workers_total: usize,
}

impl From<&Snapshot> for LineTotals {
    fn from(snap: &Snapshot) -> Self {
        Self {
            t_end: snap.t_end,
            throughput: snap.throughput,
            wip: snap.wip,
            blocked: snap.blocked,
            starved: snap.starved,
            down: snap.down,
            workers_available: snap.workers_available,
            workers_total: snap.workers_total,
        }
    }
}

/// Everything the renderer draws in one frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameView {
    pub revision: u64,
    pub alpha: f32,
    pub buffers: Vec<BufferLevel>,
    pub stations: Vec<Station>,
    pub workers: Vec<Worker>,
    pub layout: FloorLayout,
    /// Oldest first.
    pub failures: Vec<FailureEvent>,
    /// `None` until the first snapshot lands.
    pub totals: Option<LineTotals>,
    pub summary: Option<Summary>,
}

/// Frame-side state: blend clock and worker crew.
#[derive(Debug, Default)]
pub struct FrameDriver {
    clock: BlendClock,
    dispatch: WorkerDispatch,
    seen_revision: Option<u64>,
    seen_epoch: u64,
    last_dispatch: Option<Dispatch>,
}

impl FrameDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&self) -> &WorkerDispatch {
        &self.dispatch
    }

    /// Outcome of the most recently observed event.
    pub fn last_dispatch(&self) -> Option<Dispatch> {
        self.last_dispatch
    }

    /// Advances one frame of `dt` seconds.
    ///
    /// Every event ingested since the last frame is applied in order, so
    /// snapshots that landed between two frames still move workers.
    pub fn advance(&mut self, store: &SnapshotStore, dt: f32) -> FrameView {
        if self.seen_revision != Some(store.revision()) {
            let seen = self.seen_revision.replace(store.revision());
            if store.epoch() != self.seen_epoch {
                self.seen_epoch = store.epoch();
                self.dispatch.forget_events();
            }
            if let Some(current) = store.current() {
                self.clock.restart(store.previous(), current);
                self.last_dispatch = Some(self.catch_up(store, seen, current));
            }
        }

        let alpha = self.clock.advance(dt);
        self.dispatch.advance(dt);

        let Some(current) = store.current() else {
            return FrameView {
                revision: store.revision(),
                alpha,
                workers: self.dispatch.workers().to_vec(),
                layout: *self.dispatch.layout(),
                summary: store.summary().cloned(),
                ..Default::default()
            };
        };
        let previous = store.previous();

        FrameView {
            revision: store.revision(),
            alpha,
            buffers: blend_buffers(previous, current, alpha),
            stations: crossfade_stations(previous, current, alpha),
            workers: self.dispatch.workers().to_vec(),
            layout: *self.dispatch.layout(),
            failures: store.failures().iter().copied().collect(),
            totals: Some(LineTotals::from(current)),
            summary: store.summary().cloned(),
        }
    }

    fn catch_up(
        &mut self,
        store: &SnapshotStore,
        seen: Option<u64>,
        current: &Snapshot,
    ) -> Dispatch {
        self.dispatch.sync_crew(current);
        let mut outcome = Dispatch::Ignored;
        for stored in store.events_since(seen) {
            outcome = self.dispatch.apply(stored.t_end, stored.event);
        }
        self.dispatch.reconcile(current);
        outcome
    }
}
