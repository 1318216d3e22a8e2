//! Repair crew dispatch.
//!
//! Workers walk from the depot to broken stations, repair them, and walk
//! back. The server only reports counts and events; the walking itself is
//! animated here and never feeds back into the simulation.
//!
//! ```text
//! Idle ──failure──▶ ToStation ──arrive──▶ Repairing
//!  ▲                                          │
//!  └────arrive──── ToHut ◀──repair_complete───┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use twin_events::{EventKind, SimEvent, Snapshot};

use crate::layout::{FloorLayout, FloorPos};

/// Walking speed in floor units per second.
pub const WORKER_SPEED: f32 = 2.4;

/// What a worker is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WorkerState {
    /// Standing at the depot.
    #[default]
    Idle,
    /// Walking to the station in `target_station`.
    ToStation,
    /// At the station, waiting for the server to report the repair done.
    Repairing,
    /// Walking back to the depot.
    ToHut,
}

impl WorkerState {
    pub fn is_moving(self) -> bool {
        matches!(self, WorkerState::ToStation | WorkerState::ToHut)
    }
}

/// One member of the repair crew.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    pub id: usize,
    pub state: WorkerState,
    pub position: FloorPos,
    /// Set while walking to or repairing a station.
    pub target_station: Option<usize>,
}

impl Worker {
    fn at_depot(id: usize, layout: &FloorLayout) -> Self {
        Self {
            id,
            state: WorkerState::Idle,
            position: layout.depot(),
            target_station: None,
        }
    }

    /// True while the worker covers a station.
    pub fn is_assigned(&self) -> bool {
        matches!(self.state, WorkerState::ToStation | WorkerState::Repairing)
    }

    /// Where the worker is heading, if moving.
    pub fn destination(&self, layout: &FloorLayout) -> Option<FloorPos> {
        match self.state {
            WorkerState::ToStation => self.target_station.map(|s| layout.walkway(s)),
            WorkerState::ToHut => Some(layout.depot()),
            WorkerState::Idle | WorkerState::Repairing => None,
        }
    }

    fn send_home(&mut self) {
        self.state = WorkerState::ToHut;
        self.target_station = None;
    }
}

/// Identity of a snapshot event, used to apply each event once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventKey {
    t_end_bits: u64,
    kind: EventKind,
    station: usize,
}

impl EventKey {
    pub fn new(t_end: f64, event: SimEvent) -> Self {
        Self {
            t_end_bits: t_end.to_bits(),
            kind: event.kind,
            station: event.station,
        }
    }

    pub fn of(snapshot: &Snapshot) -> Option<Self> {
        snapshot.event.map(|e| Self::new(snapshot.t_end, e))
    }
}

/// Result of feeding one event to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// An idle worker was sent to the station.
    Assigned { worker: usize, station: usize },
    /// Someone is already on the way or repairing.
    AlreadyCovered { station: usize },
    /// Every worker is busy; the failure stays unhandled on screen.
    Saturated { station: usize },
    /// The repairing worker turned back to the depot.
    Released { worker: usize, station: usize },
    /// Repair reported for a station nobody covered.
    Unmatched { station: usize },
    /// This exact event was applied before.
    Duplicate,
    /// No event, or a kind that does not move workers.
    Ignored,
}

/// Worker crew plus the dispatch rules.
#[derive(Debug, Clone)]
pub struct WorkerDispatch {
    workers: Vec<Worker>,
    layout: FloorLayout,
    last_event: Option<EventKey>,
    speed: f32,
}

impl Default for WorkerDispatch {
    fn default() -> Self {
        Self::new(0, FloorLayout::default())
    }
}

impl WorkerDispatch {
    pub fn new(n_workers: usize, layout: FloorLayout) -> Self {
        let mut dispatch = Self {
            workers: Vec::new(),
            layout,
            last_event: None,
            speed: WORKER_SPEED,
        };
        dispatch.resize(n_workers);
        dispatch
    }

    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    pub fn layout(&self) -> &FloorLayout {
        &self.layout
    }

    /// Stations currently covered by a worker.
    pub fn assigned_stations(&self) -> Vec<usize> {
        self.workers
            .iter()
            .filter(|w| w.is_assigned())
            .filter_map(|w| w.target_station)
            .collect()
    }

    /// Grows or shrinks the crew to `n`, keeping the first workers as they are.
    ///
    /// Every idle worker, old or new, is placed at the depot.
    pub fn resize(&mut self, n: usize) {
        if n != self.workers.len() {
            debug!(from = self.workers.len(), to = n, "resizing crew");
        }
        self.workers.truncate(n);
        let layout = self.layout;
        let start = self.workers.len();
        self.workers
            .extend((start..n).map(|id| Worker::at_depot(id, &layout)));
        self.pin_idle();
    }

    /// Switches to a new floor plan. Idle workers follow the depot.
    pub fn set_layout(&mut self, layout: FloorLayout) {
        if layout != self.layout {
            self.layout = layout;
            self.pin_idle();
        }
    }

    fn pin_idle(&mut self) {
        let depot = self.layout.depot();
        for worker in &mut self.workers {
            if worker.state == WorkerState::Idle {
                worker.position = depot;
            }
        }
    }

    /// Brings the crew in line with a newly landed snapshot.
    pub fn observe(&mut self, snapshot: &Snapshot) -> Dispatch {
        self.sync_crew(snapshot);
        let outcome = self.apply_event(snapshot);
        self.reconcile(snapshot);
        outcome
    }

    /// Follows the snapshot's station count and crew size.
    pub fn sync_crew(&mut self, snapshot: &Snapshot) {
        if !snapshot.stations.is_empty() {
            self.set_layout(FloorLayout::new(snapshot.stations.len()));
        }
        self.resize(snapshot.workers_total);
    }

    /// Applies the snapshot's event unless it was already applied.
    pub fn apply_event(&mut self, snapshot: &Snapshot) -> Dispatch {
        match snapshot.event {
            Some(event) => self.apply(snapshot.t_end, event),
            None => Dispatch::Ignored,
        }
    }

    /// Applies an event reported at `t_end` unless it was already applied.
    pub fn apply(&mut self, t_end: f64, event: SimEvent) -> Dispatch {
        let key = EventKey::new(t_end, event);
        if self.last_event == Some(key) {
            return Dispatch::Duplicate;
        }
        self.last_event = Some(key);

        match key.kind {
            EventKind::MachineFailure => self.on_failure(key.station),
            EventKind::RepairComplete => self.on_repair(key.station),
            EventKind::ServiceComplete | EventKind::Other => Dispatch::Ignored,
        }
    }

    /// Sends the first idle worker to `station` unless someone covers it.
    pub fn on_failure(&mut self, station: usize) -> Dispatch {
        if self
            .workers
            .iter()
            .any(|w| w.is_assigned() && w.target_station == Some(station))
        {
            return Dispatch::AlreadyCovered { station };
        }

        match self
            .workers
            .iter_mut()
            .find(|w| w.state == WorkerState::Idle)
        {
            Some(worker) => {
                worker.state = WorkerState::ToStation;
                worker.target_station = Some(station);
                debug!(worker = worker.id, station, "worker dispatched");
                Dispatch::Assigned {
                    worker: worker.id,
                    station,
                }
            }
            None => {
                debug!(station, "no idle worker for failure");
                Dispatch::Saturated { station }
            }
        }
    }

    /// Sends the worker covering `station` back to the depot.
    pub fn on_repair(&mut self, station: usize) -> Dispatch {
        match self
            .workers
            .iter_mut()
            .find(|w| w.is_assigned() && w.target_station == Some(station))
        {
            Some(worker) => {
                worker.send_home();
                Dispatch::Released {
                    worker: worker.id,
                    station,
                }
            }
            None => Dispatch::Unmatched { station },
        }
    }

    /// Releases workers whose station is no longer broken or no longer exists.
    ///
    /// The station named by the snapshot's own failure event is left alone.
    /// Returns how many workers were sent home.
    pub fn reconcile(&mut self, snapshot: &Snapshot) -> usize {
        if snapshot.stations.is_empty() {
            return 0;
        }
        let just_failed = snapshot.failed_station();
        let mut released = 0;
        for worker in self.workers.iter_mut().filter(|w| w.is_assigned()) {
            let Some(station) = worker.target_station else {
                continue;
            };
            if Some(station) == just_failed {
                continue;
            }
            let still_down = snapshot.station(station).is_some_and(|s| s.is_down());
            if !still_down {
                debug!(worker = worker.id, station, "station no longer down, recalling");
                worker.send_home();
                released += 1;
            }
        }
        released
    }

    /// Moves every walking worker by one frame.
    pub fn advance(&mut self, dt: f32) {
        let step = self.speed * dt.max(0.0);
        let layout = self.layout;
        for worker in &mut self.workers {
            if !worker.state.is_moving() {
                continue;
            }
            let Some(target) = worker.destination(&layout) else {
                // Walking to a station without a target: give up and go idle
                worker.state = WorkerState::Idle;
                worker.position = layout.depot();
                continue;
            };
            if worker.position.step_toward(target, step) {
                worker.state = match worker.state {
                    WorkerState::ToStation => WorkerState::Repairing,
                    _ => {
                        worker.target_station = None;
                        WorkerState::Idle
                    }
                };
            }
        }
    }

    /// Drops event history after a reset, when `t_end` starts over.
    pub fn forget_events(&mut self) {
        self.last_event = None;
    }
}
