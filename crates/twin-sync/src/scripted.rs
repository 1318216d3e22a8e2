//! In-memory engine that replays a script.
//!
//! Enable the `test-fixtures` feature to use it from other crates' tests.
//! Steps, summaries, and state reads are served from queues; once the step
//! queue runs dry the engine keeps producing quiet one-unit steps so a loop
//! can run for as long as a test needs.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use twin_events::{EpisodeConfig, Snapshot, Station, Summary};

use crate::engine::SimEngine;
use crate::error::TransportError;

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum Scripted<T> {
    Ok(T),
    /// The server answers with this HTTP status.
    Fail(u16),
}

#[derive(Debug, Default)]
struct Script {
    reset: Option<Scripted<Snapshot>>,
    steps: VecDeque<Scripted<Snapshot>>,
    summaries: VecDeque<Scripted<Summary>>,
    states: VecDeque<Scripted<Snapshot>>,
    last: Option<Snapshot>,
    last_config: Option<EpisodeConfig>,
    last_speed: Option<f64>,
    step_latency: Duration,
    calls: Calls,
}

/// How often each engine call was made.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Calls {
    pub reset: usize,
    pub step: usize,
    pub state: usize,
    pub summary: usize,
}

/// Scripted [`SimEngine`] for tests.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    script: Mutex<Script>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot returned by every reset. Defaults to an empty line built
    /// from the requested config.
    pub fn on_reset(&self, snapshot: Snapshot) -> &Self {
        self.script().reset = Some(Scripted::Ok(snapshot));
        self
    }

    pub fn fail_reset(&self, status: u16) -> &Self {
        self.script().reset = Some(Scripted::Fail(status));
        self
    }

    pub fn push_step(&self, snapshot: Snapshot) -> &Self {
        self.script().steps.push_back(Scripted::Ok(snapshot));
        self
    }

    pub fn fail_step(&self, status: u16) -> &Self {
        self.script().steps.push_back(Scripted::Fail(status));
        self
    }

    pub fn push_summary(&self, summary: Summary) -> &Self {
        self.script().summaries.push_back(Scripted::Ok(summary));
        self
    }

    pub fn fail_summary(&self, status: u16) -> &Self {
        self.script().summaries.push_back(Scripted::Fail(status));
        self
    }

    pub fn push_state(&self, snapshot: Snapshot) -> &Self {
        self.script().states.push_back(Scripted::Ok(snapshot));
        self
    }

    pub fn fail_state(&self, status: u16) -> &Self {
        self.script().states.push_back(Scripted::Fail(status));
        self
    }

    /// Makes every step take `latency` of (tokio) time to answer.
    pub fn with_step_latency(&self, latency: Duration) -> &Self {
        self.script().step_latency = latency;
        self
    }

    pub fn calls(&self) -> Calls {
        self.script().calls
    }

    pub fn last_config(&self) -> Option<EpisodeConfig> {
        self.script().last_config.clone()
    }

    pub fn last_speed(&self) -> Option<f64> {
        self.script().last_speed
    }
}

fn failure(endpoint: &'static str, status: u16) -> TransportError {
    TransportError::Status {
        endpoint,
        status,
        body: "scripted failure".into(),
    }
}

fn empty_line(config: &EpisodeConfig) -> Snapshot {
    Snapshot {
        buffers: (0..config.n_stations.saturating_sub(1))
            .map(|i| (format!("b{}{}", i + 1, i + 2), 0))
            .collect(),
        stations: vec![Station::default(); config.n_stations],
        workers_available: config.workers,
        workers_total: config.workers,
        ..Default::default()
    }
}

/// Next quiet step after `last`: one more time unit, no event.
fn quiet_step(last: Option<&Snapshot>) -> Snapshot {
    let mut next = last.cloned().unwrap_or_default();
    next.t_start = next.t_end;
    next.t_end += 1.0;
    next.t = next.t_end;
    next.event = None;
    next
}

impl SimEngine for ScriptedEngine {
    async fn reset(&self, config: &EpisodeConfig) -> Result<Snapshot, TransportError> {
        let mut script = self.script();
        script.calls.reset += 1;
        script.last_config = Some(config.clone());
        let snapshot = match script.reset.clone() {
            Some(Scripted::Fail(status)) => return Err(failure("/sim/reset", status)),
            Some(Scripted::Ok(snapshot)) => snapshot,
            None => empty_line(config),
        };
        script.last = Some(snapshot.clone());
        Ok(snapshot)
    }

    async fn step(&self, speed_mult: f64) -> Result<Snapshot, TransportError> {
        let latency = self.script().step_latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let mut script = self.script();
        script.calls.step += 1;
        script.last_speed = Some(speed_mult);
        let snapshot = match script.steps.pop_front() {
            Some(Scripted::Fail(status)) => return Err(failure("/sim/step", status)),
            Some(Scripted::Ok(snapshot)) => snapshot,
            None => quiet_step(script.last.as_ref()),
        };
        script.last = Some(snapshot.clone());
        Ok(snapshot)
    }

    async fn state(&self) -> Result<Snapshot, TransportError> {
        let mut script = self.script();
        script.calls.state += 1;
        match script.states.pop_front() {
            Some(Scripted::Fail(status)) => Err(failure("/sim/state", status)),
            Some(Scripted::Ok(snapshot)) => {
                script.last = Some(snapshot.clone());
                Ok(snapshot)
            }
            None => Ok(script.last.clone().unwrap_or_default()),
        }
    }

    async fn summary(&self) -> Result<Summary, TransportError> {
        let mut script = self.script();
        script.calls.summary += 1;
        match script.summaries.pop_front() {
            Some(Scripted::Fail(status)) => Err(failure("/sim/summary", status)),
            Some(Scripted::Ok(summary)) => Ok(summary),
            None => Ok(Summary {
                total_jobs: 100,
                ..Default::default()
            }),
        }
    }
}
