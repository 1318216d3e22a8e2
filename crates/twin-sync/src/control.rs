//! The step/summary control loop.
//!
//! One [`ControlLoop`] drives one server session. `begin()` repeatedly steps
//! the simulation, ingests each snapshot into the shared store, and checks
//! the episode summary on a throttle until the episode completes, the loop
//! is stopped, or a reset supersedes it.
//!
//! ```text
//!          begin()                       stop() / error / done
//!   Idle ───────────▶ Running ──────────────────────────────▶ Idle
//!                       │ ▲
//!                       └─┘ step → ingest → summary? → sleep
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use twin_events::{EpisodeConfig, Summary};

use crate::engine::SimEngine;
use crate::error::SyncError;
use crate::settings::ControlSettings;
use crate::store::SharedStore;

/// Pacing of the loop.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSettings {
    /// Pause after every iteration.
    pub step_delay: Duration,
    /// Minimum gap between summary fetches.
    pub summary_interval: Duration,
    /// Sent with every step.
    pub speed_mult: f64,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_millis(150),
            summary_interval: Duration::from_millis(500),
            speed_mult: 1.0,
        }
    }
}

impl From<&ControlSettings> for LoopSettings {
    fn from(control: &ControlSettings) -> Self {
        Self {
            step_delay: control.step_delay(),
            summary_interval: control.summary_interval(),
            speed_mult: control.speed_mult,
        }
    }
}

/// Why `begin()` returned.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopExit {
    /// The server reported every job done.
    Completed(Summary),
    /// `stop()` was called.
    Stopped,
    /// A reset started a new episode while this loop was running.
    Superseded,
    /// Another `begin()` already owns the loop; nothing was done.
    AlreadyRunning,
}

/// Drives a [`SimEngine`] and feeds the shared store.
pub struct ControlLoop<E> {
    engine: Arc<E>,
    store: SharedStore,
    running: AtomicBool,
    /// Bumped by every `begin()` and `reset()`; a loop whose generation is
    /// no longer current exits at its next check.
    generation: AtomicU64,
    episode: Mutex<EpisodeConfig>,
    settings: LoopSettings,
}

impl<E: SimEngine> ControlLoop<E> {
    pub fn new(engine: Arc<E>, store: SharedStore, settings: LoopSettings) -> Self {
        Self {
            engine,
            store,
            running: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            episode: Mutex::new(EpisodeConfig::default()),
            settings,
        }
    }

    /// Sets the config used by implicit resets.
    pub fn with_episode(self, config: EpisodeConfig) -> Self {
        *self.episode_lock() = config;
        self
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Config of the current (or next) episode.
    pub fn episode(&self) -> EpisodeConfig {
        self.episode_lock().clone()
    }

    fn episode_lock(&self) -> MutexGuard<'_, EpisodeConfig> {
        self.episode.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Asks a running loop to finish after its current iteration.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("control loop stop requested");
        }
    }

    /// Starts a fresh episode and shows its first snapshot.
    ///
    /// A running loop is stopped first. A step it still has in flight is
    /// dropped when it lands.
    pub async fn reset(&self, config: EpisodeConfig) -> Result<(), SyncError> {
        config.validate()?;
        self.stop();
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.reset_episode(&config).await?;
        *self.episode_lock() = config;
        Ok(())
    }

    async fn reset_episode(&self, config: &EpisodeConfig) -> Result<(), SyncError> {
        info!(
            seed = ?config.seed,
            n_jobs = config.n_jobs,
            n_stations = config.n_stations,
            workers = config.workers,
            "resetting episode"
        );
        let snapshot = self.engine.reset(config).await?;
        let mut store = self.store.lock();
        store.reset();
        store.ingest(snapshot);
        Ok(())
    }

    /// Runs the loop until it completes, stops, or fails.
    ///
    /// Returns at once with [`LoopExit::AlreadyRunning`] when another call
    /// owns the loop. Transport errors end the loop and are returned as is.
    pub async fn begin(&self) -> Result<LoopExit, SyncError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("control loop already running");
            return Ok(LoopExit::AlreadyRunning);
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(generation, "control loop started");

        let result = self.run(generation).await;
        self.halt(generation);

        match &result {
            Ok(LoopExit::Completed(summary)) => info!(
                jobs_completed = summary.jobs_completed,
                makespan = summary.makespan,
                "episode complete"
            ),
            Ok(exit) => info!(?exit, "control loop finished"),
            Err(e) => error!(error = %e, "control loop failed"),
        }
        result
    }

    /// Clears the running flag unless a newer loop owns it.
    fn halt(&self, generation: u64) {
        if self.generation.load(Ordering::SeqCst) == generation {
            self.running.store(false, Ordering::SeqCst);
        }
    }

    async fn run(&self, generation: u64) -> Result<LoopExit, SyncError> {
        let has_snapshot = self.store.lock().has_snapshot();
        if !has_snapshot {
            let config = self.episode();
            self.reset_episode(&config).await?;
        }
        let epoch = self.store.lock().epoch();
        let mut last_summary: Option<Instant> = None;

        loop {
            if self.generation.load(Ordering::SeqCst) != generation {
                return Ok(LoopExit::Superseded);
            }
            if !self.running.load(Ordering::SeqCst) {
                return Ok(LoopExit::Stopped);
            }

            let snapshot = self.engine.step(self.settings.speed_mult).await?;
            debug!(t_end = snapshot.t_end, event = ?snapshot.event, "step");
            let ingested = self.store.lock().ingest_in_epoch(epoch, snapshot);
            if !ingested {
                warn!("episode was reset during a step, dropping its snapshot");
                return Ok(LoopExit::Superseded);
            }

            let due = last_summary.map_or(true, |at| at.elapsed() >= self.settings.summary_interval);
            if due {
                let summary = self.engine.summary().await?;
                last_summary = Some(Instant::now());
                let complete = summary.is_complete();
                self.store.lock().set_summary(summary.clone());
                if complete {
                    return Ok(LoopExit::Completed(summary));
                }
            }

            tokio::time::sleep(self.settings.step_delay).await;
        }
    }
}
