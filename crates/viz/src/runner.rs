//! Session runner: owns the connection to the simulation server.
//!
//! The control loop and the poller run as tasks on a private tokio runtime.
//! They write snapshots straight into the shared store; everything else they
//! have to say (reset done, loop ended, poll failed) comes back to the frame
//! thread through a report channel drained once per frame.

use bevy::prelude::*;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use twin_events::{EpisodeConfig, Summary};
use twin_sync::{
    ControlLoop, HttpEngine, LoopExit, LoopSettings, PollOutcome, Poller, Settings, SharedStore,
    TransportError,
};

/// Plugin for the server session and its keyboard controls.
pub struct RunnerPlugin;

impl Plugin for RunnerPlugin {
    fn build(&self, app: &mut App) {
        // Session and RunnerConfig should be inserted by main.rs
        if !app.world().contains_resource::<RunnerConfig>() {
            app.init_resource::<RunnerConfig>();
        }

        app.init_resource::<RunStatus>()
            .add_event::<RunEvent>()
            .add_systems(Startup, start_passive_polling)
            .add_systems(Update, (auto_start, drain_reports, handle_run_input).chain());
    }
}

/// How the viewer drives the server.
#[derive(Resource, Clone, Default)]
pub struct RunnerConfig {
    pub settings: Settings,
    /// Begin stepping on the first frame.
    pub auto_start: bool,
    /// Poll server state in the background instead of stepping.
    pub passive: bool,
}

/// Errors creating a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("could not start async runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Message from a background task to the frame thread.
#[derive(Debug, Clone, PartialEq)]
pub enum RunReport {
    ResetDone(Result<(), String>),
    LoopEnded(Result<LoopExit, String>),
    Polled(PollOutcome),
}

/// What the runner is doing, as shown in the HUD.
#[derive(Resource, Debug, Clone, PartialEq, Default)]
pub enum RunStatus {
    /// Connected, not stepping.
    #[default]
    Idle,
    /// A reset request is in flight.
    Resetting,
    /// The control loop is stepping the server.
    Running,
    /// The server reported every job done.
    Completed(Summary),
    /// The last request failed.
    Failed(String),
}

impl RunStatus {
    /// Folds one report into the status, returning the event to announce.
    pub fn apply(&mut self, report: &RunReport) -> Option<RunEvent> {
        match report {
            RunReport::ResetDone(Ok(())) => {
                *self = RunStatus::Idle;
                Some(RunEvent::Reset)
            }
            RunReport::ResetDone(Err(error)) | RunReport::LoopEnded(Err(error)) => {
                *self = RunStatus::Failed(error.clone());
                Some(RunEvent::Failed(error.clone()))
            }
            RunReport::LoopEnded(Ok(LoopExit::Completed(summary))) => {
                *self = RunStatus::Completed(summary.clone());
                Some(RunEvent::Completed(summary.clone()))
            }
            RunReport::LoopEnded(Ok(LoopExit::Stopped)) => {
                if *self == RunStatus::Running {
                    *self = RunStatus::Idle;
                }
                Some(RunEvent::Stopped)
            }
            // A reset took over, or the loop was already ours
            RunReport::LoopEnded(Ok(LoopExit::Superseded | LoopExit::AlreadyRunning)) => None,
            RunReport::Polled(_) => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunStatus::Idle => "idle",
            RunStatus::Resetting => "resetting",
            RunStatus::Running => "running",
            RunStatus::Completed(_) => "completed",
            RunStatus::Failed(_) => "failed",
        }
    }
}

/// Notable runner transitions.
#[derive(Event, Debug, Clone, PartialEq)]
pub enum RunEvent {
    Started,
    Reset,
    Stopped,
    Completed(Summary),
    Failed(String),
}

/// Live connection to one simulation server.
#[derive(Resource)]
pub struct Session {
    runtime: tokio::runtime::Runtime,
    control: Arc<ControlLoop<HttpEngine>>,
    poller: Arc<Poller<HttpEngine>>,
    store: SharedStore,
    poll_interval: Duration,
    reports_tx: Sender<RunReport>,
    /// Receiver for task reports (wrapped for thread safety).
    reports_rx: Mutex<Receiver<RunReport>>,
}

impl Session {
    /// Builds the runtime, HTTP client, loop, and poller for `settings`.
    pub fn connect(settings: &Settings) -> Result<Self, SessionError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("twin-sync")
            .enable_all()
            .build()?;
        let engine = Arc::new(HttpEngine::new(&settings.server)?);
        let store = SharedStore::new();
        let control = ControlLoop::new(
            Arc::clone(&engine),
            store.clone(),
            LoopSettings::from(&settings.control),
        )
        .with_episode(settings.episode.clone());
        let poller = Poller::new(engine, store.clone());
        let (reports_tx, reports_rx) = mpsc::channel();

        tracing::info!("Session ready for {}", settings.server.base_url);
        Ok(Self {
            runtime,
            control: Arc::new(control),
            poller: Arc::new(poller),
            store,
            poll_interval: settings.control.poll_interval(),
            reports_tx,
            reports_rx: Mutex::new(reports_rx),
        })
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        self.control.is_running()
    }

    /// Starts a new episode in the background.
    pub fn reset(&self, config: EpisodeConfig) {
        let control = Arc::clone(&self.control);
        let tx = self.reports_tx.clone();
        self.runtime.spawn(async move {
            let result = control.reset(config).await.map_err(|e| e.to_string());
            let _ = tx.send(RunReport::ResetDone(result));
        });
    }

    /// Starts the control loop in the background.
    pub fn begin(&self) {
        let control = Arc::clone(&self.control);
        let tx = self.reports_tx.clone();
        self.runtime.spawn(async move {
            let result = control.begin().await.map_err(|e| e.to_string());
            let _ = tx.send(RunReport::LoopEnded(result));
        });
    }

    pub fn stop(&self) {
        self.control.stop();
    }

    /// Reads the server state once.
    pub fn poll_once(&self) {
        let poller = Arc::clone(&self.poller);
        let tx = self.reports_tx.clone();
        self.runtime.spawn(async move {
            let outcome = poller.poll_once().await;
            let _ = tx.send(RunReport::Polled(outcome));
        });
    }

    /// Starts background polling at the configured interval.
    pub fn start_polling(&self) {
        let poller = Arc::clone(&self.poller);
        let interval = self.poll_interval;
        self.runtime.spawn(async move { poller.run(interval).await });
    }

    /// Takes every report that arrived since the last call.
    pub fn drain(&self) -> Vec<RunReport> {
        let mut reports = Vec::new();
        if let Ok(rx) = self.reports_rx.lock() {
            loop {
                match rx.try_recv() {
                    Ok(report) => reports.push(report),
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                }
            }
        }
        reports
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.control.stop();
        self.poller.stop();
    }
}

/// System to start background polling in passive mode.
fn start_passive_polling(config: Res<RunnerConfig>, session: Option<Res<Session>>) {
    if let (true, Some(session)) = (config.passive, session) {
        tracing::info!("Passive mode: following server state");
        session.start_polling();
    }
}

/// System to begin stepping on the first frame when requested.
fn auto_start(
    config: Res<RunnerConfig>,
    session: Option<Res<Session>>,
    mut status: ResMut<RunStatus>,
    mut events: EventWriter<RunEvent>,
    mut started: Local<bool>,
) {
    if *started || !config.auto_start || config.passive {
        return;
    }
    *started = true;
    if let Some(session) = session {
        session.begin();
        *status = RunStatus::Running;
        events.send(RunEvent::Started);
    }
}

/// System to fold task reports into the run status.
fn drain_reports(
    session: Option<Res<Session>>,
    mut status: ResMut<RunStatus>,
    mut events: EventWriter<RunEvent>,
) {
    let Some(session) = session else {
        return;
    };
    for report in session.drain() {
        if let RunReport::Polled(PollOutcome::Failed) = report {
            tracing::debug!("Poll failed, keeping last state");
        }
        if let Some(event) = status.apply(&report) {
            events.send(event);
        }
    }
}

/// System to handle runner keys.
fn handle_run_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    config: Res<RunnerConfig>,
    session: Option<Res<Session>>,
    mut status: ResMut<RunStatus>,
    mut events: EventWriter<RunEvent>,
) {
    let Some(session) = session else {
        return;
    };

    // S key: start/stop stepping
    if keyboard.just_pressed(KeyCode::KeyS) {
        if session.is_running() {
            tracing::info!("Stopping control loop...");
            session.stop();
        } else {
            tracing::info!("Starting control loop...");
            session.begin();
            *status = RunStatus::Running;
            events.send(RunEvent::Started);
        }
    }

    // R key: new episode
    if keyboard.just_pressed(KeyCode::KeyR) {
        tracing::info!("Resetting episode...");
        session.reset(config.settings.episode.clone());
        *status = RunStatus::Resetting;
    }

    // P key: one passive poll
    if keyboard.just_pressed(KeyCode::KeyP) {
        session.poll_once();
    }
}
