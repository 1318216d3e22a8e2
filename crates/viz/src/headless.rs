//! Headless mode: drive the server without a window.
//!
//! Either steps the episode through the control loop, logging progress, or
//! (`--fast-forward`) resets and lets the server run it to completion in one
//! request. Both end with the episode summary.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use twin_events::Summary;
use twin_sync::{
    ControlLoop, HttpEngine, LoopExit, LoopSettings, Settings, SharedStore, SimEngine, SyncError,
    TransportError,
};

/// How often stepping progress is logged.
const PROGRESS_EVERY: Duration = Duration::from_secs(2);

/// Errors from a headless run.
#[derive(Debug, thiserror::Error)]
pub enum HeadlessError {
    #[error("could not start async runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("control loop ended before the episode finished")]
    Interrupted,
}

/// Installs the fmt subscriber, filtered by `RUST_LOG` (default `info`).
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();
}

/// Runs one episode against the configured server and returns its summary.
pub fn run(settings: &Settings, fast_forward: bool) -> Result<Summary, HeadlessError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("twin-sync")
        .enable_all()
        .build()?;
    let engine = Arc::new(HttpEngine::new(&settings.server)?);
    let control = ControlLoop::new(
        engine,
        SharedStore::new(),
        LoopSettings::from(&settings.control),
    )
    .with_episode(settings.episode.clone());

    info!(
        server = control.engine().base_url(),
        fast_forward, "headless run starting"
    );

    runtime.block_on(async {
        if fast_forward {
            fast_forward_episode(&control).await
        } else {
            step_episode(&control).await
        }
    })
}

/// Resets, then asks the server to finish the episode in one call.
pub async fn fast_forward_episode(
    control: &ControlLoop<HttpEngine>,
) -> Result<Summary, HeadlessError> {
    control.reset(control.episode()).await?;
    let summary = control.engine().run_to_finish().await?;
    control.store().lock().set_summary(summary.clone());
    Ok(summary)
}

/// Runs the control loop to completion, logging progress as it goes.
pub async fn step_episode<E: SimEngine>(control: &ControlLoop<E>) -> Result<Summary, HeadlessError> {
    let mut ticker = tokio::time::interval(PROGRESS_EVERY);
    let run = control.begin();
    tokio::pin!(run);

    let exit = loop {
        tokio::select! {
            exit = &mut run => break exit?,
            _ = ticker.tick() => log_progress(control.store()),
        }
    };

    match exit {
        LoopExit::Completed(summary) => Ok(summary),
        other => {
            info!(?other, "control loop ended early");
            Err(HeadlessError::Interrupted)
        }
    }
}

fn log_progress(store: &SharedStore) {
    let store = store.lock();
    if let Some(snapshot) = store.current() {
        info!(
            t = snapshot.t_end,
            throughput = snapshot.throughput,
            wip = snapshot.wip,
            down = snapshot.down,
            "progress"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use twin_events::fixtures;
    use twin_sync::ScriptedEngine;

    fn quick_settings() -> LoopSettings {
        LoopSettings {
            step_delay: Duration::from_millis(10),
            summary_interval: Duration::from_millis(20),
            speed_mult: 1.0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_episode_returns_final_summary() {
        let engine = Arc::new(ScriptedEngine::new());
        engine
            .push_summary(fixtures::summary(3, 1))
            .push_summary(fixtures::summary(3, 3));
        let control = ControlLoop::new(engine, SharedStore::new(), quick_settings());

        let summary = step_episode(&control).await.unwrap();
        assert_eq!(summary.jobs_completed, 3);
        assert!(!control.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_episode_surfaces_step_errors() {
        let engine = Arc::new(ScriptedEngine::new());
        engine.fail_step(500);
        let control = ControlLoop::new(engine, SharedStore::new(), quick_settings());

        let err = step_episode(&control).await.unwrap_err();
        assert!(matches!(err, HeadlessError::Sync(SyncError::Transport(_))));
    }
}
