//! Integration tests for the viewer's non-rendering paths.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use twin_events::fixtures;
use twin_sync::{
    ControlLoop, FrameDriver, LoopExit, LoopSettings, ScriptedEngine, Settings, SharedStore,
    WorkerState,
};
use viz::cli::Args;
use viz::overlay::{failure_lines, hud_lines};
use viz::runner::{RunEvent, RunReport, RunStatus};

fn quick_settings() -> LoopSettings {
    LoopSettings {
        step_delay: Duration::from_millis(10),
        summary_interval: Duration::from_millis(10),
        speed_mult: 1.0,
    }
}

/// A failure stepped by the loop reaches the HUD and sends one worker.
#[tokio::test(start_paused = true)]
async fn test_failure_flows_from_loop_to_frame() {
    let engine = Arc::new(ScriptedEngine::new());
    engine
        .on_reset(fixtures::snapshot(0.0, 0.0, 3, 2))
        .push_step(fixtures::with_failure(fixtures::snapshot(0.0, 1.5, 3, 2), 1))
        .push_summary(fixtures::summary(4, 4));
    let control = ControlLoop::new(engine, SharedStore::new(), quick_settings());

    let exit = control.begin().await.unwrap();
    assert!(matches!(exit, LoopExit::Completed(_)));

    let mut status = RunStatus::Running;
    let event = status.apply(&RunReport::LoopEnded(Ok(exit)));
    assert!(matches!(event, Some(RunEvent::Completed(_))));

    let mut driver = FrameDriver::new();
    let view = {
        let store = control.store().lock();
        driver.advance(&store, 0.016)
    };

    assert_eq!(driver.dispatch().assigned_stations(), vec![1]);
    let walking = view
        .workers
        .iter()
        .filter(|w| w.state == WorkerState::ToStation)
        .count();
    assert_eq!(walking, 1);

    let hud = hud_lines(&view, &status);
    assert_eq!(hud[0], "Status: completed");
    assert!(hud.iter().any(|l| l.starts_with("Jobs: 4/4")));

    let failures = failure_lines(&view);
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("station 1 down"));
}

/// Flags win over the settings file, which wins over defaults.
#[test]
fn test_settings_file_with_flag_overrides() {
    let mut file_settings = Settings::default();
    file_settings.server.base_url = "http://sim.local:9000".into();
    file_settings.control.step_delay_ms = 40;
    file_settings.episode.workers = 3;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("viz.toml");
    std::fs::write(&path, file_settings.to_toml().unwrap()).unwrap();

    let path_arg = path.to_string_lossy().to_string();
    let args = Args::try_parse_from(["viz", "--settings", &path_arg, "--workers", "4"]).unwrap();
    let settings = args.settings().unwrap();

    assert_eq!(settings.server.base_url, "http://sim.local:9000");
    assert_eq!(settings.control.step_delay_ms, 40);
    assert_eq!(settings.episode.workers, 4);
}

/// A missing settings file is reported, not replaced by defaults.
#[test]
fn test_missing_settings_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let path_arg = path.to_string_lossy().to_string();

    let args = Args::try_parse_from(["viz", "--settings", &path_arg]).unwrap();
    assert!(args.settings().is_err());
}
