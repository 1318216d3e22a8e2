//! End-to-end tests of the synchronization core.
//!
//! A scripted engine stands in for the simulation server. Tests run on a
//! paused tokio clock so the loop's pacing sleeps cost no real time.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use twin_events::{fixtures, EpisodeConfig};
use twin_sync::{
    ControlLoop, Dispatch, FrameDriver, LoopExit, LoopSettings, PollOutcome, Poller,
    ScriptedEngine, SharedStore, SyncError, TransportError, WorkerState,
};

fn setup(engine: ScriptedEngine) -> (Arc<ControlLoop<ScriptedEngine>>, SharedStore) {
    let store = SharedStore::new();
    let ctl = ControlLoop::new(Arc::new(engine), store.clone(), LoopSettings::default());
    (Arc::new(ctl), store)
}

/// Two workers, one failure: exactly one worker walks over and starts repairing.
#[tokio::test(start_paused = true)]
async fn test_single_failure_dispatches_one_worker() {
    let engine = ScriptedEngine::new();
    engine
        .on_reset(fixtures::snapshot(0.0, 0.0, 3, 2))
        .push_step(fixtures::with_failure(fixtures::snapshot(0.0, 5.0, 3, 2), 1))
        .push_summary(fixtures::summary(10, 10));
    let (ctl, store) = setup(engine);

    let exit = ctl.begin().await.unwrap();
    assert!(matches!(exit, LoopExit::Completed(_)));

    let mut driver = FrameDriver::new();
    let view = driver.advance(&store.lock(), 1.0 / 60.0);
    let moving: Vec<_> = view
        .workers
        .iter()
        .filter(|w| w.state == WorkerState::ToStation)
        .collect();
    assert_eq!(moving.len(), 1);
    assert_eq!(moving[0].target_station, Some(1));

    let mut view = view;
    for _ in 0..300 {
        view = driver.advance(&store.lock(), 1.0 / 60.0);
    }
    assert_eq!(view.workers[0].state, WorkerState::Repairing);
    assert_eq!(view.workers[0].position, view.layout.walkway(1));
}

/// With every worker busy a new failure is logged but nobody is reassigned.
#[test]
fn test_saturated_crew_still_logs_failure() {
    let first = fixtures::with_failure(fixtures::snapshot(3.0, 4.0, 3, 2), 0);
    let second = fixtures::with_down(
        fixtures::with_failure(fixtures::snapshot(4.0, 5.0, 3, 2), 1),
        0,
    );
    let third = fixtures::with_down(
        fixtures::with_down(fixtures::with_failure(fixtures::snapshot(5.0, 6.0, 3, 2), 2), 0),
        1,
    );

    let store = SharedStore::new();
    let mut driver = FrameDriver::new();
    for snap in [first, second] {
        store.lock().ingest(snap);
        driver.advance(&store.lock(), 0.1);
    }
    let before = driver.dispatch().workers().to_vec();

    store.lock().ingest(third);
    let view = driver.advance(&store.lock(), 0.0);
    assert_eq!(driver.last_dispatch(), Some(Dispatch::Saturated { station: 2 }));
    assert_eq!(view.workers, before);

    let logged: Vec<_> = view.failures.iter().map(|f| (f.time, f.station)).collect();
    assert_eq!(logged, vec![(4.0, 0), (5.0, 1), (6.0, 2)]);
}

/// A finished summary mid-loop ends the loop.
#[tokio::test(start_paused = true)]
async fn test_finished_summary_ends_loop() {
    let engine = ScriptedEngine::new();
    engine
        .push_summary(fixtures::summary(50, 20))
        .push_summary(fixtures::summary(50, 50));
    let (ctl, store) = setup(engine);

    let exit = ctl.begin().await.unwrap();
    assert_eq!(exit, LoopExit::Completed(fixtures::summary(50, 50)));
    assert!(!ctl.is_running());
    assert_eq!(store.lock().summary(), Some(&fixtures::summary(50, 50)));
}

#[tokio::test(start_paused = true)]
async fn test_step_error_leaves_loop_idle() {
    let engine = ScriptedEngine::new();
    engine
        .push_step(fixtures::snapshot(0.0, 1.0, 3, 2))
        .fail_step(503);
    let (ctl, store) = setup(engine);

    let err = ctl.begin().await.unwrap_err();
    match err {
        SyncError::Transport(TransportError::Status { endpoint, status, .. }) => {
            assert_eq!(endpoint, "/sim/step");
            assert_eq!(status, 503);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!ctl.is_running());
    assert_eq!(store.lock().current().map(|s| s.t_end), Some(1.0));
    assert_eq!(ctl.engine().calls().step, 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_mid_loop() {
    let (ctl, _store) = setup(ScriptedEngine::new());

    let task = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.begin().await }
    });
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert!(ctl.is_running());
    let steps_at_stop = ctl.engine().calls().step;

    ctl.stop();
    let exit = task.await.unwrap().unwrap();
    assert_eq!(exit, LoopExit::Stopped);
    assert!(!ctl.is_running());
    assert!(ctl.engine().calls().step <= steps_at_stop + 1);
}

#[tokio::test(start_paused = true)]
async fn test_second_begin_is_noop() {
    let (ctl, _store) = setup(ScriptedEngine::new());

    let task = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.begin().await }
    });
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(ctl.begin().await.unwrap(), LoopExit::AlreadyRunning);
    assert!(ctl.is_running());

    ctl.stop();
    assert_eq!(task.await.unwrap().unwrap(), LoopExit::Stopped);
}

/// A step still in flight when a reset lands must not overwrite the new episode.
#[tokio::test(start_paused = true)]
async fn test_reset_supersedes_in_flight_step() {
    let engine = ScriptedEngine::new();
    engine
        .on_reset(fixtures::snapshot(0.0, 0.0, 3, 2))
        .with_step_latency(Duration::from_millis(400));
    let (ctl, store) = setup(engine);

    let task = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.begin().await }
    });
    // The first step is answered at 400 ms
    tokio::time::sleep(Duration::from_millis(100)).await;
    ctl.reset(EpisodeConfig::default()).await.unwrap();
    let epoch = store.lock().epoch();

    let exit = task.await.unwrap().unwrap();
    assert_eq!(exit, LoopExit::Superseded);
    assert!(!ctl.is_running());

    let store = store.lock();
    assert_eq!(store.epoch(), epoch);
    assert_eq!(store.current().map(|s| s.t_end), Some(0.0));
    assert!(store.previous().is_none());
}

/// Seeing the same snapshot on two revisions assigns at most one worker.
#[test]
fn test_repeated_snapshot_assigns_once() {
    let failed = fixtures::with_failure(fixtures::snapshot(0.0, 5.0, 3, 3), 1);
    let store = SharedStore::new();
    let mut driver = FrameDriver::new();

    store.lock().ingest(failed.clone());
    driver.advance(&store.lock(), 0.0);
    store.lock().ingest(failed);
    driver.advance(&store.lock(), 0.0);

    assert_eq!(driver.last_dispatch(), Some(Dispatch::Duplicate));
    assert_eq!(driver.dispatch().assigned_stations(), vec![1]);
}

/// Crew size follows `workers_total`, keeping the first workers intact.
#[test]
fn test_crew_follows_workers_total() {
    let store = SharedStore::new();
    let mut driver = FrameDriver::new();
    store
        .lock()
        .ingest(fixtures::with_failure(fixtures::snapshot(0.0, 1.0, 3, 3), 2));
    driver.advance(&store.lock(), 0.5);
    let first = driver.dispatch().workers()[0].clone();

    for (i, n) in [5usize, 1, 4].into_iter().enumerate() {
        let t = 1.0 + i as f64;
        let snap = fixtures::with_down(fixtures::snapshot(t, t + 1.0, 3, n), 2);
        store.lock().ingest(snap);
        let view = driver.advance(&store.lock(), 0.0);
        assert_eq!(view.workers.len(), n);
        assert_eq!(view.workers[0], first);
    }
}

/// Across a long random-looking run no station is covered twice.
#[tokio::test(start_paused = true)]
async fn test_no_station_covered_twice() {
    let engine = ScriptedEngine::new();
    engine.on_reset(fixtures::snapshot(0.0, 0.0, 4, 2));
    let mut down = [false; 4];
    for i in 0..30 {
        let t = i as f64;
        let station = (i * 5 + 1) % 4;
        let mut snap = fixtures::snapshot(t, t + 1.0, 4, 2);
        if down[station] {
            down[station] = false;
            snap = fixtures::with_repair(snap, station);
        } else {
            down[station] = true;
            snap = fixtures::with_failure(snap, station);
        }
        for (s, is_down) in down.iter().enumerate() {
            if *is_down {
                snap = fixtures::with_down(snap, s);
            }
        }
        engine.push_step(snap);
    }
    let (ctl, store) = setup(engine);

    let task = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.begin().await }
    });

    let mut driver = FrameDriver::new();
    for _ in 0..400 {
        tokio::time::sleep(Duration::from_millis(16)).await;
        let view = driver.advance(&store.lock(), 0.016);
        let targets: Vec<usize> = view
            .workers
            .iter()
            .filter(|w| w.is_assigned())
            .filter_map(|w| w.target_station)
            .collect();
        let unique: HashSet<usize> = targets.iter().copied().collect();
        assert_eq!(targets.len(), unique.len());
    }

    ctl.stop();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_poller_keeps_state_through_errors() {
    let engine = Arc::new(ScriptedEngine::new());
    engine
        .push_state(fixtures::sample_snapshot())
        .fail_state(500)
        .fail_state(500);
    let store = SharedStore::new();
    let poller = Poller::new(Arc::clone(&engine), store.clone());

    assert_eq!(poller.poll_once().await, PollOutcome::Updated);
    assert_eq!(poller.poll_once().await, PollOutcome::Failed);
    assert_eq!(poller.poll_once().await, PollOutcome::Failed);
    assert_eq!(poller.poll_once().await, PollOutcome::Unchanged);

    let view = FrameDriver::new().advance(&store.lock(), 0.0);
    assert_eq!(view.totals.map(|t| t.t_end), Some(5.0));
    assert_eq!(view.failures.len(), 1);
}
