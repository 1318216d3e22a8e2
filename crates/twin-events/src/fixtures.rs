//! Sample data fixtures for testing.
//!
//! This module provides ready-made snapshots and summaries for other crates
//! to use. Enable the `test-fixtures` feature to access these helpers.
//!
//! # Example
//!
//! ```ignore
//! // In your Cargo.toml:
//! // [dev-dependencies]
//! // twin-events = { path = "../twin-events", features = ["test-fixtures"] }
//!
//! use twin_events::fixtures;
//!
//! let snap = fixtures::snapshot(0.0, 5.0, 3, 2);
//! let failed = fixtures::with_failure(snap, 1);
//! ```

use crate::{EventKind, SimEvent, Snapshot, Station, StationStatus, Summary};

/// Returns the sample mid-run snapshot from the fixtures file.
///
/// Three stations, station 1 down after a failure at `t_end = 5.0`,
/// two workers in total.
pub fn sample_snapshot() -> Snapshot {
    let json = include_str!("../tests/fixtures/sample_snapshot.json");
    serde_json::from_str(json).expect("Failed to parse sample_snapshot.json")
}

/// Returns the snapshot the server answers a default reset with.
pub fn sample_reset() -> Snapshot {
    let json = include_str!("../tests/fixtures/sample_reset.json");
    serde_json::from_str(json).expect("Failed to parse sample_reset.json")
}

/// Returns a finished 50-job summary.
pub fn sample_summary() -> Summary {
    let json = include_str!("../tests/fixtures/sample_summary.json");
    serde_json::from_str(json).expect("Failed to parse sample_summary.json")
}

/// Builds a quiet snapshot covering `[t_start, t_end]`.
///
/// All stations idle, all buffers empty, every worker available.
pub fn snapshot(t_start: f64, t_end: f64, n_stations: usize, workers_total: usize) -> Snapshot {
    let buffers = (0..n_stations.saturating_sub(1))
        .map(|i| (format!("b{}{}", i + 1, i + 2), 0))
        .collect();
    Snapshot {
        t: t_end,
        t_start,
        t_end,
        event: None,
        buffers,
        stations: vec![Station::default(); n_stations],
        workers_available: workers_total,
        workers_total,
        ..Default::default()
    }
}

/// Marks `station` as failed during this interval.
pub fn with_failure(mut snap: Snapshot, station: usize) -> Snapshot {
    snap.event = Some(SimEvent::failure(station));
    if let Some(st) = snap.stations.get_mut(station) {
        st.status = StationStatus::Down;
        st.down = true;
    }
    snap.down = snap.stations.iter().filter(|s| s.is_down()).count() as u32;
    snap
}

/// Marks `station` as repaired during this interval.
pub fn with_repair(mut snap: Snapshot, station: usize) -> Snapshot {
    snap.event = Some(SimEvent::repair(station));
    if let Some(st) = snap.stations.get_mut(station) {
        st.status = StationStatus::Idle;
        st.down = false;
        st.repairing = false;
    }
    snap.down = snap.stations.iter().filter(|s| s.is_down()).count() as u32;
    snap
}

/// Keeps `station` reported as down without any event.
pub fn with_down(mut snap: Snapshot, station: usize) -> Snapshot {
    if let Some(st) = snap.stations.get_mut(station) {
        st.status = StationStatus::Down;
        st.down = true;
    }
    snap
}

/// Attaches an arbitrary event.
pub fn with_event(mut snap: Snapshot, kind: EventKind, station: usize) -> Snapshot {
    snap.event = Some(SimEvent::new(kind, station));
    snap
}

/// Sets one buffer level.
pub fn with_buffer(mut snap: Snapshot, key: &str, level: u32) -> Snapshot {
    snap.buffers.insert(key.to_string(), level);
    snap
}

/// Builds a summary with the given counters.
pub fn summary(total_jobs: u64, jobs_completed: u64) -> Summary {
    Summary {
        total_jobs,
        jobs_completed,
        ..Default::default()
    }
}
