//! Snapshot Types
//!
//! A snapshot is one observation of the production line, covering the
//! simulated interval `[t_start, t_end]` that the server advanced through
//! since the previous decision point.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::event::{self, SimEvent};

/// Operating status of a station.
///
/// Sent on the wire as an integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StationStatus {
    #[default]
    Idle,
    Working,
    Blocked,
    Down,
}

impl TryFrom<u8> for StationStatus {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(StationStatus::Idle),
            1 => Ok(StationStatus::Working),
            2 => Ok(StationStatus::Blocked),
            3 => Ok(StationStatus::Down),
            other => Err(format!("unknown station status code {}", other)),
        }
    }
}

impl From<StationStatus> for u8 {
    fn from(status: StationStatus) -> Self {
        match status {
            StationStatus::Idle => 0,
            StationStatus::Working => 1,
            StationStatus::Blocked => 2,
            StationStatus::Down => 3,
        }
    }
}

impl fmt::Display for StationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationStatus::Idle => write!(f, "idle"),
            StationStatus::Working => write!(f, "working"),
            StationStatus::Blocked => write!(f, "blocked"),
            StationStatus::Down => write!(f, "down"),
        }
    }
}

/// Per-station state
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Station {
    pub status: StationStatus,
    /// Processing time left on the current part.
    #[serde(default)]
    pub remaining: f64,
    /// Exponential moving average of the busy fraction.
    #[serde(default)]
    pub util_ema: f64,
    #[serde(default)]
    pub starved: bool,
    #[serde(default)]
    pub blocked: bool,
    #[serde(default)]
    pub down: bool,
    #[serde(default)]
    pub repairing: bool,
    #[serde(default)]
    pub repair_remaining: f64,
}

impl Station {
    /// True when the server reports this station broken.
    pub fn is_down(&self) -> bool {
        self.down || self.status == StationStatus::Down
    }
}

/// Full line snapshot
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Simulation clock when the snapshot was taken.
    #[serde(default)]
    pub t: f64,
    pub t_start: f64,
    pub t_end: f64,
    #[serde(default, with = "event::wire")]
    pub event: Option<SimEvent>,
    /// Buffer key (`b12`, `b23`, ...) to fill level.
    #[serde(default)]
    pub buffers: BTreeMap<String, u32>,
    #[serde(default)]
    pub stations: Vec<Station>,
    /// Parts finished during this interval.
    #[serde(default)]
    pub throughput: u64,
    #[serde(default)]
    pub wip: u64,
    #[serde(default)]
    pub blocked: u32,
    #[serde(default)]
    pub starved: u32,
    #[serde(default)]
    pub down: u32,
    #[serde(default)]
    pub workers_available: usize,
    #[serde(default)]
    pub workers_total: usize,
    #[serde(default)]
    pub avg_processing_time: f64,
    #[serde(default)]
    pub avg_processing_speed: f64,
}

impl Snapshot {
    /// Simulated time covered since `previous`, never negative.
    ///
    /// Without a previous snapshot the interval is measured from `t_start`.
    pub fn sim_dt(&self, previous: Option<&Snapshot>) -> f64 {
        let from = previous.map(|p| p.t_end).unwrap_or(self.t_start);
        (self.t_end - from).max(0.0)
    }

    /// Station that failed during this interval, if any.
    pub fn failed_station(&self) -> Option<usize> {
        self.event
            .filter(|e| e.kind.is_failure())
            .map(|e| e.station)
    }

    /// Buffer levels in line order.
    pub fn ordered_buffers(&self) -> Vec<(&str, u32)> {
        ordered_buffer_keys(self.buffers.keys())
            .into_iter()
            .map(|k| (k, self.buffers[k]))
            .collect()
    }

    /// Get the state of a station by index.
    pub fn station(&self, index: usize) -> Option<&Station> {
        self.stations.get(index)
    }
}

/// Sorts buffer keys into line order.
///
/// Keys concatenate the two neighbouring station numbers, so a longer key is
/// always further down the line (`b910` before `b1011`).
pub fn ordered_buffer_keys<'a>(keys: impl IntoIterator<Item = &'a String>) -> Vec<&'a str> {
    let mut keys: Vec<&str> = keys.into_iter().map(String::as_str).collect();
    keys.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventKind;

    const SAMPLE: &str = r#"{
        "t": 12.5, "t_start": 10.0, "t_end": 12.5,
        "event": {"type": "machine_failure", "station": 1},
        "buffers": {"b12": 3, "b23": 0},
        "stations": [
            {"status": 1, "remaining": 1.5, "util_ema": 0.4, "starved": false,
             "blocked": false, "down": false, "repairing": false, "repair_remaining": 0.0},
            {"status": 3, "remaining": 0.0, "util_ema": 0.2, "starved": false,
             "blocked": false, "down": true, "repairing": true, "repair_remaining": 58.0},
            {"status": 0, "remaining": 0.0, "util_ema": 0.1, "starved": true,
             "blocked": false, "down": false, "repairing": false, "repair_remaining": 0.0}
        ],
        "throughput": 0, "wip": 5, "blocked": 0, "starved": 1, "down": 1,
        "workers_available": 2, "workers_total": 3,
        "avg_processing_time": 4.5, "avg_processing_speed": 0.222
    }"#;

    #[test]
    fn test_parse_sample_snapshot() {
        let snap: Snapshot = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(snap.stations.len(), 3);
        assert_eq!(snap.stations[1].status, StationStatus::Down);
        assert!(snap.stations[1].is_down());
        assert_eq!(snap.event.map(|e| e.kind), Some(EventKind::MachineFailure));
        assert_eq!(snap.failed_station(), Some(1));
        assert_eq!(snap.workers_total, 3);
    }

    #[test]
    fn test_station_status_codes() {
        assert_eq!(StationStatus::try_from(2), Ok(StationStatus::Blocked));
        assert!(StationStatus::try_from(9).is_err());
        assert_eq!(serde_json::to_string(&StationStatus::Down).unwrap(), "3");
        assert!(serde_json::from_str::<StationStatus>("7").is_err());
    }

    #[test]
    fn test_sim_dt() {
        let snap: Snapshot = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(snap.sim_dt(None), 2.5);

        let prev = Snapshot {
            t_end: 11.0,
            ..Default::default()
        };
        assert_eq!(snap.sim_dt(Some(&prev)), 1.5);

        let later = Snapshot {
            t_end: 20.0,
            ..Default::default()
        };
        assert_eq!(snap.sim_dt(Some(&later)), 0.0);
    }

    #[test]
    fn test_buffer_key_order() {
        let keys: Vec<String> = ["b1011", "b23", "b910", "b12"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(ordered_buffer_keys(&keys), vec!["b12", "b23", "b910", "b1011"]);
    }
}
