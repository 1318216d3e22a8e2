//! Discrete simulation events.
//!
//! Each snapshot carries at most one event: the one that ended the simulated
//! interval. The server sends `{"type": ..., "station": ...}` and may send
//! `null` for either field (or for the whole object) when no event fired,
//! for example right after a reset.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Kind of event that closed a simulated interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A station finished processing a part.
    ServiceComplete,
    /// A working station broke down.
    MachineFailure,
    /// A repair crew finished fixing a station.
    RepairComplete,
    /// Any kind this client does not know about.
    #[serde(other)]
    Other,
}

impl EventKind {
    /// Returns the wire name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::ServiceComplete => "service_complete",
            EventKind::MachineFailure => "machine_failure",
            EventKind::RepairComplete => "repair_complete",
            EventKind::Other => "other",
        }
    }

    /// Returns true for station breakdowns.
    pub fn is_failure(self) -> bool {
        matches!(self, EventKind::MachineFailure)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event at a specific station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimEvent {
    pub kind: EventKind,
    pub station: usize,
}

impl SimEvent {
    pub fn new(kind: EventKind, station: usize) -> Self {
        Self { kind, station }
    }

    pub fn failure(station: usize) -> Self {
        Self::new(EventKind::MachineFailure, station)
    }

    pub fn repair(station: usize) -> Self {
        Self::new(EventKind::RepairComplete, station)
    }
}

/// Shape of the event object as sent by the server.
#[derive(Serialize, Deserialize)]
struct WireEvent {
    #[serde(rename = "type", default)]
    kind: Option<EventKind>,
    #[serde(default)]
    station: Option<usize>,
}

/// Serde adapter for `Option<SimEvent>` fields.
///
/// A missing field, `null`, or an object with a `null` type or station all
/// decode to `None`.
pub(crate) mod wire {
    use super::*;

    pub fn serialize<S>(event: &Option<SimEvent>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let wire = match event {
            Some(e) => WireEvent {
                kind: Some(e.kind),
                station: Some(e.station),
            },
            None => WireEvent {
                kind: None,
                station: None,
            },
        };
        wire.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SimEvent>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = Option::<WireEvent>::deserialize(deserializer)?;
        Ok(wire.and_then(|w| {
            Some(SimEvent {
                kind: w.kind?,
                station: w.station?,
            })
        }))
    }
}
