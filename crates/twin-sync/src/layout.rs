//! Floor plan of the production line.
//!
//! Positions here are a client-side fiction: the server only reports station
//! indices. Coordinates are `(x, z)` on the ground plane.

use serde::{Deserialize, Serialize};

/// Distance between neighbouring stations along the line.
pub const STATION_SPACING: f32 = 3.2;
/// Depth of the walkway where workers stand in front of a station.
pub const WALKWAY_DEPTH: f32 = 1.4;
/// How far left of the first station the depot sits.
pub const DEPOT_OFFSET_X: f32 = 2.6;
/// Depth of the depot.
pub const DEPOT_DEPTH: f32 = 3.0;

/// A point on the factory floor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FloorPos {
    pub x: f32,
    pub z: f32,
}

impl FloorPos {
    pub const fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    pub fn distance(self, other: FloorPos) -> f32 {
        ((other.x - self.x).powi(2) + (other.z - self.z).powi(2)).sqrt()
    }

    /// Moves `step` units toward `target`, snapping onto it when within reach.
    ///
    /// Returns true when the target was reached.
    pub fn step_toward(&mut self, target: FloorPos, step: f32) -> bool {
        let distance = self.distance(target);
        if distance <= step {
            *self = target;
            return true;
        }
        let f = step / distance;
        self.x += (target.x - self.x) * f;
        self.z += (target.z - self.z) * f;
        false
    }
}

/// Station placement for a line of `n` stations centred on the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorLayout {
    n_stations: usize,
}

impl Default for FloorLayout {
    fn default() -> Self {
        Self::new(3)
    }
}

impl FloorLayout {
    pub fn new(n_stations: usize) -> Self {
        Self {
            n_stations: n_stations.max(1),
        }
    }

    pub fn n_stations(&self) -> usize {
        self.n_stations
    }

    /// X coordinate of station `index`.
    pub fn station_x(&self, index: usize) -> f32 {
        let centre = (self.n_stations as f32 - 1.0) / 2.0;
        (index as f32 - centre) * STATION_SPACING
    }

    /// Where the station itself stands.
    pub fn station(&self, index: usize) -> FloorPos {
        FloorPos::new(self.station_x(index), 0.0)
    }

    /// Where a worker stands to repair station `index`.
    pub fn walkway(&self, index: usize) -> FloorPos {
        FloorPos::new(self.station_x(index), WALKWAY_DEPTH)
    }

    /// Midpoint between station `index` and the next one.
    pub fn buffer(&self, index: usize) -> FloorPos {
        FloorPos::new(self.station_x(index) + STATION_SPACING / 2.0, 0.0)
    }

    /// Rendezvous point of idle workers.
    pub fn depot(&self) -> FloorPos {
        FloorPos::new(self.station_x(0) - DEPOT_OFFSET_X, DEPOT_DEPTH)
    }
}
