//! Temporal interpolation between the previous and current snapshot.
//!
//! Each snapshot covers a simulated interval of arbitrary length. The blend
//! clock maps that interval onto a wall-clock window and advances a fraction
//! `alpha` from 0 to 1 across it, driven by frame time.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use twin_events::{ordered_buffer_keys, Snapshot, Station};

/// Wall-clock milliseconds spent per simulated time unit.
pub const RENDER_MS_PER_SIM_UNIT: f64 = 150.0;
/// Shortest transition, so even zero-length steps are visible.
pub const MIN_RENDER_MS: f64 = 120.0;
/// Longest transition, so long steps do not lag behind the server.
pub const MAX_RENDER_MS: f64 = 1500.0;

/// Crossfade point for categorical station state.
const STATION_SWITCH_ALPHA: f32 = 0.5;

/// Wall-clock window used to show `sim_dt` simulated time units.
pub fn render_duration(sim_dt: f64) -> Duration {
    let ms = sim_dt * RENDER_MS_PER_SIM_UNIT;
    let ms = if ms.is_finite() {
        ms.clamp(MIN_RENDER_MS, MAX_RENDER_MS)
    } else {
        MIN_RENDER_MS
    };
    Duration::from_micros((ms * 1000.0).round() as u64)
}

/// Frame-driven blend fraction.
#[derive(Debug, Clone)]
pub struct BlendClock {
    window: f32,
    elapsed: f32,
    alpha: f32,
}

impl Default for BlendClock {
    /// Nothing to blend: fully on the current snapshot.
    fn default() -> Self {
        Self {
            window: MIN_RENDER_MS as f32 / 1000.0,
            elapsed: 0.0,
            alpha: 1.0,
        }
    }
}

impl BlendClock {
    /// Starts a new window for a freshly landed snapshot.
    ///
    /// The very first snapshot has nothing to blend from and shows at once.
    pub fn restart(&mut self, previous: Option<&Snapshot>, current: &Snapshot) {
        self.window = render_duration(current.sim_dt(previous)).as_secs_f32();
        self.elapsed = 0.0;
        self.alpha = if previous.is_some() { 0.0 } else { 1.0 };
    }

    /// Advances by one frame and returns the new alpha.
    pub fn advance(&mut self, dt: f32) -> f32 {
        if self.alpha >= 1.0 {
            return 1.0;
        }
        self.elapsed += dt.max(0.0);
        self.alpha = if self.elapsed >= self.window {
            1.0
        } else {
            (self.elapsed / self.window).clamp(0.0, 1.0)
        };
        self.alpha
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Length of the current window in seconds.
    pub fn window_secs(&self) -> f32 {
        self.window
    }

    pub fn is_settled(&self) -> bool {
        self.alpha >= 1.0
    }
}

/// Interpolated fill level of one buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferLevel {
    pub key: String,
    pub level: f32,
}

/// Linearly blends buffer levels key by key, in line order.
///
/// Keys missing from `previous` take the current level directly.
pub fn blend_buffers(previous: Option<&Snapshot>, current: &Snapshot, alpha: f32) -> Vec<BufferLevel> {
    ordered_buffer_keys(current.buffers.keys())
        .into_iter()
        .map(|key| {
            let curr = current.buffers[key] as f32;
            let level = match previous.and_then(|p| p.buffers.get(key)) {
                Some(&prev) => prev as f32 * (1.0 - alpha) + curr * alpha,
                None => curr,
            };
            BufferLevel {
                key: key.to_string(),
                level,
            }
        })
        .collect()
}

/// Picks the station record to display for each position.
///
/// Status is categorical, so the previous record holds until the midpoint
/// and then switches. Positions the previous snapshot lacks switch at once.
pub fn crossfade_stations(previous: Option<&Snapshot>, current: &Snapshot, alpha: f32) -> Vec<Station> {
    current
        .stations
        .iter()
        .enumerate()
        .map(|(i, curr)| {
            let prev = previous.and_then(|p| p.stations.get(i));
            match prev {
                Some(prev) if alpha < STATION_SWITCH_ALPHA => prev.clone(),
                _ => curr.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use twin_events::{fixtures, StationStatus};

    #[test]
    fn test_render_duration_bounds() {
        assert_eq!(render_duration(0.0), Duration::from_millis(120));
        assert_eq!(render_duration(10.0), Duration::from_millis(1500));
        assert_eq!(render_duration(2.0), Duration::from_millis(300));
        assert_eq!(render_duration(f64::NAN), Duration::from_millis(120));
    }

    #[test]
    fn test_first_snapshot_shows_immediately() {
        let mut clock = BlendClock::default();
        let snap = fixtures::snapshot(0.0, 3.0, 3, 2);
        clock.restart(None, &snap);
        assert_eq!(clock.alpha(), 1.0);
        assert_eq!(clock.advance(0.016), 1.0);
    }

    #[test]
    fn test_alpha_monotone_and_exact() {
        let prev = fixtures::snapshot(0.0, 1.0, 3, 2);
        let curr = fixtures::snapshot(1.0, 3.0, 3, 2);
        let mut clock = BlendClock::default();
        clock.restart(Some(&prev), &curr);
        assert_eq!(clock.alpha(), 0.0);
        assert!((clock.window_secs() - 0.3).abs() < 1e-6);

        let mut last = 0.0;
        for _ in 0..40 {
            let a = clock.advance(1.0 / 60.0);
            assert!(a >= last);
            assert!(a <= 1.0);
            last = a;
        }
        assert_eq!(last, 1.0);
        assert!(clock.is_settled());
    }

    #[test]
    fn test_jittery_frames_reach_one() {
        let prev = fixtures::snapshot(0.0, 1.0, 3, 2);
        let curr = fixtures::snapshot(1.0, 1.0, 3, 2);
        let mut clock = BlendClock::default();
        clock.restart(Some(&prev), &curr);

        // 120 ms window
        assert!(clock.advance(0.05) < 1.0);
        assert!(clock.advance(0.0) < 1.0);
        assert!(clock.advance(-1.0) < 1.0);
        assert_eq!(clock.advance(0.5), 1.0);
        assert_eq!(clock.advance(0.5), 1.0);
    }

    #[test]
    fn test_blend_buffers() {
        let prev = fixtures::with_buffer(fixtures::snapshot(0.0, 1.0, 3, 2), "b12", 4);
        let curr = fixtures::with_buffer(fixtures::snapshot(1.0, 2.0, 3, 2), "b12", 0);

        let at_start = blend_buffers(Some(&prev), &curr, 0.0);
        assert_eq!(at_start[0].key, "b12");
        assert_eq!(at_start[0].level, 4.0);

        let midway = blend_buffers(Some(&prev), &curr, 0.25);
        assert_eq!(midway[0].level, 3.0);

        let no_prev = blend_buffers(None, &curr, 0.25);
        assert_eq!(no_prev[0].level, 0.0);
    }

    #[test]
    fn test_new_buffer_key_is_instant() {
        let prev = fixtures::snapshot(0.0, 1.0, 2, 2);
        let curr = fixtures::with_buffer(fixtures::snapshot(1.0, 2.0, 3, 2), "b23", 5);
        let levels = blend_buffers(Some(&prev), &curr, 0.1);
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[1].key, "b23");
        assert_eq!(levels[1].level, 5.0);
    }

    #[test]
    fn test_station_crossfade() {
        let prev = fixtures::snapshot(0.0, 1.0, 2, 2);
        let curr = fixtures::with_failure(fixtures::snapshot(1.0, 2.0, 3, 2), 1);

        let early = crossfade_stations(Some(&prev), &curr, 0.49);
        assert_eq!(early.len(), 3);
        assert_eq!(early[1].status, StationStatus::Idle);
        // No previous record for the third station
        assert_eq!(early[2], curr.stations[2]);

        let late = crossfade_stations(Some(&prev), &curr, 0.5);
        assert_eq!(late[1].status, StationStatus::Down);
    }
}
