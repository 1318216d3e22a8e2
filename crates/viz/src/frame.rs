//! Frame driving: turns the shared store into this frame's view.
//!
//! Runs before every other Update system so that scenery, workers, and the
//! HUD all draw from the same [`FrameView`].

use bevy::prelude::*;

use twin_sync::{FrameDriver, FrameView};

use crate::runner::Session;

/// Plugin that advances interpolation and the repair crew each frame.
pub struct FramePlugin;

impl Plugin for FramePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CurrentFrame>()
            .add_event::<SnapshotLandedEvent>()
            .add_systems(Update, drive_frame.in_set(FrameSet));
    }
}

/// Systems that produce the frame view. Readers run `.after(FrameSet)`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameSet;

/// The view for the current frame plus the driver that produced it.
#[derive(Resource, Default)]
pub struct CurrentFrame {
    driver: FrameDriver,
    pub view: FrameView,
}

impl CurrentFrame {
    /// Time of the newest snapshot, or zero before the first one.
    pub fn t_end(&self) -> f64 {
        self.view.totals.as_ref().map(|t| t.t_end).unwrap_or(0.0)
    }

    pub fn has_snapshot(&self) -> bool {
        self.view.totals.is_some()
    }
}

/// Event emitted when a new store revision is first drawn.
#[derive(Event)]
pub struct SnapshotLandedEvent {
    pub revision: u64,
}

/// System to advance the frame driver against the locked store.
fn drive_frame(
    time: Res<Time>,
    session: Option<Res<Session>>,
    mut frame: ResMut<CurrentFrame>,
    mut landed: EventWriter<SnapshotLandedEvent>,
) {
    let Some(session) = session else {
        return;
    };

    let previous_revision = frame.view.revision;
    let view = {
        let store = session.store().lock();
        frame.driver.advance(&store, time.delta_seconds())
    };

    if view.revision != previous_revision {
        landed.send(SnapshotLandedEvent {
            revision: view.revision,
        });
    }
    frame.view = view;
}
