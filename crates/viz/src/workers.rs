//! Repair crew rendering.
//!
//! Positions come straight from the frame view; walking is already
//! animated by the dispatcher, so this only mirrors it onto sprites.

use bevy::prelude::*;

use twin_sync::{FloorPos, WorkerState};

use crate::frame::{CurrentFrame, FrameSet};
use crate::scenery::floor_to_screen;

const WORKER_SIZE: Vec2 = Vec2::new(18.0, 28.0);

/// Plugin for worker sprites.
pub struct WorkerPlugin;

impl Plugin for WorkerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, sync_workers.after(FrameSet));
    }
}

/// Visual representation of one worker.
#[derive(Component)]
pub struct WorkerSprite {
    pub id: usize,
}

/// Sprite color for a worker state.
pub fn worker_color(state: WorkerState) -> Color {
    match state {
        WorkerState::Idle => Color::srgb(0.75, 0.75, 0.8),
        WorkerState::ToStation => Color::srgb(1.0, 0.75, 0.2),
        WorkerState::Repairing => Color::srgb(1.0, 0.45, 0.1),
        WorkerState::ToHut => Color::srgb(0.55, 0.8, 0.95),
    }
}

/// Floor distance from the depot over which the crowd offset fades out.
const DEPOT_SPREAD_RADIUS: f32 = 1.0;

/// Small sideways offset so workers at the depot do not stack.
fn idle_offset(id: usize) -> Vec2 {
    let col = (id % 4) as f32 - 1.5;
    let row = (id / 4) as f32;
    Vec2::new(col * 16.0, -row * 20.0)
}

/// System to reconcile worker sprites with the crew.
fn sync_workers(
    mut commands: Commands,
    frame: Res<CurrentFrame>,
    mut sprites: Query<(Entity, &WorkerSprite, &mut Sprite, &mut Transform)>,
) {
    let workers = &frame.view.workers;
    let depot = frame.view.layout.depot();
    let mut seen = vec![false; workers.len()];

    for (entity, worker_sprite, mut sprite, mut transform) in sprites.iter_mut() {
        let Some(worker) = workers.get(worker_sprite.id) else {
            commands.entity(entity).despawn_recursive();
            continue;
        };
        seen[worker.id] = true;
        sprite.color = worker_color(worker.state);
        transform.translation = screen_position(worker.id, worker.position, depot).extend(2.0);
    }

    for worker in workers.iter().filter(|w| !seen[w.id]) {
        let pos = screen_position(worker.id, worker.position, depot);
        commands.spawn((
            SpriteBundle {
                sprite: Sprite {
                    color: worker_color(worker.state),
                    custom_size: Some(WORKER_SIZE),
                    ..default()
                },
                transform: Transform::from_translation(pos.extend(2.0)),
                ..default()
            },
            WorkerSprite { id: worker.id },
        ));
    }
}

/// Sprite position: the floor position plus a crowd offset that shrinks to
/// nothing as the worker walks away from the depot.
fn screen_position(id: usize, position: FloorPos, depot: FloorPos) -> Vec2 {
    let spread = (1.0 - position.distance(depot) / DEPOT_SPREAD_RADIUS).clamp(0.0, 1.0);
    floor_to_screen(position) + idle_offset(id) * spread
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_offsets_unique() {
        let offsets: Vec<Vec2> = (0..8).map(idle_offset).collect();
        for (i, a) in offsets.iter().enumerate() {
            for b in &offsets[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_offset_only_near_depot() {
        let depot = FloorPos::new(-5.8, 3.0);
        assert_eq!(
            screen_position(3, depot, depot),
            floor_to_screen(depot) + idle_offset(3)
        );

        let away = FloorPos::new(1.0, 1.0);
        assert_eq!(screen_position(3, away, depot), floor_to_screen(away));
    }

    #[test]
    fn test_leaving_depot_has_no_jump() {
        let depot = FloorPos::new(-5.8, 3.0);
        let mut pos = depot;
        let mut last = screen_position(5, pos, depot);
        // One frame of walking at most moves a few pixels
        for _ in 0..120 {
            pos.step_toward(FloorPos::new(0.0, 1.4), twin_sync::WORKER_SPEED / 60.0);
            let next = screen_position(5, pos, depot);
            assert!((next - last).length() < 5.0, "jump from {:?} to {:?}", last, next);
            last = next;
        }
    }
}
