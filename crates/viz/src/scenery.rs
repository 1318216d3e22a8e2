//! Scenery rendering: factory floor, stations, buffers, and the depot.
//!
//! The floor is drawn top-down. Floor coordinates `(x, z)` map to screen
//! `(x, -z)`, so the walkway and depot sit below the line of stations.

use bevy::prelude::*;
use bevy::sprite::Anchor;

use twin_events::StationStatus;
use twin_sync::FloorPos;

use crate::frame::{CurrentFrame, FrameSet};

/// Screen pixels per floor unit.
pub const PIXELS_PER_UNIT: f32 = 60.0;
/// Height of one queued part in a buffer column.
const PX_PER_PART: f32 = 10.0;
const STATION_SIZE: Vec2 = Vec2::new(90.0, 70.0);
const BUFFER_WIDTH: f32 = 26.0;

/// Plugin for static and station-driven scenery.
pub struct SceneryPlugin;

impl Plugin for SceneryPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ClearColor(Color::srgb(0.12, 0.13, 0.15)))
            .add_systems(Startup, spawn_floor)
            .add_systems(
                Update,
                (sync_stations, sync_buffers, place_depot).after(FrameSet),
            );
    }
}

/// Converts a floor position to 2D world coordinates.
pub fn floor_to_screen(pos: FloorPos) -> Vec2 {
    Vec2::new(pos.x * PIXELS_PER_UNIT, -pos.z * PIXELS_PER_UNIT)
}

/// Fill color of a station box.
pub fn status_color(status: StationStatus) -> Color {
    match status {
        StationStatus::Idle => Color::srgb(0.45, 0.47, 0.5),
        StationStatus::Working => Color::srgb(0.25, 0.65, 0.35),
        StationStatus::Blocked => Color::srgb(0.85, 0.65, 0.2),
        StationStatus::Down => Color::srgb(0.85, 0.2, 0.2),
    }
}

/// Pixel height of a buffer column holding `level` parts.
pub fn buffer_height(level: f32) -> f32 {
    (level.max(0.0) * PX_PER_PART).max(2.0)
}

/// Marker component for the floor background.
#[derive(Component)]
pub struct FloorBackground;

/// Visual representation of one station.
#[derive(Component)]
pub struct StationBox {
    pub index: usize,
}

/// Visual representation of one inter-station buffer.
#[derive(Component)]
pub struct BufferColumn {
    pub index: usize,
}

/// Marker component for the depot.
#[derive(Component)]
pub struct DepotMarker;

/// System to spawn the floor and the depot.
fn spawn_floor(mut commands: Commands) {
    commands.spawn((
        SpriteBundle {
            sprite: Sprite {
                color: Color::srgb(0.2, 0.21, 0.23),
                custom_size: Some(Vec2::new(2400.0, 900.0)),
                ..default()
            },
            transform: Transform::from_xyz(0.0, -60.0, -10.0),
            ..default()
        },
        FloorBackground,
    ));

    commands.spawn((
        SpriteBundle {
            sprite: Sprite {
                color: Color::srgb(0.3, 0.35, 0.55),
                custom_size: Some(Vec2::new(70.0, 50.0)),
                ..default()
            },
            transform: Transform::from_xyz(0.0, 0.0, -1.0),
            ..default()
        },
        DepotMarker,
    ));

    tracing::info!("Spawned factory floor");
}

/// System to reconcile station boxes with the frame view.
fn sync_stations(
    mut commands: Commands,
    frame: Res<CurrentFrame>,
    mut boxes: Query<(Entity, &StationBox, &mut Sprite, &mut Transform)>,
) {
    let view = &frame.view;
    let mut seen = vec![false; view.stations.len()];

    for (entity, station_box, mut sprite, mut transform) in boxes.iter_mut() {
        let Some(station) = view.stations.get(station_box.index) else {
            commands.entity(entity).despawn_recursive();
            continue;
        };
        seen[station_box.index] = true;
        sprite.color = status_color(station.status);
        let pos = floor_to_screen(view.layout.station(station_box.index));
        transform.translation = pos.extend(0.0);
    }

    for (index, station) in view.stations.iter().enumerate() {
        if seen[index] {
            continue;
        }
        let pos = floor_to_screen(view.layout.station(index));
        commands.spawn((
            SpriteBundle {
                sprite: Sprite {
                    color: status_color(station.status),
                    custom_size: Some(STATION_SIZE),
                    ..default()
                },
                transform: Transform::from_translation(pos.extend(0.0)),
                ..default()
            },
            StationBox { index },
        ));
    }
}

/// System to reconcile buffer columns with the blended levels.
fn sync_buffers(
    mut commands: Commands,
    frame: Res<CurrentFrame>,
    mut columns: Query<(Entity, &BufferColumn, &mut Sprite, &mut Transform)>,
) {
    let view = &frame.view;
    let mut seen = vec![false; view.buffers.len()];

    for (entity, column, mut sprite, mut transform) in columns.iter_mut() {
        let Some(buffer) = view.buffers.get(column.index) else {
            commands.entity(entity).despawn_recursive();
            continue;
        };
        seen[column.index] = true;
        sprite.custom_size = Some(Vec2::new(BUFFER_WIDTH, buffer_height(buffer.level)));
        let base = floor_to_screen(view.layout.buffer(column.index)) - Vec2::Y * STATION_SIZE.y / 2.0;
        transform.translation = base.extend(0.5);
    }

    for (index, buffer) in view.buffers.iter().enumerate() {
        if seen[index] {
            continue;
        }
        let base = floor_to_screen(view.layout.buffer(index)) - Vec2::Y * STATION_SIZE.y / 2.0;
        commands.spawn((
            SpriteBundle {
                sprite: Sprite {
                    color: Color::srgb(0.35, 0.6, 0.85),
                    custom_size: Some(Vec2::new(BUFFER_WIDTH, buffer_height(buffer.level))),
                    anchor: Anchor::BottomCenter,
                    ..default()
                },
                transform: Transform::from_translation(base.extend(0.5)),
                ..default()
            },
            BufferColumn { index },
        ));
    }
}

/// System to keep the depot where the layout puts it.
fn place_depot(frame: Res<CurrentFrame>, mut depot: Query<&mut Transform, With<DepotMarker>>) {
    let pos = floor_to_screen(frame.view.layout.depot());
    for mut transform in depot.iter_mut() {
        transform.translation = pos.extend(-1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use twin_sync::FloorLayout;

    #[test]
    fn test_floor_to_screen_flips_depth() {
        let pos = floor_to_screen(FloorPos::new(1.0, 2.0));
        assert_eq!(pos, Vec2::new(PIXELS_PER_UNIT, -2.0 * PIXELS_PER_UNIT));
    }

    #[test]
    fn test_depot_below_and_left_of_line() {
        let layout = FloorLayout::new(3);
        let depot = floor_to_screen(layout.depot());
        let first = floor_to_screen(layout.station(0));
        assert!(depot.x < first.x);
        assert!(depot.y < first.y);
    }

    #[test]
    fn test_buffer_height() {
        assert_eq!(buffer_height(0.0), 2.0);
        assert_eq!(buffer_height(2.5), 25.0);
        assert_eq!(buffer_height(-1.0), 2.0);
    }

    #[test]
    fn test_status_colors_distinct() {
        let colors = [
            status_color(StationStatus::Idle),
            status_color(StationStatus::Working),
            status_color(StationStatus::Blocked),
            status_color(StationStatus::Down),
        ];
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
