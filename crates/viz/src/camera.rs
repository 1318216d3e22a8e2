//! Camera system: controller, transitions, and user input handling.

use bevy::prelude::*;

use twin_sync::FloorLayout;

use crate::frame::{CurrentFrame, FrameSet};
use crate::scenery::floor_to_screen;

/// Plugin for camera control and movement.
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraController>()
            .init_resource::<CameraConstraints>()
            .add_systems(Startup, setup_camera)
            .add_systems(
                Update,
                (
                    frame_new_line,
                    handle_scroll_zoom,
                    handle_keyboard_input,
                    update_camera_transition,
                    apply_camera_to_transform,
                )
                    .chain()
                    .after(FrameSet),
            );
    }
}

/// Main camera controller resource.
#[derive(Resource)]
pub struct CameraController {
    /// Current camera position in world coordinates.
    pub position: Vec2,
    /// Current zoom level (1.0 = normal, higher = zoomed in).
    pub zoom: f32,
    /// Target position for smooth movement.
    pub target_position: Vec2,
    /// Target zoom for smooth zooming.
    pub target_zoom: f32,
    /// Active camera transition, if any.
    pub transition: Option<CameraTransition>,
}

impl Default for CameraController {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            zoom: 1.0,
            target_position: Vec2::ZERO,
            target_zoom: 1.0,
            transition: None,
        }
    }
}

impl CameraController {
    /// Begin a smooth transition to a new position and zoom.
    pub fn begin_transition(&mut self, to_pos: Vec2, to_zoom: f32, duration: f32) {
        self.transition = Some(CameraTransition {
            from_pos: self.position,
            to_pos,
            from_zoom: self.zoom,
            to_zoom,
            duration,
            elapsed: 0.0,
        });
    }

    /// Multiply the zoom by `factor`, cancelling any transition.
    pub fn step_zoom(&mut self, factor: f32, constraints: &CameraConstraints) {
        let new_zoom = constraints.clamp_zoom(self.zoom * factor);
        self.transition = None;
        self.zoom = new_zoom;
        self.target_zoom = new_zoom;
    }

    /// Move by `delta` world units, cancelling any transition.
    pub fn pan(&mut self, delta: Vec2, constraints: &CameraConstraints) {
        self.transition = None;
        self.position = constraints.clamp_position(self.position + delta);
        self.target_position = self.position;
    }
}

/// Active camera transition state.
#[derive(Clone, Debug)]
pub struct CameraTransition {
    /// Starting position.
    pub from_pos: Vec2,
    /// Target position.
    pub to_pos: Vec2,
    /// Starting zoom.
    pub from_zoom: f32,
    /// Target zoom.
    pub to_zoom: f32,
    /// Total duration in seconds.
    pub duration: f32,
    /// Time elapsed so far.
    pub elapsed: f32,
}

impl CameraTransition {
    /// Get the progress of this transition (0.0 to 1.0).
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }

    /// Check if this transition is complete.
    pub fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Get the current position based on progress.
    pub fn current_position(&self) -> Vec2 {
        let t = ease_in_out(self.progress());
        self.from_pos.lerp(self.to_pos, t)
    }

    /// Get the current zoom based on progress.
    pub fn current_zoom(&self) -> f32 {
        let t = ease_in_out(self.progress());
        self.from_zoom + (self.to_zoom - self.from_zoom) * t
    }
}

/// Smooth ease-in-out function for transitions.
pub fn ease_in_out(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Screen point halfway between the first station and the depot row.
pub fn line_center(layout: &FloorLayout) -> Vec2 {
    let first = floor_to_screen(layout.station(0));
    let last = floor_to_screen(layout.station(layout.n_stations() - 1));
    let depot = floor_to_screen(layout.depot());
    Vec2::new((depot.x + last.x) / 2.0, (first.y + depot.y) / 2.0)
}

/// Camera constraints for zooming and panning.
#[derive(Resource)]
pub struct CameraConstraints {
    /// Minimum zoom level (zoomed out).
    pub min_zoom: f32,
    /// Maximum zoom level (zoomed in).
    pub max_zoom: f32,
    /// Optional bounds to constrain camera position.
    pub bounds: Option<Rect>,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self {
            min_zoom: 0.25,
            max_zoom: 4.0,
            bounds: Some(Rect::new(-2000.0, -1200.0, 4000.0, 800.0)),
        }
    }
}

impl CameraConstraints {
    /// Clamp a zoom value to valid range.
    pub fn clamp_zoom(&self, zoom: f32) -> f32 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    /// Clamp a position to valid bounds if bounds are set.
    pub fn clamp_position(&self, pos: Vec2) -> Vec2 {
        match &self.bounds {
            Some(bounds) => Vec2::new(
                pos.x.clamp(bounds.min.x, bounds.max.x),
                pos.y.clamp(bounds.min.y, bounds.max.y),
            ),
            None => pos,
        }
    }
}

/// Marker component for the main camera.
#[derive(Component)]
pub struct MainCamera;

/// System to set up the camera on startup.
fn setup_camera(mut commands: Commands) {
    commands.spawn((Camera2dBundle::default(), MainCamera));
}

/// System to recentre when the line changes length.
fn frame_new_line(
    frame: Res<CurrentFrame>,
    mut controller: ResMut<CameraController>,
    mut framed: Local<Option<usize>>,
) {
    let n_stations = frame.view.layout.n_stations();
    if *framed == Some(n_stations) {
        return;
    }
    *framed = Some(n_stations);
    let zoom = controller.zoom;
    controller.begin_transition(line_center(&frame.view.layout), zoom, 0.5);
}

/// System to zoom with the scroll wheel.
fn handle_scroll_zoom(
    mut controller: ResMut<CameraController>,
    constraints: Res<CameraConstraints>,
    mut scroll: EventReader<bevy::input::mouse::MouseWheel>,
) {
    for ev in scroll.read() {
        controller.step_zoom(1.0 + ev.y * 0.1, &constraints);
    }
}

/// System to handle keyboard input for camera controls.
fn handle_keyboard_input(
    mut controller: ResMut<CameraController>,
    constraints: Res<CameraConstraints>,
    keyboard: Res<ButtonInput<KeyCode>>,
    frame: Res<CurrentFrame>,
    time: Res<Time>,
) {
    let delta = time.delta_seconds();

    // Arrow key panning
    let shift_held = keyboard.pressed(KeyCode::ShiftLeft) || keyboard.pressed(KeyCode::ShiftRight);
    let base_pan_speed = if shift_held { 800.0 } else { 400.0 };
    let pan_speed = base_pan_speed / controller.zoom * delta;

    let mut pan_delta = Vec2::ZERO;
    if keyboard.pressed(KeyCode::ArrowLeft) {
        pan_delta.x -= pan_speed;
    }
    if keyboard.pressed(KeyCode::ArrowRight) {
        pan_delta.x += pan_speed;
    }
    if keyboard.pressed(KeyCode::ArrowUp) {
        pan_delta.y += pan_speed;
    }
    if keyboard.pressed(KeyCode::ArrowDown) {
        pan_delta.y -= pan_speed;
    }

    if pan_delta != Vec2::ZERO {
        controller.pan(pan_delta, &constraints);
    }

    // Home key - back to the whole line
    if keyboard.just_pressed(KeyCode::Home) {
        controller.begin_transition(line_center(&frame.view.layout), 1.0, 0.5);
    }

    // +/- keys for discrete zoom steps
    if keyboard.just_pressed(KeyCode::Equal) {
        controller.step_zoom(1.25, &constraints);
    }
    if keyboard.just_pressed(KeyCode::Minus) {
        controller.step_zoom(1.0 / 1.25, &constraints);
    }
}

/// System to update camera transitions.
fn update_camera_transition(mut controller: ResMut<CameraController>, time: Res<Time>) {
    let delta = time.delta_seconds();

    let transition_result = if let Some(ref mut transition) = controller.transition {
        transition.elapsed += delta;
        Some((
            transition.current_position(),
            transition.current_zoom(),
            transition.is_complete(),
            transition.to_pos,
            transition.to_zoom,
        ))
    } else {
        None
    };

    // Apply transition results outside of the borrow
    if let Some((position, zoom, is_complete, final_pos, final_zoom)) = transition_result {
        if is_complete {
            controller.position = final_pos;
            controller.zoom = final_zoom;
            controller.target_position = final_pos;
            controller.target_zoom = final_zoom;
            controller.transition = None;
        } else {
            controller.position = position;
            controller.zoom = zoom;
        }
    } else {
        let lerp_speed = (5.0 * delta).min(1.0);
        let target_pos = controller.target_position;
        let target_zoom = controller.target_zoom;
        controller.position = controller.position.lerp(target_pos, lerp_speed);
        controller.zoom = controller.zoom + (target_zoom - controller.zoom) * lerp_speed;
    }
}

/// System to apply camera controller state to the actual camera transform.
fn apply_camera_to_transform(
    controller: Res<CameraController>,
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
) {
    for mut transform in camera_query.iter_mut() {
        transform.translation.x = controller.position.x;
        transform.translation.y = controller.position.y;
        // Zoom is applied via projection scale (inverse relationship)
        let scale = 1.0 / controller.zoom;
        transform.scale = Vec3::new(scale, scale, 1.0);
    }
}
