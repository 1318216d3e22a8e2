//! Main visualization plugin that ties all systems together.

use bevy::prelude::*;

use crate::camera::CameraPlugin;
use crate::frame::FramePlugin;
use crate::overlay::OverlayPlugin;
use crate::runner::RunnerPlugin;
use crate::scenery::SceneryPlugin;
use crate::workers::WorkerPlugin;

/// Main plugin for the factory line viewer.
///
/// Sets up the window and adds every sub-plugin. The [`Session`] and
/// [`RunnerConfig`] resources are expected to be inserted before this
/// plugin is added; without a session the viewer shows an empty line.
///
/// [`Session`]: crate::runner::Session
/// [`RunnerConfig`]: crate::runner::RunnerConfig
pub struct FactoryVizPlugin;

impl Plugin for FactoryVizPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Factory Twin".into(),
                resolution: (1280., 720.).into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins((
            FramePlugin,
            RunnerPlugin,
            CameraPlugin,
            SceneryPlugin,
            WorkerPlugin,
            OverlayPlugin,
        ));
    }
}
