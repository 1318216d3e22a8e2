//! Factory line viewer: Bevy front end over the `twin-sync` core.
//!
//! The [`runner`] owns the connection to the simulation server, [`frame`]
//! turns the shared store into one [`twin_sync::FrameView`] per frame, and
//! the remaining plugins draw that view.

pub mod camera;
pub mod cli;
pub mod frame;
pub mod headless;
pub mod overlay;
pub mod plugin;
pub mod runner;
pub mod scenery;
pub mod workers;

pub use plugin::FactoryVizPlugin;
