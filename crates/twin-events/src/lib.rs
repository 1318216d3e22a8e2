//! Shared wire types for the factory twin.
//!
//! This crate contains pure data structures with no synchronization logic.
//! The shapes mirror what the simulation server sends and accepts; every other
//! crate in the workspace depends on it.

pub mod config;
pub mod event;
pub mod snapshot;
pub mod summary;

#[cfg(feature = "test-fixtures")]
pub mod fixtures;

// Re-export config types
pub use config::{EpisodeConfig, InvalidConfig, ProcDist, ProcDists};

// Re-export event types
pub use event::{EventKind, SimEvent};

// Re-export snapshot types
pub use snapshot::{ordered_buffer_keys, Snapshot, Station, StationStatus};

// Re-export summary types
pub use summary::Summary;
