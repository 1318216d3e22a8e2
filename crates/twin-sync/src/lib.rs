//! Synchronization core of the factory twin viewer.
//!
//! The simulation runs on a remote server; this crate keeps a local picture
//! of it up to date and turns the server's sparse, irregular snapshots into
//! something that can be drawn smoothly at frame rate.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐  step / summary   ┌──────────────┐  ingest  ┌───────────────┐
//! │ sim server │ ◀───────────────▶ │ ControlLoop  │ ───────▶ │               │
//! └────────────┘                   └──────────────┘          │  SharedStore  │
//!       ▲             state        ┌──────────────┐  ingest  │               │
//!       └───────────────────────── │ Poller       │ ───────▶ │               │
//!                                  └──────────────┘          └───────┬───────┘
//!                                                                    │ each frame
//!                                                            ┌───────▼───────┐
//!                                                            │ FrameDriver   │ ─▶ FrameView
//!                                                            └───────────────┘
//! ```
//!
//! # Modules
//!
//! - [`engine`]: The `SimEngine` contract
//! - [`http`]: `reqwest` implementation of the contract
//! - [`store`]: Current/previous snapshot and the failure log
//! - [`blend`]: Temporal interpolation between snapshots
//! - [`dispatch`]: Repair crew state machine
//! - [`control`]: The step/summary loop
//! - [`poll`]: Passive state polling
//! - [`frame`]: Per-frame glue for renderers
//! - [`settings`]: TOML client settings

pub mod blend;
pub mod control;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod frame;
pub mod http;
pub mod layout;
pub mod poll;
pub mod settings;
pub mod store;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod scripted;

// Re-export engine types
pub use engine::SimEngine;
pub use http::HttpEngine;

// Re-export error types
pub use error::{ConfigError, SyncError, TransportError};

// Re-export store types
pub use store::{
    FailureEvent, SharedStore, SnapshotStore, StoredEvent, EVENT_QUEUE_CAPACITY, FAILURE_LOG_CAPACITY,
};

// Re-export interpolation types
pub use blend::{blend_buffers, crossfade_stations, render_duration, BlendClock, BufferLevel};

// Re-export dispatch types
pub use dispatch::{Dispatch, Worker, WorkerDispatch, WorkerState, WORKER_SPEED};
pub use layout::{FloorLayout, FloorPos};

// Re-export loop types
pub use control::{ControlLoop, LoopExit, LoopSettings};
pub use poll::{PollOutcome, Poller};

// Re-export frame types
pub use frame::{FrameDriver, FrameView, LineTotals};

// Re-export settings types
pub use settings::{default_settings_toml, ControlSettings, ServerSettings, Settings};

#[cfg(any(test, feature = "test-fixtures"))]
pub use scripted::ScriptedEngine;
