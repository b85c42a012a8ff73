//! Beamsight Core - View state, status metrics and scene geometry
//!
//! This crate provides everything in Beamsight that does not need a renderer:
//! - Marker, detection and room-scan types shared by the panels and the scene
//! - The top-level view state and its placement/detection/reset operations
//! - Status panel metrics (RSSI delta, clamped signal strength)
//! - Room normalisation, beam curve and idle animation math
//! - The simulated signal monitor behind the illustrative RSSI numbers
//! - Viewer configuration loading

pub mod animation;
pub mod config;
pub mod geometry;
pub mod signal;
pub mod status;
pub mod types;
pub mod upload;
pub mod view;

pub use config::{ConfigError, ViewerConfig};
pub use geometry::{Bounds, RoomFit};
pub use signal::{DetectionMode, MetricsSnapshot, SignalError, SignalMonitor};
pub use status::StatusSummary;
pub use types::{DetectionState, MarkerKind, MarkerPosition, RoomScan};
pub use upload::{RoomUpload, UploadError};
pub use view::ViewState;
