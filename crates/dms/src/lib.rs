//! Driver Monitoring System (DMS)
//!
//! Fatigue detection from per-frame face detector output:
//! - Eye closure classification against a probability threshold
//! - Debounced closed-eye runs (fatigue confirmation window)
//! - Face-lost handling

pub mod config;
pub mod observation;
pub mod reducer;
pub mod state;

pub use config::DmsConfig;
pub use observation::{EyeObservation, EyeState, FaceEyes, FaceObservation};
pub use reducer::FatigueSignalReducer;
pub use state::FatigueSignal;

use thiserror::Error;

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Configuration error: {0}")]
    Config(String),
}
