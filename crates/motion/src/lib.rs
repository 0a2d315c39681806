//! Motion Spike Detection
//!
//! Converts raw accelerometer and gyroscope samples into accident
//! candidates for the alert orchestrator.

pub mod detector;
pub mod sample;

pub use detector::MotionSpikeDetector;
pub use sample::{Axis, MotionSample};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Motion error types
#[derive(Error, Debug)]
pub enum MotionError {
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Spike thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Acceleration magnitude threshold (m/s²)
    pub acceleration_threshold: f32,
    /// Rotation rate magnitude threshold (rad/s)
    pub rotation_threshold: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            acceleration_threshold: 45.0,
            rotation_threshold: 15.0,
        }
    }
}

impl MotionConfig {
    pub fn validate(&self) -> Result<(), MotionError> {
        if !(self.acceleration_threshold > 0.0) || !(self.rotation_threshold > 0.0) {
            return Err(MotionError::Config(format!(
                "thresholds must be positive (accel {}, rotation {})",
                self.acceleration_threshold, self.rotation_threshold
            )));
        }
        Ok(())
    }
}
