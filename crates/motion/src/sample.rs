//! Inertial samples

use serde::{Deserialize, Serialize};

/// Sensor axis group a sample came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Accelerometer (m/s²)
    Accel,
    /// Gyroscope (rad/s)
    Gyro,
}

/// One 3-axis reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    pub axis: Axis,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Timestamp (milliseconds)
    pub timestamp_ms: u64,
}

impl MotionSample {
    pub fn accel(x: f32, y: f32, z: f32, timestamp_ms: u64) -> Self {
        Self { axis: Axis::Accel, x, y, z, timestamp_ms }
    }

    pub fn gyro(x: f32, y: f32, z: f32, timestamp_ms: u64) -> Self {
        Self { axis: Axis::Gyro, x, y, z, timestamp_ms }
    }

    /// Vector magnitude
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}
