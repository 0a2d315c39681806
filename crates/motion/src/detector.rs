//! Motion spike detector
//!
//! Stateless: every qualifying sample yields an accident candidate.
//! Deduplication and cooldown belong to the alert orchestrator.

use hazard::HazardEvent;
use tracing::warn;

use crate::sample::{Axis, MotionSample};
use crate::MotionConfig;

/// Emits `AccidentCandidate` for samples above the per-axis threshold
#[derive(Debug, Clone, Default)]
pub struct MotionSpikeDetector {
    config: MotionConfig,
}

impl MotionSpikeDetector {
    pub fn new(config: MotionConfig) -> Self {
        Self { config }
    }

    /// Threshold for an axis group
    pub fn threshold(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Accel => self.config.acceleration_threshold,
            Axis::Gyro => self.config.rotation_threshold,
        }
    }

    pub fn observe(&self, sample: &MotionSample) -> Option<HazardEvent> {
        let magnitude = sample.magnitude();
        if !(magnitude > self.threshold(sample.axis)) {
            return None;
        }

        let cause = match sample.axis {
            Axis::Accel => {
                warn!("Potential accident: high acceleration {:.1}", magnitude);
                format!("High Impact ({:.1} m/s²)", magnitude)
            }
            Axis::Gyro => {
                warn!("Potential accident: high rotation {:.1}", magnitude);
                format!("Severe Rotation ({:.1} °/s)", magnitude.to_degrees())
            }
        };

        Some(HazardEvent::AccidentCandidate { cause })
    }
}
