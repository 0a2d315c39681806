//! DMS configuration

use serde::{Deserialize, Serialize};

use crate::DmsError;

/// DMS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Eye-open probability below which an eye counts as closed
    pub eye_closed_threshold: f32,

    /// Continuous closure required before fatigue is confirmed (milliseconds)
    pub fatigue_duration_ms: u64,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            eye_closed_threshold: 0.4,
            fatigue_duration_ms: 2000,
        }
    }
}

impl DmsConfig {
    /// Reject thresholds that can never (or always) classify an eye as closed
    pub fn validate(&self) -> Result<(), DmsError> {
        if !(self.eye_closed_threshold > 0.0 && self.eye_closed_threshold <= 1.0) {
            return Err(DmsError::Config(format!(
                "eye_closed_threshold {} outside (0, 1]",
                self.eye_closed_threshold
            )));
        }
        if self.fatigue_duration_ms == 0 {
            return Err(DmsError::Config("fatigue_duration_ms must be positive".into()));
        }
        Ok(())
    }
}
