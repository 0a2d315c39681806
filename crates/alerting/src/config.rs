//! Alert timing configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::AlertError;

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Minimum time between two dispatches of the same kind (seconds)
    pub cooldown_seconds: u64,
    /// Delay between authorization and dispatch during which the driver can cancel (seconds)
    pub countdown_seconds: u64,
    /// Countdown display refresh (milliseconds)
    pub tick_millis: u64,
    /// How long "Alert Sent" stays up before returning to monitoring (seconds)
    pub status_settle_seconds: u64,
    /// Orchestrator input queue depth
    pub queue_capacity: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: 120,
            countdown_seconds: 7,
            tick_millis: 1000,
            status_settle_seconds: 5,
            queue_capacity: 64,
        }
    }
}

impl AlertConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }

    pub fn countdown(&self) -> Duration {
        Duration::from_secs(self.countdown_seconds)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }

    pub fn status_settle(&self) -> Duration {
        Duration::from_secs(self.status_settle_seconds)
    }

    pub fn validate(&self) -> Result<(), AlertError> {
        if self.countdown_seconds == 0 {
            return Err(AlertError::Config("countdown_seconds must be positive".into()));
        }
        if self.tick_millis == 0 {
            return Err(AlertError::Config("tick_millis must be positive".into()));
        }
        if self.queue_capacity == 0 {
            return Err(AlertError::Config("queue_capacity must be positive".into()));
        }
        Ok(())
    }
}
