//! User-visible status line

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status pushed to the UI sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Status {
    Monitoring,
    /// No emergency contact; persists until one is configured
    ConfigurationNeeded,
    FatigueDetected,
    AccidentDetected,
    AlertSent,
    DispatchFailed(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Monitoring => write!(f, "Status: Monitoring"),
            Status::ConfigurationNeeded => write!(f, "Status: Set Emergency Contact!"),
            Status::FatigueDetected => write!(f, "Status: Fatigue Detected!"),
            Status::AccidentDetected => write!(f, "Status: ACCIDENT DETECTED!"),
            Status::AlertSent => write!(f, "Status: Alert Sent!"),
            Status::DispatchFailed(reason) => write!(f, "Status: Alert Failed ({})", reason),
        }
    }
}
