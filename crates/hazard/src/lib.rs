//! Hazard vocabulary
//!
//! Events produced by the fatigue and motion detectors (and the user) and
//! consumed exactly once by the alert orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of alert a countdown is running for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// Sustained eye closure
    Fatigue,
    /// Abnormal motion spike
    Accident,
}

impl AlertKind {
    /// Label used in logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Fatigue => "fatigue",
            AlertKind::Accident => "accident",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::Fatigue => write!(f, "Fatigue"),
            AlertKind::Accident => write!(f, "Accident"),
        }
    }
}

/// Input to the alert orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HazardEvent {
    /// Eyes closed past the confirmation duration
    FatigueStarted,

    /// Eyes reopened after a confirmed fatigue run
    FatigueEnded,

    /// Face detector reported no face for a frame
    FaceLost,

    /// Motion sample above threshold
    AccidentCandidate { cause: String },

    /// Driver aborted the pending alert
    UserCancel,
}

impl HazardEvent {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            HazardEvent::FatigueStarted => "fatigue_started",
            HazardEvent::FatigueEnded => "fatigue_ended",
            HazardEvent::FaceLost => "face_lost",
            HazardEvent::AccidentCandidate { .. } => "accident_candidate",
            HazardEvent::UserCancel => "user_cancel",
        }
    }
}
