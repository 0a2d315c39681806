//! Face and eye observations delivered by the external face detector

use serde::{Deserialize, Serialize};

/// Eye-open probabilities for one detected face
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeObservation {
    /// Left eye open probability (0-1), absent when the detector could not classify it
    #[serde(default)]
    pub left_open_prob: Option<f32>,
    /// Right eye open probability (0-1)
    #[serde(default)]
    pub right_open_prob: Option<f32>,
    /// Frame timestamp (milliseconds)
    pub timestamp_ms: u64,
}

/// Classified eye state for a single frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EyeState {
    Open,
    Closed,
    /// One or both probabilities missing
    Ambiguous,
}

impl EyeObservation {
    pub fn new(left: Option<f32>, right: Option<f32>, timestamp_ms: u64) -> Self {
        Self {
            left_open_prob: left,
            right_open_prob: right,
            timestamp_ms,
        }
    }

    /// Classify against the closed-eye threshold. Both eyes must be below it.
    pub fn classify(&self, closed_threshold: f32) -> EyeState {
        match (self.left_open_prob, self.right_open_prob) {
            (Some(left), Some(right)) => {
                if left < closed_threshold && right < closed_threshold {
                    EyeState::Closed
                } else {
                    EyeState::Open
                }
            }
            _ => EyeState::Ambiguous,
        }
    }
}

/// Per-frame result from the face detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceObservation {
    /// Frame timestamp (milliseconds)
    pub timestamp_ms: u64,
    /// Detected faces, primary (driver) face first
    #[serde(default)]
    pub faces: Vec<FaceEyes>,
}

/// Eye probabilities of one detected face
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceEyes {
    #[serde(default)]
    pub left_eye_open_probability: Option<f32>,
    #[serde(default)]
    pub right_eye_open_probability: Option<f32>,
}

impl FaceObservation {
    /// Eye observation of the primary face, `None` when no face was detected
    pub fn primary(&self) -> Option<EyeObservation> {
        self.faces.first().map(|face| EyeObservation {
            left_open_prob: face.left_eye_open_probability,
            right_open_prob: face.right_eye_open_probability,
            timestamp_ms: self.timestamp_ms,
        })
    }
}
