//! Fatigue signal reducer
//!
//! Turns per-frame eye observations into debounced hazard events. Calls are
//! expected to be serialized by the frame pipeline.

use hazard::HazardEvent;
use tracing::{debug, info, trace};

use crate::observation::{EyeObservation, EyeState, FaceObservation};
use crate::state::FatigueSignal;
use crate::DmsConfig;

/// Debounces eye closure into `FatigueStarted` / `FatigueEnded` / `FaceLost`
#[derive(Debug, Clone)]
pub struct FatigueSignalReducer {
    config: DmsConfig,
    signal: FatigueSignal,
}

impl FatigueSignalReducer {
    pub fn new(config: DmsConfig) -> Self {
        Self {
            config,
            signal: FatigueSignal::default(),
        }
    }

    /// Current run state
    pub fn signal(&self) -> &FatigueSignal {
        &self.signal
    }

    /// Feed a full detector result. Zero faces means `FaceLost`.
    pub fn observe_frame(&mut self, frame: &FaceObservation) -> Option<HazardEvent> {
        match frame.primary() {
            Some(eyes) => self.observe(&eyes),
            None => Some(self.face_lost()),
        }
    }

    /// Feed the primary face's eye observation for one frame
    pub fn observe(&mut self, eyes: &EyeObservation) -> Option<HazardEvent> {
        let now = eyes.timestamp_ms;

        let closed = match eyes.classify(self.config.eye_closed_threshold) {
            EyeState::Closed => true,
            EyeState::Open => false,
            EyeState::Ambiguous => {
                trace!("Eye probabilities missing at {}ms, treating as open", now);
                false
            }
        };

        if !closed {
            let ended = self.signal.is_active();
            self.signal.reset();
            if ended {
                info!("Eyes reopened at {}ms, fatigue ended", now);
                return Some(HazardEvent::FatigueEnded);
            }
            return None;
        }

        let Some(since) = self.signal.since else {
            debug!("Eyes closed at {}ms, starting run", now);
            self.signal.since = Some(now);
            return None;
        };

        if self.signal.emitted {
            return None;
        }

        let closed_ms = now.saturating_sub(since);
        if closed_ms >= self.config.fatigue_duration_ms {
            info!("Fatigue confirmed: eyes closed for {}ms", closed_ms);
            self.signal.emitted = true;
            return Some(HazardEvent::FatigueStarted);
        }

        None
    }

    fn face_lost(&mut self) -> HazardEvent {
        if self.signal.is_closed() {
            debug!("Face lost during closed run, resetting");
        }
        self.signal.reset();
        HazardEvent::FaceLost
    }
}

impl Default for FatigueSignalReducer {
    fn default() -> Self {
        Self::new(DmsConfig::default())
    }
}
