//! Per-kind alert cooldown

use hazard::AlertKind;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Last dispatch time per hazard kind. Lives as long as the process.
#[derive(Debug, Clone, Default)]
pub struct CooldownState {
    /// Last time a fatigue alert was dispatched
    pub last_fatigue_alert: Option<Instant>,
    /// Last time an accident alert was dispatched
    pub last_accident_alert: Option<Instant>,
}

impl CooldownState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last dispatch of this kind
    pub fn last_fired(&self, kind: AlertKind) -> Option<Instant> {
        match kind {
            AlertKind::Fatigue => self.last_fatigue_alert,
            AlertKind::Accident => self.last_accident_alert,
        }
    }

    /// Check whether an alert of this kind may start a countdown
    pub fn should_fire(&self, kind: AlertKind, now: Instant, cooldown: Duration) -> bool {
        match self.last_fired(kind) {
            Some(last) if now.saturating_duration_since(last) < cooldown => {
                debug!("{} alert suppressed: in cooldown period", kind);
                false
            }
            _ => true,
        }
    }

    /// Time left before this kind may fire again
    pub fn remaining(&self, kind: AlertKind, now: Instant, cooldown: Duration) -> Duration {
        self.last_fired(kind)
            .map(|last| cooldown.saturating_sub(now.saturating_duration_since(last)))
            .unwrap_or(Duration::ZERO)
    }

    /// Record that an alert was dispatched
    pub fn record_fire(&mut self, kind: AlertKind, now: Instant) {
        match kind {
            AlertKind::Fatigue => self.last_fatigue_alert = Some(now),
            AlertKind::Accident => self.last_accident_alert = Some(now),
        }
        info!("Alert recorded: {}", kind);
    }
}
