//! Collaborator contracts
//!
//! The orchestrator never performs I/O itself. Location, contacts, dispatch,
//! UI and alarm are reached through these traits. Implementations are called
//! from inside the orchestrator task and must not block.

use hazard::AlertKind;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::Status;

/// Dispatch failures reported by the SMS/call collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("SMS send failed: {0}")]
    Sms(String),

    #[error("Dispatch unavailable: {0}")]
    Unavailable(String),
}

/// Geographic position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Human-readable location with a maps link
    pub fn describe(&self) -> String {
        format!(
            "Lat: {:.6}, Lng: {:.6} (http://maps.google.com/maps?q={:.6},{:.6})",
            self.lat, self.lng, self.lat, self.lng
        )
    }
}

/// Format an optional location, tolerating absence
pub fn format_location(point: Option<GeoPoint>) -> String {
    match point {
        Some(point) => point.describe(),
        None => "Location unavailable".to_string(),
    }
}

/// Dispatch authorized on countdown expiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRequest {
    pub kind: AlertKind,
    pub cause: String,
    pub location: String,
    pub contact: String,
}

impl AlertRequest {
    /// Accidents also require an outbound call attempt
    pub fn requires_call(&self) -> bool {
        self.kind == AlertKind::Accident
    }

    /// SMS body sent to the emergency contact
    pub fn sms_message(&self) -> String {
        match self.kind {
            AlertKind::Accident => format!(
                "Emergency! Potential Accident Detected ({}). Last known location: {}",
                self.cause, self.location
            ),
            AlertKind::Fatigue => format!(
                "Alert: Driver Fatigue Detected. Last known location: {}",
                self.location
            ),
        }
    }
}

/// Emergency contact lookup
pub trait ContactStore: Send + Sync {
    fn emergency_contact(&self) -> Option<String>;
}

/// Last known position
pub trait LocationProvider: Send + Sync {
    fn current_location(&self) -> Option<GeoPoint>;
}

/// SMS/call dispatch. Fire-and-forget from the orchestrator's side.
pub trait DispatchSink: Send + Sync {
    fn send_alert(&self, request: &AlertRequest) -> Result<(), DispatchError>;
}

/// UI state push
pub trait StatusSink: Send + Sync {
    fn set_status(&self, status: &Status);
    fn set_fatigue_warning_visible(&self, visible: bool);
    fn show_countdown(&self, kind: AlertKind, remaining: Duration);
    fn hide_countdown(&self);

    /// Transient user notification
    fn notify(&self, _title: &str, _body: &str) {}
}

/// Audible alarm
pub trait AlarmSink: Send + Sync {
    fn start_alarm(&self);
    fn stop_alarm(&self);
}

/// Bundle of collaborators handed to the orchestrator
#[derive(Clone)]
pub struct Collaborators {
    pub contacts: Arc<dyn ContactStore>,
    pub location: Arc<dyn LocationProvider>,
    pub dispatch: Arc<dyn DispatchSink>,
    pub status: Arc<dyn StatusSink>,
    pub alarm: Arc<dyn AlarmSink>,
}

/// Location provider that never has a fix
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

impl LocationProvider for NoLocation {
    fn current_location(&self) -> Option<GeoPoint> {
        None
    }
}
