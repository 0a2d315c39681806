//! Alerting System
//!
//! Turns hazard events into emergency dispatches: per-kind cooldowns,
//! a single cancellable countdown, and dispatch authorization.

mod config;
mod contacts;
mod cooldown;
mod orchestrator;
mod service;
mod sinks;
mod status;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::AlertConfig;
pub use contacts::{ContactError, EmergencyContact, InMemoryContactStore, MIN_PHONE_LEN};
pub use cooldown::CooldownState;
pub use orchestrator::{
    AlertOrchestrator, CancelReason, Input, OrchestratorSnapshot, OrchestratorState,
    PendingAlert, TimerRequest,
};
pub use service::{AlertHandle, AlertService};
pub use sinks::{
    format_location, AlarmSink, AlertRequest, Collaborators, ContactStore, DispatchError,
    DispatchSink, GeoPoint, LocationProvider, NoLocation, StatusSink,
};
pub use status::Status;

pub use hazard::{AlertKind, HazardEvent};

use thiserror::Error;

/// Alerting error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlertError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Emergency contact not configured")]
    ConfigurationMissing,

    #[error("Alert service stopped")]
    ServiceStopped,
}
