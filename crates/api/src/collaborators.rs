//! Server-side collaborators
//!
//! Status, alarm and dispatch are exposed over HTTP instead of a phone UI.
//! Dispatch is logged and kept in a bounded history; real SMS and call
//! delivery is left to a gateway implementing [`DispatchSink`].

use alerting::{
    AlarmSink, AlertKind, AlertRequest, DispatchError, DispatchSink, GeoPoint, LocationProvider,
    Status, StatusSink,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Dispatch records kept for the history endpoint
pub const HISTORY_CAPACITY: usize = 100;

/// Countdown currently on screen
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CountdownView {
    pub kind: AlertKind,
    pub remaining_seconds: u64,
}

/// Last notification raised to the driver
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// Everything the driver would currently see
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub status: Status,
    pub text: String,
    pub fatigue_warning: bool,
    pub countdown: Option<CountdownView>,
    pub notification: Option<Notification>,
}

impl Default for StatusView {
    fn default() -> Self {
        Self {
            text: Status::Monitoring.to_string(),
            status: Status::Monitoring,
            fatigue_warning: false,
            countdown: None,
            notification: None,
        }
    }
}

/// Display state pushed by the orchestrator
#[derive(Debug, Default)]
pub struct StatusBoard {
    view: RwLock<StatusView>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> StatusView {
        self.view
            .read()
            .map(|view| view.clone())
            .unwrap_or_default()
    }

    fn update(&self, f: impl FnOnce(&mut StatusView)) {
        match self.view.write() {
            Ok(mut view) => f(&mut view),
            Err(_) => warn!("Status board lock poisoned"),
        }
    }
}

impl StatusSink for StatusBoard {
    fn set_status(&self, status: &Status) {
        info!("{}", status);
        self.update(|view| {
            view.status = status.clone();
            view.text = status.to_string();
        });
    }

    fn set_fatigue_warning_visible(&self, visible: bool) {
        self.update(|view| view.fatigue_warning = visible);
    }

    fn show_countdown(&self, kind: AlertKind, remaining: Duration) {
        self.update(|view| {
            view.countdown = Some(CountdownView {
                kind,
                remaining_seconds: remaining.as_secs(),
            })
        });
    }

    fn hide_countdown(&self) {
        self.update(|view| view.countdown = None);
    }

    fn notify(&self, title: &str, body: &str) {
        info!("Notification: {} - {}", title, body);
        self.update(|view| {
            view.notification = Some(Notification {
                title: title.to_string(),
                body: body.to_string(),
            })
        });
    }
}

/// One authorized dispatch
#[derive(Debug, Clone, Serialize)]
pub struct DispatchRecord {
    pub id: Uuid,
    pub sent_at: DateTime<Utc>,
    pub kind: AlertKind,
    pub cause: String,
    pub location: String,
    pub contact: String,
    pub message: String,
    pub call_placed: bool,
}

/// Dispatcher that logs alerts and remembers the most recent ones
#[derive(Debug, Default)]
pub struct LoggingDispatcher {
    history: Mutex<VecDeque<DispatchRecord>>,
}

impl LoggingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent dispatches first
    pub fn history(&self, limit: usize) -> Vec<DispatchRecord> {
        self.history
            .lock()
            .map(|history| history.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.history.lock().map(|h| h.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DispatchSink for LoggingDispatcher {
    fn send_alert(&self, request: &AlertRequest) -> Result<(), DispatchError> {
        let message = request.sms_message();
        info!("SMS to {}: {}", request.contact, message);
        if request.requires_call() {
            info!("Calling {}", request.contact);
        }

        let record = DispatchRecord {
            id: Uuid::new_v4(),
            sent_at: Utc::now(),
            kind: request.kind,
            cause: request.cause.clone(),
            location: request.location.clone(),
            contact: request.contact.clone(),
            message,
            call_placed: request.requires_call(),
        };

        let mut history = self
            .history
            .lock()
            .map_err(|_| DispatchError::Unavailable("dispatch history poisoned".into()))?;
        if history.len() == HISTORY_CAPACITY {
            history.pop_front();
        }
        history.push_back(record);
        Ok(())
    }
}

/// Alarm that only logs transitions
#[derive(Debug, Default)]
pub struct LoggingAlarm {
    playing: AtomicBool,
}

impl LoggingAlarm {
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }
}

impl AlarmSink for LoggingAlarm {
    fn start_alarm(&self) {
        if !self.playing.swap(true, Ordering::Relaxed) {
            warn!("Alarm started");
        }
    }

    fn stop_alarm(&self) {
        if self.playing.swap(false, Ordering::Relaxed) {
            info!("Alarm stopped");
        }
    }
}

/// Fixed location from configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLocation(pub Option<GeoPoint>);

impl LocationProvider for StaticLocation {
    fn current_location(&self) -> Option<GeoPoint> {
        self.0
    }
}
