//! Recording collaborators for tests

use hazard::AlertKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::sinks::{
    AlarmSink, AlertRequest, Collaborators, ContactStore, DispatchError, DispatchSink, NoLocation,
    StatusSink,
};
use crate::Status;

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Status(Status),
    FatigueWarning(bool),
    Countdown(AlertKind, Duration),
    CountdownHidden,
    Notify(String),
    AlarmStarted,
    AlarmStopped,
    Dispatched(AlertRequest),
}

#[derive(Debug, Default)]
pub struct Recorder {
    events: Mutex<Vec<SinkEvent>>,
    contact: Mutex<Option<String>>,
    fail_dispatch: AtomicBool,
}

impl Recorder {
    pub fn new(contact: Option<&str>) -> Arc<Self> {
        let recorder = Self::default();
        *recorder.contact.lock().unwrap() = contact.map(str::to_string);
        Arc::new(recorder)
    }

    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators {
            contacts: self.clone(),
            location: Arc::new(NoLocation),
            dispatch: self.clone(),
            status: self.clone(),
            alarm: self.clone(),
        }
    }

    pub fn set_contact(&self, contact: Option<&str>) {
        *self.contact.lock().unwrap() = contact.map(str::to_string);
    }

    pub fn fail_dispatch(&self, fail: bool) {
        self.fail_dispatch.store(fail, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn dispatches(&self) -> Vec<AlertRequest> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Dispatched(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn last_status(&self) -> Option<Status> {
        self.events().into_iter().rev().find_map(|e| match e {
            SinkEvent::Status(status) => Some(status),
            _ => None,
        })
    }

    pub fn count(&self, event: &SinkEvent) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    fn push(&self, event: SinkEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl ContactStore for Recorder {
    fn emergency_contact(&self) -> Option<String> {
        self.contact.lock().unwrap().clone()
    }
}

impl DispatchSink for Recorder {
    fn send_alert(&self, request: &AlertRequest) -> Result<(), DispatchError> {
        self.push(SinkEvent::Dispatched(request.clone()));
        if self.fail_dispatch.load(Ordering::SeqCst) {
            return Err(DispatchError::Sms("no signal".into()));
        }
        Ok(())
    }
}

impl StatusSink for Recorder {
    fn set_status(&self, status: &Status) {
        self.push(SinkEvent::Status(status.clone()));
    }

    fn set_fatigue_warning_visible(&self, visible: bool) {
        self.push(SinkEvent::FatigueWarning(visible));
    }

    fn show_countdown(&self, kind: AlertKind, remaining: Duration) {
        self.push(SinkEvent::Countdown(kind, remaining));
    }

    fn hide_countdown(&self) {
        self.push(SinkEvent::CountdownHidden);
    }

    fn notify(&self, title: &str, _body: &str) {
        self.push(SinkEvent::Notify(title.to_string()));
    }
}

impl AlarmSink for Recorder {
    fn start_alarm(&self) {
        self.push(SinkEvent::AlarmStarted);
    }

    fn stop_alarm(&self) {
        self.push(SinkEvent::AlarmStopped);
    }
}
