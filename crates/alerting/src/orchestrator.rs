//! Alert orchestrator state machine
//!
//! Reduces hazard events, countdown timer messages and user cancellation into
//! a single send/don't-send decision. The machine is synchronous and owns no
//! timers: it returns [`TimerRequest`]s for the surrounding service to act on,
//! and every timer message carries the generation of the countdown it belongs
//! to. A message whose generation no longer matches the pending alert is
//! dropped, so expiry racing a cancel can never double-dispatch.

use hazard::{AlertKind, HazardEvent};
use serde::Serialize;
use std::mem;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::cooldown::CooldownState;
use crate::sinks::{format_location, AlertRequest, Collaborators};
use crate::{AlertConfig, AlertError, Status};

/// Countdown in flight
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAlert {
    pub kind: AlertKind,
    pub cause: String,
    pub location_snapshot: String,
    pub contact: String,
    /// Last displayed remaining time
    pub remaining: Duration,
    /// Instant at which the alert fires
    pub deadline: Instant,
    /// Identifies this countdown in timer messages
    pub generation: u64,
}

/// Orchestrator state
#[derive(Debug, Clone, Default, PartialEq)]
pub enum OrchestratorState {
    #[default]
    Idle,
    CountingDown(PendingAlert),
}

/// Everything the orchestrator reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Hazard(HazardEvent),
    CountdownTick { generation: u64 },
    CountdownExpired { generation: u64 },
    StatusSettle { generation: u64 },
    /// Emergency contact settings were saved
    ContactChanged,
}

impl From<HazardEvent> for Input {
    fn from(event: HazardEvent) -> Self {
        Input::Hazard(event)
    }
}

/// Timer work requested from the owning service
#[derive(Debug, Clone, PartialEq)]
pub enum TimerRequest {
    /// Spawn a countdown firing at `deadline`, ticking every `tick`
    StartCountdown {
        generation: u64,
        deadline: Instant,
        tick: Duration,
    },
    /// Drop the countdown task
    CancelCountdown { generation: u64 },
    /// Deliver `StatusSettle` at `at`
    ScheduleSettle { generation: u64, at: Instant },
}

/// Why a countdown ended without dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    UserCancel,
    FatigueEnded,
    FaceLost,
    Shutdown,
}

impl CancelReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancelReason::UserCancel => "user_cancel",
            CancelReason::FatigueEnded => "fatigue_ended",
            CancelReason::FaceLost => "face_lost",
            CancelReason::Shutdown => "shutdown",
        }
    }
}

/// Serializable view of the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrchestratorSnapshot {
    pub pending_kind: Option<AlertKind>,
    pub pending_cause: Option<String>,
    pub remaining_seconds: Option<u64>,
    pub fatigue_active: bool,
    pub alarm_playing: bool,
    pub dispatched: u64,
}

/// The alert state machine
pub struct AlertOrchestrator {
    config: AlertConfig,
    sinks: Collaborators,
    state: OrchestratorState,
    cooldown: CooldownState,
    /// Fatigue warning shown for the current fatigue episode
    fatigue_active: bool,
    alarm_playing: bool,
    next_generation: u64,
    last_dispatch: Option<u64>,
    dispatched: u64,
}

impl AlertOrchestrator {
    pub fn new(config: AlertConfig, sinks: Collaborators) -> Self {
        Self {
            config,
            sinks,
            state: OrchestratorState::Idle,
            cooldown: CooldownState::new(),
            fatigue_active: false,
            alarm_playing: false,
            next_generation: 1,
            last_dispatch: None,
            dispatched: 0,
        }
    }

    pub fn pending(&self) -> Option<&PendingAlert> {
        match &self.state {
            OrchestratorState::CountingDown(pending) => Some(pending),
            OrchestratorState::Idle => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.pending().is_none()
    }

    pub fn cooldown(&self) -> &CooldownState {
        &self.cooldown
    }

    pub fn fatigue_active(&self) -> bool {
        self.fatigue_active
    }

    pub fn alarm_playing(&self) -> bool {
        self.alarm_playing
    }

    pub fn snapshot(&self) -> OrchestratorSnapshot {
        let pending = self.pending();
        OrchestratorSnapshot {
            pending_kind: pending.map(|p| p.kind),
            pending_cause: pending.map(|p| p.cause.clone()),
            remaining_seconds: pending.map(|p| p.remaining.as_secs()),
            fatigue_active: self.fatigue_active,
            alarm_playing: self.alarm_playing,
            dispatched: self.dispatched,
        }
    }

    /// Publish the initial status
    pub fn start(&mut self) {
        let status = self.idle_status();
        info!("Alert orchestrator started ({})", status);
        self.sinks.status.set_status(&status);
    }

    /// Cancel anything in flight without dispatching
    pub fn shutdown(&mut self) -> Option<TimerRequest> {
        let request = self.cancel(CancelReason::Shutdown);
        self.stop_alarm();
        info!("Alert orchestrator stopped");
        request
    }

    /// Process one input. Total over every state and input.
    pub fn handle(&mut self, input: Input, now: Instant) -> Option<TimerRequest> {
        match input {
            Input::Hazard(event) => self.on_hazard(event, now),
            Input::CountdownTick { generation } => {
                self.on_tick(generation, now);
                None
            }
            Input::CountdownExpired { generation } => self.on_expired(generation, now),
            Input::StatusSettle { generation } => {
                self.on_settle(generation);
                None
            }
            Input::ContactChanged => {
                self.on_contact_changed();
                None
            }
        }
    }

    fn on_hazard(&mut self, event: HazardEvent, now: Instant) -> Option<TimerRequest> {
        debug!("Hazard event: {}", event.name());
        match event {
            HazardEvent::FatigueStarted => self.on_fatigue_started(now),
            HazardEvent::FatigueEnded => self.on_fatigue_resolved(CancelReason::FatigueEnded),
            HazardEvent::FaceLost => self.on_fatigue_resolved(CancelReason::FaceLost),
            HazardEvent::AccidentCandidate { cause } => self.on_accident(cause, now),
            HazardEvent::UserCancel => self.on_user_cancel(),
        }
    }

    fn on_fatigue_started(&mut self, now: Instant) -> Option<TimerRequest> {
        match self.pending().map(|p| p.kind) {
            Some(AlertKind::Fatigue) => {
                debug!("Fatigue countdown already running");
                None
            }
            Some(AlertKind::Accident) => {
                // Accident keeps the status line, fatigue visuals still follow the driver
                self.show_fatigue(false);
                None
            }
            None => {
                self.show_fatigue(true);
                self.try_start_countdown(AlertKind::Fatigue, "Driver Fatigue Detected".into(), now)
            }
        }
    }

    fn on_fatigue_resolved(&mut self, reason: CancelReason) -> Option<TimerRequest> {
        match self.pending().map(|p| p.kind) {
            Some(AlertKind::Fatigue) => {
                info!("Fatigue resolved during fatigue countdown ({})", reason.as_str());
                self.clear_fatigue(false);
                self.cancel(reason)
            }
            Some(AlertKind::Accident) => {
                debug!("Fatigue resolved during accident countdown, countdown continues");
                self.clear_fatigue(false);
                None
            }
            None => {
                self.clear_fatigue(true);
                None
            }
        }
    }

    fn on_accident(&mut self, cause: String, now: Instant) -> Option<TimerRequest> {
        if let Some(pending) = self.pending() {
            debug!(
                "Accident candidate ignored, {} countdown in flight: {}",
                pending.kind, cause
            );
            metrics::counter!(
                "driver_guard_alerts_suppressed_total",
                "kind" => AlertKind::Accident.as_str(),
                "reason" => "in_flight"
            )
            .increment(1);
            return None;
        }
        self.try_start_countdown(AlertKind::Accident, cause, now)
    }

    fn on_user_cancel(&mut self) -> Option<TimerRequest> {
        if self.is_idle() {
            debug!("Cancel with no countdown running");
            return None;
        }
        self.cancel(CancelReason::UserCancel)
    }

    fn try_start_countdown(
        &mut self,
        kind: AlertKind,
        cause: String,
        now: Instant,
    ) -> Option<TimerRequest> {
        let cooldown = self.config.cooldown();
        if !self.cooldown.should_fire(kind, now, cooldown) {
            info!(
                "{} alert in cooldown for another {}s",
                kind,
                self.cooldown.remaining(kind, now, cooldown).as_secs()
            );
            metrics::counter!(
                "driver_guard_alerts_suppressed_total",
                "kind" => kind.as_str(),
                "reason" => "cooldown"
            )
            .increment(1);
            return None;
        }

        let contact = match self.require_contact() {
            Ok(contact) => contact,
            Err(e) => {
                warn!("{} alert not started: {}", kind, e);
                self.sinks.status.set_status(&Status::ConfigurationNeeded);
                metrics::counter!(
                    "driver_guard_alerts_suppressed_total",
                    "kind" => kind.as_str(),
                    "reason" => "no_contact"
                )
                .increment(1);
                return None;
            }
        };

        let generation = self.next_generation;
        self.next_generation += 1;

        let remaining = self.config.countdown();
        let deadline = now + remaining;
        let location_snapshot = format_location(self.sinks.location.current_location());

        warn!("{} trigger -> countdown start. Cause: {}", kind, cause);

        if kind == AlertKind::Accident {
            self.sinks.status.set_status(&Status::AccidentDetected);
        }
        let title = match kind {
            AlertKind::Accident => "Potential Accident!",
            AlertKind::Fatigue => "Fatigue Alert!",
        };
        self.sinks.status.notify(
            title,
            &format!("Sending alert in {}s...", remaining.as_secs()),
        );
        self.sinks.status.show_countdown(kind, remaining);

        self.state = OrchestratorState::CountingDown(PendingAlert {
            kind,
            cause,
            location_snapshot,
            contact,
            remaining,
            deadline,
            generation,
        });

        Some(TimerRequest::StartCountdown {
            generation,
            deadline,
            tick: self.config.tick(),
        })
    }

    fn on_tick(&mut self, generation: u64, now: Instant) {
        let OrchestratorState::CountingDown(pending) = &mut self.state else {
            return;
        };
        if pending.generation != generation {
            return;
        }
        pending.remaining = pending.deadline.saturating_duration_since(now);
        self.sinks.status.show_countdown(pending.kind, pending.remaining);
    }

    fn on_expired(&mut self, generation: u64, now: Instant) -> Option<TimerRequest> {
        let matches = self.pending().map(|p| p.generation) == Some(generation);
        if !matches {
            debug!("Stale countdown expiry {} ignored", generation);
            return None;
        }
        let OrchestratorState::CountingDown(pending) =
            mem::replace(&mut self.state, OrchestratorState::Idle)
        else {
            return None;
        };

        info!("Countdown finished for {}", pending.kind);
        self.cooldown.record_fire(pending.kind, now);
        self.sinks.status.hide_countdown();

        let request = AlertRequest {
            kind: pending.kind,
            cause: pending.cause,
            location: pending.location_snapshot,
            contact: pending.contact,
        };

        self.dispatched += 1;
        match self.sinks.dispatch.send_alert(&request) {
            Ok(()) => {
                info!(
                    "Alert sent for {} (call: {})",
                    request.kind,
                    request.requires_call()
                );
                metrics::counter!(
                    "driver_guard_alerts_dispatched_total",
                    "kind" => request.kind.as_str()
                )
                .increment(1);
                self.sinks.status.set_status(&Status::AlertSent);
            }
            Err(e) => {
                error!("{} alert dispatch failed: {}", request.kind, e);
                metrics::counter!(
                    "driver_guard_alerts_failed_total",
                    "kind" => request.kind.as_str()
                )
                .increment(1);
                self.sinks.status.set_status(&Status::DispatchFailed(e.to_string()));
            }
        }

        if request.kind == AlertKind::Fatigue {
            self.clear_fatigue(false);
        }

        self.last_dispatch = Some(generation);
        Some(TimerRequest::ScheduleSettle {
            generation,
            at: now + self.config.status_settle(),
        })
    }

    fn on_settle(&mut self, generation: u64) {
        if self.last_dispatch != Some(generation) || !self.is_idle() || self.fatigue_active {
            return;
        }
        let status = self.idle_status();
        self.sinks.status.set_status(&status);
    }

    /// Clear a stale configuration prompt once a contact exists
    fn on_contact_changed(&mut self) {
        if !self.is_idle() || self.fatigue_active {
            return;
        }
        let status = self.idle_status();
        debug!("Contact changed, status {}", status);
        self.sinks.status.set_status(&status);
    }

    /// Terminal transition without dispatch. No-op when idle.
    fn cancel(&mut self, reason: CancelReason) -> Option<TimerRequest> {
        let OrchestratorState::CountingDown(pending) =
            mem::replace(&mut self.state, OrchestratorState::Idle)
        else {
            return None;
        };

        warn!(
            "Countdown cancelled: {} (was for: {})",
            reason.as_str(),
            pending.kind
        );
        metrics::counter!(
            "driver_guard_alerts_cancelled_total",
            "kind" => pending.kind.as_str(),
            "reason" => reason.as_str()
        )
        .increment(1);

        // Alarm goes quiet, the fatigue warning stays until fatigue resolves
        self.stop_alarm();
        self.sinks.status.hide_countdown();
        if reason != CancelReason::Shutdown {
            self.sinks.status.notify("Alert Canceled", reason.as_str());
        }
        let status = self.idle_status();
        self.sinks.status.set_status(&status);

        Some(TimerRequest::CancelCountdown {
            generation: pending.generation,
        })
    }

    fn show_fatigue(&mut self, update_status: bool) {
        if self.fatigue_active {
            return;
        }
        warn!("Fatigue detected");
        self.fatigue_active = true;
        if update_status {
            self.sinks.status.set_status(&Status::FatigueDetected);
        }
        self.sinks.status.set_fatigue_warning_visible(true);
        self.start_alarm();
    }

    fn clear_fatigue(&mut self, update_status: bool) {
        if !self.fatigue_active {
            return;
        }
        info!("Fatigue ended");
        self.fatigue_active = false;
        self.sinks.status.set_fatigue_warning_visible(false);
        self.stop_alarm();
        if update_status {
            let status = self.idle_status();
            self.sinks.status.set_status(&status);
        }
    }

    fn start_alarm(&mut self) {
        if !self.alarm_playing {
            self.alarm_playing = true;
            self.sinks.alarm.start_alarm();
        }
    }

    fn stop_alarm(&mut self) {
        if self.alarm_playing {
            self.alarm_playing = false;
            self.sinks.alarm.stop_alarm();
        }
    }

    fn require_contact(&self) -> Result<String, AlertError> {
        self.sinks
            .contacts
            .emergency_contact()
            .filter(|contact| !contact.trim().is_empty())
            .ok_or(AlertError::ConfigurationMissing)
    }

    fn idle_status(&self) -> Status {
        if self.require_contact().is_ok() {
            Status::Monitoring
        } else {
            Status::ConfigurationNeeded
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Recorder, SinkEvent};
    use proptest::prelude::*;
    use std::sync::Arc;

    const CONTACT: &str = "5550100";

    fn setup(contact: Option<&str>) -> (AlertOrchestrator, Arc<Recorder>, Instant) {
        let recorder = Recorder::new(contact);
        let orchestrator = AlertOrchestrator::new(AlertConfig::default(), recorder.collaborators());
        (orchestrator, recorder, Instant::now())
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn accident(cause: &str) -> Input {
        Input::Hazard(HazardEvent::AccidentCandidate { cause: cause.into() })
    }

    fn started_generation(request: Option<TimerRequest>) -> u64 {
        match request {
            Some(TimerRequest::StartCountdown { generation, .. }) => generation,
            other => panic!("expected countdown start, got {:?}", other),
        }
    }

    #[test]
    fn test_fatigue_countdown_fires() {
        let (mut orch, rec, t0) = setup(Some(CONTACT));

        let request = orch.handle(HazardEvent::FatigueStarted.into(), t0);
        let generation = started_generation(request.clone());
        assert_eq!(
            request,
            Some(TimerRequest::StartCountdown {
                generation,
                deadline: t0 + secs(7),
                tick: secs(1),
            })
        );
        assert_eq!(orch.pending().unwrap().kind, AlertKind::Fatigue);
        assert!(orch.alarm_playing());

        let settle = orch.handle(Input::CountdownExpired { generation }, t0 + secs(7));
        assert!(matches!(settle, Some(TimerRequest::ScheduleSettle { .. })));
        assert!(orch.is_idle());

        let dispatches = rec.dispatches();
        assert_eq!(dispatches.len(), 1);
        assert_eq!(dispatches[0].kind, AlertKind::Fatigue);
        assert_eq!(dispatches[0].cause, "Driver Fatigue Detected");
        assert_eq!(dispatches[0].contact, CONTACT);
        assert_eq!(dispatches[0].location, "Location unavailable");
        assert_eq!(rec.last_status(), Some(Status::AlertSent));

        // Fatigue dispatch resets fatigue visuals
        assert!(!orch.fatigue_active());
        assert!(!orch.alarm_playing());
        assert_eq!(orch.cooldown().last_fatigue_alert, Some(t0 + secs(7)));
    }

    #[test]
    fn test_user_cancel_prevents_dispatch() {
        let (mut orch, rec, t0) = setup(Some(CONTACT));
        let generation = started_generation(orch.handle(HazardEvent::FatigueStarted.into(), t0));

        let request = orch.handle(HazardEvent::UserCancel.into(), t0 + secs(1));
        assert_eq!(request, Some(TimerRequest::CancelCountdown { generation }));
        assert!(orch.is_idle());
        assert!(!orch.alarm_playing());
        assert_eq!(rec.last_status(), Some(Status::Monitoring));

        // Expiry racing the cancel is a no-op
        assert_eq!(orch.handle(Input::CountdownExpired { generation }, t0 + secs(7)), None);
        assert!(rec.dispatches().is_empty());
        assert_eq!(orch.cooldown().last_fatigue_alert, None);
    }

    #[test]
    fn test_cancellation_is_idempotent() {
        let (mut orch, rec, t0) = setup(Some(CONTACT));
        let generation = started_generation(orch.handle(accident("x"), t0));

        assert!(orch.handle(HazardEvent::UserCancel.into(), t0 + secs(2)).is_some());
        assert_eq!(orch.handle(HazardEvent::UserCancel.into(), t0 + secs(3)), None);

        let fired = started_generation(orch.handle(accident("y"), t0 + secs(4)));
        assert_ne!(fired, generation);
        orch.handle(Input::CountdownExpired { generation: fired }, t0 + secs(11));
        assert_eq!(orch.handle(HazardEvent::UserCancel.into(), t0 + secs(12)), None);
        assert_eq!(orch.handle(Input::CountdownExpired { generation: fired }, t0 + secs(12)), None);

        assert_eq!(rec.dispatches().len(), 1);
        assert_eq!(rec.dispatches()[0].cause, "y");
    }

    #[test]
    fn test_fatigue_end_cancels_fatigue_countdown() {
        for event in [HazardEvent::FatigueEnded, HazardEvent::FaceLost] {
            let (mut orch, rec, t0) = setup(Some(CONTACT));
            let generation =
                started_generation(orch.handle(HazardEvent::FatigueStarted.into(), t0));

            let request = orch.handle(event.into(), t0 + secs(2));
            assert_eq!(request, Some(TimerRequest::CancelCountdown { generation }));
            assert!(orch.is_idle());
            assert!(!orch.fatigue_active());
            assert_eq!(rec.count(&SinkEvent::FatigueWarning(false)), 1);
            assert_eq!(rec.count(&SinkEvent::AlarmStopped), 1);
        }
    }

    #[test]
    fn test_accident_has_priority_over_fatigue_events() {
        let (mut orch, rec, t0) = setup(Some(CONTACT));
        let generation = started_generation(orch.handle(accident("High Impact (50.0 m/s²)"), t0));

        assert_eq!(orch.handle(HazardEvent::FatigueStarted.into(), t0 + secs(1)), None);
        assert!(orch.fatigue_active());
        assert_eq!(orch.handle(HazardEvent::FatigueEnded.into(), t0 + secs(2)), None);
        assert_eq!(orch.handle(HazardEvent::FaceLost.into(), t0 + secs(3)), None);
        assert_eq!(orch.pending().unwrap().kind, AlertKind::Accident);
        assert_eq!(rec.last_status(), Some(Status::AccidentDetected));

        orch.handle(Input::CountdownExpired { generation }, t0 + secs(7));
        let dispatches = rec.dispatches();
        assert_eq!(dispatches.len(), 1);
        assert_eq!(dispatches[0].kind, AlertKind::Accident);
        assert!(dispatches[0].requires_call());
    }

    #[test]
    fn test_single_flight_ignores_other_kind() {
        let (mut orch, _rec, t0) = setup(Some(CONTACT));
        started_generation(orch.handle(HazardEvent::FatigueStarted.into(), t0));

        assert_eq!(orch.handle(accident("spike"), t0 + secs(1)), None);
        assert_eq!(orch.pending().unwrap().kind, AlertKind::Fatigue);
        // The ignored candidate is not queued
        orch.handle(HazardEvent::UserCancel.into(), t0 + secs(2));
        assert!(orch.is_idle());
    }

    #[test]
    fn test_cooldown_independence() {
        let (mut orch, rec, t0) = setup(Some(CONTACT));
        let generation = started_generation(orch.handle(accident("first"), t0));
        orch.handle(Input::CountdownExpired { generation }, t0 + secs(7));

        // Fatigue right after an accident dispatch is allowed
        assert!(orch.handle(HazardEvent::FatigueStarted.into(), t0 + secs(8)).is_some());
        orch.handle(HazardEvent::UserCancel.into(), t0 + secs(9));

        // Second accident inside the cooldown is suppressed
        assert_eq!(orch.handle(accident("second"), t0 + secs(60)), None);
        assert!(orch.is_idle());

        // After the cooldown it fires again
        assert!(orch.handle(accident("third"), t0 + secs(7 + 120)).is_some());
        assert_eq!(rec.dispatches().len(), 1);
    }

    #[test]
    fn test_missing_contact_refuses_countdown() {
        let (mut orch, rec, t0) = setup(None);
        assert_eq!(orch.handle(accident("spike"), t0), None);
        assert!(orch.is_idle());
        assert_eq!(rec.last_status(), Some(Status::ConfigurationNeeded));

        // Fatigue still sounds the alarm, but no countdown
        assert_eq!(orch.handle(HazardEvent::FatigueStarted.into(), t0), None);
        assert!(orch.alarm_playing());
        assert_eq!(rec.last_status(), Some(Status::ConfigurationNeeded));

        rec.set_contact(Some(CONTACT));
        assert!(orch.handle(accident("spike"), t0 + secs(1)).is_some());
    }

    #[test]
    fn test_cooldown_blocks_countdown_but_not_alarm() {
        let (mut orch, rec, t0) = setup(Some(CONTACT));
        let generation = started_generation(orch.handle(HazardEvent::FatigueStarted.into(), t0));
        orch.handle(Input::CountdownExpired { generation }, t0 + secs(7));
        rec.clear();

        orch.handle(HazardEvent::FatigueEnded.into(), t0 + secs(8));
        assert_eq!(orch.handle(HazardEvent::FatigueStarted.into(), t0 + secs(20)), None);
        assert!(orch.alarm_playing());
        assert_eq!(rec.last_status(), Some(Status::FatigueDetected));
        assert_eq!(rec.count(&SinkEvent::AlarmStarted), 1);
    }

    #[test]
    fn test_ticks_update_remaining() {
        let (mut orch, rec, t0) = setup(Some(CONTACT));
        let generation = started_generation(orch.handle(accident("spike"), t0));

        orch.handle(Input::CountdownTick { generation }, t0 + secs(1));
        assert_eq!(orch.pending().unwrap().remaining, secs(6));
        assert!(rec.events().contains(&SinkEvent::Countdown(AlertKind::Accident, secs(6))));

        // Stale tick from an older countdown is ignored
        orch.handle(Input::CountdownTick { generation: generation + 10 }, t0 + secs(2));
        assert_eq!(orch.pending().unwrap().remaining, secs(6));
    }

    #[test]
    fn test_dispatch_failure_surfaces_status() {
        let (mut orch, rec, t0) = setup(Some(CONTACT));
        rec.fail_dispatch(true);
        let generation = started_generation(orch.handle(accident("spike"), t0));
        orch.handle(Input::CountdownExpired { generation }, t0 + secs(7));

        assert_eq!(
            rec.last_status(),
            Some(Status::DispatchFailed("SMS send failed: no signal".into()))
        );
        // Not retried, cooldown still stamped
        assert_eq!(rec.dispatches().len(), 1);
        assert_eq!(orch.cooldown().last_accident_alert, Some(t0 + secs(7)));
    }

    #[test]
    fn test_status_settles_after_send() {
        let (mut orch, rec, t0) = setup(Some(CONTACT));
        let generation = started_generation(orch.handle(accident("spike"), t0));
        let settle = orch.handle(Input::CountdownExpired { generation }, t0 + secs(7));
        assert_eq!(
            settle,
            Some(TimerRequest::ScheduleSettle { generation, at: t0 + secs(12) })
        );

        orch.handle(Input::StatusSettle { generation }, t0 + secs(12));
        assert_eq!(rec.last_status(), Some(Status::Monitoring));
    }

    #[test]
    fn test_status_settle_skipped_while_busy() {
        let (mut orch, rec, t0) = setup(Some(CONTACT));
        let generation = started_generation(orch.handle(accident("spike"), t0));
        orch.handle(Input::CountdownExpired { generation }, t0 + secs(7));

        orch.handle(HazardEvent::FatigueStarted.into(), t0 + secs(8));
        orch.handle(Input::StatusSettle { generation }, t0 + secs(12));
        assert_eq!(rec.last_status(), Some(Status::FatigueDetected));
    }

    #[test]
    fn test_idle_fatigue_end_updates_ui_only() {
        let (mut orch, rec, t0) = setup(Some(CONTACT));
        assert_eq!(orch.handle(HazardEvent::FatigueEnded.into(), t0), None);
        assert_eq!(orch.handle(HazardEvent::FaceLost.into(), t0), None);
        assert_eq!(orch.handle(HazardEvent::UserCancel.into(), t0), None);
        assert!(rec.events().is_empty());
    }

    #[test]
    fn test_shutdown_cancels_pending() {
        let (mut orch, rec, t0) = setup(Some(CONTACT));
        let generation = started_generation(orch.handle(HazardEvent::FatigueStarted.into(), t0));
        assert_eq!(orch.shutdown(), Some(TimerRequest::CancelCountdown { generation }));
        assert!(!orch.alarm_playing());
        assert!(rec.dispatches().is_empty());
        assert_eq!(orch.shutdown(), None);
    }

    #[test]
    fn test_contact_saved_clears_configuration_prompt() {
        let (mut orch, rec, t0) = setup(None);
        orch.start();
        assert_eq!(rec.last_status(), Some(Status::ConfigurationNeeded));

        rec.set_contact(Some(CONTACT));
        assert_eq!(orch.handle(Input::ContactChanged, t0), None);
        assert_eq!(rec.last_status(), Some(Status::Monitoring));
    }

    #[test]
    fn test_contact_change_keeps_busy_status() {
        let (mut orch, rec, t0) = setup(Some(CONTACT));
        started_generation(orch.handle(accident("spike"), t0));
        orch.handle(Input::ContactChanged, t0 + secs(1));
        assert_eq!(rec.last_status(), Some(Status::AccidentDetected));
        orch.handle(HazardEvent::UserCancel.into(), t0 + secs(2));

        orch.handle(HazardEvent::FatigueStarted.into(), t0 + secs(3));
        orch.handle(HazardEvent::UserCancel.into(), t0 + secs(4));
        rec.clear();
        orch.handle(Input::ContactChanged, t0 + secs(5));
        assert!(rec.events().is_empty());
    }

    #[test]
    fn test_cancel_during_accident_keeps_fatigue_warning() {
        let (mut orch, rec, t0) = setup(Some(CONTACT));
        started_generation(orch.handle(accident("spike"), t0));
        orch.handle(HazardEvent::FatigueStarted.into(), t0 + secs(1));
        assert!(orch.alarm_playing());

        orch.handle(HazardEvent::UserCancel.into(), t0 + secs(2));
        assert!(orch.is_idle());
        assert!(!orch.alarm_playing());
        assert!(orch.fatigue_active());
        assert_eq!(rec.count(&SinkEvent::FatigueWarning(false)), 0);

        // Same episode: no second alarm, the warning clears when the eyes reopen
        orch.handle(HazardEvent::FatigueStarted.into(), t0 + secs(3));
        assert!(!orch.alarm_playing());
        orch.handle(HazardEvent::FatigueEnded.into(), t0 + secs(4));
        assert!(!orch.fatigue_active());
        assert_eq!(rec.count(&SinkEvent::FatigueWarning(false)), 1);
    }

    #[test]
    fn test_start_publishes_status() {
        let (mut orch, rec, _) = setup(None);
        orch.start();
        assert_eq!(rec.last_status(), Some(Status::ConfigurationNeeded));

        let (mut orch, rec, _) = setup(Some(CONTACT));
        orch.start();
        assert_eq!(rec.last_status(), Some(Status::Monitoring));
    }

    #[derive(Debug, Clone)]
    enum Step {
        Advance(u64),
        Fatigue,
        FatigueEnd,
        FaceLost,
        Accident,
        Cancel,
        Tick,
        Expire,
        ExpireStale(u64),
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            (1u64..40_000).prop_map(Step::Advance),
            Just(Step::Fatigue),
            Just(Step::FatigueEnd),
            Just(Step::FaceLost),
            Just(Step::Accident),
            Just(Step::Cancel),
            Just(Step::Tick),
            Just(Step::Expire),
            (0u64..20).prop_map(Step::ExpireStale),
        ]
    }

    proptest! {
        #[test]
        fn prop_dispatches_respect_flight_and_cooldown(steps in prop::collection::vec(step(), 1..200)) {
            let (mut orch, rec, t0) = setup(Some(CONTACT));
            let mut now = t0;
            let mut started = 0usize;
            let mut fired_at: Vec<(AlertKind, Instant)> = Vec::new();

            for step in steps {
                let before = orch.pending().cloned();
                let input = match step {
                    Step::Advance(ms) => {
                        now += Duration::from_millis(ms);
                        continue;
                    }
                    Step::Fatigue => HazardEvent::FatigueStarted.into(),
                    Step::FatigueEnd => HazardEvent::FatigueEnded.into(),
                    Step::FaceLost => HazardEvent::FaceLost.into(),
                    Step::Accident => accident("spike"),
                    Step::Cancel => HazardEvent::UserCancel.into(),
                    Step::Tick => match &before {
                        Some(p) => Input::CountdownTick { generation: p.generation },
                        None => continue,
                    },
                    Step::Expire => match &before {
                        Some(p) if now >= p.deadline => Input::CountdownExpired { generation: p.generation },
                        _ => continue,
                    },
                    Step::ExpireStale(g) => match &before {
                        Some(p) if p.generation == g => continue,
                        _ => Input::CountdownExpired { generation: g },
                    },
                };

                let dispatched_before = rec.dispatches().len();
                let request = orch.handle(input, now);
                if matches!(request, Some(TimerRequest::StartCountdown { .. })) {
                    // A new countdown only starts from idle
                    prop_assert!(before.is_none());
                    started += 1;
                }

                let dispatched_after = rec.dispatches().len();
                prop_assert!(dispatched_after - dispatched_before <= 1);
                if dispatched_after > dispatched_before {
                    let pending = before.expect("dispatch requires a pending alert");
                    prop_assert!(now >= pending.deadline);
                    fired_at.push((pending.kind, now));
                }
            }

            prop_assert!(fired_at.len() <= started);
            for kind in [AlertKind::Fatigue, AlertKind::Accident] {
                let times: Vec<_> = fired_at.iter().filter(|(k, _)| *k == kind).map(|(_, t)| *t).collect();
                for pair in times.windows(2) {
                    prop_assert!(pair[1] - pair[0] >= Duration::from_secs(120));
                }
            }
        }
    }
}
