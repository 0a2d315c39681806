//! Serialized alert service
//!
//! One tokio task owns the [`AlertOrchestrator`]. Detector pipelines, the UI
//! and the countdown timers all talk to it through the same bounded channel,
//! so cooldown checks and the pending alert are always checked-and-set
//! atomically relative to every other input.

use hazard::HazardEvent;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::orchestrator::{AlertOrchestrator, Input, OrchestratorSnapshot, TimerRequest};
use crate::sinks::Collaborators;
use crate::{AlertConfig, AlertError};

enum Command {
    Input(Input),
    Snapshot(oneshot::Sender<OrchestratorSnapshot>),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable handle to the running service
#[derive(Clone)]
pub struct AlertHandle {
    tx: mpsc::Sender<Command>,
}

impl AlertHandle {
    /// Deliver a hazard event, waiting for queue space
    pub async fn send(&self, event: HazardEvent) -> Result<(), AlertError> {
        self.tx
            .send(Command::Input(Input::Hazard(event)))
            .await
            .map_err(|_| AlertError::ServiceStopped)
    }

    /// Driver pressed cancel
    pub async fn cancel(&self) -> Result<(), AlertError> {
        self.send(HazardEvent::UserCancel).await
    }

    /// Emergency contact settings were saved
    pub async fn contact_changed(&self) -> Result<(), AlertError> {
        self.tx
            .send(Command::Input(Input::ContactChanged))
            .await
            .map_err(|_| AlertError::ServiceStopped)
    }

    pub async fn snapshot(&self) -> Result<OrchestratorSnapshot, AlertError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot(tx))
            .await
            .map_err(|_| AlertError::ServiceStopped)?;
        rx.await.map_err(|_| AlertError::ServiceStopped)
    }

    /// Stop the service, cancelling any pending countdown without dispatch
    pub async fn shutdown(&self) -> Result<(), AlertError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(Command::Shutdown(tx))
            .await
            .map_err(|_| AlertError::ServiceStopped)?;
        rx.await.map_err(|_| AlertError::ServiceStopped)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Owner of the orchestrator and its timer tasks
pub struct AlertService {
    orchestrator: AlertOrchestrator,
    rx: mpsc::Receiver<Command>,
    timer_tx: mpsc::WeakSender<Command>,
    countdown: Option<JoinHandle<()>>,
    settle: Option<JoinHandle<()>>,
}

impl AlertService {
    pub fn new(config: AlertConfig, sinks: Collaborators) -> (Self, AlertHandle) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let service = Self {
            orchestrator: AlertOrchestrator::new(config, sinks),
            rx,
            timer_tx: tx.downgrade(),
            countdown: None,
            settle: None,
        };
        (service, AlertHandle { tx })
    }

    /// Spawn onto the current runtime
    pub fn spawn(config: AlertConfig, sinks: Collaborators) -> (AlertHandle, JoinHandle<()>) {
        let (service, handle) = Self::new(config, sinks);
        let task = tokio::spawn(service.run());
        (handle, task)
    }

    /// Run until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        self.orchestrator.start();

        while let Some(command) = self.rx.recv().await {
            match command {
                Command::Input(input) => {
                    let request = self.orchestrator.handle(input, Instant::now());
                    self.apply(request);
                }
                Command::Snapshot(reply) => {
                    let _ = reply.send(self.orchestrator.snapshot());
                }
                Command::Shutdown(ack) => {
                    let request = self.orchestrator.shutdown();
                    self.apply(request);
                    self.abort_timers();
                    let _ = ack.send(());
                    return;
                }
            }
        }

        debug!("All alert handles dropped");
        let request = self.orchestrator.shutdown();
        self.apply(request);
        self.abort_timers();
    }

    fn apply(&mut self, request: Option<TimerRequest>) {
        match request {
            Some(TimerRequest::StartCountdown {
                generation,
                deadline,
                tick,
            }) => {
                if let Some(previous) = self.countdown.take() {
                    previous.abort();
                }
                info!("Countdown {} armed", generation);
                self.countdown = Some(tokio::spawn(run_countdown(
                    self.timer_tx.clone(),
                    generation,
                    deadline,
                    tick,
                )));
            }
            Some(TimerRequest::CancelCountdown { generation }) => {
                debug!("Countdown {} disarmed", generation);
                if let Some(task) = self.countdown.take() {
                    task.abort();
                }
            }
            Some(TimerRequest::ScheduleSettle { generation, at }) => {
                if let Some(previous) = self.settle.take() {
                    previous.abort();
                }
                let tx = self.timer_tx.clone();
                self.settle = Some(tokio::spawn(async move {
                    time::sleep_until(at).await;
                    forward(&tx, Input::StatusSettle { generation }).await;
                }));
            }
            None => {}
        }

        // The countdown task has already delivered its expiry once the machine is idle
        if self.orchestrator.is_idle() {
            if let Some(task) = self.countdown.take() {
                task.abort();
            }
        }
    }

    fn abort_timers(&mut self) {
        for task in [self.countdown.take(), self.settle.take()].into_iter().flatten() {
            task.abort();
        }
    }
}

/// Countdown timer: ticks refresh the display, expiry alone decides firing
async fn run_countdown(
    tx: mpsc::WeakSender<Command>,
    generation: u64,
    deadline: Instant,
    tick: Duration,
) {
    let mut ticker = time::interval_at(Instant::now() + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let expiry = time::sleep_until(deadline);
    tokio::pin!(expiry);

    loop {
        tokio::select! {
            biased;
            _ = &mut expiry => {
                forward(&tx, Input::CountdownExpired { generation }).await;
                return;
            }
            _ = ticker.tick() => {
                if !forward(&tx, Input::CountdownTick { generation }).await {
                    return;
                }
            }
        }
    }
}

async fn forward(tx: &mpsc::WeakSender<Command>, input: Input) -> bool {
    match tx.upgrade() {
        Some(tx) => tx.send(Command::Input(input)).await.is_ok(),
        None => false,
    }
}
