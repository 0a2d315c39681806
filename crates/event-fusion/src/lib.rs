//! Event Fusion Engine
//!
//! Feeds asynchronous sources into the single alert orchestrator queue:
//! - Camera (face detector results → fatigue reducer)
//! - IMU (accelerometer/gyroscope samples → spike detector)
//!
//! Each source runs in its own task and processes one item at a time. The
//! inbound channel holds at most `queue_depth` waiting items, so producers
//! either wait (`submit_*`) or are told the source is busy (`try_submit_*`).

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use alerting::AlertHandle;
use dms::{DmsConfig, FaceObservation, FatigueSignalReducer};
use hazard::HazardEvent;
use motion::{MotionConfig, MotionSample, MotionSpikeDetector};

/// Fusion error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FusionError {
    #[error("{0} pipeline closed")]
    Closed(&'static str),

    #[error("{0} pipeline busy")]
    Busy(&'static str),
}

/// Fusion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Items allowed to wait behind the one being processed, per source
    pub queue_depth: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self { queue_depth: 1 }
    }
}

/// Per-source counters
#[derive(Debug, Default)]
pub struct SourceStats {
    processed: AtomicU64,
    events: AtomicU64,
    dropped: AtomicU64,
}

impl SourceStats {
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn events(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }

    /// Items rejected by `try_submit_*` while the source was busy
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Counters for both sources
#[derive(Debug, Default)]
pub struct FusionStats {
    pub camera: SourceStats,
    pub imu: SourceStats,
}

/// Running camera and IMU pipelines
pub struct EventFusion {
    frame_tx: mpsc::Sender<FaceObservation>,
    motion_tx: mpsc::Sender<MotionSample>,
    stats: Arc<FusionStats>,
    tasks: Vec<JoinHandle<()>>,
}

impl EventFusion {
    /// Spawn both pipelines, forwarding their events to `alerts`
    pub fn spawn(
        config: FusionConfig,
        dms: DmsConfig,
        motion: MotionConfig,
        alerts: AlertHandle,
    ) -> Self {
        let depth = config.queue_depth.max(1);
        let (frame_tx, frame_rx) = mpsc::channel(depth);
        let (motion_tx, motion_rx) = mpsc::channel(depth);
        let stats = Arc::new(FusionStats::default());

        let tasks = vec![
            tokio::spawn(run_camera(
                frame_rx,
                FatigueSignalReducer::new(dms),
                alerts.clone(),
                stats.clone(),
            )),
            tokio::spawn(run_imu(
                motion_rx,
                MotionSpikeDetector::new(motion),
                alerts,
                stats.clone(),
            )),
        ];

        info!("Event fusion started (queue depth {})", depth);
        Self {
            frame_tx,
            motion_tx,
            stats,
            tasks,
        }
    }

    pub fn stats(&self) -> Arc<FusionStats> {
        self.stats.clone()
    }

    /// Queue a face detector result, waiting while the camera source is busy
    pub async fn submit_frame(&self, frame: FaceObservation) -> Result<(), FusionError> {
        self.frame_tx
            .send(frame)
            .await
            .map_err(|_| FusionError::Closed("camera"))
    }

    /// Queue a face detector result, or drop it if the camera source is busy
    pub fn try_submit_frame(&self, frame: FaceObservation) -> Result<(), FusionError> {
        try_submit(&self.frame_tx, frame, "camera", &self.stats.camera)
    }

    /// Queue an IMU sample, waiting while the IMU source is busy
    pub async fn submit_motion(&self, sample: MotionSample) -> Result<(), FusionError> {
        self.motion_tx
            .send(sample)
            .await
            .map_err(|_| FusionError::Closed("imu"))
    }

    /// Queue an IMU sample, or drop it if the IMU source is busy
    pub fn try_submit_motion(&self, sample: MotionSample) -> Result<(), FusionError> {
        try_submit(&self.motion_tx, sample, "imu", &self.stats.imu)
    }

    /// Close both inputs and wait for queued items to drain
    pub async fn shutdown(self) {
        let Self {
            frame_tx,
            motion_tx,
            tasks,
            ..
        } = self;
        drop(frame_tx);
        drop(motion_tx);
        for task in tasks {
            if let Err(e) = task.await {
                warn!("Pipeline task ended abnormally: {}", e);
            }
        }
        info!("Event fusion stopped");
    }
}

fn try_submit<T>(
    tx: &mpsc::Sender<T>,
    item: T,
    source: &'static str,
    stats: &SourceStats,
) -> Result<(), FusionError> {
    tx.try_send(item).map_err(|e| match e {
        mpsc::error::TrySendError::Full(_) => {
            stats.dropped.fetch_add(1, Ordering::Relaxed);
            FusionError::Busy(source)
        }
        mpsc::error::TrySendError::Closed(_) => FusionError::Closed(source),
    })
}

async fn run_camera(
    mut rx: mpsc::Receiver<FaceObservation>,
    mut reducer: FatigueSignalReducer,
    alerts: AlertHandle,
    stats: Arc<FusionStats>,
) {
    while let Some(frame) = rx.recv().await {
        stats.camera.processed.fetch_add(1, Ordering::Relaxed);
        let Some(event) = reducer.observe_frame(&frame) else {
            continue;
        };
        if !forward(&alerts, event, &stats.camera).await {
            break;
        }
    }
    debug!("Camera pipeline finished");
}

async fn run_imu(
    mut rx: mpsc::Receiver<MotionSample>,
    detector: MotionSpikeDetector,
    alerts: AlertHandle,
    stats: Arc<FusionStats>,
) {
    while let Some(sample) = rx.recv().await {
        stats.imu.processed.fetch_add(1, Ordering::Relaxed);
        let Some(event) = detector.observe(&sample) else {
            continue;
        };
        if !forward(&alerts, event, &stats.imu).await {
            break;
        }
    }
    debug!("IMU pipeline finished");
}

async fn forward(alerts: &AlertHandle, event: HazardEvent, stats: &SourceStats) -> bool {
    stats.events.fetch_add(1, Ordering::Relaxed);
    match alerts.send(event).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Dropping pipeline: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::testing::Recorder;
    use alerting::{AlertConfig, AlertKind, AlertService, Status};
    use dms::FaceEyes;
    use std::time::Duration;
    use tokio::time;

    fn frame(ts: u64, prob: f32) -> FaceObservation {
        FaceObservation {
            timestamp_ms: ts,
            faces: vec![FaceEyes {
                left_eye_open_probability: Some(prob),
                right_eye_open_probability: Some(prob),
            }],
        }
    }

    fn setup(contact: Option<&str>) -> (EventFusion, AlertHandle, Arc<Recorder>) {
        let recorder = Recorder::new(contact);
        let (alerts, _task) =
            AlertService::spawn(AlertConfig::default(), recorder.collaborators());
        let fusion = EventFusion::spawn(
            FusionConfig::default(),
            DmsConfig::default(),
            MotionConfig::default(),
            alerts.clone(),
        );
        (fusion, alerts, recorder)
    }

    /// Closed eyes every 100ms from 0..=until_ms, advancing the clock with the frames
    async fn closed_run(fusion: &EventFusion, until_ms: u64) {
        let mut ts = 0;
        while ts <= until_ms {
            fusion.submit_frame(frame(ts, 0.05)).await.unwrap();
            time::sleep(Duration::from_millis(100)).await;
            ts += 100;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sustained_closure_dispatches_fatigue() {
        let (fusion, alerts, rec) = setup(Some("5550100"));

        closed_run(&fusion, 2500).await;
        assert_eq!(alerts.snapshot().await.unwrap().pending_kind, Some(AlertKind::Fatigue));

        time::sleep(Duration::from_secs(8)).await;
        let dispatches = rec.dispatches();
        assert_eq!(dispatches.len(), 1);
        assert_eq!(dispatches[0].kind, AlertKind::Fatigue);
        assert_eq!(dispatches[0].cause, "Driver Fatigue Detected");
        assert!(!dispatches[0].requires_call());

        let stats = fusion.stats();
        assert_eq!(stats.camera.processed(), 26);
        assert_eq!(stats.camera.events(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_cancel_one_second_into_countdown() {
        let (fusion, alerts, rec) = setup(Some("5550100"));

        // Fatigue confirmed at 2000ms, cancel lands at 3000ms
        closed_run(&fusion, 2000).await;
        time::sleep(Duration::from_millis(900)).await;
        alerts.cancel().await.unwrap();

        time::sleep(Duration::from_secs(10)).await;
        assert!(rec.dispatches().is_empty());
        assert_eq!(alerts.snapshot().await.unwrap().pending_kind, None);
        assert_eq!(rec.last_status(), Some(Status::Monitoring));
    }

    #[tokio::test(start_paused = true)]
    async fn test_eyes_reopening_cancels_countdown() {
        let (fusion, alerts, rec) = setup(Some("5550100"));

        closed_run(&fusion, 2100).await;
        fusion.submit_frame(frame(2200, 0.9)).await.unwrap();

        time::sleep(Duration::from_secs(10)).await;
        assert!(rec.dispatches().is_empty());
        assert!(!alerts.snapshot().await.unwrap().fatigue_active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_impact_dispatches_accident_with_call() {
        let (fusion, alerts, rec) = setup(Some("5550100"));

        fusion
            .submit_motion(MotionSample::accel(50.0, 0.0, 0.0, 0))
            .await
            .unwrap();
        // A second spike during the countdown is not queued
        time::sleep(Duration::from_secs(1)).await;
        fusion
            .submit_motion(MotionSample::accel(0.0, 60.0, 0.0, 1000))
            .await
            .unwrap();

        time::sleep(Duration::from_secs(7)).await;
        let dispatches = rec.dispatches();
        assert_eq!(dispatches.len(), 1);
        assert_eq!(dispatches[0].kind, AlertKind::Accident);
        assert_eq!(dispatches[0].cause, "High Impact (50.0 m/s²)");
        assert!(dispatches[0].requires_call());
        assert_eq!(alerts.snapshot().await.unwrap().pending_kind, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_face_lost_does_not_cancel_accident() {
        let (fusion, _alerts, rec) = setup(Some("5550100"));

        fusion
            .submit_motion(MotionSample::gyro(0.0, 0.0, 20.0, 0))
            .await
            .unwrap();
        fusion
            .submit_frame(FaceObservation { timestamp_ms: 10, faces: vec![] })
            .await
            .unwrap();

        time::sleep(Duration::from_secs(8)).await;
        assert_eq!(rec.dispatches().len(), 1);
        assert_eq!(rec.dispatches()[0].kind, AlertKind::Accident);
    }

    #[tokio::test]
    async fn test_try_submit_reports_busy() {
        let (fusion, _alerts, _rec) = setup(Some("5550100"));

        // Nothing has yielded yet, so the single slot stays occupied
        assert!(fusion.try_submit_frame(frame(0, 0.9)).is_ok());
        assert_eq!(
            fusion.try_submit_frame(frame(33, 0.9)),
            Err(FusionError::Busy("camera"))
        );
        assert_eq!(fusion.stats().camera.dropped(), 1);

        let stats = fusion.stats();
        fusion.shutdown().await;
        assert_eq!(stats.camera.processed(), 1);
    }

    #[tokio::test]
    async fn test_closed_alert_service_stops_pipelines() {
        let (fusion, alerts, _rec) = setup(Some("5550100"));
        alerts.shutdown().await.unwrap();

        fusion
            .submit_motion(MotionSample::accel(99.0, 0.0, 0.0, 0))
            .await
            .unwrap();
        fusion.shutdown().await;
    }
}
