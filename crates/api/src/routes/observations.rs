//! Detector Ingest Routes
//!
//! Each source processes one sample at a time; a request waits while the
//! source's queue is full.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::debug;

use dms::FaceObservation;
use motion::MotionSample;

use crate::{ApiError, AppState};

pub async fn post_face(
    State(state): State<Arc<AppState>>,
    Json(frame): Json<FaceObservation>,
) -> Result<StatusCode, ApiError> {
    debug!("Face observation at {} ms ({} faces)", frame.timestamp_ms, frame.faces.len());
    state.fusion.submit_frame(frame).await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn post_motion(
    State(state): State<Arc<AppState>>,
    Json(sample): Json<MotionSample>,
) -> Result<StatusCode, ApiError> {
    state.fusion.submit_motion(sample).await?;
    Ok(StatusCode::ACCEPTED)
}
