//! Driver Status Routes

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use alerting::OrchestratorSnapshot;

use crate::collaborators::{CountdownView, Notification};
use crate::{ApiError, AppState};

/// What the driver currently sees, plus the orchestrator's view
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: alerting::Status,
    pub text: String,
    pub fatigue_warning: bool,
    pub alarm_playing: bool,
    pub countdown: Option<CountdownView>,
    pub notification: Option<Notification>,
    pub orchestrator: OrchestratorSnapshot,
}

pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, ApiError> {
    let orchestrator = state.alerts.snapshot().await?;
    let view = state.status.view();

    Ok(Json(StatusResponse {
        status: view.status,
        text: view.text,
        fatigue_warning: view.fatigue_warning,
        alarm_playing: state.alarm.is_playing(),
        countdown: view.countdown,
        notification: view.notification,
        orchestrator,
    }))
}
