//! Alert Routes

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::collaborators::DispatchRecord;
use crate::{ApiError, AppState};

/// Query parameters for alerts endpoint
#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    /// Maximum number of records
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Response for alerts endpoint
#[derive(Debug, Serialize)]
pub struct AlertResponse {
    pub data: Vec<DispatchRecord>,
    pub count: usize,
    pub total: usize,
}

/// Response for cancel endpoint
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub accepted: bool,
}

/// Dispatch history, newest first
pub async fn get_alerts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AlertQuery>,
) -> Json<AlertResponse> {
    let alerts = state.dispatcher.history(params.limit);

    Json(AlertResponse {
        count: alerts.len(),
        total: state.dispatcher.len(),
        data: alerts,
    })
}

/// Driver cancel; a no-op when no countdown is pending
pub async fn cancel_alert(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<CancelResponse>), ApiError> {
    state.alerts.cancel().await?;
    Ok((StatusCode::ACCEPTED, Json(CancelResponse { accepted: true })))
}
