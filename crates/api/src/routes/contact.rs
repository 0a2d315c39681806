//! Emergency Contact Routes

use axum::{extract::State, Json};
use std::sync::Arc;

use alerting::EmergencyContact;

use crate::{ApiError, AppState};

pub async fn get_contact(
    State(state): State<Arc<AppState>>,
) -> Result<Json<EmergencyContact>, ApiError> {
    state
        .contacts
        .load()
        .map(Json)
        .ok_or(ApiError::NotFound("contact"))
}

/// Validate and store the contact; takes effect for the next dispatch
pub async fn put_contact(
    State(state): State<Arc<AppState>>,
    Json(contact): Json<EmergencyContact>,
) -> Result<Json<EmergencyContact>, ApiError> {
    let saved = state.contacts.save(contact)?;
    state.alerts.contact_changed().await?;
    Ok(Json(saved))
}
