//! HTTP error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use alerting::{AlertError, ContactError};
use event_fusion::FusionError;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Contact(#[from] ContactError),

    #[error(transparent)]
    Alert(#[from] AlertError),

    #[error(transparent)]
    Fusion(#[from] FusionError),

    #[error("{0} not found")]
    NotFound(&'static str),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Contact(ContactError::Poisoned) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Contact(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Alert(AlertError::Config(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Alert(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Fusion(FusionError::Busy(_)) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Fusion(FusionError::Closed(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
