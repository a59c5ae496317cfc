// HTTP error mapping for monitoring handlers
use crate::domain::error::MonitorError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error("Internal error: {0}")]
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<MonitorError>() {
            Ok(monitor) => ApiError::Monitor(monitor),
            Err(other) => ApiError::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Monitor(err) => {
                let (status, code) = match err {
                    MonitorError::UnknownVehicleType(_) => (StatusCode::NOT_FOUND, "NO_SCHEMATIC"),
                    MonitorError::UnknownVehicle(_) => (StatusCode::NOT_FOUND, "UNKNOWN_VEHICLE"),
                    MonitorError::UnknownPosition(_) => (StatusCode::UNPROCESSABLE_ENTITY, "UNKNOWN_POSITION"),
                    MonitorError::NoVehicleSelected => (StatusCode::CONFLICT, "NO_VEHICLE_SELECTED"),
                    MonitorError::DuplicatePosition(_) => (StatusCode::INTERNAL_SERVER_ERROR, "BAD_TOPOLOGY"),
                };
                (status, code, err.to_string())
            }
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": { "code": code, "message": message } }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
