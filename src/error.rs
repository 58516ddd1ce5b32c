use std::time::Duration;

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, state::jobs::JobKind};

/// Failures raised by the league services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The store answered with an error.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// No store is installed (degraded mode).
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Rejected request parameters.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Stored data disagrees with what the operation expects.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Unknown league, season or user.
    #[error("not found: {0}")]
    NotFound(String),
    /// Another run of a scheduled job holds its slot in this instance.
    #[error("job `{0}` is already running")]
    JobRunning(JobKind),
    /// A scheduled job exceeded the configured limit; completed seasons stay committed.
    #[error("scheduled job exceeded {limit:?}")]
    JobTimedOut {
        /// Configured job timeout.
        limit: Duration,
    },
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict { message } => ServiceError::InvalidState(message),
            other => ServiceError::Unavailable(other),
        }
    }
}

/// Errors surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid path or query parameters.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Missing or wrong trigger secret.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Overlapping job or a concurrent change to the same record.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Storage unreachable.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Job deadline exceeded.
    #[error("timed out: {0}")]
    Timeout(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::ServiceUnavailable(_) => "service_unavailable",
            AppError::Timeout(_) => "timeout",
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {err}"))
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            err @ ServiceError::JobRunning(_) => AppError::Conflict(err.to_string()),
            err @ ServiceError::JobTimedOut { .. } => AppError::Timeout(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let payload = Json(ErrorBody {
            error: self.code(),
            message: self.to_string(),
        });
        (status, payload).into_response()
    }
}
