//! API error types with HTTP outcome mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use saga::SagaError;

/// API-level error type that maps to candidate-visible outcome responses.
///
/// Failures never leak as raw error dumps: every response carries an
/// `outcome` discriminant and a `can_retry` flag so the front end always
/// knows whether to offer another attempt.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Saga step failure.
    Saga(SagaError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, outcome, can_retry, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not-found", false, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad-request", false, msg),
            ApiError::Saga(err) => saga_error_to_outcome(err),
        };

        let body = serde_json::json!({
            "outcome": outcome,
            "can_retry": can_retry,
            "error": message,
        });
        (status, axum::Json(body)).into_response()
    }
}

/// Maps a saga failure to its outcome page.
///
/// A gone slot sends the candidate back to slot selection; a transient
/// gateway failure (429/5xx/network) is a retryable error page; anything
/// else is a terminal technical-error page.
fn saga_error_to_outcome(err: SagaError) -> (StatusCode, &'static str, bool, String) {
    match &err {
        SagaError::SlotUnavailable => (
            StatusCode::CONFLICT,
            "slot-unavailable",
            false,
            err.to_string(),
        ),
        SagaError::Booking(_) => (StatusCode::CONFLICT, "invalid-state", false, err.to_string()),
        _ if err.is_retryable() => {
            tracing::warn!(error = %err, "saga step failed, candidate may retry");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "please-retry",
                true,
                err.to_string(),
            )
        }
        _ => {
            tracing::error!(error = %err, "saga step failed terminally");
            (
                StatusCode::BAD_GATEWAY,
                "technical-error",
                false,
                err.to_string(),
            )
        }
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}
