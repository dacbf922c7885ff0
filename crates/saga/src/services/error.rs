//! Closed error taxonomy for remote service calls.

use std::time::Duration;

use thiserror::Error;

/// Classified failure from a remote service.
///
/// Each remote client translates its provider's error shapes into this
/// enum at its own boundary; saga logic only ever inspects this type.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Connection-level failure (DNS, refused, timed out).
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP 429, optionally with a server-supplied retry hint.
    #[error("Rate limited")]
    RateLimited { retry_after: Option<Duration> },

    /// HTTP 5xx from the remote system.
    #[error("Server error (status {status}): {message}")]
    Server { status: u16, message: String },

    /// HTTP 401/403: the service rejected our credentials.
    #[error("Unauthorized (status {status})")]
    Unauthorized { status: u16 },

    /// The scheduling system reported the slot gone (expired hold,
    /// consumed reservation, or capacity taken). A business condition,
    /// never retried.
    #[error("Slot unavailable")]
    SlotUnavailable,

    /// Any other 4xx: the request itself is wrong, retrying cannot help.
    #[error("Request rejected (status {status}): {message}")]
    Request { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("Response decode error: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Returns true if retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GatewayError::Network(_)
                | GatewayError::RateLimited { .. }
                | GatewayError::Server { .. }
        )
    }

    /// Returns the HTTP status code, where one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::RateLimited { .. } => Some(429),
            GatewayError::Server { status, .. }
            | GatewayError::Unauthorized { status }
            | GatewayError::Request { status, .. } => Some(*status),
            GatewayError::Network(_) | GatewayError::SlotUnavailable | GatewayError::Decode(_) => {
                None
            }
        }
    }

    /// Returns the server-supplied retry hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            GatewayError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}
