//! Saga error types.

use domain::BookingError;
use thiserror::Error;

use crate::services::GatewayError;

/// Errors that abort a saga step.
///
/// Gateway failures keep their classified form so that callers can branch
/// on retryability (429/5xx against anything else) without re-parsing
/// provider responses.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The requested slot is no longer available.
    ///
    /// A business condition, not a fault: never retried, the candidate is
    /// sent back to choose another slot.
    #[error("Slot no longer available")]
    SlotUnavailable,

    /// The booking aggregate refused a transition.
    #[error("Booking error: {0}")]
    Booking(#[from] BookingError),

    /// The scheduling system failed.
    #[error("Scheduling system error: {0}")]
    Scheduling(#[source] GatewayError),

    /// The customer-record service failed.
    #[error("Customer-record service error: {0}")]
    Records(#[source] GatewayError),

    /// The payment service failed.
    #[error("Payment service error: {0}")]
    Payment(#[source] GatewayError),
}

impl SagaError {
    /// Returns the underlying gateway error, if there is one.
    pub fn gateway(&self) -> Option<&GatewayError> {
        match self {
            SagaError::Scheduling(err) | SagaError::Records(err) | SagaError::Payment(err) => {
                Some(err)
            }
            SagaError::SlotUnavailable | SagaError::Booking(_) => None,
        }
    }

    /// Returns true if the candidate may retry the same operation.
    pub fn is_retryable(&self) -> bool {
        self.gateway().is_some_and(GatewayError::is_transient)
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
