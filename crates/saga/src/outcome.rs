//! Candidate-visible saga outcomes.

use common::BookingRef;
use domain::RefundDecision;

use crate::services::{BookingSummary, ProviderCode};

/// What the candidate is shown once the forward saga resolves.
///
/// Every resolution is a dedicated outcome page; the caller never renders
/// a raw error. Outcomes that allow another attempt say so explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Payment succeeded and the slot is booked.
    BookingConfirmed,
    /// Payment did not complete. `can_retry` distinguishes a declined
    /// attempt (try again) from a provider fault (attempt is over).
    PaymentUnsuccessful { can_retry: bool },
    /// Candidate cancelled at the payment gateway.
    BookingCancelled,
    /// Provider system fault; the booking reference is surfaced so the
    /// candidate can quote it to support.
    SystemError { booking_reference: BookingRef },
    /// The completion poll itself failed; the session is reset.
    ConfirmationError,
}

impl CompletionOutcome {
    /// Returns the outcome page slug.
    pub fn page(&self) -> &'static str {
        match self {
            CompletionOutcome::BookingConfirmed => "booking-confirmation",
            CompletionOutcome::PaymentUnsuccessful { .. } => "payment-unsuccessful",
            CompletionOutcome::BookingCancelled => "booking-cancelled",
            CompletionOutcome::SystemError { .. } => "system-error",
            CompletionOutcome::ConfirmationError => "confirmation-error",
        }
    }
}

/// Result of a finished cancellation saga.
#[derive(Debug, Clone)]
pub struct CancellationOutcome {
    /// The refund decision applied, decided once for the run.
    pub decision: RefundDecision,
    /// The provider's answer to the refund request, when one was made.
    pub refund_code: Option<ProviderCode>,
    /// Refreshed booking list, when the refresh succeeded.
    pub bookings: Option<Vec<BookingSummary>>,
}
