//! Booking journey state machine.

use serde::{Deserialize, Serialize};

/// The state of a booking as it moves through the booking journey.
///
/// Forward transitions:
/// ```text
/// Draft ──► Reserved ──► RecordsCreated ──► PaymentInitiated
///       ──► PaymentConfirmed ──► SlotConfirmed ──► Complete
/// ```
///
/// Side paths: a payment that never completes ends in `Abandoned`; a
/// provider gateway/system fault ends in `SystemError`; a confirmed
/// booking can enter `ChangeInProgress` (reschedule) or
/// `CancellationInProgress ──► Cancelled`. Transitions are monotonic
/// forward; the only way back is [`JourneyState::Draft`] via an explicit
/// reset that discards the in-flight booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum JourneyState {
    /// Candidate has started the journey; nothing reserved yet.
    #[default]
    Draft,

    /// A slot is held in the scheduling system.
    Reserved,

    /// Candidate, booking, and booking-product records exist in the
    /// customer-record service.
    RecordsCreated,

    /// A hosted card payment has been started; candidate is at the gateway.
    PaymentInitiated,

    /// The gateway reported the payment complete.
    PaymentConfirmed,

    /// The held slot has been converted to a durable booked slot.
    SlotConfirmed,

    /// Booking confirmed end to end.
    Complete,

    /// Candidate walked away from the payment (terminal).
    Abandoned,

    /// Payment provider reported a gateway or system fault (terminal).
    SystemError,

    /// A reschedule is moving the booking to a new slot.
    ChangeInProgress,

    /// Cancellation has been recorded; refund handling is under way.
    CancellationInProgress,

    /// Booking cancelled (terminal).
    Cancelled,
}

impl JourneyState {
    /// Returns true if a slot reservation may be requested in this state.
    pub fn can_reserve(&self) -> bool {
        matches!(self, JourneyState::Draft | JourneyState::ChangeInProgress)
    }

    /// Returns true if record creation may proceed in this state.
    pub fn can_create_records(&self) -> bool {
        matches!(self, JourneyState::Reserved)
    }

    /// Returns true if payment may be initiated in this state.
    pub fn can_initiate_payment(&self) -> bool {
        matches!(self, JourneyState::RecordsCreated)
    }

    /// Returns true if a payment completion poll is meaningful in this state.
    pub fn can_complete_payment(&self) -> bool {
        matches!(self, JourneyState::PaymentInitiated)
    }

    /// Returns true if the held slot may be confirmed in this state.
    pub fn can_confirm_slot(&self) -> bool {
        matches!(self, JourneyState::PaymentConfirmed)
    }

    /// Returns true if the booking can be cancelled in this state.
    pub fn can_cancel(&self) -> bool {
        matches!(self, JourneyState::Complete)
    }

    /// Returns true if the booking can be moved to a new slot in this state.
    pub fn can_reschedule(&self) -> bool {
        matches!(self, JourneyState::Complete)
    }

    /// Returns true if this is a terminal state (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JourneyState::Abandoned | JourneyState::SystemError | JourneyState::Cancelled
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            JourneyState::Draft => "Draft",
            JourneyState::Reserved => "Reserved",
            JourneyState::RecordsCreated => "RecordsCreated",
            JourneyState::PaymentInitiated => "PaymentInitiated",
            JourneyState::PaymentConfirmed => "PaymentConfirmed",
            JourneyState::SlotConfirmed => "SlotConfirmed",
            JourneyState::Complete => "Complete",
            JourneyState::Abandoned => "Abandoned",
            JourneyState::SystemError => "SystemError",
            JourneyState::ChangeInProgress => "ChangeInProgress",
            JourneyState::CancellationInProgress => "CancellationInProgress",
            JourneyState::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for JourneyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_draft() {
        assert_eq!(JourneyState::default(), JourneyState::Draft);
    }

    #[test]
    fn test_can_reserve() {
        assert!(JourneyState::Draft.can_reserve());
        assert!(JourneyState::ChangeInProgress.can_reserve());
        assert!(!JourneyState::Reserved.can_reserve());
        assert!(!JourneyState::Complete.can_reserve());
        assert!(!JourneyState::Cancelled.can_reserve());
    }

    #[test]
    fn test_forward_path_gates() {
        assert!(JourneyState::Reserved.can_create_records());
        assert!(!JourneyState::Draft.can_create_records());

        assert!(JourneyState::RecordsCreated.can_initiate_payment());
        assert!(!JourneyState::Reserved.can_initiate_payment());

        assert!(JourneyState::PaymentInitiated.can_complete_payment());
        assert!(!JourneyState::RecordsCreated.can_complete_payment());

        assert!(JourneyState::PaymentConfirmed.can_confirm_slot());
        assert!(!JourneyState::PaymentInitiated.can_confirm_slot());
    }

    #[test]
    fn test_only_complete_bookings_cancel_or_reschedule() {
        assert!(JourneyState::Complete.can_cancel());
        assert!(JourneyState::Complete.can_reschedule());
        for state in [
            JourneyState::Draft,
            JourneyState::Reserved,
            JourneyState::PaymentInitiated,
            JourneyState::Abandoned,
            JourneyState::Cancelled,
        ] {
            assert!(!state.can_cancel(), "{state} should not cancel");
            assert!(!state.can_reschedule(), "{state} should not reschedule");
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(JourneyState::Abandoned.is_terminal());
        assert!(JourneyState::SystemError.is_terminal());
        assert!(JourneyState::Cancelled.is_terminal());
        assert!(!JourneyState::Complete.is_terminal());
        assert!(!JourneyState::Draft.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(JourneyState::Draft.to_string(), "Draft");
        assert_eq!(
            JourneyState::CancellationInProgress.to_string(),
            "CancellationInProgress"
        );
    }

    #[test]
    fn test_serialization() {
        let state = JourneyState::PaymentInitiated;
        let json = serde_json::to_string(&state).unwrap();
        let deserialized: JourneyState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, deserialized);
    }
}
