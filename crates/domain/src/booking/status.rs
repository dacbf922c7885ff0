//! Customer-record service status codes.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a booking as recorded in the customer-record
/// service.
///
/// Statuses cross the wire as coded enums; the numeric codes are part of
/// the record-service contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordStatus {
    /// Journey started, booking not yet paid for.
    Draft,
    /// Paid and slot-confirmed.
    Confirmed,
    /// A reschedule is under way.
    ChangeInProgress,
    /// Cancellation recorded, refund handling pending.
    CancellationInProgress,
    /// Cancellation finished.
    Cancelled,
    /// Payment provider reported a gateway or system fault.
    SystemErrorNonRecoverable,
    /// Candidate abandoned the payment.
    AbandonedNonRecoverable,
}

impl RecordStatus {
    /// Returns the wire code for this status.
    pub fn code(&self) -> u8 {
        match self {
            RecordStatus::Draft => 1,
            RecordStatus::Confirmed => 2,
            RecordStatus::ChangeInProgress => 3,
            RecordStatus::CancellationInProgress => 4,
            RecordStatus::Cancelled => 5,
            RecordStatus::SystemErrorNonRecoverable => 6,
            RecordStatus::AbandonedNonRecoverable => 7,
        }
    }

    /// Looks up a status by wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(RecordStatus::Draft),
            2 => Some(RecordStatus::Confirmed),
            3 => Some(RecordStatus::ChangeInProgress),
            4 => Some(RecordStatus::CancellationInProgress),
            5 => Some(RecordStatus::Cancelled),
            6 => Some(RecordStatus::SystemErrorNonRecoverable),
            7 => Some(RecordStatus::AbandonedNonRecoverable),
            _ => None,
        }
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Draft => "Draft",
            RecordStatus::Confirmed => "Confirmed",
            RecordStatus::ChangeInProgress => "ChangeInProgress",
            RecordStatus::CancellationInProgress => "CancellationInProgress",
            RecordStatus::Cancelled => "Cancelled",
            RecordStatus::SystemErrorNonRecoverable => "SystemErrorNonRecoverable",
            RecordStatus::AbandonedNonRecoverable => "AbandonedNonRecoverable",
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a status change originated.
///
/// Carried on status updates so the record service can distinguish
/// candidate self-service changes from support-centre interventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StatusOrigin {
    /// Candidate acting through the online journey.
    #[default]
    CandidateOnline,
    /// A support-centre agent acting on the candidate's behalf.
    SupportCentre,
}

impl StatusOrigin {
    /// Returns the origin name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusOrigin::CandidateOnline => "CandidateOnline",
            StatusOrigin::SupportCentre => "SupportCentre",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_roundtrip() {
        for status in [
            RecordStatus::Draft,
            RecordStatus::Confirmed,
            RecordStatus::ChangeInProgress,
            RecordStatus::CancellationInProgress,
            RecordStatus::Cancelled,
            RecordStatus::SystemErrorNonRecoverable,
            RecordStatus::AbandonedNonRecoverable,
        ] {
            assert_eq!(RecordStatus::from_code(status.code()), Some(status));
        }
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(RecordStatus::from_code(0), None);
        assert_eq!(RecordStatus::from_code(99), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(RecordStatus::Confirmed.to_string(), "Confirmed");
        assert_eq!(
            RecordStatus::AbandonedNonRecoverable.to_string(),
            "AbandonedNonRecoverable"
        );
    }
}
