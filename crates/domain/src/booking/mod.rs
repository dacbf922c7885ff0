//! Booking aggregate and related types.

mod aggregate;
mod candidate;
mod state;
mod status;
mod value_objects;

pub use aggregate::{Booking, BookingDraft, SupportOptions};
pub use candidate::{Address, Candidate};
pub use state::JourneyState;
pub use status::{RecordStatus, StatusOrigin};
pub use value_objects::{
    LicenceNumber, Money, PersonReference, Region, ReservationId, TestCentre, TestType,
};

use thiserror::Error;

/// Errors that can occur when mutating a booking.
#[derive(Debug, Error)]
pub enum BookingError {
    /// Booking is not in the expected state.
    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: JourneyState,
        action: &'static str,
    },

    /// A reservation is already held and has not been released or consumed.
    #[error("Reservation {reservation_id} is still active; release it before reserving again")]
    ActiveReservation { reservation_id: ReservationId },

    /// An operation required a reservation that the booking does not hold.
    #[error("Booking holds no reservation")]
    NoReservation,

    /// An operation required record-service identifiers that are not set.
    #[error("Booking has no {identifier}")]
    MissingIdentifier { identifier: &'static str },
}
