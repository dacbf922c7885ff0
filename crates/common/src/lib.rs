//! Shared identifier types used across the booking service.

mod types;

pub use types::{BookingRef, CandidateId};
