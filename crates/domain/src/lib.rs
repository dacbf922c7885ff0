//! Domain layer for the theory-test booking service.
//!
//! This crate provides the core booking abstractions:
//! - The `Booking` aggregate: the working copy of a candidate's booking,
//!   owned by one saga run and persisted back to session storage between
//!   steps. The customer-record service remains the durable owner.
//! - The journey state machine (`JourneyState`) and the customer-record
//!   status codes (`RecordStatus`).
//! - Value objects: money, test types, centres, regions, payment person
//!   references.
//! - The refund-eligibility decision for cancellations.

pub mod booking;
pub mod refund;

pub use booking::{
    Address, Booking, BookingDraft, BookingError, Candidate, JourneyState, LicenceNumber, Money,
    PersonReference, Region, RecordStatus, ReservationId, StatusOrigin, SupportOptions, TestCentre,
    TestType,
};
pub use refund::{RefundDecision, decide as decide_refund};
