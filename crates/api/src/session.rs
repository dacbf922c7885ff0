//! Session storage for in-flight booking journeys.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use common::BookingRef;
use domain::{Booking, Candidate};

/// One candidate's working state: the candidate details and the booking
/// aggregate the saga is driving.
#[derive(Debug, Clone)]
pub struct Journey {
    pub candidate: Candidate,
    pub booking: Booking,
}

/// In-memory session store keyed by booking reference.
///
/// The customer-record service owns booking state durably; what lives
/// here is a working copy that handlers persist back after every saga
/// step. After any remote failure the copy is potentially stale and must
/// be re-read before reuse.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<BookingRef, Journey>>>,
}

impl SessionStore {
    /// Creates an empty session store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Persists a journey under its booking reference, replacing any
    /// previous copy.
    pub fn put(&self, journey: Journey) {
        let key = journey.booking.booking_ref();
        self.inner.write().unwrap().insert(key, journey);
    }

    /// Returns a copy of the journey for a booking reference.
    pub fn get(&self, booking_ref: BookingRef) -> Option<Journey> {
        self.inner.read().unwrap().get(&booking_ref).cloned()
    }

    /// Discards the journey for a booking reference.
    pub fn remove(&self, booking_ref: BookingRef) {
        self.inner.write().unwrap().remove(&booking_ref);
    }

    /// Returns the number of stored journeys.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    /// Returns true if no journeys are stored.
    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().is_empty()
    }
}
