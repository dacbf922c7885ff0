//! Scheduling service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::BookingRef;
use domain::{Region, ReservationId, TestCentre, TestType};

use super::GatewayError;

/// Operations against the scheduling system's slot capacity.
///
/// A reservation is a time-boxed hold: it exists only between `reserve`
/// and either `confirm` or `release`, and a reservation id is never
/// reused across bookings.
#[async_trait]
pub trait SchedulingService: Send + Sync {
    /// Requests a hold on a slot.
    ///
    /// Fails with [`GatewayError::SlotUnavailable`] when the slot is gone;
    /// that condition is surfaced to the caller to pick another slot, not
    /// retried.
    async fn reserve(
        &self,
        centre: &TestCentre,
        test_type: TestType,
        slot: DateTime<Utc>,
    ) -> Result<ReservationId, GatewayError>;

    /// Converts a held reservation into a durable booked slot.
    ///
    /// Must be called at most once per reservation id.
    async fn confirm(
        &self,
        booking_ref: BookingRef,
        reservation_id: &ReservationId,
        region: Region,
    ) -> Result<(), GatewayError>;

    /// Releases a previously held or confirmed slot by its booking-product
    /// reference. Callers treat failure as best-effort.
    async fn release(&self, product_ref: &str, region: Region) -> Result<(), GatewayError>;
}

#[async_trait]
impl<T: SchedulingService + ?Sized> SchedulingService for std::sync::Arc<T> {
    async fn reserve(
        &self,
        centre: &TestCentre,
        test_type: TestType,
        slot: DateTime<Utc>,
    ) -> Result<ReservationId, GatewayError> {
        (**self).reserve(centre, test_type, slot).await
    }

    async fn confirm(
        &self,
        booking_ref: BookingRef,
        reservation_id: &ReservationId,
        region: Region,
    ) -> Result<(), GatewayError> {
        (**self).confirm(booking_ref, reservation_id, region).await
    }

    async fn release(&self, product_ref: &str, region: Region) -> Result<(), GatewayError> {
        (**self).release(product_ref, region).await
    }
}

#[derive(Debug, Default)]
struct InMemorySchedulingState {
    holds: HashMap<ReservationId, (String, TestType, DateTime<Utc>)>,
    confirmed: Vec<(BookingRef, ReservationId, Region)>,
    released: Vec<(String, Region)>,
    confirm_calls: u32,
    next_id: u32,
    slot_unavailable: bool,
    fail_on_reserve: bool,
    fail_on_confirm: bool,
    fail_on_release: bool,
}

/// In-memory scheduling service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemorySchedulingService {
    state: Arc<RwLock<InMemorySchedulingState>>,
}

impl InMemorySchedulingService {
    /// Creates a new in-memory scheduling service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next reserve call report the slot gone.
    pub fn set_slot_unavailable(&self, unavailable: bool) {
        self.state.write().unwrap().slot_unavailable = unavailable;
    }

    /// Makes reserve calls fail with a server error.
    pub fn set_fail_on_reserve(&self, fail: bool) {
        self.state.write().unwrap().fail_on_reserve = fail;
    }

    /// Makes confirm calls fail with a server error.
    pub fn set_fail_on_confirm(&self, fail: bool) {
        self.state.write().unwrap().fail_on_confirm = fail;
    }

    /// Makes release calls fail with a server error.
    pub fn set_fail_on_release(&self, fail: bool) {
        self.state.write().unwrap().fail_on_release = fail;
    }

    /// Returns the number of outstanding holds.
    pub fn hold_count(&self) -> usize {
        self.state.read().unwrap().holds.len()
    }

    /// Returns the number of confirmed reservations.
    pub fn confirmed_count(&self) -> usize {
        self.state.read().unwrap().confirmed.len()
    }

    /// Returns how many times confirm was called, including failures.
    pub fn confirm_calls(&self) -> u32 {
        self.state.read().unwrap().confirm_calls
    }

    /// Returns the (product_ref, region) pairs released so far.
    pub fn released(&self) -> Vec<(String, Region)> {
        self.state.read().unwrap().released.clone()
    }

    /// Returns the confirmed (booking_ref, reservation_id, region) triples.
    pub fn confirmed(&self) -> Vec<(BookingRef, ReservationId, Region)> {
        self.state.read().unwrap().confirmed.clone()
    }
}

#[async_trait]
impl SchedulingService for InMemorySchedulingService {
    async fn reserve(
        &self,
        centre: &TestCentre,
        test_type: TestType,
        slot: DateTime<Utc>,
    ) -> Result<ReservationId, GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.slot_unavailable {
            return Err(GatewayError::SlotUnavailable);
        }
        if state.fail_on_reserve {
            return Err(GatewayError::Server {
                status: 500,
                message: "scheduling unavailable".to_string(),
            });
        }

        state.next_id += 1;
        let reservation_id = ReservationId::new(format!("RSV-{:04}", state.next_id));
        state
            .holds
            .insert(reservation_id.clone(), (centre.id.clone(), test_type, slot));

        Ok(reservation_id)
    }

    async fn confirm(
        &self,
        booking_ref: BookingRef,
        reservation_id: &ReservationId,
        region: Region,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.write().unwrap();
        state.confirm_calls += 1;

        if state.fail_on_confirm {
            return Err(GatewayError::Server {
                status: 500,
                message: "confirm failed".to_string(),
            });
        }

        // An expired or already-consumed hold reads as the slot being gone.
        if state.holds.remove(reservation_id).is_none() {
            return Err(GatewayError::SlotUnavailable);
        }

        state
            .confirmed
            .push((booking_ref, reservation_id.clone(), region));
        Ok(())
    }

    async fn release(&self, product_ref: &str, region: Region) -> Result<(), GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_release {
            return Err(GatewayError::Server {
                status: 500,
                message: "release failed".to_string(),
            });
        }

        state.released.push((product_ref.to_string(), region));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn centre() -> TestCentre {
        TestCentre::new("C-001", "Birmingham", Region::A)
    }

    fn slot() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 12, 9, 30, 0).unwrap()
    }

    #[tokio::test]
    async fn test_reserve_then_confirm() {
        let service = InMemorySchedulingService::new();
        let booking_ref = BookingRef::new();

        let reservation_id = service
            .reserve(&centre(), TestType::Car, slot())
            .await
            .unwrap();
        assert_eq!(service.hold_count(), 1);

        service
            .confirm(booking_ref, &reservation_id, Region::A)
            .await
            .unwrap();
        assert_eq!(service.hold_count(), 0);
        assert_eq!(service.confirmed_count(), 1);
    }

    #[tokio::test]
    async fn test_confirm_of_consumed_hold_reads_as_slot_unavailable() {
        let service = InMemorySchedulingService::new();
        let booking_ref = BookingRef::new();

        let reservation_id = service
            .reserve(&centre(), TestType::Car, slot())
            .await
            .unwrap();
        service
            .confirm(booking_ref, &reservation_id, Region::A)
            .await
            .unwrap();

        let err = service
            .confirm(booking_ref, &reservation_id, Region::A)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::SlotUnavailable));
    }

    #[tokio::test]
    async fn test_slot_unavailable_toggle() {
        let service = InMemorySchedulingService::new();
        service.set_slot_unavailable(true);

        let err = service
            .reserve(&centre(), TestType::Car, slot())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::SlotUnavailable));
        assert_eq!(service.hold_count(), 0);
    }

    #[tokio::test]
    async fn test_release_records_product_ref_and_region() {
        let service = InMemorySchedulingService::new();
        service.release("PRD-7", Region::B).await.unwrap();

        assert_eq!(service.released(), vec![("PRD-7".to_string(), Region::B)]);
    }

    #[tokio::test]
    async fn test_sequential_reservation_ids_never_repeat() {
        let service = InMemorySchedulingService::new();

        let r1 = service
            .reserve(&centre(), TestType::Car, slot())
            .await
            .unwrap();
        let r2 = service
            .reserve(&centre(), TestType::Motorcycle, slot())
            .await
            .unwrap();

        assert_eq!(r1.as_str(), "RSV-0001");
        assert_eq!(r2.as_str(), "RSV-0002");
    }
}
