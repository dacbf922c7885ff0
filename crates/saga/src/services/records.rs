//! Customer-record service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::{BookingRef, CandidateId};
use domain::{Booking, Candidate, RecordStatus, Region, StatusOrigin};
use uuid::Uuid;

use super::GatewayError;

/// Identifiers minted by the batch candidate-and-booking create.
///
/// On partial batch failure none of these are valid; the create either
/// yields the full set or an error.
#[derive(Debug, Clone)]
pub struct CreatedRecords {
    pub candidate_record_id: Uuid,
    pub licence_record_id: Uuid,
    pub booking_record_id: Uuid,
}

/// The payable line item attached to a booking record.
#[derive(Debug, Clone)]
pub struct BookingProduct {
    pub product_id: Uuid,
    /// Reference used when releasing the scheduling slot.
    pub product_ref: String,
}

/// One row of a candidate's booking list.
#[derive(Debug, Clone)]
pub struct BookingSummary {
    pub booking_record_id: Uuid,
    pub booking_ref: BookingRef,
    pub slot: DateTime<Utc>,
    pub status: RecordStatus,
}

/// Operations against the customer-record service, the durable owner of
/// candidate and booking entities.
#[async_trait]
pub trait BookingRecordsService: Send + Sync {
    /// Creates the candidate, licence, and booking records in one batch
    /// round trip. On failure no identifiers are valid and the caller must
    /// not proceed to payment.
    async fn create_candidate_and_booking(
        &self,
        candidate: &Candidate,
        booking: &Booking,
    ) -> Result<CreatedRecords, GatewayError>;

    /// Creates the payable line item. Only valid once the booking record
    /// itself exists.
    async fn create_booking_product(
        &self,
        booking_record_id: Uuid,
        booking: &Booking,
    ) -> Result<BookingProduct, GatewayError>;

    /// Sets the booking's lifecycle status. Idempotent: setting the same
    /// status twice is a no-op.
    async fn update_booking_status(
        &self,
        booking_record_id: Uuid,
        status: RecordStatus,
        origin: StatusOrigin,
    ) -> Result<(), GatewayError>;

    /// Sets the voiceover flag on the booking record.
    async fn set_voiceover(
        &self,
        booking_record_id: Uuid,
        enabled: bool,
    ) -> Result<(), GatewayError>;

    /// Sets the extended-time flag on the booking record.
    async fn set_extended_time(
        &self,
        booking_record_id: Uuid,
        enabled: bool,
    ) -> Result<(), GatewayError>;

    /// Atomically updates the slot (and optionally centre) and sets the
    /// status to Confirmed. Used only on the reschedule path, after the
    /// new reservation is confirmed and the old one released.
    async fn reschedule_and_confirm(
        &self,
        booking_record_id: Uuid,
        new_slot: DateTime<Utc>,
        centre_id: Option<&str>,
    ) -> Result<(), GatewayError>;

    /// Asks the remote working-days calculation for the last day a
    /// cancellation still refunds. Callers treat failure as "unknown"
    /// rather than an abort; the date is informational.
    async fn calculate_refund_eligibility_date(
        &self,
        test_date: NaiveDate,
        region: Region,
    ) -> Result<NaiveDate, GatewayError>;

    /// Stamps the refund-eligibility date onto the booking record.
    async fn store_refund_eligibility_date(
        &self,
        booking_record_id: Uuid,
        date: NaiveDate,
    ) -> Result<(), GatewayError>;

    /// Terminal status transition for a cancelled booking and its product.
    async fn mark_cancelled(
        &self,
        booking_record_id: Uuid,
        product_id: Uuid,
        origin: StatusOrigin,
    ) -> Result<(), GatewayError>;

    /// Reads the candidate's bookings for display.
    async fn list_candidate_bookings(
        &self,
        candidate_id: CandidateId,
    ) -> Result<Vec<BookingSummary>, GatewayError>;
}

#[async_trait]
impl<T: BookingRecordsService + ?Sized> BookingRecordsService for std::sync::Arc<T> {
    async fn create_candidate_and_booking(
        &self,
        candidate: &Candidate,
        booking: &Booking,
    ) -> Result<CreatedRecords, GatewayError> {
        (**self).create_candidate_and_booking(candidate, booking).await
    }

    async fn create_booking_product(
        &self,
        booking_record_id: Uuid,
        booking: &Booking,
    ) -> Result<BookingProduct, GatewayError> {
        (**self).create_booking_product(booking_record_id, booking).await
    }

    async fn update_booking_status(
        &self,
        booking_record_id: Uuid,
        status: RecordStatus,
        origin: StatusOrigin,
    ) -> Result<(), GatewayError> {
        (**self)
            .update_booking_status(booking_record_id, status, origin)
            .await
    }

    async fn set_voiceover(
        &self,
        booking_record_id: Uuid,
        enabled: bool,
    ) -> Result<(), GatewayError> {
        (**self).set_voiceover(booking_record_id, enabled).await
    }

    async fn set_extended_time(
        &self,
        booking_record_id: Uuid,
        enabled: bool,
    ) -> Result<(), GatewayError> {
        (**self).set_extended_time(booking_record_id, enabled).await
    }

    async fn reschedule_and_confirm(
        &self,
        booking_record_id: Uuid,
        new_slot: DateTime<Utc>,
        centre_id: Option<&str>,
    ) -> Result<(), GatewayError> {
        (**self)
            .reschedule_and_confirm(booking_record_id, new_slot, centre_id)
            .await
    }

    async fn calculate_refund_eligibility_date(
        &self,
        test_date: NaiveDate,
        region: Region,
    ) -> Result<NaiveDate, GatewayError> {
        (**self)
            .calculate_refund_eligibility_date(test_date, region)
            .await
    }

    async fn store_refund_eligibility_date(
        &self,
        booking_record_id: Uuid,
        date: NaiveDate,
    ) -> Result<(), GatewayError> {
        (**self)
            .store_refund_eligibility_date(booking_record_id, date)
            .await
    }

    async fn mark_cancelled(
        &self,
        booking_record_id: Uuid,
        product_id: Uuid,
        origin: StatusOrigin,
    ) -> Result<(), GatewayError> {
        (**self)
            .mark_cancelled(booking_record_id, product_id, origin)
            .await
    }

    async fn list_candidate_bookings(
        &self,
        candidate_id: CandidateId,
    ) -> Result<Vec<BookingSummary>, GatewayError> {
        (**self).list_candidate_bookings(candidate_id).await
    }
}

#[derive(Debug, Default)]
struct InMemoryRecordsState {
    bookings: HashMap<Uuid, StoredBooking>,
    products: HashMap<Uuid, Uuid>,
    next_product: u32,
    fail_on_create: bool,
    fail_on_product: bool,
    fail_status_update: Option<RecordStatus>,
    fail_on_support_update: bool,
    fail_on_reschedule: bool,
    fail_on_refund_calc: bool,
    fail_on_mark_cancelled: bool,
    fail_on_list: bool,
}

#[derive(Debug, Clone)]
struct StoredBooking {
    candidate_id: CandidateId,
    booking_ref: BookingRef,
    slot: DateTime<Utc>,
    centre_id: String,
    status: RecordStatus,
    status_history: Vec<RecordStatus>,
    voiceover: Option<bool>,
    extended_time: Option<bool>,
    refund_eligibility_date: Option<NaiveDate>,
}

/// In-memory customer-record service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordsService {
    state: Arc<RwLock<InMemoryRecordsState>>,
}

impl InMemoryRecordsService {
    /// Creates a new in-memory record service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the batch create fail with a server error.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Makes the booking-product create fail with a server error.
    pub fn set_fail_on_product(&self, fail: bool) {
        self.state.write().unwrap().fail_on_product = fail;
    }

    /// Makes status updates to the given status fail with a server error.
    pub fn set_fail_on_status(&self, status: Option<RecordStatus>) {
        self.state.write().unwrap().fail_status_update = status;
    }

    /// Makes support-option updates fail with a server error.
    pub fn set_fail_on_support_update(&self, fail: bool) {
        self.state.write().unwrap().fail_on_support_update = fail;
    }

    /// Makes reschedule updates fail with a server error.
    pub fn set_fail_on_reschedule(&self, fail: bool) {
        self.state.write().unwrap().fail_on_reschedule = fail;
    }

    /// Makes the working-days calculation fail with a server error.
    pub fn set_fail_on_refund_calc(&self, fail: bool) {
        self.state.write().unwrap().fail_on_refund_calc = fail;
    }

    /// Makes the terminal cancelled transition fail with a server error.
    pub fn set_fail_on_mark_cancelled(&self, fail: bool) {
        self.state.write().unwrap().fail_on_mark_cancelled = fail;
    }

    /// Makes the booking-list read fail with a server error.
    pub fn set_fail_on_list(&self, fail: bool) {
        self.state.write().unwrap().fail_on_list = fail;
    }

    /// Returns the number of booking records.
    pub fn booking_count(&self) -> usize {
        self.state.read().unwrap().bookings.len()
    }

    /// Returns the current status of a booking record.
    pub fn status_of(&self, booking_record_id: Uuid) -> Option<RecordStatus> {
        self.state
            .read()
            .unwrap()
            .bookings
            .get(&booking_record_id)
            .map(|b| b.status)
    }

    /// Returns every status a booking record has been set to, in order.
    pub fn status_history(&self, booking_record_id: Uuid) -> Vec<RecordStatus> {
        self.state
            .read()
            .unwrap()
            .bookings
            .get(&booking_record_id)
            .map(|b| b.status_history.clone())
            .unwrap_or_default()
    }

    /// Returns the stored support flags of a booking record.
    pub fn support_flags(&self, booking_record_id: Uuid) -> (Option<bool>, Option<bool>) {
        let state = self.state.read().unwrap();
        state
            .bookings
            .get(&booking_record_id)
            .map(|b| (b.voiceover, b.extended_time))
            .unwrap_or((None, None))
    }

    /// Returns the stored refund-eligibility date of a booking record.
    pub fn refund_eligibility_date(&self, booking_record_id: Uuid) -> Option<NaiveDate> {
        self.state
            .read()
            .unwrap()
            .bookings
            .get(&booking_record_id)
            .and_then(|b| b.refund_eligibility_date)
    }

    /// Returns the stored slot of a booking record.
    pub fn slot_of(&self, booking_record_id: Uuid) -> Option<DateTime<Utc>> {
        self.state
            .read()
            .unwrap()
            .bookings
            .get(&booking_record_id)
            .map(|b| b.slot)
    }

    /// Returns the stored centre of a booking record.
    pub fn centre_of(&self, booking_record_id: Uuid) -> Option<String> {
        self.state
            .read()
            .unwrap()
            .bookings
            .get(&booking_record_id)
            .map(|b| b.centre_id.clone())
    }

    /// Returns the number of booking products created.
    pub fn product_count(&self) -> usize {
        self.state.read().unwrap().products.len()
    }
}

#[async_trait]
impl BookingRecordsService for InMemoryRecordsService {
    async fn create_candidate_and_booking(
        &self,
        candidate: &Candidate,
        booking: &Booking,
    ) -> Result<CreatedRecords, GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(GatewayError::Server {
                status: 500,
                message: "batch create failed".to_string(),
            });
        }

        let created = CreatedRecords {
            candidate_record_id: Uuid::new_v4(),
            licence_record_id: Uuid::new_v4(),
            booking_record_id: Uuid::new_v4(),
        };
        state.bookings.insert(
            created.booking_record_id,
            StoredBooking {
                candidate_id: candidate.id,
                booking_ref: booking.booking_ref(),
                slot: booking.slot(),
                centre_id: booking.centre().id.clone(),
                status: RecordStatus::Draft,
                status_history: vec![RecordStatus::Draft],
                voiceover: None,
                extended_time: None,
                refund_eligibility_date: None,
            },
        );

        Ok(created)
    }

    async fn create_booking_product(
        &self,
        booking_record_id: Uuid,
        _booking: &Booking,
    ) -> Result<BookingProduct, GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_product {
            return Err(GatewayError::Server {
                status: 500,
                message: "product create failed".to_string(),
            });
        }
        if !state.bookings.contains_key(&booking_record_id) {
            return Err(GatewayError::Request {
                status: 404,
                message: "no such booking record".to_string(),
            });
        }

        state.next_product += 1;
        let product = BookingProduct {
            product_id: Uuid::new_v4(),
            product_ref: format!("PRD-{:04}", state.next_product),
        };
        state.products.insert(product.product_id, booking_record_id);

        Ok(product)
    }

    async fn update_booking_status(
        &self,
        booking_record_id: Uuid,
        status: RecordStatus,
        _origin: StatusOrigin,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail_status_update == Some(status) {
            return Err(GatewayError::Server {
                status: 500,
                message: format!("status update to {status} failed"),
            });
        }

        let booking = state.bookings.get_mut(&booking_record_id).ok_or_else(|| {
            GatewayError::Request {
                status: 404,
                message: "no such booking record".to_string(),
            }
        })?;

        if booking.status != status {
            booking.status = status;
            booking.status_history.push(status);
        }
        Ok(())
    }

    async fn set_voiceover(
        &self,
        booking_record_id: Uuid,
        enabled: bool,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_support_update {
            return Err(GatewayError::Server {
                status: 500,
                message: "voiceover update failed".to_string(),
            });
        }
        if let Some(booking) = state.bookings.get_mut(&booking_record_id) {
            booking.voiceover = Some(enabled);
        }
        Ok(())
    }

    async fn set_extended_time(
        &self,
        booking_record_id: Uuid,
        enabled: bool,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_support_update {
            return Err(GatewayError::Server {
                status: 500,
                message: "extended-time update failed".to_string(),
            });
        }
        if let Some(booking) = state.bookings.get_mut(&booking_record_id) {
            booking.extended_time = Some(enabled);
        }
        Ok(())
    }

    async fn reschedule_and_confirm(
        &self,
        booking_record_id: Uuid,
        new_slot: DateTime<Utc>,
        centre_id: Option<&str>,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_reschedule {
            return Err(GatewayError::Server {
                status: 500,
                message: "reschedule failed".to_string(),
            });
        }

        let booking = state.bookings.get_mut(&booking_record_id).ok_or_else(|| {
            GatewayError::Request {
                status: 404,
                message: "no such booking record".to_string(),
            }
        })?;

        booking.slot = new_slot;
        if let Some(centre_id) = centre_id {
            booking.centre_id = centre_id.to_string();
        }
        if booking.status != RecordStatus::Confirmed {
            booking.status = RecordStatus::Confirmed;
            booking.status_history.push(RecordStatus::Confirmed);
        }
        Ok(())
    }

    async fn calculate_refund_eligibility_date(
        &self,
        test_date: NaiveDate,
        _region: Region,
    ) -> Result<NaiveDate, GatewayError> {
        let state = self.state.read().unwrap();
        if state.fail_on_refund_calc {
            return Err(GatewayError::Server {
                status: 500,
                message: "working-days calculation failed".to_string(),
            });
        }
        Ok(test_date - chrono::Duration::days(domain::refund::REFUND_NOTICE_DAYS))
    }

    async fn store_refund_eligibility_date(
        &self,
        booking_record_id: Uuid,
        date: NaiveDate,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.write().unwrap();
        if let Some(booking) = state.bookings.get_mut(&booking_record_id) {
            booking.refund_eligibility_date = Some(date);
        }
        Ok(())
    }

    async fn mark_cancelled(
        &self,
        booking_record_id: Uuid,
        _product_id: Uuid,
        _origin: StatusOrigin,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_mark_cancelled {
            return Err(GatewayError::Server {
                status: 500,
                message: "cancel transition failed".to_string(),
            });
        }

        let booking = state.bookings.get_mut(&booking_record_id).ok_or_else(|| {
            GatewayError::Request {
                status: 404,
                message: "no such booking record".to_string(),
            }
        })?;

        if booking.status != RecordStatus::Cancelled {
            booking.status = RecordStatus::Cancelled;
            booking.status_history.push(RecordStatus::Cancelled);
        }
        Ok(())
    }

    async fn list_candidate_bookings(
        &self,
        candidate_id: CandidateId,
    ) -> Result<Vec<BookingSummary>, GatewayError> {
        let state = self.state.read().unwrap();

        if state.fail_on_list {
            return Err(GatewayError::Server {
                status: 500,
                message: "booking list unavailable".to_string(),
            });
        }

        Ok(state
            .bookings
            .iter()
            .filter(|(_, b)| b.candidate_id == candidate_id)
            .map(|(id, b)| BookingSummary {
                booking_record_id: *id,
                booking_ref: b.booking_ref,
                slot: b.slot,
                status: b.status,
            })
            .collect())
    }
}
