//! Booking aggregate implementation.

use chrono::{DateTime, NaiveDate, Utc};
use common::BookingRef;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    BookingError, JourneyState, Money, Region, ReservationId, TestCentre, TestType,
};

/// Support options requested on a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SupportOptions {
    /// Voiceover requested for the test.
    pub voiceover: bool,
    /// Extended sitting time requested.
    pub extended_time: bool,
}

impl SupportOptions {
    /// Returns true if any support option is requested.
    pub fn any(&self) -> bool {
        self.voiceover || self.extended_time
    }
}

/// The details a candidate chooses before anything is reserved or paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingDraft {
    pub centre: TestCentre,
    pub test_type: TestType,
    pub slot: DateTime<Utc>,
    pub price: Money,
    pub support: SupportOptions,
}

impl BookingDraft {
    /// Creates a draft priced at the standard fee for the test type.
    pub fn new(centre: TestCentre, test_type: TestType, slot: DateTime<Utc>) -> Self {
        Self {
            centre,
            test_type,
            price: test_type.standard_fee(),
            slot,
            support: SupportOptions::default(),
        }
    }

    /// Overrides the price (zero-cost bookings, concessions).
    pub fn with_price(mut self, price: Money) -> Self {
        self.price = price;
        self
    }

    /// Sets the requested support options.
    pub fn with_support(mut self, support: SupportOptions) -> Self {
        self.support = support;
        self
    }
}

/// Booking aggregate root.
///
/// The working copy of one candidate's booking for the duration of one
/// saga run. The customer-record service is the durable owner; the saga
/// driver persists this aggregate back to session storage after each step
/// and must treat the copy as stale after any remote failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Candidate-facing booking reference.
    booking_ref: BookingRef,

    /// Canonical booking record id in the customer-record service.
    record_id: Option<Uuid>,

    /// Payable line-item record id in the customer-record service.
    product_id: Option<Uuid>,

    /// Line-item reference used when releasing the scheduling slot.
    product_ref: Option<String>,

    /// Reference the payment service correlates this sale under.
    payment_reference: Option<String>,

    /// Receipt reference of the active payment attempt.
    receipt_reference: Option<String>,

    /// Slot hold in the scheduling system, while one is outstanding.
    reservation_id: Option<ReservationId>,

    centre: TestCentre,
    test_type: TestType,
    slot: DateTime<Utc>,
    price: Money,
    support: SupportOptions,

    state: JourneyState,

    /// Last day a cancellation still qualifies for a refund. Informational;
    /// absent when the working-day calculation was unavailable.
    refund_eligibility_date: Option<NaiveDate>,
}

impl Booking {
    /// Starts a new draft booking from the candidate's chosen details.
    pub fn draft(draft: BookingDraft) -> Self {
        Self {
            booking_ref: BookingRef::new(),
            record_id: None,
            product_id: None,
            product_ref: None,
            payment_reference: None,
            receipt_reference: None,
            reservation_id: None,
            centre: draft.centre,
            test_type: draft.test_type,
            slot: draft.slot,
            price: draft.price,
            support: draft.support,
            state: JourneyState::Draft,
            refund_eligibility_date: None,
        }
    }

    // -- Queries --

    pub fn booking_ref(&self) -> BookingRef {
        self.booking_ref
    }

    pub fn record_id(&self) -> Option<Uuid> {
        self.record_id
    }

    pub fn product_id(&self) -> Option<Uuid> {
        self.product_id
    }

    pub fn product_ref(&self) -> Option<&str> {
        self.product_ref.as_deref()
    }

    pub fn payment_reference(&self) -> Option<&str> {
        self.payment_reference.as_deref()
    }

    pub fn receipt_reference(&self) -> Option<&str> {
        self.receipt_reference.as_deref()
    }

    pub fn reservation_id(&self) -> Option<&ReservationId> {
        self.reservation_id.as_ref()
    }

    pub fn centre(&self) -> &TestCentre {
        &self.centre
    }

    pub fn region(&self) -> Region {
        self.centre.region
    }

    pub fn test_type(&self) -> TestType {
        self.test_type
    }

    pub fn slot(&self) -> DateTime<Utc> {
        self.slot
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn support(&self) -> SupportOptions {
        self.support
    }

    pub fn state(&self) -> JourneyState {
        self.state
    }

    pub fn refund_eligibility_date(&self) -> Option<NaiveDate> {
        self.refund_eligibility_date
    }

    // -- Transitions --

    /// Records a slot hold obtained from the scheduling system.
    ///
    /// Refuses while a prior reservation is unreleased: at most one active
    /// reservation may exist per booking.
    pub fn mark_reserved(&mut self, reservation_id: ReservationId) -> Result<(), BookingError> {
        if let Some(existing) = &self.reservation_id {
            return Err(BookingError::ActiveReservation {
                reservation_id: existing.clone(),
            });
        }
        if !self.state.can_reserve() {
            return Err(BookingError::InvalidStateTransition {
                current_state: self.state,
                action: "reserve a slot",
            });
        }
        self.reservation_id = Some(reservation_id);
        if self.state == JourneyState::Draft {
            self.state = JourneyState::Reserved;
        }
        Ok(())
    }

    /// Records the identifiers minted by the customer-record service.
    pub fn records_created(
        &mut self,
        record_id: Uuid,
        product_id: Uuid,
        product_ref: impl Into<String>,
        payment_reference: impl Into<String>,
    ) -> Result<(), BookingError> {
        if !self.state.can_create_records() {
            return Err(BookingError::InvalidStateTransition {
                current_state: self.state,
                action: "attach created records",
            });
        }
        self.record_id = Some(record_id);
        self.product_id = Some(product_id);
        self.product_ref = Some(product_ref.into());
        self.payment_reference = Some(payment_reference.into());
        self.state = JourneyState::RecordsCreated;
        Ok(())
    }

    /// Records that a hosted card payment has been started.
    pub fn payment_initiated(
        &mut self,
        receipt_reference: impl Into<String>,
    ) -> Result<(), BookingError> {
        if !self.state.can_initiate_payment() {
            return Err(BookingError::InvalidStateTransition {
                current_state: self.state,
                action: "initiate payment",
            });
        }
        self.receipt_reference = Some(receipt_reference.into());
        self.state = JourneyState::PaymentInitiated;
        Ok(())
    }

    /// Records that the gateway reported the payment complete.
    pub fn payment_confirmed(&mut self) -> Result<(), BookingError> {
        if !self.state.can_complete_payment() {
            return Err(BookingError::InvalidStateTransition {
                current_state: self.state,
                action: "confirm payment",
            });
        }
        self.state = JourneyState::PaymentConfirmed;
        Ok(())
    }

    /// Records that the held slot was converted to a durable booked slot.
    ///
    /// The reservation id is consumed by the confirm call and cleared here;
    /// it must never be presented to the scheduling system again.
    pub fn slot_confirmed(&mut self) -> Result<(), BookingError> {
        if !self.state.can_confirm_slot() {
            return Err(BookingError::InvalidStateTransition {
                current_state: self.state,
                action: "confirm the slot",
            });
        }
        if self.reservation_id.take().is_none() {
            return Err(BookingError::NoReservation);
        }
        self.state = JourneyState::SlotConfirmed;
        Ok(())
    }

    /// Marks the booking fully confirmed.
    pub fn completed(&mut self, refund_eligibility_date: Option<NaiveDate>) -> Result<(), BookingError> {
        if self.state != JourneyState::SlotConfirmed {
            return Err(BookingError::InvalidStateTransition {
                current_state: self.state,
                action: "complete",
            });
        }
        self.refund_eligibility_date = refund_eligibility_date;
        self.state = JourneyState::Complete;
        Ok(())
    }

    /// Drops the hold after the scheduling system released (or lost) it.
    pub fn reservation_released(&mut self) {
        self.reservation_id = None;
    }

    /// Candidate walked away from the payment; terminal.
    pub fn abandoned(&mut self) {
        self.reservation_id = None;
        self.state = JourneyState::Abandoned;
    }

    /// Payment provider reported a gateway or system fault; terminal.
    pub fn system_error(&mut self) {
        self.reservation_id = None;
        self.state = JourneyState::SystemError;
    }

    /// Explicit reset after a failed payment: the in-flight attempt is
    /// discarded and the journey returns to Draft so the candidate can try
    /// again from slot selection.
    pub fn revert_to_draft(&mut self) {
        self.reservation_id = None;
        self.receipt_reference = None;
        self.state = JourneyState::Draft;
    }

    /// Enters the reschedule path for a confirmed booking.
    pub fn begin_reschedule(&mut self) -> Result<(), BookingError> {
        if !self.state.can_reschedule() {
            return Err(BookingError::InvalidStateTransition {
                current_state: self.state,
                action: "reschedule",
            });
        }
        self.state = JourneyState::ChangeInProgress;
        Ok(())
    }

    /// Applies the new slot after a successful reschedule.
    pub fn rescheduled(
        &mut self,
        new_slot: DateTime<Utc>,
        new_centre: Option<TestCentre>,
        refund_eligibility_date: Option<NaiveDate>,
    ) -> Result<(), BookingError> {
        if self.state != JourneyState::ChangeInProgress {
            return Err(BookingError::InvalidStateTransition {
                current_state: self.state,
                action: "apply a reschedule",
            });
        }
        if self.reservation_id.take().is_none() {
            return Err(BookingError::NoReservation);
        }
        self.slot = new_slot;
        if let Some(centre) = new_centre {
            self.centre = centre;
        }
        self.refund_eligibility_date = refund_eligibility_date;
        self.state = JourneyState::Complete;
        Ok(())
    }

    /// Abandons an in-flight reschedule, keeping the original slot.
    pub fn reschedule_abandoned(&mut self) {
        if self.state == JourneyState::ChangeInProgress {
            self.reservation_id = None;
            self.state = JourneyState::Complete;
        }
    }

    /// Enters the cancellation path for a confirmed booking.
    pub fn begin_cancellation(&mut self) -> Result<(), BookingError> {
        if !self.state.can_cancel() {
            return Err(BookingError::InvalidStateTransition {
                current_state: self.state,
                action: "cancel",
            });
        }
        self.state = JourneyState::CancellationInProgress;
        Ok(())
    }

    /// Marks the cancellation finished; terminal.
    pub fn cancelled(&mut self) -> Result<(), BookingError> {
        if self.state != JourneyState::CancellationInProgress {
            return Err(BookingError::InvalidStateTransition {
                current_state: self.state,
                action: "finish cancelling",
            });
        }
        self.state = JourneyState::Cancelled;
        Ok(())
    }

    /// Returns the record id, or an error naming the missing identifier.
    pub fn require_record_id(&self) -> Result<Uuid, BookingError> {
        self.record_id.ok_or(BookingError::MissingIdentifier {
            identifier: "record id",
        })
    }

    /// Returns the product id, or an error naming the missing identifier.
    pub fn require_product_id(&self) -> Result<Uuid, BookingError> {
        self.product_id.ok_or(BookingError::MissingIdentifier {
            identifier: "product id",
        })
    }

    /// Returns the product ref, or an error naming the missing identifier.
    pub fn require_product_ref(&self) -> Result<&str, BookingError> {
        self.product_ref
            .as_deref()
            .ok_or(BookingError::MissingIdentifier {
                identifier: "product ref",
            })
    }

    /// Returns the receipt reference, or an error naming the missing
    /// identifier.
    pub fn require_receipt_reference(&self) -> Result<&str, BookingError> {
        self.receipt_reference
            .as_deref()
            .ok_or(BookingError::MissingIdentifier {
                identifier: "receipt reference",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::Region;
    use chrono::TimeZone;

    fn draft() -> BookingDraft {
        BookingDraft::new(
            TestCentre::new("C-014", "Leicester", Region::B),
            TestType::Car,
            Utc.with_ymd_and_hms(2026, 10, 12, 9, 30, 0).unwrap(),
        )
    }

    fn booking_through_records() -> Booking {
        let mut booking = Booking::draft(draft());
        booking.mark_reserved(ReservationId::new("RSV-1")).unwrap();
        booking
            .records_created(Uuid::new_v4(), Uuid::new_v4(), "PRD-1", "FTT-0001")
            .unwrap();
        booking
    }

    #[test]
    fn test_draft_starts_clean() {
        let booking = Booking::draft(draft());
        assert_eq!(booking.state(), JourneyState::Draft);
        assert!(booking.reservation_id().is_none());
        assert!(booking.record_id().is_none());
        assert_eq!(booking.price(), Money::from_pence(2300));
    }

    #[test]
    fn test_forward_path() {
        let mut booking = booking_through_records();
        booking.payment_initiated("RCPT-9").unwrap();
        assert_eq!(booking.state(), JourneyState::PaymentInitiated);

        booking.payment_confirmed().unwrap();
        booking.slot_confirmed().unwrap();
        assert!(booking.reservation_id().is_none());

        booking
            .completed(Some(NaiveDate::from_ymd_opt(2026, 10, 9).unwrap()))
            .unwrap();
        assert_eq!(booking.state(), JourneyState::Complete);
        assert_eq!(
            booking.refund_eligibility_date(),
            Some(NaiveDate::from_ymd_opt(2026, 10, 9).unwrap())
        );
    }

    #[test]
    fn test_second_reservation_refused_while_first_active() {
        let mut booking = Booking::draft(draft());
        booking.mark_reserved(ReservationId::new("RSV-1")).unwrap();

        let err = booking.mark_reserved(ReservationId::new("RSV-2")).unwrap_err();
        assert!(matches!(err, BookingError::ActiveReservation { .. }));
        assert_eq!(booking.reservation_id().unwrap().as_str(), "RSV-1");
    }

    #[test]
    fn test_records_require_reservation_first() {
        let mut booking = Booking::draft(draft());
        let err = booking
            .records_created(Uuid::new_v4(), Uuid::new_v4(), "PRD-1", "FTT-0001")
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_slot_confirm_consumes_reservation() {
        let mut booking = booking_through_records();
        booking.payment_initiated("RCPT-9").unwrap();
        booking.payment_confirmed().unwrap();
        booking.slot_confirmed().unwrap();

        // The consumed id must never be reused; a fresh reserve is allowed
        // only from states that permit it.
        assert!(booking.reservation_id().is_none());
        let err = booking.mark_reserved(ReservationId::new("RSV-2")).unwrap_err();
        assert!(matches!(err, BookingError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_revert_to_draft_clears_attempt() {
        let mut booking = booking_through_records();
        booking.payment_initiated("RCPT-9").unwrap();
        booking.revert_to_draft();

        assert_eq!(booking.state(), JourneyState::Draft);
        assert!(booking.reservation_id().is_none());
        assert!(booking.receipt_reference().is_none());
        // Record ids survive a reset; the records themselves still exist.
        assert!(booking.record_id().is_some());
    }

    #[test]
    fn test_abandoned_and_system_error_are_terminal() {
        let mut booking = booking_through_records();
        booking.payment_initiated("RCPT-9").unwrap();
        booking.abandoned();
        assert_eq!(booking.state(), JourneyState::Abandoned);
        assert!(booking.state().is_terminal());

        let mut booking = booking_through_records();
        booking.payment_initiated("RCPT-9").unwrap();
        booking.system_error();
        assert_eq!(booking.state(), JourneyState::SystemError);
        assert!(booking.state().is_terminal());
    }

    #[test]
    fn test_reschedule_path() {
        let mut booking = booking_through_records();
        booking.payment_initiated("RCPT-9").unwrap();
        booking.payment_confirmed().unwrap();
        booking.slot_confirmed().unwrap();
        booking.completed(None).unwrap();

        booking.begin_reschedule().unwrap();
        assert_eq!(booking.state(), JourneyState::ChangeInProgress);

        // A new hold is allowed now that the prior one was consumed.
        booking.mark_reserved(ReservationId::new("RSV-2")).unwrap();

        let new_slot = Utc.with_ymd_and_hms(2026, 11, 2, 14, 0, 0).unwrap();
        booking.rescheduled(new_slot, None, None).unwrap();
        assert_eq!(booking.state(), JourneyState::Complete);
        assert_eq!(booking.slot(), new_slot);
        assert!(booking.reservation_id().is_none());
    }

    #[test]
    fn test_cancellation_path() {
        let mut booking = booking_through_records();
        booking.payment_initiated("RCPT-9").unwrap();
        booking.payment_confirmed().unwrap();
        booking.slot_confirmed().unwrap();
        booking.completed(None).unwrap();

        booking.begin_cancellation().unwrap();
        assert_eq!(booking.state(), JourneyState::CancellationInProgress);
        booking.cancelled().unwrap();
        assert_eq!(booking.state(), JourneyState::Cancelled);
        assert!(booking.state().is_terminal());
    }

    #[test]
    fn test_cannot_cancel_unconfirmed_booking() {
        let mut booking = booking_through_records();
        let err = booking.begin_cancellation().unwrap_err();
        assert!(matches!(err, BookingError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut booking = booking_through_records();
        booking.payment_initiated("RCPT-9").unwrap();

        let json = serde_json::to_string(&booking).unwrap();
        let deserialized: Booking = serde_json::from_str(&json).unwrap();
        assert_eq!(booking, deserialized);
    }
}
