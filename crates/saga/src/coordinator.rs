//! Forward saga coordinator: reserve, create records, pay, confirm.

use chrono::{DateTime, Utc};
use common::BookingRef;
use domain::{
    Booking, BookingDraft, BookingError, Candidate, JourneyState, RecordStatus, StatusOrigin,
    TestCentre,
};

use crate::error::SagaError;
use crate::outcome::CompletionOutcome;
use crate::services::scheduling::SchedulingService;
use crate::services::{
    BookingRecordsService, EmailMessage, GatewayError, NotificationService, PaymentOutcome,
    PaymentService, SaleDetails,
};
use crate::steps;

/// Where to send the candidate to pay, plus the references to poll with
/// afterwards.
#[derive(Debug, Clone)]
pub struct PaymentRedirect {
    pub gateway_url: String,
    pub receipt_reference: String,
    pub payment_id: String,
}

/// Drives a booking through reservation, record creation, payment, and
/// confirmation, with the compensating actions each payment outcome
/// demands.
///
/// The coordinator owns no state of its own: the [`Booking`] aggregate is
/// the working copy for one saga run, and the caller persists it back to
/// session storage after each step. Services are injected so tests can
/// substitute in-memory implementations.
pub struct BookingCoordinator<S, R, P, N>
where
    S: SchedulingService,
    R: BookingRecordsService,
    P: PaymentService,
    N: NotificationService,
{
    scheduling: S,
    records: R,
    payment: P,
    notifications: N,
}

impl<S, R, P, N> BookingCoordinator<S, R, P, N>
where
    S: SchedulingService,
    R: BookingRecordsService,
    P: PaymentService,
    N: NotificationService,
{
    /// Creates a new coordinator over the given services.
    pub fn new(scheduling: S, records: R, payment: P, notifications: N) -> Self {
        Self {
            scheduling,
            records,
            payment,
            notifications,
        }
    }

    /// Reserves a slot and creates the customer records for a new booking.
    ///
    /// A slot that is no longer available short-circuits before any record
    /// create is attempted; the candidate picks another slot. Record
    /// creation failures are fatal and leave no valid identifiers; the
    /// reservation is left to expire with its hold window. No compensating
    /// record delete is attempted; the record service tolerates orphaned
    /// Draft rows.
    #[tracing::instrument(skip(self, candidate, draft), fields(saga_type = steps::SAGA_TYPE_BOOKING))]
    pub async fn start_booking(
        &self,
        candidate: &Candidate,
        draft: BookingDraft,
    ) -> Result<Booking, SagaError> {
        metrics::counter!("booking_saga_started_total").increment(1);

        let mut booking = Booking::draft(draft);
        tracing::info!(
            step = steps::STEP_RESERVE_SLOT,
            booking_ref = %booking.booking_ref(),
            "saga step started"
        );

        let reservation_id = match self
            .scheduling
            .reserve(booking.centre(), booking.test_type(), booking.slot())
            .await
        {
            Ok(id) => id,
            Err(GatewayError::SlotUnavailable) => return Err(SagaError::SlotUnavailable),
            Err(err) => return Err(SagaError::Scheduling(err)),
        };
        booking.mark_reserved(reservation_id)?;

        tracing::info!(step = steps::STEP_CREATE_RECORDS, "saga step started");
        let created = self
            .records
            .create_candidate_and_booking(candidate, &booking)
            .await
            .map_err(SagaError::Records)?;

        tracing::info!(step = steps::STEP_CREATE_PRODUCT, "saga step started");
        let product = self
            .records
            .create_booking_product(created.booking_record_id, &booking)
            .await
            .map_err(SagaError::Records)?;

        let payment_reference = payment_reference_for(booking.booking_ref());
        booking.records_created(
            created.booking_record_id,
            product.product_id,
            product.product_ref,
            payment_reference,
        )?;

        if booking.support().any() {
            tracing::info!(step = steps::STEP_APPLY_SUPPORT, "saga step started");
            let support = booking.support();
            // Independent fields, updated concurrently; both must land
            // before the saga proceeds.
            tokio::try_join!(
                self.records
                    .set_voiceover(created.booking_record_id, support.voiceover),
                self.records
                    .set_extended_time(created.booking_record_id, support.extended_time),
            )
            .map_err(SagaError::Records)?;
        }

        Ok(booking)
    }

    /// Starts the hosted card payment and returns the redirect target.
    ///
    /// Initiation failures are surfaced classified (auth, server, or
    /// generic) and never retried here; the candidate retries manually.
    /// The reservation is kept so a manual retry does not lose the slot.
    #[tracing::instrument(skip(self, booking, candidate), fields(booking_ref = %booking.booking_ref()))]
    pub async fn begin_payment(
        &self,
        booking: &mut Booking,
        candidate: &Candidate,
    ) -> Result<PaymentRedirect, SagaError> {
        let payment_reference = booking
            .payment_reference()
            .ok_or(BookingError::MissingIdentifier {
                identifier: "payment reference",
            })?
            .to_string();

        let sale = SaleDetails {
            payment_reference,
            total_amount: booking.price().to_amount_string(),
            description: format!("{} theory test", booking.test_type()),
        };
        let person = candidate.payment_person_reference();

        tracing::info!(step = steps::STEP_INITIATE_PAYMENT, "saga step started");
        let initiation = self
            .payment
            .initiate(&sale, candidate.id, &person)
            .await
            .map_err(SagaError::Payment)?;

        booking.payment_initiated(initiation.receipt_reference.clone())?;

        Ok(PaymentRedirect {
            gateway_url: initiation.gateway_url,
            receipt_reference: initiation.receipt_reference,
            payment_id: initiation.payment_id,
        })
    }

    /// Polls the payment outcome after redirect-back and applies the
    /// compensating actions that outcome demands.
    ///
    /// Classification happens once, at the payment boundary; this method
    /// only branches on the classified outcome. Re-polling a booking whose
    /// saga already resolved re-yields the stored outcome without driving
    /// confirm or release again.
    #[tracing::instrument(skip(self, booking, candidate), fields(booking_ref = %booking.booking_ref()))]
    pub async fn complete_payment(
        &self,
        booking: &mut Booking,
        candidate: &Candidate,
    ) -> Result<CompletionOutcome, SagaError> {
        match booking.state() {
            JourneyState::SlotConfirmed | JourneyState::Complete => {
                return Ok(CompletionOutcome::BookingConfirmed);
            }
            JourneyState::Abandoned => return Ok(CompletionOutcome::BookingCancelled),
            JourneyState::SystemError => {
                return Ok(CompletionOutcome::SystemError {
                    booking_reference: booking.booking_ref(),
                });
            }
            _ => {}
        }
        if !booking.state().can_complete_payment() {
            return Err(BookingError::InvalidStateTransition {
                current_state: booking.state(),
                action: "confirm payment",
            }
            .into());
        }

        let saga_start = std::time::Instant::now();
        let receipt = booking.require_receipt_reference()?.to_string();
        let person = candidate.payment_person_reference();

        tracing::info!(step = steps::STEP_CONFIRM_PAYMENT, "saga step started");
        let confirmation = match self
            .payment
            .confirm_complete(&receipt, candidate.id, &person)
            .await
        {
            Ok(confirmation) => confirmation,
            Err(err) => {
                // The outcome is unknown; free the hold and reset the
                // candidate's session rather than guessing.
                tracing::error!(error = %err, "payment completion poll failed");
                self.release_best_effort(booking).await;
                booking.revert_to_draft();
                self.finish(saga_start, "confirmation-error");
                return Ok(CompletionOutcome::ConfirmationError);
            }
        };

        let outcome = PaymentOutcome::classify(confirmation.code);
        tracing::info!(code = %confirmation.code, ?outcome, "payment outcome classified");

        match outcome {
            PaymentOutcome::Success => {
                booking.payment_confirmed()?;

                let reservation_id = booking
                    .reservation_id()
                    .cloned()
                    .ok_or(BookingError::NoReservation)?;

                tracing::info!(step = steps::STEP_CONFIRM_SLOT, "saga step started");
                self.scheduling
                    .confirm(booking.booking_ref(), &reservation_id, booking.region())
                    .await
                    .map_err(SagaError::Scheduling)?;
                booking.slot_confirmed()?;

                tracing::info!(step = steps::STEP_MARK_CONFIRMED, "saga step started");
                let record_id = booking.require_record_id()?;
                self.records
                    .update_booking_status(
                        record_id,
                        RecordStatus::Confirmed,
                        StatusOrigin::CandidateOnline,
                    )
                    .await
                    .map_err(SagaError::Records)?;

                let refund_by = match self
                    .records
                    .calculate_refund_eligibility_date(
                        booking.slot().date_naive(),
                        booking.region(),
                    )
                    .await
                {
                    Ok(date) => {
                        if let Err(err) = self
                            .records
                            .store_refund_eligibility_date(record_id, date)
                            .await
                        {
                            tracing::warn!(error = %err, "refund-eligibility date not stamped");
                        }
                        Some(date)
                    }
                    Err(err) => {
                        // Informational only; confirmation proceeds.
                        tracing::warn!(error = %err, "refund-eligibility date unavailable");
                        None
                    }
                };

                booking.completed(refund_by)?;
                self.send_best_effort(confirmation_email(booking, candidate))
                    .await;

                self.finish(saga_start, "booking-confirmed");
                metrics::counter!("booking_saga_completed").increment(1);
                tracing::info!(booking_ref = %booking.booking_ref(), "booking saga completed");
                Ok(CompletionOutcome::BookingConfirmed)
            }
            PaymentOutcome::Failed => {
                self.release_best_effort(booking).await;
                self.status_best_effort(booking, RecordStatus::Draft).await;
                booking.revert_to_draft();
                self.finish(saga_start, "payment-failed");
                Ok(CompletionOutcome::PaymentUnsuccessful { can_retry: true })
            }
            PaymentOutcome::UserCancelled => {
                self.release_best_effort(booking).await;
                self.status_best_effort(booking, RecordStatus::AbandonedNonRecoverable)
                    .await;
                booking.abandoned();
                self.finish(saga_start, "user-cancelled");
                Ok(CompletionOutcome::BookingCancelled)
            }
            PaymentOutcome::GatewayFault => {
                self.release_best_effort(booking).await;
                self.status_best_effort(booking, RecordStatus::SystemErrorNonRecoverable)
                    .await;
                booking.system_error();
                self.finish(saga_start, "gateway-fault");
                Ok(CompletionOutcome::PaymentUnsuccessful { can_retry: false })
            }
            PaymentOutcome::SystemFault => {
                self.release_best_effort(booking).await;
                self.status_best_effort(booking, RecordStatus::SystemErrorNonRecoverable)
                    .await;
                booking.system_error();
                self.finish(saga_start, "system-fault");
                Ok(CompletionOutcome::SystemError {
                    booking_reference: booking.booking_ref(),
                })
            }
        }
    }

    /// Moves a confirmed booking to a new slot, and optionally a new
    /// centre.
    ///
    /// The record is marked ChangeInProgress first; the new slot is
    /// reserved and confirmed before the old slot is released, so the
    /// candidate never ends up with no slot at all.
    #[tracing::instrument(skip(self, booking, candidate, new_centre), fields(saga_type = steps::SAGA_TYPE_RESCHEDULE, booking_ref = %booking.booking_ref()))]
    pub async fn reschedule(
        &self,
        booking: &mut Booking,
        candidate: &Candidate,
        new_slot: DateTime<Utc>,
        new_centre: Option<TestCentre>,
    ) -> Result<(), SagaError> {
        if !booking.state().can_reschedule() {
            return Err(BookingError::InvalidStateTransition {
                current_state: booking.state(),
                action: "reschedule",
            }
            .into());
        }

        let record_id = booking.require_record_id()?;
        let product_ref = booking.require_product_ref()?.to_string();
        let old_region = booking.region();

        self.records
            .update_booking_status(
                record_id,
                RecordStatus::ChangeInProgress,
                StatusOrigin::CandidateOnline,
            )
            .await
            .map_err(SagaError::Records)?;
        booking.begin_reschedule()?;

        let target_centre = new_centre
            .clone()
            .unwrap_or_else(|| booking.centre().clone());

        tracing::info!(step = steps::STEP_RESERVE_SLOT, "saga step started");
        let reservation_id = match self
            .scheduling
            .reserve(&target_centre, booking.test_type(), new_slot)
            .await
        {
            Ok(id) => id,
            Err(err) => {
                // Keep the original slot; put the record back to Confirmed.
                booking.reschedule_abandoned();
                self.status_best_effort(booking, RecordStatus::Confirmed)
                    .await;
                return Err(match err {
                    GatewayError::SlotUnavailable => SagaError::SlotUnavailable,
                    other => SagaError::Scheduling(other),
                });
            }
        };
        booking.mark_reserved(reservation_id.clone())?;

        tracing::info!(step = steps::STEP_CONFIRM_SLOT, "saga step started");
        self.scheduling
            .confirm(booking.booking_ref(), &reservation_id, target_centre.region)
            .await
            .map_err(SagaError::Scheduling)?;

        tracing::info!(step = steps::STEP_RELEASE_SLOT, "saga step started");
        if let Err(err) = self.scheduling.release(&product_ref, old_region).await {
            tracing::warn!(error = %err, "old slot release failed");
        }

        self.records
            .reschedule_and_confirm(
                record_id,
                new_slot,
                new_centre.as_ref().map(|c| c.id.as_str()),
            )
            .await
            .map_err(SagaError::Records)?;

        let refund_by = match self
            .records
            .calculate_refund_eligibility_date(new_slot.date_naive(), target_centre.region)
            .await
        {
            Ok(date) => {
                if let Err(err) = self
                    .records
                    .store_refund_eligibility_date(record_id, date)
                    .await
                {
                    tracing::warn!(error = %err, "refund-eligibility date not stamped");
                }
                Some(date)
            }
            Err(err) => {
                tracing::warn!(error = %err, "refund-eligibility date unavailable");
                None
            }
        };

        booking.rescheduled(new_slot, new_centre, refund_by)?;
        self.send_best_effort(reschedule_email(booking, candidate))
            .await;

        tracing::info!(booking_ref = %booking.booking_ref(), "reschedule completed");
        Ok(())
    }

    async fn release_best_effort(&self, booking: &mut Booking) {
        tracing::info!(step = steps::STEP_RELEASE_SLOT, "saga step started");
        match booking.product_ref().map(str::to_string) {
            Some(product_ref) => {
                if let Err(err) = self.scheduling.release(&product_ref, booking.region()).await {
                    tracing::warn!(error = %err, "slot release failed");
                } else {
                    booking.reservation_released();
                }
            }
            None => tracing::warn!("no product ref held; nothing to release"),
        }
    }

    async fn status_best_effort(&self, booking: &Booking, status: RecordStatus) {
        match booking.record_id() {
            Some(record_id) => {
                if let Err(err) = self
                    .records
                    .update_booking_status(record_id, status, StatusOrigin::CandidateOnline)
                    .await
                {
                    tracing::warn!(%status, error = %err, "record status update failed");
                }
            }
            None => tracing::warn!(%status, "no record id held; status not updated"),
        }
    }

    async fn send_best_effort(&self, message: EmailMessage) {
        tracing::info!(step = steps::STEP_SEND_NOTIFICATION, "saga step started");
        if let Err(err) = self.notifications.send_email(&message).await {
            tracing::warn!(error = %err, "notification send failed");
        }
    }

    fn finish(&self, started: std::time::Instant, outcome: &'static str) {
        metrics::histogram!("booking_saga_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        metrics::counter!("booking_saga_outcome_total", "outcome" => outcome).increment(1);
    }
}

/// Payment reference the provider correlates the sale under, derived from
/// the booking reference so repeat initiations for the same booking
/// present the same reference.
fn payment_reference_for(booking_ref: BookingRef) -> String {
    let simple = booking_ref.as_uuid().simple().to_string();
    format!("FTT-{}", simple[..12].to_uppercase())
}

fn confirmation_email(booking: &Booking, candidate: &Candidate) -> EmailMessage {
    EmailMessage {
        address: candidate.email.clone(),
        subject: "Your theory test booking is confirmed".to_string(),
        body: format!(
            "Dear {},\n\nYour {} theory test is booked for {} at {}.\nBooking reference: {}\n",
            candidate.full_name(),
            booking.test_type(),
            booking.slot().format("%d %B %Y at %H:%M"),
            booking.centre().name,
            booking.booking_ref(),
        ),
        reference: booking.booking_ref().to_string(),
    }
}

fn reschedule_email(booking: &Booking, candidate: &Candidate) -> EmailMessage {
    EmailMessage {
        address: candidate.email.clone(),
        subject: "Your theory test has been moved".to_string(),
        body: format!(
            "Dear {},\n\nYour {} theory test is now on {} at {}.\nBooking reference: {}\n",
            candidate.full_name(),
            booking.test_type(),
            booking.slot().format("%d %B %Y at %H:%M"),
            booking.centre().name,
            booking.booking_ref(),
        ),
        reference: booking.booking_ref().to_string(),
    }
}
