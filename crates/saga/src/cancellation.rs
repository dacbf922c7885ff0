//! Reverse saga: cancellation with refund or income recognition.

use chrono::NaiveDate;
use domain::{
    Booking, BookingError, Candidate, RecordStatus, RefundDecision, StatusOrigin, decide_refund,
};

use crate::error::SagaError;
use crate::outcome::CancellationOutcome;
use crate::services::scheduling::SchedulingService;
use crate::services::{
    BookingRecordsService, EmailMessage, IncomeRecognition, NotificationService, PaymentService,
    ProviderCode, RefundRequest,
};
use crate::steps;

/// Drives a confirmed booking through cancellation.
///
/// The run has two fatal legs, recording CancellationInProgress and
/// settling the money; everything after them is best-effort cleanup.
/// Once the payment is resolved the saga is financially settled: a failed
/// release, status update, email, or list refresh is logged and never
/// re-opens the earlier steps.
pub struct CancellationCoordinator<S, R, P, N>
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

impl<S, R, P, N> CancellationCoordinator<S, R, P, N>
where
    S: SchedulingService,
    R: BookingRecordsService,
    P: PaymentService,
    N: NotificationService,
{
    /// Creates a new cancellation coordinator over the given services.
    pub fn new(scheduling: S, records: R, payment: P, notifications: N) -> Self {
        Self {
            scheduling,
            records,
            payment,
            notifications,
        }
    }

    /// Cancels a confirmed booking.
    ///
    /// `cancelled_on` is the date the cancellation is made, against which
    /// refund eligibility is decided once, before any payment call, and
    /// never re-derived within the run.
    #[tracing::instrument(skip(self, booking, candidate), fields(saga_type = steps::SAGA_TYPE_CANCELLATION, booking_ref = %booking.booking_ref()))]
    pub async fn cancel(
        &self,
        booking: &mut Booking,
        candidate: &Candidate,
        cancelled_on: NaiveDate,
    ) -> Result<CancellationOutcome, SagaError> {
        metrics::counter!("cancellation_saga_started_total").increment(1);
        let saga_start = std::time::Instant::now();

        if !booking.state().can_cancel() {
            return Err(BookingError::InvalidStateTransition {
                current_state: booking.state(),
                action: "cancel",
            }
            .into());
        }
        let record_id = booking.require_record_id()?;
        let product_id = booking.require_product_id()?;
        let product_ref = booking.require_product_ref()?.to_string();

        // 1. Record the cancellation before any side effects. If this does
        // not land, no further cancellation action is safe.
        tracing::info!(
            step = steps::STEP_MARK_CANCELLATION_IN_PROGRESS,
            "saga step started"
        );
        self.records
            .update_booking_status(
                record_id,
                RecordStatus::CancellationInProgress,
                StatusOrigin::CandidateOnline,
            )
            .await
            .map_err(|err| {
                metrics::counter!("cancellation_saga_failed").increment(1);
                SagaError::Records(err)
            })?;
        booking.begin_cancellation()?;

        // 2. Decide refund handling once for this run.
        let decision = decide_refund(booking.price(), booking.slot().date_naive(), cancelled_on);
        tracing::info!(?decision, "refund decision made");

        // 3. Settle the money. Failure leaves the booking in
        // CancellationInProgress for a candidate or operator retry.
        tracing::info!(step = steps::STEP_SETTLE_PAYMENT, "saga step started");
        let refund_code = self
            .settle_payment(booking, candidate, decision)
            .await
            .inspect_err(|_| {
                metrics::counter!("cancellation_saga_failed").increment(1);
            })?;

        // 4. Release the slot; capacity reconciliation is out of band.
        tracing::info!(step = steps::STEP_RELEASE_SLOT, "saga step started");
        if let Err(err) = self.scheduling.release(&product_ref, booking.region()).await {
            tracing::warn!(error = %err, "slot release failed");
        }
        booking.reservation_released();

        // 5. Terminal status.
        tracing::info!(step = steps::STEP_MARK_CANCELLED, "saga step started");
        if let Err(err) = self
            .records
            .mark_cancelled(record_id, product_id, StatusOrigin::CandidateOnline)
            .await
        {
            tracing::warn!(error = %err, "cancelled status not recorded");
        }
        booking.cancelled()?;

        // 6. Cancellation email.
        tracing::info!(step = steps::STEP_SEND_NOTIFICATION, "saga step started");
        let email = cancellation_email(booking, candidate, decision);
        if let Err(err) = self.notifications.send_email(&email).await {
            tracing::warn!(error = %err, "cancellation email failed");
        }

        // 7. Refresh the candidate's booking list.
        tracing::info!(step = steps::STEP_REFRESH_BOOKINGS, "saga step started");
        let bookings = match self.records.list_candidate_bookings(candidate.id).await {
            Ok(bookings) => Some(bookings),
            Err(err) => {
                tracing::warn!(error = %err, "booking list refresh failed");
                None
            }
        };

        metrics::histogram!("cancellation_saga_duration_seconds")
            .record(saga_start.elapsed().as_secs_f64());
        metrics::counter!("cancellation_saga_completed").increment(1);
        tracing::info!(booking_ref = %booking.booking_ref(), "cancellation saga completed");

        Ok(CancellationOutcome {
            decision,
            refund_code,
            bookings,
        })
    }

    /// Applies the refund decision against the payment service.
    ///
    /// Transport failures are fatal; a refund the provider answers with a
    /// non-success code is logged and the run continues. Financial calls
    /// are never blindly re-sent, to avoid double-refunding.
    async fn settle_payment(
        &self,
        booking: &Booking,
        candidate: &Candidate,
        decision: RefundDecision,
    ) -> Result<Option<ProviderCode>, SagaError> {
        let person = candidate.payment_person_reference();

        match decision {
            RefundDecision::NoPaymentAction => Ok(None),
            RefundDecision::Refund => {
                let refund = RefundRequest {
                    payment_reference: booking
                        .payment_reference()
                        .ok_or(BookingError::MissingIdentifier {
                            identifier: "payment reference",
                        })?
                        .to_string(),
                    total_amount: booking.price().to_amount_string(),
                };
                let outcome = self
                    .payment
                    .request_refund(&refund, candidate.id, &person)
                    .await
                    .map_err(SagaError::Payment)?;

                if outcome.code != ProviderCode::RefundSuccess
                    && outcome.code != ProviderCode::Success
                {
                    tracing::warn!(code = %outcome.code, "refund not accepted by provider");
                }
                Ok(Some(outcome.code))
            }
            RefundDecision::RecogniseIncome => {
                let income = IncomeRecognition {
                    payment_reference: booking
                        .payment_reference()
                        .ok_or(BookingError::MissingIdentifier {
                            identifier: "payment reference",
                        })?
                        .to_string(),
                    total_amount: booking.price().to_amount_string(),
                };
                self.payment
                    .recognise_income(&income, candidate.id, &person)
                    .await
                    .map_err(SagaError::Payment)?;
                Ok(None)
            }
        }
    }
}

fn cancellation_email(
    booking: &Booking,
    candidate: &Candidate,
    decision: RefundDecision,
) -> EmailMessage {
    let refund_line = match decision {
        RefundDecision::Refund => "Your payment will be refunded.\n",
        RefundDecision::RecogniseIncome | RefundDecision::NoPaymentAction => "",
    };
    EmailMessage {
        address: candidate.email.clone(),
        subject: "Your theory test booking has been cancelled".to_string(),
        body: format!(
            "Dear {},\n\nYour {} theory test on {} at {} has been cancelled.\n{}Booking reference: {}\n",
            candidate.full_name(),
            booking.test_type(),
            booking.slot().format("%d %B %Y at %H:%M"),
            booking.centre().name,
            refund_line,
            booking.booking_ref(),
        ),
        reference: booking.booking_ref().to_string(),
    }
}
