//! Booking journey endpoints: start, pay, complete, cancel, reschedule.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::BookingRef;
use domain::{
    Address, Booking, BookingDraft, Candidate, LicenceNumber, Money, PersonReference,
    RefundDecision, Region, SupportOptions, TestCentre, TestType,
};
use saga::{
    BookingCoordinator, BookingRecordsService, CancellationCoordinator, CompletionOutcome,
    NotificationService, PaymentService, SchedulingService,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::session::{Journey, SessionStore};

/// Remote services behind trait objects so the same handlers run against
/// HTTP gateways in production and in-memory services in tests.
pub type DynScheduling = Arc<dyn SchedulingService>;
pub type DynRecords = Arc<dyn BookingRecordsService>;
pub type DynPayments = Arc<dyn PaymentService>;
pub type DynNotifications = Arc<dyn NotificationService>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub coordinator: BookingCoordinator<DynScheduling, DynRecords, DynPayments, DynNotifications>,
    pub cancellation:
        CancellationCoordinator<DynScheduling, DynRecords, DynPayments, DynNotifications>,
    pub sessions: SessionStore,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CandidateRequest {
    pub first_name: String,
    pub surname: String,
    pub licence_number: String,
    pub email: String,
    pub address_line_1: String,
    pub address_line_2: Option<String>,
    pub city: String,
    pub postcode: String,
    pub person_reference: Option<String>,
}

#[derive(Deserialize)]
pub struct CentreRequest {
    pub id: String,
    pub name: String,
    pub region: Region,
}

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub candidate: CandidateRequest,
    pub centre: CentreRequest,
    pub test_type: TestType,
    pub slot: DateTime<Utc>,
    /// Price override in pence; defaults to the standard fee.
    pub price_pence: Option<i64>,
    #[serde(default)]
    pub voiceover: bool,
    #[serde(default)]
    pub extended_time: bool,
}

#[derive(Deserialize)]
pub struct RescheduleRequest {
    pub slot: DateTime<Utc>,
    pub centre: Option<CentreRequest>,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub booking_ref: String,
    pub state: String,
    pub centre: String,
    pub test_type: String,
    pub slot: DateTime<Utc>,
    pub price: String,
    pub refund_eligibility_date: Option<String>,
}

#[derive(Serialize)]
pub struct PaymentRedirectResponse {
    pub gateway_url: String,
    pub receipt_reference: String,
}

#[derive(Serialize)]
pub struct OutcomeResponse {
    pub outcome: &'static str,
    pub can_retry: bool,
    pub booking_reference: Option<String>,
}

#[derive(Serialize)]
pub struct CancellationResponse {
    pub outcome: &'static str,
    pub refunded: bool,
    pub bookings: Option<Vec<BookingSummaryResponse>>,
}

#[derive(Serialize)]
pub struct BookingSummaryResponse {
    pub booking_ref: String,
    pub slot: DateTime<Utc>,
    pub status: String,
}

fn booking_response(booking: &Booking) -> BookingResponse {
    BookingResponse {
        booking_ref: booking.booking_ref().to_string(),
        state: booking.state().to_string(),
        centre: booking.centre().name.clone(),
        test_type: booking.test_type().to_string(),
        slot: booking.slot(),
        price: booking.price().to_string(),
        refund_eligibility_date: booking.refund_eligibility_date().map(|d| d.to_string()),
    }
}

fn candidate_from(request: CandidateRequest) -> Candidate {
    Candidate {
        id: common::CandidateId::new(),
        first_name: request.first_name,
        surname: request.surname,
        licence_number: LicenceNumber::new(request.licence_number),
        email: request.email,
        address: Address::new(
            request.address_line_1,
            request.address_line_2,
            request.city,
            request.postcode,
        ),
        person_reference: request.person_reference.map(PersonReference::new),
    }
}

fn parse_booking_ref(id: &str) -> Result<BookingRef, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid booking ref: {e}")))?;
    Ok(BookingRef::from_uuid(uuid))
}

// -- Handlers --

/// POST /bookings — start the booking journey: reserve a slot and create
/// the customer records.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    metrics::counter!("http_booking_journeys_started_total").increment(1);

    let candidate = candidate_from(req.candidate);
    let centre = TestCentre::new(req.centre.id, req.centre.name, req.centre.region);

    let mut draft = BookingDraft::new(centre, req.test_type, req.slot).with_support(
        SupportOptions {
            voiceover: req.voiceover,
            extended_time: req.extended_time,
        },
    );
    if let Some(pence) = req.price_pence {
        draft = draft.with_price(Money::from_pence(pence));
    }

    let booking = state.coordinator.start_booking(&candidate, draft).await?;

    let response = booking_response(&booking);
    state.sessions.put(Journey { candidate, booking });

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /bookings/{ref} — the current working copy of a booking.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking_ref = parse_booking_ref(&id)?;
    let journey = state
        .sessions
        .get(booking_ref)
        .ok_or_else(|| ApiError::NotFound(format!("Booking {id} not found")))?;

    Ok(Json(booking_response(&journey.booking)))
}

/// POST /bookings/{ref}/payment — begin the hosted card payment and hand
/// back the gateway redirect.
#[tracing::instrument(skip(state))]
pub async fn begin_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PaymentRedirectResponse>, ApiError> {
    let booking_ref = parse_booking_ref(&id)?;
    let mut journey = state
        .sessions
        .get(booking_ref)
        .ok_or_else(|| ApiError::NotFound(format!("Booking {id} not found")))?;

    let result = state
        .coordinator
        .begin_payment(&mut journey.booking, &journey.candidate)
        .await;
    state.sessions.put(journey);

    let redirect = result?;
    Ok(Json(PaymentRedirectResponse {
        gateway_url: redirect.gateway_url,
        receipt_reference: redirect.receipt_reference,
    }))
}

/// POST /bookings/{ref}/payment/complete — the return leg from the
/// payment gateway; resolves the saga and selects the outcome page.
#[tracing::instrument(skip(state))]
pub async fn complete_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OutcomeResponse>, ApiError> {
    let booking_ref = parse_booking_ref(&id)?;
    let mut journey = state
        .sessions
        .get(booking_ref)
        .ok_or_else(|| ApiError::NotFound(format!("Booking {id} not found")))?;

    let result = state
        .coordinator
        .complete_payment(&mut journey.booking, &journey.candidate)
        .await;

    // A reset outcome discards the session copy; everything else persists
    // the updated aggregate.
    match &result {
        Ok(CompletionOutcome::ConfirmationError) => state.sessions.remove(booking_ref),
        _ => state.sessions.put(journey),
    }

    let outcome = result?;
    let response = match &outcome {
        CompletionOutcome::BookingConfirmed => OutcomeResponse {
            outcome: outcome.page(),
            can_retry: false,
            booking_reference: Some(booking_ref.to_string()),
        },
        CompletionOutcome::PaymentUnsuccessful { can_retry } => OutcomeResponse {
            outcome: outcome.page(),
            can_retry: *can_retry,
            booking_reference: None,
        },
        CompletionOutcome::BookingCancelled => OutcomeResponse {
            outcome: outcome.page(),
            can_retry: false,
            booking_reference: None,
        },
        CompletionOutcome::SystemError { booking_reference } => OutcomeResponse {
            outcome: outcome.page(),
            can_retry: false,
            booking_reference: Some(booking_reference.to_string()),
        },
        CompletionOutcome::ConfirmationError => OutcomeResponse {
            outcome: outcome.page(),
            can_retry: false,
            booking_reference: None,
        },
    };

    Ok(Json(response))
}

/// POST /bookings/{ref}/cancel — run the cancellation saga.
#[tracing::instrument(skip(state))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CancellationResponse>, ApiError> {
    let booking_ref = parse_booking_ref(&id)?;
    let mut journey = state
        .sessions
        .get(booking_ref)
        .ok_or_else(|| ApiError::NotFound(format!("Booking {id} not found")))?;

    let cancelled_on = Utc::now().date_naive();
    let result = state
        .cancellation
        .cancel(&mut journey.booking, &journey.candidate, cancelled_on)
        .await;
    state.sessions.put(journey);

    let outcome = result?;
    Ok(Json(CancellationResponse {
        outcome: "booking-cancelled",
        refunded: outcome.decision == RefundDecision::Refund,
        bookings: outcome.bookings.map(|rows| {
            rows.into_iter()
                .map(|row| BookingSummaryResponse {
                    booking_ref: row.booking_ref.to_string(),
                    slot: row.slot,
                    status: row.status.to_string(),
                })
                .collect()
        }),
    }))
}

/// POST /bookings/{ref}/reschedule — move a confirmed booking to a new
/// slot, optionally at a different centre.
#[tracing::instrument(skip(state, req))]
pub async fn reschedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RescheduleRequest>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking_ref = parse_booking_ref(&id)?;
    let mut journey = state
        .sessions
        .get(booking_ref)
        .ok_or_else(|| ApiError::NotFound(format!("Booking {id} not found")))?;

    let new_centre = req
        .centre
        .map(|c| TestCentre::new(c.id, c.name, c.region));

    let result = state
        .coordinator
        .reschedule(&mut journey.booking, &journey.candidate, req.slot, new_centre)
        .await;

    let response = booking_response(&journey.booking);
    state.sessions.put(journey);

    result?;
    Ok(Json(response))
}
