//! Integration tests for the forward booking saga.

use chrono::{TimeZone, Utc};
use common::CandidateId;
use domain::{
    Address, BookingDraft, Candidate, JourneyState, LicenceNumber, RecordStatus, Region,
    TestCentre, TestType,
};
use saga::{
    BookingCoordinator, CompletionOutcome, InMemoryNotificationService, InMemoryPaymentService,
    InMemoryRecordsService, InMemorySchedulingService, ProviderCode, SagaError,
};

type TestCoordinator = BookingCoordinator<
    InMemorySchedulingService,
    InMemoryRecordsService,
    InMemoryPaymentService,
    InMemoryNotificationService,
>;

struct TestHarness {
    coordinator: TestCoordinator,
    scheduling: InMemorySchedulingService,
    records: InMemoryRecordsService,
    payment: InMemoryPaymentService,
    notifications: InMemoryNotificationService,
}

impl TestHarness {
    fn new() -> Self {
        let scheduling = InMemorySchedulingService::new();
        let records = InMemoryRecordsService::new();
        let payment = InMemoryPaymentService::new();
        let notifications = InMemoryNotificationService::new();

        let coordinator = BookingCoordinator::new(
            scheduling.clone(),
            records.clone(),
            payment.clone(),
            notifications.clone(),
        );

        Self {
            coordinator,
            scheduling,
            records,
            payment,
            notifications,
        }
    }

    fn candidate() -> Candidate {
        Candidate {
            id: CandidateId::new(),
            first_name: "Megan".to_string(),
            surname: "Price".to_string(),
            licence_number: LicenceNumber::new("PRICE061102M97AB"),
            email: "megan.price@example.com".to_string(),
            address: Address::new("12 Castle Street", None, "Cardiff", "CF10 1BS"),
            person_reference: None,
        }
    }

    fn draft() -> BookingDraft {
        BookingDraft::new(
            TestCentre::new("C-052", "Cardiff", Region::B),
            TestType::Car,
            Utc.with_ymd_and_hms(2026, 10, 12, 9, 30, 0).unwrap(),
        )
    }
}

#[tokio::test]
async fn test_happy_path_reserve_pay_confirm() {
    let h = TestHarness::new();
    let candidate = TestHarness::candidate();

    // Reserve and create records.
    let mut booking = h
        .coordinator
        .start_booking(&candidate, TestHarness::draft())
        .await
        .unwrap();
    let reservation_id = booking.reservation_id().unwrap().clone();
    assert_eq!(booking.state(), JourneyState::RecordsCreated);

    // Redirect to the gateway.
    let redirect = h
        .coordinator
        .begin_payment(&mut booking, &candidate)
        .await
        .unwrap();
    assert_eq!(booking.receipt_reference(), Some(redirect.receipt_reference.as_str()));

    // Provider reports success on redirect-back.
    let outcome = h
        .coordinator
        .complete_payment(&mut booking, &candidate)
        .await
        .unwrap();

    assert_eq!(outcome, CompletionOutcome::BookingConfirmed);
    assert_eq!(booking.state(), JourneyState::Complete);
    assert!(booking.refund_eligibility_date().is_some());

    // The held slot was confirmed with the right identifiers.
    let confirmed = h.scheduling.confirmed();
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].0, booking.booking_ref());
    assert_eq!(confirmed[0].1, reservation_id);
    assert_eq!(confirmed[0].2, Region::B);

    // Record status followed the outcome table.
    let record_id = booking.record_id().unwrap();
    assert_eq!(h.records.status_of(record_id), Some(RecordStatus::Confirmed));

    // Confirmation email attempted.
    assert_eq!(h.notifications.sent_count(), 1);
    assert_eq!(h.notifications.sent()[0].address, candidate.email);

    // Nothing was released.
    assert!(h.scheduling.released().is_empty());
}

#[tokio::test]
async fn test_user_cancelled_releases_and_abandons() {
    let h = TestHarness::new();
    let candidate = TestHarness::candidate();

    let mut booking = h
        .coordinator
        .start_booking(&candidate, TestHarness::draft())
        .await
        .unwrap();
    let product_ref = booking.product_ref().unwrap().to_string();
    h.coordinator
        .begin_payment(&mut booking, &candidate)
        .await
        .unwrap();

    h.payment.set_confirm_code(ProviderCode::UserCancelled);
    let outcome = h
        .coordinator
        .complete_payment(&mut booking, &candidate)
        .await
        .unwrap();

    assert_eq!(outcome, CompletionOutcome::BookingCancelled);
    assert_eq!(booking.state(), JourneyState::Abandoned);

    // Release used the (product_ref, region) pair; no confirm happened.
    assert_eq!(h.scheduling.released(), vec![(product_ref, Region::B)]);
    assert_eq!(h.scheduling.confirmed_count(), 0);

    let record_id = booking.record_id().unwrap();
    assert_eq!(
        h.records.status_of(record_id),
        Some(RecordStatus::AbandonedNonRecoverable)
    );

    // No confirmation email for an abandoned payment.
    assert_eq!(h.notifications.sent_count(), 0);
}

#[tokio::test]
async fn test_payment_failed_releases_and_returns_to_draft() {
    let h = TestHarness::new();
    let candidate = TestHarness::candidate();

    let mut booking = h
        .coordinator
        .start_booking(&candidate, TestHarness::draft())
        .await
        .unwrap();
    h.coordinator
        .begin_payment(&mut booking, &candidate)
        .await
        .unwrap();

    h.payment.set_confirm_code(ProviderCode::Failed);
    let outcome = h
        .coordinator
        .complete_payment(&mut booking, &candidate)
        .await
        .unwrap();

    assert_eq!(outcome, CompletionOutcome::PaymentUnsuccessful { can_retry: true });
    assert_eq!(booking.state(), JourneyState::Draft);
    assert_eq!(h.scheduling.released().len(), 1);

    let record_id = booking.record_id().unwrap();
    assert_eq!(h.records.status_of(record_id), Some(RecordStatus::Draft));
}

#[tokio::test]
async fn test_gateway_fault_is_non_retryable_unsuccessful() {
    let h = TestHarness::new();
    let candidate = TestHarness::candidate();

    let mut booking = h
        .coordinator
        .start_booking(&candidate, TestHarness::draft())
        .await
        .unwrap();
    h.coordinator
        .begin_payment(&mut booking, &candidate)
        .await
        .unwrap();

    h.payment.set_confirm_code(ProviderCode::GatewayFault);
    let outcome = h
        .coordinator
        .complete_payment(&mut booking, &candidate)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        CompletionOutcome::PaymentUnsuccessful { can_retry: false }
    );
    assert_eq!(booking.state(), JourneyState::SystemError);
    assert_eq!(h.scheduling.released().len(), 1);

    let record_id = booking.record_id().unwrap();
    assert_eq!(
        h.records.status_of(record_id),
        Some(RecordStatus::SystemErrorNonRecoverable)
    );
}

#[tokio::test]
async fn test_system_fault_surfaces_booking_reference() {
    let h = TestHarness::new();
    let candidate = TestHarness::candidate();

    let mut booking = h
        .coordinator
        .start_booking(&candidate, TestHarness::draft())
        .await
        .unwrap();
    h.coordinator
        .begin_payment(&mut booking, &candidate)
        .await
        .unwrap();

    h.payment.set_confirm_code(ProviderCode::SystemFault);
    let outcome = h
        .coordinator
        .complete_payment(&mut booking, &candidate)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        CompletionOutcome::SystemError {
            booking_reference: booking.booking_ref()
        }
    );
    assert_eq!(booking.state(), JourneyState::SystemError);

    let record_id = booking.record_id().unwrap();
    assert_eq!(
        h.records.status_of(record_id),
        Some(RecordStatus::SystemErrorNonRecoverable)
    );
}

#[tokio::test]
async fn test_completion_is_idempotent() {
    let h = TestHarness::new();
    let candidate = TestHarness::candidate();

    let mut booking = h
        .coordinator
        .start_booking(&candidate, TestHarness::draft())
        .await
        .unwrap();
    let redirect = h
        .coordinator
        .begin_payment(&mut booking, &candidate)
        .await
        .unwrap();

    let first = h
        .coordinator
        .complete_payment(&mut booking, &candidate)
        .await
        .unwrap();
    let second = h
        .coordinator
        .complete_payment(&mut booking, &candidate)
        .await
        .unwrap();

    // Same classified outcome, and neither the scheduling confirm nor the
    // gateway poll ran twice.
    assert_eq!(first, second);
    assert_eq!(h.scheduling.confirm_calls(), 1);
    assert_eq!(h.payment.confirm_calls(&redirect.receipt_reference), 1);
}

#[tokio::test]
async fn test_slot_unavailable_short_circuits() {
    let h = TestHarness::new();
    h.scheduling.set_slot_unavailable(true);

    let err = h
        .coordinator
        .start_booking(&TestHarness::candidate(), TestHarness::draft())
        .await
        .unwrap_err();

    assert!(matches!(err, SagaError::SlotUnavailable));
    assert_eq!(h.records.booking_count(), 0);
    assert_eq!(h.payment.initiation_count(), 0);
}

#[tokio::test]
async fn test_refund_date_failure_does_not_block_confirmation() {
    let h = TestHarness::new();
    let candidate = TestHarness::candidate();

    let mut booking = h
        .coordinator
        .start_booking(&candidate, TestHarness::draft())
        .await
        .unwrap();
    h.coordinator
        .begin_payment(&mut booking, &candidate)
        .await
        .unwrap();

    h.records.set_fail_on_refund_calc(true);
    let outcome = h
        .coordinator
        .complete_payment(&mut booking, &candidate)
        .await
        .unwrap();

    assert_eq!(outcome, CompletionOutcome::BookingConfirmed);
    assert_eq!(booking.state(), JourneyState::Complete);
    assert!(booking.refund_eligibility_date().is_none());
}

#[tokio::test]
async fn test_notification_failure_never_fails_the_saga() {
    let h = TestHarness::new();
    let candidate = TestHarness::candidate();

    let mut booking = h
        .coordinator
        .start_booking(&candidate, TestHarness::draft())
        .await
        .unwrap();
    h.coordinator
        .begin_payment(&mut booking, &candidate)
        .await
        .unwrap();

    h.notifications.set_fail_on_send(true);
    let outcome = h
        .coordinator
        .complete_payment(&mut booking, &candidate)
        .await
        .unwrap();

    assert_eq!(outcome, CompletionOutcome::BookingConfirmed);
    assert_eq!(booking.state(), JourneyState::Complete);
}

#[tokio::test]
async fn test_independent_sagas_do_not_interfere() {
    let h = TestHarness::new();
    let first_candidate = TestHarness::candidate();
    let second_candidate = TestHarness::candidate();

    let mut first = h
        .coordinator
        .start_booking(&first_candidate, TestHarness::draft())
        .await
        .unwrap();
    let mut second = h
        .coordinator
        .start_booking(&second_candidate, TestHarness::draft())
        .await
        .unwrap();

    h.coordinator
        .begin_payment(&mut first, &first_candidate)
        .await
        .unwrap();
    h.coordinator
        .begin_payment(&mut second, &second_candidate)
        .await
        .unwrap();

    // First completes; second's candidate walks away.
    let first_outcome = h
        .coordinator
        .complete_payment(&mut first, &first_candidate)
        .await
        .unwrap();
    h.payment.set_confirm_code(ProviderCode::UserCancelled);
    let second_outcome = h
        .coordinator
        .complete_payment(&mut second, &second_candidate)
        .await
        .unwrap();

    assert_eq!(first_outcome, CompletionOutcome::BookingConfirmed);
    assert_eq!(second_outcome, CompletionOutcome::BookingCancelled);
    assert_eq!(first.state(), JourneyState::Complete);
    assert_eq!(second.state(), JourneyState::Abandoned);
    assert_eq!(h.scheduling.confirmed_count(), 1);
    assert_eq!(h.scheduling.released().len(), 1);
}

#[tokio::test]
async fn test_reschedule_moves_slot_and_releases_old() {
    let h = TestHarness::new();
    let candidate = TestHarness::candidate();

    let mut booking = h
        .coordinator
        .start_booking(&candidate, TestHarness::draft())
        .await
        .unwrap();
    let product_ref = booking.product_ref().unwrap().to_string();
    h.coordinator
        .begin_payment(&mut booking, &candidate)
        .await
        .unwrap();
    h.coordinator
        .complete_payment(&mut booking, &candidate)
        .await
        .unwrap();

    let new_slot = Utc.with_ymd_and_hms(2026, 11, 3, 14, 0, 0).unwrap();
    h.coordinator
        .reschedule(&mut booking, &candidate, new_slot, None)
        .await
        .unwrap();

    assert_eq!(booking.state(), JourneyState::Complete);
    assert_eq!(booking.slot(), new_slot);

    // Old slot released once, new reservation confirmed.
    assert_eq!(h.scheduling.released(), vec![(product_ref, Region::B)]);
    assert_eq!(h.scheduling.confirmed_count(), 2);

    // Record carries the new slot, kept its centre, and stayed Confirmed.
    let record_id = booking.record_id().unwrap();
    assert_eq!(h.records.slot_of(record_id), Some(new_slot));
    assert_eq!(h.records.centre_of(record_id), Some("C-052".to_string()));
    assert_eq!(h.records.status_of(record_id), Some(RecordStatus::Confirmed));

    // Confirmation email plus reschedule email.
    assert_eq!(h.notifications.sent_count(), 2);
}

#[tokio::test]
async fn test_reschedule_slot_unavailable_keeps_original() {
    let h = TestHarness::new();
    let candidate = TestHarness::candidate();

    let mut booking = h
        .coordinator
        .start_booking(&candidate, TestHarness::draft())
        .await
        .unwrap();
    let original_slot = booking.slot();
    h.coordinator
        .begin_payment(&mut booking, &candidate)
        .await
        .unwrap();
    h.coordinator
        .complete_payment(&mut booking, &candidate)
        .await
        .unwrap();

    h.scheduling.set_slot_unavailable(true);
    let new_slot = Utc.with_ymd_and_hms(2026, 11, 3, 14, 0, 0).unwrap();
    let err = h
        .coordinator
        .reschedule(&mut booking, &candidate, new_slot, None)
        .await
        .unwrap_err();

    assert!(matches!(err, SagaError::SlotUnavailable));
    assert_eq!(booking.state(), JourneyState::Complete);
    assert_eq!(booking.slot(), original_slot);

    // Nothing was released and the record went back to Confirmed.
    assert!(h.scheduling.released().is_empty());
    let record_id = booking.record_id().unwrap();
    assert_eq!(h.records.status_of(record_id), Some(RecordStatus::Confirmed));
}
