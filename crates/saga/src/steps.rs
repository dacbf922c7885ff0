//! Saga type and step identifiers used in logs and metrics.

/// The forward booking-confirmation saga.
pub const SAGA_TYPE_BOOKING: &str = "BookingConfirmation";

/// The reverse cancellation saga.
pub const SAGA_TYPE_CANCELLATION: &str = "BookingCancellation";

/// The reschedule saga.
pub const SAGA_TYPE_RESCHEDULE: &str = "BookingReschedule";

/// Step name: hold a slot in the scheduling system.
pub const STEP_RESERVE_SLOT: &str = "reserve_slot";

/// Step name: batch-create candidate and booking records.
pub const STEP_CREATE_RECORDS: &str = "create_records";

/// Step name: create the payable booking product.
pub const STEP_CREATE_PRODUCT: &str = "create_booking_product";

/// Step name: apply requested support options to the record.
pub const STEP_APPLY_SUPPORT: &str = "apply_support_options";

/// Step name: start the hosted card payment.
pub const STEP_INITIATE_PAYMENT: &str = "initiate_payment";

/// Step name: poll the gateway for the payment outcome.
pub const STEP_CONFIRM_PAYMENT: &str = "confirm_payment";

/// Step name: convert the held slot into a booked slot.
pub const STEP_CONFIRM_SLOT: &str = "confirm_slot";

/// Step name: mark the booking record Confirmed.
pub const STEP_MARK_CONFIRMED: &str = "mark_confirmed";

/// Step name: mark the booking record CancellationInProgress.
pub const STEP_MARK_CANCELLATION_IN_PROGRESS: &str = "mark_cancellation_in_progress";

/// Step name: refund or recognise income for a cancellation.
pub const STEP_SETTLE_PAYMENT: &str = "settle_payment";

/// Step name: release a held or booked slot.
pub const STEP_RELEASE_SLOT: &str = "release_slot";

/// Step name: mark the booking record Cancelled.
pub const STEP_MARK_CANCELLED: &str = "mark_cancelled";

/// Step name: send a notification email.
pub const STEP_SEND_NOTIFICATION: &str = "send_notification";

/// Step name: refresh the candidate's booking list.
pub const STEP_REFRESH_BOOKINGS: &str = "refresh_booking_list";
