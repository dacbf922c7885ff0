//! Booking lifecycle saga for the theory-test booking service.
//!
//! A booking touches three independently-owned remote systems with no
//! shared transaction boundary: the scheduling system (slot capacity),
//! the customer-record service (the durable owner of booking entities),
//! and the payment service. This crate sequences those calls, retries
//! transient failures, and runs compensating actions on partial failure:
//!
//! Forward: reserve slot → create records → initiate payment → confirm
//! payment → confirm slot → mark confirmed → notify (best effort).
//!
//! Reverse: mark cancellation in progress → refund or recognise income →
//! release slot → mark cancelled → notify → refresh booking list, where
//! everything after the payment settlement is best-effort cleanup.

pub mod cancellation;
pub mod coordinator;
pub mod error;
pub mod outcome;
pub mod retry;
pub mod services;
pub mod steps;

pub use cancellation::CancellationCoordinator;
pub use coordinator::{BookingCoordinator, PaymentRedirect};
pub use error::SagaError;
pub use outcome::{CancellationOutcome, CompletionOutcome};
pub use retry::RetryPolicy;
pub use services::{
    BookingProduct, BookingRecordsService, BookingSummary, CreatedRecords, EmailMessage,
    GatewayError, InMemoryNotificationService, InMemoryPaymentService, InMemoryRecordsService,
    InMemorySchedulingService, NotificationService, PaymentConfirmation, PaymentInitiation,
    PaymentOutcome, PaymentService, ProviderCode, RefundOutcome, RefundRequest, SaleDetails,
    SchedulingService,
};
