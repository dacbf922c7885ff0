//! Remote service traits, error taxonomy, and in-memory implementations
//! used by the saga coordinators and their tests.

mod error;
pub mod notification;
pub mod payment;
pub mod records;
pub mod scheduling;

pub use error::GatewayError;
pub use notification::{EmailMessage, InMemoryNotificationService, NotificationService};
pub use payment::{
    InMemoryPaymentService, IncomeRecognition, PaymentConfirmation, PaymentInitiation,
    PaymentOutcome, PaymentService, ProviderCode, RefundOutcome, RefundRequest, SaleDetails,
};
pub use records::{
    BookingProduct, BookingRecordsService, BookingSummary, CreatedRecords, InMemoryRecordsService,
};
pub use scheduling::{InMemorySchedulingService, SchedulingService};
