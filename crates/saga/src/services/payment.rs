//! Payment service trait, provider result codes, and in-memory
//! implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::CandidateId;
use domain::PersonReference;
use serde::{Deserialize, Serialize};

use super::GatewayError;

/// Result code returned by the payment provider.
///
/// The numeric values are the provider's contract and must be interpreted
/// exactly; unknown values are preserved rather than dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u16", into = "u16")]
pub enum ProviderCode {
    /// 801: payment completed.
    Success,
    /// 802: payment failed.
    Failed,
    /// 807: candidate cancelled at the gateway.
    UserCancelled,
    /// 809: refund accepted.
    RefundSuccess,
    /// 810: fault inside the payment gateway.
    GatewayFault,
    /// 828: fault in the provider's backing systems.
    SystemFault,
    /// Any code outside the documented set.
    Other(u16),
}

impl ProviderCode {
    /// Returns the numeric wire code.
    pub fn code(&self) -> u16 {
        match self {
            ProviderCode::Success => 801,
            ProviderCode::Failed => 802,
            ProviderCode::UserCancelled => 807,
            ProviderCode::RefundSuccess => 809,
            ProviderCode::GatewayFault => 810,
            ProviderCode::SystemFault => 828,
            ProviderCode::Other(code) => *code,
        }
    }
}

impl From<u16> for ProviderCode {
    fn from(code: u16) -> Self {
        match code {
            801 => ProviderCode::Success,
            802 => ProviderCode::Failed,
            807 => ProviderCode::UserCancelled,
            809 => ProviderCode::RefundSuccess,
            810 => ProviderCode::GatewayFault,
            828 => ProviderCode::SystemFault,
            other => ProviderCode::Other(other),
        }
    }
}

impl From<ProviderCode> for u16 {
    fn from(code: ProviderCode) -> Self {
        code.code()
    }
}

impl std::fmt::Display for ProviderCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Classified payment outcome.
///
/// Classification from [`ProviderCode`] happens exactly once, here; the
/// coordinators branch on this enum and never re-derive it downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Payment completed; confirm the slot and the booking.
    Success,
    /// Payment failed; the candidate may retry.
    Failed,
    /// Candidate walked away at the gateway.
    UserCancelled,
    /// Fault inside the payment gateway.
    GatewayFault,
    /// Fault in the provider's backing systems.
    SystemFault,
}

impl PaymentOutcome {
    /// Classifies a provider result code.
    ///
    /// Codes outside the documented set read as a generic failure: the
    /// attempt did not complete, and the candidate may retry.
    pub fn classify(code: ProviderCode) -> Self {
        match code {
            ProviderCode::Success => PaymentOutcome::Success,
            ProviderCode::UserCancelled => PaymentOutcome::UserCancelled,
            ProviderCode::GatewayFault => PaymentOutcome::GatewayFault,
            ProviderCode::SystemFault => PaymentOutcome::SystemFault,
            ProviderCode::Failed | ProviderCode::RefundSuccess | ProviderCode::Other(_) => {
                PaymentOutcome::Failed
            }
        }
    }
}

/// Sale details presented to the payment provider when starting a payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleDetails {
    /// Reference the provider correlates this sale under.
    pub payment_reference: String,
    /// Two-decimal amount string, e.g. `"23.00"`.
    pub total_amount: String,
    /// Line description shown on the hosted payment page.
    pub description: String,
}

/// A started hosted card payment.
#[derive(Debug, Clone)]
pub struct PaymentInitiation {
    /// Where to redirect the candidate to enter card details.
    pub gateway_url: String,
    /// Receipt reference for the completion poll after redirect-back.
    pub receipt_reference: String,
    /// Provider-side payment id.
    pub payment_id: String,
}

/// Result of the completion poll.
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub code: ProviderCode,
    pub message: Option<String>,
}

/// Refund request for a cancelled, refund-eligible booking.
#[derive(Debug, Clone)]
pub struct RefundRequest {
    pub payment_reference: String,
    /// Two-decimal amount string, e.g. `"23.00"`.
    pub total_amount: String,
}

/// Provider's answer to a refund request.
#[derive(Debug, Clone)]
pub struct RefundOutcome {
    pub code: ProviderCode,
    pub message: Option<String>,
}

/// Income recognition for a cancelled booking whose charge is kept.
#[derive(Debug, Clone)]
pub struct IncomeRecognition {
    pub payment_reference: String,
    /// Two-decimal amount string, e.g. `"23.00"`.
    pub total_amount: String,
}

/// Operations against the payment provider.
///
/// The person reference is never absent on the wire: callers derive one
/// from the candidate id when the candidate record holds none. Financial
/// operations are never blindly retried; a failed refund is surfaced, not
/// re-sent.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Begins a hosted card payment. The caller redirects the candidate to
    /// the returned gateway URL.
    async fn initiate(
        &self,
        sale: &SaleDetails,
        candidate_id: CandidateId,
        person_reference: &PersonReference,
    ) -> Result<PaymentInitiation, GatewayError>;

    /// Polls the provider for the outcome after redirect-back. Safe to
    /// call repeatedly with the same receipt reference.
    async fn confirm_complete(
        &self,
        receipt_reference: &str,
        candidate_id: CandidateId,
        person_reference: &PersonReference,
    ) -> Result<PaymentConfirmation, GatewayError>;

    /// Requests a refund for a refund-eligible cancellation.
    async fn request_refund(
        &self,
        refund: &RefundRequest,
        candidate_id: CandidateId,
        person_reference: &PersonReference,
    ) -> Result<RefundOutcome, GatewayError>;

    /// Recognises the income for a cancellation that keeps the charge.
    async fn recognise_income(
        &self,
        income: &IncomeRecognition,
        candidate_id: CandidateId,
        person_reference: &PersonReference,
    ) -> Result<(), GatewayError>;
}

#[async_trait]
impl<T: PaymentService + ?Sized> PaymentService for std::sync::Arc<T> {
    async fn initiate(
        &self,
        sale: &SaleDetails,
        candidate_id: CandidateId,
        person_reference: &PersonReference,
    ) -> Result<PaymentInitiation, GatewayError> {
        (**self).initiate(sale, candidate_id, person_reference).await
    }

    async fn confirm_complete(
        &self,
        receipt_reference: &str,
        candidate_id: CandidateId,
        person_reference: &PersonReference,
    ) -> Result<PaymentConfirmation, GatewayError> {
        (**self)
            .confirm_complete(receipt_reference, candidate_id, person_reference)
            .await
    }

    async fn request_refund(
        &self,
        refund: &RefundRequest,
        candidate_id: CandidateId,
        person_reference: &PersonReference,
    ) -> Result<RefundOutcome, GatewayError> {
        (**self)
            .request_refund(refund, candidate_id, person_reference)
            .await
    }

    async fn recognise_income(
        &self,
        income: &IncomeRecognition,
        candidate_id: CandidateId,
        person_reference: &PersonReference,
    ) -> Result<(), GatewayError> {
        (**self)
            .recognise_income(income, candidate_id, person_reference)
            .await
    }
}

#[derive(Debug)]
struct InMemoryPaymentState {
    confirm_code: ProviderCode,
    refund_code: ProviderCode,
    initiations: u32,
    confirm_calls: HashMap<String, u32>,
    refunds: Vec<RefundRequest>,
    income_recognitions: Vec<IncomeRecognition>,
    person_references: Vec<String>,
    fail_on_initiate: Option<GatewayError>,
    fail_on_confirm: bool,
    fail_on_refund: bool,
    fail_on_recognise_income: bool,
}

impl Default for InMemoryPaymentState {
    fn default() -> Self {
        Self {
            confirm_code: ProviderCode::Success,
            refund_code: ProviderCode::RefundSuccess,
            initiations: 0,
            confirm_calls: HashMap::new(),
            refunds: Vec::new(),
            income_recognitions: Vec::new(),
            person_references: Vec::new(),
            fail_on_initiate: None,
            fail_on_confirm: false,
            fail_on_refund: false,
            fail_on_recognise_income: false,
        }
    }
}

/// In-memory payment service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentService {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentService {
    /// Creates a new in-memory payment service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the provider code the completion poll reports.
    pub fn set_confirm_code(&self, code: ProviderCode) {
        self.state.write().unwrap().confirm_code = code;
    }

    /// Sets the provider code refund requests report.
    pub fn set_refund_code(&self, code: ProviderCode) {
        self.state.write().unwrap().refund_code = code;
    }

    /// Makes initiate fail with the given classified error.
    pub fn set_fail_on_initiate(&self, error: Option<GatewayError>) {
        self.state.write().unwrap().fail_on_initiate = error;
    }

    /// Makes the completion poll fail at the transport level.
    pub fn set_fail_on_confirm(&self, fail: bool) {
        self.state.write().unwrap().fail_on_confirm = fail;
    }

    /// Makes refund requests fail at the transport level.
    pub fn set_fail_on_refund(&self, fail: bool) {
        self.state.write().unwrap().fail_on_refund = fail;
    }

    /// Makes income recognition fail at the transport level.
    pub fn set_fail_on_recognise_income(&self, fail: bool) {
        self.state.write().unwrap().fail_on_recognise_income = fail;
    }

    /// Returns how many payments have been initiated.
    pub fn initiation_count(&self) -> u32 {
        self.state.read().unwrap().initiations
    }

    /// Returns how many times the completion poll ran for a receipt.
    pub fn confirm_calls(&self, receipt_reference: &str) -> u32 {
        self.state
            .read()
            .unwrap()
            .confirm_calls
            .get(receipt_reference)
            .copied()
            .unwrap_or(0)
    }

    /// Returns the refund requests received.
    pub fn refunds(&self) -> Vec<RefundRequest> {
        self.state.read().unwrap().refunds.clone()
    }

    /// Returns the income recognitions received.
    pub fn income_recognitions(&self) -> Vec<IncomeRecognition> {
        self.state.read().unwrap().income_recognitions.clone()
    }

    /// Returns every person reference presented, in call order.
    pub fn person_references(&self) -> Vec<String> {
        self.state.read().unwrap().person_references.clone()
    }
}

#[async_trait]
impl PaymentService for InMemoryPaymentService {
    async fn initiate(
        &self,
        _sale: &SaleDetails,
        _candidate_id: CandidateId,
        person_reference: &PersonReference,
    ) -> Result<PaymentInitiation, GatewayError> {
        let mut state = self.state.write().unwrap();

        if let Some(error) = &state.fail_on_initiate {
            return Err(error.clone());
        }

        state.initiations += 1;
        state
            .person_references
            .push(person_reference.as_str().to_string());

        let n = state.initiations;
        Ok(PaymentInitiation {
            gateway_url: format!("https://pay.example.com/session/{n}"),
            receipt_reference: format!("RCPT-{n:04}"),
            payment_id: format!("PAY-{n:04}"),
        })
    }

    async fn confirm_complete(
        &self,
        receipt_reference: &str,
        _candidate_id: CandidateId,
        person_reference: &PersonReference,
    ) -> Result<PaymentConfirmation, GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_confirm {
            return Err(GatewayError::Network("connection reset".to_string()));
        }

        *state
            .confirm_calls
            .entry(receipt_reference.to_string())
            .or_insert(0) += 1;
        state
            .person_references
            .push(person_reference.as_str().to_string());

        Ok(PaymentConfirmation {
            code: state.confirm_code,
            message: None,
        })
    }

    async fn request_refund(
        &self,
        refund: &RefundRequest,
        _candidate_id: CandidateId,
        person_reference: &PersonReference,
    ) -> Result<RefundOutcome, GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_refund {
            return Err(GatewayError::Server {
                status: 500,
                message: "refund endpoint down".to_string(),
            });
        }

        state.refunds.push(refund.clone());
        state
            .person_references
            .push(person_reference.as_str().to_string());

        Ok(RefundOutcome {
            code: state.refund_code,
            message: None,
        })
    }

    async fn recognise_income(
        &self,
        income: &IncomeRecognition,
        _candidate_id: CandidateId,
        person_reference: &PersonReference,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_recognise_income {
            return Err(GatewayError::Server {
                status: 500,
                message: "income recognition down".to_string(),
            });
        }

        state.income_recognitions.push(income.clone());
        state
            .person_references
            .push(person_reference.as_str().to_string());
        Ok(())
    }
}
