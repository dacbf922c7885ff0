//! Payment service HTTP client.

use async_trait::async_trait;
use common::CandidateId;
use domain::PersonReference;
use saga::services::payment::{
    IncomeRecognition, PaymentConfirmation, PaymentInitiation, PaymentService, ProviderCode,
    RefundOutcome, RefundRequest, SaleDetails,
};
use saga::GatewayError;
use serde::Deserialize;
use serde_json::json;

use crate::http;

#[derive(Debug, Deserialize)]
struct InitiateResponse {
    gateway_url: String,
    receipt_reference: String,
    payment_id: String,
}

#[derive(Debug, Deserialize)]
struct CodeResponse {
    code: u16,
    message: Option<String>,
}

/// Client for the payment provider's REST endpoints.
///
/// No operation here is auto-retried: initiation failures are surfaced to
/// the candidate to retry manually, and refunds or income recognitions
/// must never be re-sent blindly: a repeated refund is a double refund.
/// Provider result codes travel in the response body and are mapped to
/// [`ProviderCode`] without interpretation.
#[derive(Clone)]
pub struct PaymentClient {
    client: reqwest::Client,
    base_url: String,
}

impl PaymentClient {
    /// Creates a client for the payment service at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl PaymentService for PaymentClient {
    async fn initiate(
        &self,
        sale: &SaleDetails,
        candidate_id: CandidateId,
        person_reference: &PersonReference,
    ) -> Result<PaymentInitiation, GatewayError> {
        let url = format!("{}/payments", self.base_url);
        let body = json!({
            "payment_reference": sale.payment_reference,
            "total_amount": sale.total_amount,
            "description": sale.description,
            "candidate_id": candidate_id.to_string(),
            "person_reference": person_reference.as_str(),
        });

        let response = http::post_json(&self.client, &url, &body).await?;
        let initiated: InitiateResponse = http::decode_json(response).await?;

        Ok(PaymentInitiation {
            gateway_url: initiated.gateway_url,
            receipt_reference: initiated.receipt_reference,
            payment_id: initiated.payment_id,
        })
    }

    async fn confirm_complete(
        &self,
        receipt_reference: &str,
        candidate_id: CandidateId,
        person_reference: &PersonReference,
    ) -> Result<PaymentConfirmation, GatewayError> {
        let url = format!("{}/payments/{}/complete", self.base_url, receipt_reference);
        let body = json!({
            "candidate_id": candidate_id.to_string(),
            "person_reference": person_reference.as_str(),
        });

        let response = http::post_json(&self.client, &url, &body).await?;
        let confirmed: CodeResponse = http::decode_json(response).await?;

        Ok(PaymentConfirmation {
            code: ProviderCode::from(confirmed.code),
            message: confirmed.message,
        })
    }

    async fn request_refund(
        &self,
        refund: &RefundRequest,
        candidate_id: CandidateId,
        person_reference: &PersonReference,
    ) -> Result<RefundOutcome, GatewayError> {
        let url = format!("{}/refunds", self.base_url);
        let body = json!({
            "payment_reference": refund.payment_reference,
            "total_amount": refund.total_amount,
            "candidate_id": candidate_id.to_string(),
            "person_reference": person_reference.as_str(),
        });

        let response = http::post_json(&self.client, &url, &body).await?;
        let outcome: CodeResponse = http::decode_json(response).await?;

        Ok(RefundOutcome {
            code: ProviderCode::from(outcome.code),
            message: outcome.message,
        })
    }

    async fn recognise_income(
        &self,
        income: &IncomeRecognition,
        candidate_id: CandidateId,
        person_reference: &PersonReference,
    ) -> Result<(), GatewayError> {
        let url = format!("{}/income", self.base_url);
        let body = json!({
            "payment_reference": income.payment_reference,
            "total_amount": income.total_amount,
            "candidate_id": candidate_id.to_string(),
            "person_reference": person_reference.as_str(),
        });

        http::post_json(&self.client, &url, &body).await?;
        Ok(())
    }
}
