//! Customer-record service HTTP client.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::{BookingRef, CandidateId};
use domain::{Booking, Candidate, RecordStatus, Region, StatusOrigin};
use saga::services::records::{
    BookingProduct, BookingRecordsService, BookingSummary, CreatedRecords,
};
use saga::{GatewayError, RetryPolicy, retry};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::http;

#[derive(Debug, Deserialize)]
struct BatchCreateResponse {
    candidate_id: Uuid,
    licence_id: Uuid,
    booking_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct ProductResponse {
    product_id: Uuid,
    product_ref: String,
}

#[derive(Debug, Deserialize)]
struct WorkingDaysResponse {
    eligible_until: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct BookingRow {
    booking_id: Uuid,
    booking_ref: Uuid,
    slot: DateTime<Utc>,
    status_code: u8,
}

/// Client for the customer-record service.
///
/// Writes go through the service's batch endpoint where the operation
/// spans entities (candidate + licence + booking in one round trip).
/// Status updates are idempotent on the service side, so every operation
/// here is wrapped in the retry executor; the duplicate-create risk on a
/// retried batch create is a known gap, not guarded here.
#[derive(Clone)]
pub struct RecordsClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl RecordsClient {
    /// Creates a client for the customer-record service at `base_url`.
    pub fn new(base_url: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            retry,
        }
    }

    async fn post_retrying(
        &self,
        label: &str,
        url: String,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, GatewayError> {
        retry::execute(&self.retry, label, || {
            let client = self.client.clone();
            let url = url.clone();
            let body = body.clone();
            async move { http::post_json(&client, &url, &body).await }
        })
        .await
    }
}

#[async_trait]
impl BookingRecordsService for RecordsClient {
    async fn create_candidate_and_booking(
        &self,
        candidate: &Candidate,
        booking: &Booking,
    ) -> Result<CreatedRecords, GatewayError> {
        let url = format!("{}/batch", self.base_url);
        let body = json!({
            "candidate": {
                "first_name": candidate.first_name,
                "surname": candidate.surname,
                "licence_number": candidate.licence_number.as_str(),
                "email": candidate.email,
                "address": {
                    "line_1": candidate.address.line_1,
                    "line_2": candidate.address.line_2,
                    "city": candidate.address.city,
                    "postcode": candidate.address.postcode,
                },
                "person_reference": candidate.payment_person_reference().as_str(),
            },
            "booking": {
                "booking_ref": booking.booking_ref().to_string(),
                "centre_id": booking.centre().id,
                "test_type": booking.test_type().as_str(),
                "slot": booking.slot().to_rfc3339(),
                "price_pence": booking.price().pence(),
                "status_code": RecordStatus::Draft.code(),
            },
        });

        let response = self
            .post_retrying("records.create_candidate_and_booking", url, body)
            .await?;
        let created: BatchCreateResponse = http::decode_json(response).await?;

        Ok(CreatedRecords {
            candidate_record_id: created.candidate_id,
            licence_record_id: created.licence_id,
            booking_record_id: created.booking_id,
        })
    }

    async fn create_booking_product(
        &self,
        booking_record_id: Uuid,
        booking: &Booking,
    ) -> Result<BookingProduct, GatewayError> {
        let url = format!(
            "{}/bookings/{}/products",
            self.base_url, booking_record_id
        );
        let body = json!({
            "test_type": booking.test_type().as_str(),
            "price_pence": booking.price().pence(),
        });

        let response = self
            .post_retrying("records.create_booking_product", url, body)
            .await?;
        let product: ProductResponse = http::decode_json(response).await?;

        Ok(BookingProduct {
            product_id: product.product_id,
            product_ref: product.product_ref,
        })
    }

    async fn update_booking_status(
        &self,
        booking_record_id: Uuid,
        status: RecordStatus,
        origin: StatusOrigin,
    ) -> Result<(), GatewayError> {
        let url = format!("{}/bookings/{}/status", self.base_url, booking_record_id);
        let body = json!({
            "status_code": status.code(),
            "origin": origin.as_str(),
        });

        self.post_retrying("records.update_booking_status", url, body)
            .await?;
        Ok(())
    }

    async fn set_voiceover(
        &self,
        booking_record_id: Uuid,
        enabled: bool,
    ) -> Result<(), GatewayError> {
        let url = format!("{}/bookings/{}/voiceover", self.base_url, booking_record_id);
        self.post_retrying("records.set_voiceover", url, json!({ "enabled": enabled }))
            .await?;
        Ok(())
    }

    async fn set_extended_time(
        &self,
        booking_record_id: Uuid,
        enabled: bool,
    ) -> Result<(), GatewayError> {
        let url = format!(
            "{}/bookings/{}/extended-time",
            self.base_url, booking_record_id
        );
        self.post_retrying(
            "records.set_extended_time",
            url,
            json!({ "enabled": enabled }),
        )
        .await?;
        Ok(())
    }

    async fn reschedule_and_confirm(
        &self,
        booking_record_id: Uuid,
        new_slot: DateTime<Utc>,
        centre_id: Option<&str>,
    ) -> Result<(), GatewayError> {
        let url = format!(
            "{}/bookings/{}/reschedule",
            self.base_url, booking_record_id
        );
        let body = json!({
            "slot": new_slot.to_rfc3339(),
            "centre_id": centre_id,
            "status_code": RecordStatus::Confirmed.code(),
        });

        self.post_retrying("records.reschedule_and_confirm", url, body)
            .await?;
        Ok(())
    }

    async fn calculate_refund_eligibility_date(
        &self,
        test_date: NaiveDate,
        region: Region,
    ) -> Result<NaiveDate, GatewayError> {
        let url = format!(
            "{}/working-days?test_date={}&region={}",
            self.base_url,
            test_date,
            region.as_str()
        );

        let response = retry::execute(&self.retry, "records.working_days", || {
            let client = self.client.clone();
            let url = url.clone();
            async move { http::get(&client, &url).await }
        })
        .await?;

        let calculated: WorkingDaysResponse = http::decode_json(response).await?;
        Ok(calculated.eligible_until)
    }

    async fn store_refund_eligibility_date(
        &self,
        booking_record_id: Uuid,
        date: NaiveDate,
    ) -> Result<(), GatewayError> {
        let url = format!(
            "{}/bookings/{}/refund-eligibility",
            self.base_url, booking_record_id
        );
        self.post_retrying(
            "records.store_refund_eligibility_date",
            url,
            json!({ "eligible_until": date }),
        )
        .await?;
        Ok(())
    }

    async fn mark_cancelled(
        &self,
        booking_record_id: Uuid,
        product_id: Uuid,
        origin: StatusOrigin,
    ) -> Result<(), GatewayError> {
        let url = format!("{}/bookings/{}/cancel", self.base_url, booking_record_id);
        let body = json!({
            "product_id": product_id,
            "status_code": RecordStatus::Cancelled.code(),
            "origin": origin.as_str(),
        });

        self.post_retrying("records.mark_cancelled", url, body)
            .await?;
        Ok(())
    }

    async fn list_candidate_bookings(
        &self,
        candidate_id: CandidateId,
    ) -> Result<Vec<BookingSummary>, GatewayError> {
        let url = format!("{}/candidates/{}/bookings", self.base_url, candidate_id);

        let response = retry::execute(&self.retry, "records.list_candidate_bookings", || {
            let client = self.client.clone();
            let url = url.clone();
            async move { http::get(&client, &url).await }
        })
        .await?;

        let rows: Vec<BookingRow> = http::decode_json(response).await?;
        rows.into_iter()
            .map(|row| {
                let status = RecordStatus::from_code(row.status_code).ok_or_else(|| {
                    GatewayError::Decode(format!("unknown status code {}", row.status_code))
                })?;
                Ok(BookingSummary {
                    booking_record_id: row.booking_id,
                    booking_ref: BookingRef::from_uuid(row.booking_ref),
                    slot: row.slot,
                    status,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use domain::{Address, BookingDraft, LicenceNumber, TestCentre, TestType};
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> RecordsClient {
        RecordsClient::new(
            server.uri(),
            RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(10)),
        )
    }

    fn candidate() -> Candidate {
        Candidate {
            id: CandidateId::new(),
            first_name: "Nina".to_string(),
            surname: "Doyle".to_string(),
            licence_number: LicenceNumber::new("DOYLE061102N97EF"),
            email: "nina.doyle@example.com".to_string(),
            address: Address::new("9 Abbey Road", None, "Derby", "DE1 3QT"),
            person_reference: None,
        }
    }

    fn booking() -> Booking {
        Booking::draft(BookingDraft::new(
            TestCentre::new("C-021", "Derby", Region::B),
            TestType::Car,
            Utc.with_ymd_and_hms(2026, 10, 12, 9, 30, 0).unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_batch_create_decodes_all_identifiers() {
        let server = MockServer::start().await;
        let candidate_id = Uuid::new_v4();
        let licence_id = Uuid::new_v4();
        let booking_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path("/batch"))
            .and(body_partial_json(
                serde_json::json!({"booking": {"status_code": 1}}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidate_id": candidate_id,
                "licence_id": licence_id,
                "booking_id": booking_id,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let created = client(&server)
            .create_candidate_and_booking(&candidate(), &booking())
            .await
            .unwrap();

        assert_eq!(created.candidate_record_id, candidate_id);
        assert_eq!(created.licence_record_id, licence_id);
        assert_eq!(created.booking_record_id, booking_id);
    }

    #[tokio::test]
    async fn test_status_update_sends_wire_code() {
        let server = MockServer::start().await;
        let booking_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path_regex(r"^/bookings/[0-9a-f-]+/status$"))
            .and(body_partial_json(serde_json::json!({"status_code": 4})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .update_booking_status(
                booking_id,
                RecordStatus::CancellationInProgress,
                StatusOrigin::CandidateOnline,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_status_update_retries_rate_limit() {
        let server = MockServer::start().await;
        let booking_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path_regex(r"^/bookings/[0-9a-f-]+/status$"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/bookings/[0-9a-f-]+/status$"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .update_booking_status(
                booking_id,
                RecordStatus::Confirmed,
                StatusOrigin::CandidateOnline,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_working_days_decodes_date() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/working-days"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"eligible_until": "2026-10-09"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let date = client(&server)
            .calculate_refund_eligibility_date(
                NaiveDate::from_ymd_opt(2026, 10, 12).unwrap(),
                Region::B,
            )
            .await
            .unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 10, 9).unwrap());
    }

    #[tokio::test]
    async fn test_list_maps_status_codes() {
        let server = MockServer::start().await;
        let candidate_id = CandidateId::new();

        Mock::given(method("GET"))
            .and(path_regex(r"^/candidates/[0-9a-f-]+/bookings$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "booking_id": Uuid::new_v4(),
                "booking_ref": Uuid::new_v4(),
                "slot": "2026-10-12T09:30:00Z",
                "status_code": 2,
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let bookings = client(&server)
            .list_candidate_bookings(candidate_id)
            .await
            .unwrap();
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0].status, RecordStatus::Confirmed);
    }
}
