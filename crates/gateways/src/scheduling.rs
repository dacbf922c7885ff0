//! Scheduling system HTTP client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::BookingRef;
use domain::{Region, ReservationId, TestCentre, TestType};
use saga::services::scheduling::SchedulingService;
use saga::{GatewayError, RetryPolicy, retry};
use serde::Deserialize;
use serde_json::json;

use crate::http;

#[derive(Debug, Deserialize)]
struct ReserveResponse {
    reservation_id: String,
}

/// Client for the scheduling system's slot-capacity endpoints.
///
/// The provider signals a gone slot with HTTP 409; that is translated to
/// [`GatewayError::SlotUnavailable`] here so saga logic never inspects
/// provider status codes. Reserve and release are retried on transient
/// failure; confirm is not, because the provider's contract does not
/// promise a second confirm with the same reservation id is safe.
#[derive(Clone)]
pub struct SchedulingClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl SchedulingClient {
    /// Creates a client for the scheduling system at `base_url`.
    pub fn new(base_url: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            retry,
        }
    }

    fn slot_gone(err: GatewayError) -> GatewayError {
        match err {
            GatewayError::Request { status: 409, .. } => GatewayError::SlotUnavailable,
            other => other,
        }
    }
}

#[async_trait]
impl SchedulingService for SchedulingClient {
    async fn reserve(
        &self,
        centre: &TestCentre,
        test_type: TestType,
        slot: DateTime<Utc>,
    ) -> Result<ReservationId, GatewayError> {
        let url = format!("{}/slots/reserve", self.base_url);
        let body = json!({
            "centre_id": centre.id,
            "test_type": test_type.as_str(),
            "slot": slot.to_rfc3339(),
        });

        let response = retry::execute(&self.retry, "scheduling.reserve", || {
            let client = self.client.clone();
            let url = url.clone();
            let body = body.clone();
            async move { http::post_json(&client, &url, &body).await }
        })
        .await
        .map_err(Self::slot_gone)?;

        let reserved: ReserveResponse = http::decode_json(response).await?;
        Ok(ReservationId::new(reserved.reservation_id))
    }

    async fn confirm(
        &self,
        booking_ref: BookingRef,
        reservation_id: &ReservationId,
        region: Region,
    ) -> Result<(), GatewayError> {
        let url = format!("{}/bookings/confirm", self.base_url);
        let body = json!({
            "bookings": [{
                "booking_ref": booking_ref.to_string(),
                "reservation_id": reservation_id.as_str(),
            }],
            "region": region.as_str(),
        });

        // Single shot: an ambiguous timeout here must surface, not repeat.
        http::post_json(&self.client, &url, &body)
            .await
            .map_err(Self::slot_gone)?;
        Ok(())
    }

    async fn release(&self, product_ref: &str, region: Region) -> Result<(), GatewayError> {
        let url = format!(
            "{}/bookings/{}?region={}",
            self.base_url,
            product_ref,
            region.as_str()
        );

        retry::execute(&self.retry, "scheduling.release", || {
            let client = self.client.clone();
            let url = url.clone();
            async move { http::delete(&client, &url).await }
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> SchedulingClient {
        SchedulingClient::new(
            server.uri(),
            RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(10)),
        )
    }

    fn centre() -> TestCentre {
        TestCentre::new("C-014", "Leicester", Region::B)
    }

    fn slot() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 12, 9, 30, 0).unwrap()
    }

    #[tokio::test]
    async fn test_reserve_decodes_reservation_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/slots/reserve"))
            .and(body_partial_json(serde_json::json!({"centre_id": "C-014"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"reservation_id": "RSV-881"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let reservation_id = client(&server)
            .reserve(&centre(), TestType::Car, slot())
            .await
            .unwrap();
        assert_eq!(reservation_id.as_str(), "RSV-881");
    }

    #[tokio::test]
    async fn test_reserve_maps_409_to_slot_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/slots/reserve"))
            .respond_with(ResponseTemplate::new(409))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .reserve(&centre(), TestType::Car, slot())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::SlotUnavailable));
    }

    #[tokio::test]
    async fn test_reserve_retries_transient_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/slots/reserve"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/slots/reserve"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"reservation_id": "RSV-7"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let reservation_id = client(&server)
            .reserve(&centre(), TestType::Car, slot())
            .await
            .unwrap();
        assert_eq!(reservation_id.as_str(), "RSV-7");
    }

    #[tokio::test]
    async fn test_reserve_does_not_retry_client_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/slots/reserve"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad slot"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .reserve(&centre(), TestType::Car, slot())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Request { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_confirm_is_single_shot() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bookings/confirm"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .confirm(BookingRef::new(), &ReservationId::new("RSV-1"), Region::B)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Server { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_release_carries_region() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/bookings/PRD-0001"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).release("PRD-0001", Region::B).await.unwrap();
    }
}
