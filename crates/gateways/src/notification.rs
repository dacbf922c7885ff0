//! Notification service HTTP client.

use async_trait::async_trait;
use saga::GatewayError;
use saga::services::notification::{EmailMessage, NotificationService};
use serde_json::json;

use crate::http;

/// Client for the email notification service.
///
/// Single fire-and-forget operation; callers treat any failure as
/// best-effort, so there is no retry wrapping here.
#[derive(Clone)]
pub struct NotificationClient {
    client: reqwest::Client,
    base_url: String,
}

impl NotificationClient {
    /// Creates a client for the notification service at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl NotificationService for NotificationClient {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), GatewayError> {
        let url = format!("{}/email", self.base_url);
        let body = json!({
            "address": message.address,
            "subject": message.subject,
            "body": message.body,
            "reference": message.reference,
        });

        http::post_json(&self.client, &url, &body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_send_posts_rendered_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/email"))
            .and(body_partial_json(
                serde_json::json!({"address": "megan.price@example.com"}),
            ))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        NotificationClient::new(server.uri())
            .send_email(&EmailMessage {
                address: "megan.price@example.com".to_string(),
                subject: "Your theory test booking is confirmed".to_string(),
                body: "Booking reference: BK-1".to_string(),
                reference: "BK-1".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_failure_classifies_for_caller_to_swallow() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/email"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let err = NotificationClient::new(server.uri())
            .send_email(&EmailMessage {
                address: "x@example.com".to_string(),
                subject: "s".to_string(),
                body: "b".to_string(),
                reference: "r".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Server { status: 500, .. }));
    }
}
