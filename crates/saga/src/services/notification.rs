//! Notification service trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::GatewayError;

/// A pre-rendered email. Content is built by the caller; this service
/// only delivers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub address: String,
    pub subject: String,
    pub body: String,
    /// Correlation reference carried through to delivery tracking.
    pub reference: String,
}

/// Fire-and-forget email delivery.
///
/// Every caller treats failure as best-effort: a lost notification never
/// aborts a saga.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Sends a single email.
    async fn send_email(&self, message: &EmailMessage) -> Result<(), GatewayError>;
}

#[async_trait]
impl<T: NotificationService + ?Sized> NotificationService for std::sync::Arc<T> {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), GatewayError> {
        (**self).send_email(message).await
    }
}

#[derive(Debug, Default)]
struct InMemoryNotificationState {
    sent: Vec<EmailMessage>,
    fail_on_send: bool,
}

/// In-memory notification service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationService {
    state: Arc<RwLock<InMemoryNotificationState>>,
}

impl InMemoryNotificationService {
    /// Creates a new in-memory notification service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sends fail with a server error.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.state.write().unwrap().fail_on_send = fail;
    }

    /// Returns the number of emails sent.
    pub fn sent_count(&self) -> usize {
        self.state.read().unwrap().sent.len()
    }

    /// Returns the emails sent so far.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.state.read().unwrap().sent.clone()
    }
}

#[async_trait]
impl NotificationService for InMemoryNotificationService {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_send {
            return Err(GatewayError::Server {
                status: 500,
                message: "notification service down".to_string(),
            });
        }

        state.sent.push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> EmailMessage {
        EmailMessage {
            address: "candidate@example.com".to_string(),
            subject: "Your theory test is booked".to_string(),
            body: "See you there.".to_string(),
            reference: "BK-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_records_message() {
        let service = InMemoryNotificationService::new();
        service.send_email(&message()).await.unwrap();

        assert_eq!(service.sent_count(), 1);
        assert_eq!(service.sent()[0].address, "candidate@example.com");
    }

    #[tokio::test]
    async fn test_send_failure_surfaces() {
        let service = InMemoryNotificationService::new();
        service.set_fail_on_send(true);

        assert!(service.send_email(&message()).await.is_err());
        assert_eq!(service.sent_count(), 0);
    }
}
