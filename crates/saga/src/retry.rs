//! Retry executor for outbound remote calls.
//!
//! Wraps any remote operation with a uniform retry policy: transient
//! failures (network errors, 5xx, 429) are retried with exponential
//! backoff, honouring a server-supplied retry hint when present; anything
//! else propagates immediately. Exhausting the policy propagates the last
//! error unchanged so that callers can still classify by status code.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::services::GatewayError;

/// Retry policy for remote calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Cap for computed delays and server retry hints.
    pub max_delay: Duration,
    /// Backoff multiplier per attempt.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempt limit and delays.
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            ..Self::default()
        }
    }

    /// Returns the backoff delay before retrying after `attempt` failures,
    /// preferring the server's retry hint when one was supplied. Both are
    /// capped at `max_delay`.
    pub fn delay_after(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        if let Some(hint) = hint {
            return hint.min(self.max_delay);
        }

        let exponent = attempt.saturating_sub(1).min(31);
        let backoff_ms = self.base_delay.as_millis() as f64 * self.multiplier.powi(exponent as i32);
        Duration::from_millis(backoff_ms as u64).min(self.max_delay)
    }
}

/// Executes `operation`, retrying transient failures per `policy`.
///
/// `label` names the call in logs and retry metrics. Backoff sleeps are
/// async; concurrent sagas are never blocked by another saga's retries.
pub async fn execute<F, Fut, T>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let mut attempt: u32 = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(call = label, attempt, "remote call succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_after(attempt, err.retry_after());
                tracing::warn!(
                    call = label,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying"
                );
                metrics::counter!("gateway_retries_total", "call" => label.to_string())
                    .increment(1);
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
