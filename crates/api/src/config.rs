//! Application configuration loaded from environment variables.

use std::time::Duration;

use saga::RetryPolicy;

/// Server and gateway configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `SCHEDULING_URL`, `RECORDS_URL`, `PAYMENT_URL`, `NOTIFICATION_URL` —
///   base URLs of the four remote systems
/// - `RETRY_MAX_ATTEMPTS`, `RETRY_BASE_DELAY_MS`, `RETRY_MAX_DELAY_MS` —
///   retry policy for transient gateway failures
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub scheduling_url: String,
    pub records_url: String,
    pub payment_url: String,
    pub notification_url: String,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_parsed("PORT", 3000),
            log_level: env_or("RUST_LOG", "info"),
            scheduling_url: env_or("SCHEDULING_URL", "http://localhost:8081"),
            records_url: env_or("RECORDS_URL", "http://localhost:8082"),
            payment_url: env_or("PAYMENT_URL", "http://localhost:8083"),
            notification_url: env_or("NOTIFICATION_URL", "http://localhost:8084"),
            retry_max_attempts: env_parsed("RETRY_MAX_ATTEMPTS", 3),
            retry_base_delay_ms: env_parsed("RETRY_BASE_DELAY_MS", 100),
            retry_max_delay_ms: env_parsed("RETRY_MAX_DELAY_MS", 30_000),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the retry policy the gateway clients should use.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_max_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
            Duration::from_millis(self.retry_max_delay_ms),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            scheduling_url: "http://localhost:8081".to_string(),
            records_url: "http://localhost:8082".to_string(),
            payment_url: "http://localhost:8083".to_string(),
            notification_url: "http://localhost:8084".to_string(),
            retry_max_attempts: 3,
            retry_base_delay_ms: 100,
            retry_max_delay_ms: 30_000,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
