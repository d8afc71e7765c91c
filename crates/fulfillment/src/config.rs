//! Service configuration loaded from environment variables.

use std::time::Duration;

use crate::RetryPolicy;

const DEFAULT_CHECKOUT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_CART_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 5;

/// Fulfillment configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `CHECKOUT_MAX_ATTEMPTS`: attempts for checkout and lifecycle transitions (default: `3`, minimum `1`)
/// - `CART_MAX_ATTEMPTS`: attempts for cart, coupon and catalog writes (default: `5`, minimum `1`)
/// - `RETRY_BACKOFF_MS`: base delay between attempts, multiplied by the attempt number (default: `5`, `0` disables)
/// - `DATABASE_URL`: PostgreSQL connection string (optional)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillmentConfig {
    pub checkout_max_attempts: u32,
    pub cart_max_attempts: u32,
    pub retry_backoff: Duration,
    pub database_url: Option<String>,
    pub log_level: String,
}

impl FulfillmentConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parse_u32 = |name: &str, default: u32| {
            lookup(name)
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(default)
                .max(1)
        };

        Self {
            checkout_max_attempts: parse_u32("CHECKOUT_MAX_ATTEMPTS", DEFAULT_CHECKOUT_MAX_ATTEMPTS),
            cart_max_attempts: parse_u32("CART_MAX_ATTEMPTS", DEFAULT_CART_MAX_ATTEMPTS),
            retry_backoff: Duration::from_millis(
                lookup("RETRY_BACKOFF_MS")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(DEFAULT_RETRY_BACKOFF_MS),
            ),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        }
    }

    /// Retry policy for checkout and lifecycle transitions.
    pub fn checkout_retry(&self) -> RetryPolicy {
        RetryPolicy::new(self.checkout_max_attempts, self.retry_backoff)
    }

    /// Retry policy for single-document writes.
    pub fn cart_retry(&self) -> RetryPolicy {
        RetryPolicy::new(self.cart_max_attempts, self.retry_backoff)
    }
}

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self {
            checkout_max_attempts: DEFAULT_CHECKOUT_MAX_ATTEMPTS,
            cart_max_attempts: DEFAULT_CART_MAX_ATTEMPTS,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            database_url: None,
            log_level: "info".to_string(),
        }
    }
}
