//! Application Configuration
//!
//! Configuration for the paywall application layer.

use crate::domain::entities::TOKEN_PREFIX;
use platform::rate_limit::RateLimitConfig;
use std::time::Duration;

/// Paywall application configuration
#[derive(Debug, Clone)]
pub struct PaywallConfig {
    /// Prefix prepended to every issued token
    pub token_prefix: String,
    /// Random characters after the prefix
    pub token_len: usize,
    /// Access key lifetime in the durable store
    pub key_ttl: Duration,
    /// Entries retained per key in the usage log
    pub usage_log_cap: usize,
    /// Short abuse window
    pub abuse_short_window: Duration,
    /// Accesses tolerated within the short window
    pub abuse_short_limit: u64,
    /// Long abuse window
    pub abuse_long_window: Duration,
    /// Accesses tolerated within the long window
    pub abuse_long_limit: u64,
    /// Per-client request ceilings
    pub rate_limit: RateLimitConfig,
    /// Where the provider redirects after payment
    pub success_url: String,
    /// Where the provider redirects on cancel
    pub cancel_url: String,
    /// Checkout currency code
    pub currency: String,
    /// Shared secret for webhook signature verification
    pub webhook_secret: Option<String>,
}

impl Default for PaywallConfig {
    fn default() -> Self {
        Self {
            token_prefix: TOKEN_PREFIX.to_string(),
            token_len: 32,
            key_ttl: Duration::from_secs(365 * 24 * 3600),
            usage_log_cap: 50,
            abuse_short_window: Duration::from_secs(600),
            abuse_short_limit: 50,
            abuse_long_window: Duration::from_secs(3600),
            abuse_long_limit: 200,
            rate_limit: RateLimitConfig::default(),
            success_url: "http://localhost:3000/purchase/success?session_id={CHECKOUT_SESSION_ID}"
                .to_string(),
            cancel_url: "http://localhost:3000/purchase/cancelled".to_string(),
            currency: "usd".to_string(),
            webhook_secret: None,
        }
    }
}

impl PaywallConfig {
    /// Create config for development (no webhook secret required)
    pub fn development() -> Self {
        Self::default()
    }

    pub fn abuse_short_window_ms(&self) -> i64 {
        self.abuse_short_window.as_millis() as i64
    }

    pub fn abuse_long_window_ms(&self) -> i64 {
        self.abuse_long_window.as_millis() as i64
    }

    pub fn key_ttl_secs(&self) -> u64 {
        self.key_ttl.as_secs()
    }
}
