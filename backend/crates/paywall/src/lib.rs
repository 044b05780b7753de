//! Paywall Backend Module
//!
//! API-protection core for the paid-content catalog: every protected
//! read is gated by a sliding-window rate limit, authorized against an
//! access-key registry, and delivered with an invisible fingerprint
//! for leak attribution.
//!
//! Clean Architecture structure:
//! - `domain/` - Business logic, entities, repository traits
//! - `application/` - Use cases
//! - `infra/` - Storage and payment-provider implementations
//! - `presentation/` - HTTP handlers
//!
//! ## Security Model
//! - Access keys are opaque bearer tokens; authorization is solely via
//!   registry lookup, never via token structure
//! - Key issuance is idempotent per checkout session (retried client
//!   calls and double webhook delivery mint exactly one key)
//! - Delivered paid content carries a zero-width fingerprint of the
//!   presenting key, so leaked copies can be attributed offline
//! - Fingerprinting survives copy-paste, not deliberate stripping of
//!   non-printing characters

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::PaywallConfig;
pub use domain::fingerprint;
pub use error::{PaywallError, PaywallResult};
pub use infra::memory::MemoryKeyRepository;
pub use infra::redis::RedisKeyRepository;
pub use infra::stripe::HttpPaymentProvider;
pub use presentation::router::paywall_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult, OptionExt, ResultExt},
    kind::ErrorKind,
};

#[cfg(test)]
mod tests;
