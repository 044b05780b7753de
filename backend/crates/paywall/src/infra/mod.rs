//! Infrastructure Layer
//!
//! Concrete implementations of the domain's repository and payment
//! provider traits: Redis and in-process stores, and the hosted
//! checkout HTTP client.

pub mod memory;
pub mod redis;
pub mod stripe;

pub use memory::MemoryKeyRepository;
pub use redis::RedisKeyRepository;
pub use stripe::{HttpPaymentProvider, WebhookEvent, verify_webhook};
