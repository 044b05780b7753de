//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (random tokens, SHA-256, HMAC, Base64)
//! - Client identification (IP extraction behind reverse proxies)
//! - Sliding-window rate limiting

pub mod client;
pub mod crypto;
pub mod rate_limit;
