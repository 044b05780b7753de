//! Application Layer - Use Cases
//!
//! Business logic orchestration. Use cases coordinate domain objects
//! and repositories to fulfill application requirements.

pub mod check_abuse;
pub mod checkout;
pub mod config;
pub mod issue_key;
pub mod trace_leak;
pub mod unlock_content;
