//! Presentation Layer - HTTP Interface
//!
//! Axum handlers, request/response DTOs, and router wiring.

pub mod dto;
pub mod handlers;
pub mod router;
