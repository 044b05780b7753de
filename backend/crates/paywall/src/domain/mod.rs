//! Domain Layer
//!
//! Entities, repository traits, and pure domain services.
//! No dependency on infrastructure or HTTP.

pub mod catalog;
pub mod entities;
pub mod fingerprint;
pub mod payment;
pub mod repository;
