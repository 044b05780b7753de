//! Paywall Error Types
//!
//! This module provides paywall-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Paywall-specific result type alias
pub type PaywallResult<T> = Result<T, PaywallError>;

/// Paywall-specific error variants
///
/// These are domain-specific errors that map to appropriate HTTP status
/// codes and can be converted to `AppError` for unified error handling.
#[derive(Debug, Error)]
pub enum PaywallError {
    /// Caller exceeded the sliding-window ceiling; recoverable by
    /// waiting out the reported delay
    #[error("Rate limit exceeded")]
    RateLimited { retry_after_ms: i64 },

    /// Requested content id does not resolve
    #[error("Content not found")]
    ContentNotFound,

    /// Presented access key does not resolve
    #[error("Access key not found")]
    KeyNotFound,

    /// Paid content requested without a key that unlocks it
    #[error("Payment required for this content")]
    PaymentRequired,

    /// Checkout session exists but is not paid yet
    #[error("Checkout session is not paid")]
    PaymentNotConfirmed,

    /// Checkout session does not resolve at the provider
    #[error("Checkout session not found")]
    SessionNotFound,

    /// Key resolves and nominally grants access but fails the abuse
    /// predicate; terminal until administrative intervention
    #[error("Access key suspended for unusual usage volume")]
    KeySuspended,

    /// Checkout requested for content with price zero
    #[error("Content is free; no checkout needed")]
    ContentIsFree,

    /// Webhook payload or signature did not verify
    #[error("Webhook verification failed")]
    InvalidWebhook,

    /// Durable store error
    #[error("Store error: {0}")]
    Store(#[from] redis::RedisError),

    /// Record (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Payment provider round trip failed
    #[error("Payment provider error: {0}")]
    Payment(String),

    /// Required collaborator not configured; never degraded into
    /// granting access
    #[error("Service misconfigured: {0}")]
    Misconfigured(String),
}

impl PaywallError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            PaywallError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            PaywallError::ContentNotFound
            | PaywallError::KeyNotFound
            | PaywallError::SessionNotFound => StatusCode::NOT_FOUND,
            PaywallError::PaymentRequired | PaywallError::PaymentNotConfirmed => {
                StatusCode::PAYMENT_REQUIRED
            }
            PaywallError::KeySuspended => StatusCode::FORBIDDEN,
            PaywallError::ContentIsFree | PaywallError::InvalidWebhook => StatusCode::BAD_REQUEST,
            PaywallError::Store(_) | PaywallError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            PaywallError::Payment(_) => StatusCode::BAD_GATEWAY,
            PaywallError::Misconfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaywallError::RateLimited { .. } => ErrorKind::TooManyRequests,
            PaywallError::ContentNotFound
            | PaywallError::KeyNotFound
            | PaywallError::SessionNotFound => ErrorKind::NotFound,
            PaywallError::PaymentRequired | PaywallError::PaymentNotConfirmed => {
                ErrorKind::PaymentRequired
            }
            PaywallError::KeySuspended => ErrorKind::Forbidden,
            PaywallError::ContentIsFree | PaywallError::InvalidWebhook => ErrorKind::BadRequest,
            PaywallError::Store(_) | PaywallError::Serialization(_) => {
                ErrorKind::InternalServerError
            }
            PaywallError::Payment(_) => ErrorKind::BadGateway,
            PaywallError::Misconfigured(_) => ErrorKind::ServiceUnavailable,
        }
    }

    /// Machine-readable error code for response bodies
    pub fn code(&self) -> &'static str {
        match self {
            PaywallError::RateLimited { .. } => "RATE_LIMITED",
            PaywallError::ContentNotFound => "CONTENT_NOT_FOUND",
            PaywallError::KeyNotFound => "KEY_NOT_FOUND",
            PaywallError::PaymentRequired => "PAYMENT_REQUIRED",
            PaywallError::PaymentNotConfirmed => "PAYMENT_NOT_CONFIRMED",
            PaywallError::SessionNotFound => "SESSION_NOT_FOUND",
            PaywallError::KeySuspended => "KEY_SUSPENDED",
            PaywallError::ContentIsFree => "CONTENT_IS_FREE",
            PaywallError::InvalidWebhook => "INVALID_WEBHOOK",
            PaywallError::Store(_) | PaywallError::Serialization(_) => "INTERNAL_ERROR",
            PaywallError::Payment(_) => "PAYMENT_PROVIDER_ERROR",
            PaywallError::Misconfigured(_) => "SERVICE_MISCONFIGURED",
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            PaywallError::Store(e) => {
                tracing::error!(error = %e, "Paywall store error");
            }
            PaywallError::Serialization(e) => {
                tracing::error!(error = %e, "Paywall serialization error");
            }
            PaywallError::Payment(msg) => {
                tracing::error!(message = %msg, "Payment provider error");
            }
            PaywallError::Misconfigured(msg) => {
                tracing::error!(message = %msg, "Paywall misconfigured");
            }
            PaywallError::KeySuspended => {
                tracing::warn!("Suspended key refused");
            }
            PaywallError::RateLimited { retry_after_ms } => {
                tracing::warn!(retry_after_ms, "Rate limit exceeded");
            }
            PaywallError::InvalidWebhook => {
                tracing::warn!("Webhook verification failed");
            }
            _ => {
                tracing::debug!(error = %self, "Paywall error");
            }
        }
    }
}

impl From<PaywallError> for AppError {
    fn from(err: PaywallError) -> Self {
        let kind = err.kind();
        let message = err.to_string();
        AppError::new(kind, message)
    }
}

impl From<reqwest::Error> for PaywallError {
    fn from(err: reqwest::Error) -> Self {
        PaywallError::Payment(err.to_string())
    }
}

impl IntoResponse for PaywallError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status_code();

        // Machine-readable body; the rate-limit variant additionally
        // carries a Retry-After hint.
        let body = serde_json::json!({
            "error": self.code(),
            "message": self.to_string(),
            "retryAfterMs": match &self {
                PaywallError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
                _ => None,
            },
        });

        if let PaywallError::RateLimited { retry_after_ms } = self {
            let retry_after_secs = (retry_after_ms.max(0) as u64).div_ceil(1000);
            return (
                status,
                [(axum::http::header::RETRY_AFTER, retry_after_secs.to_string())],
                Json(body),
            )
                .into_response();
        }

        (status, Json(body)).into_response()
    }
}
