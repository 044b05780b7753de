//! Hosted Checkout HTTP Client
//!
//! Thin client for a Stripe-style checkout API: form-encoded session
//! creation, session retrieval, and webhook signature verification.

use crate::domain::payment::{CheckoutItem, CheckoutSession, PaymentProvider, PaymentStatus};
use crate::error::{PaywallError, PaywallResult};
use serde::Deserialize;
use std::collections::HashMap;

const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Session body as the provider returns it
#[derive(Debug, Deserialize)]
struct SessionBody {
    id: String,
    url: Option<String>,
    payment_status: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
    customer_email: Option<String>,
}

impl SessionBody {
    fn into_session(self) -> CheckoutSession {
        let payment_status = match self.payment_status.as_str() {
            "paid" => PaymentStatus::Paid,
            "no_payment_required" => PaymentStatus::NoPaymentRequired,
            _ => PaymentStatus::Unpaid,
        };
        CheckoutSession {
            id: self.id,
            url: self.url,
            payment_status,
            metadata: self.metadata,
            customer_email: self.customer_email,
        }
    }
}

/// HTTP payment provider
pub struct HttpPaymentProvider {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl HttpPaymentProvider {
    pub fn new(secret_key: String) -> Self {
        Self::with_api_base(secret_key, DEFAULT_API_BASE.to_string())
    }

    /// Point at a non-default API host (local mock in tests)
    pub fn with_api_base(secret_key: String, api_base: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base,
            secret_key,
        }
    }
}

impl PaymentProvider for HttpPaymentProvider {
    async fn create_session(
        &self,
        item: &CheckoutItem,
        metadata: &HashMap<String, String>,
        success_url: &str,
        cancel_url: &str,
    ) -> PaywallResult<CheckoutSession> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), success_url.to_string()),
            ("cancel_url".to_string(), cancel_url.to_string()),
            (
                "line_items[0][price_data][currency]".to_string(),
                item.currency.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                item.amount_cents.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                item.name.clone(),
            ),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
        ];
        for (k, v) in metadata {
            form.push((format!("metadata[{k}]"), v.clone()));
        }

        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PaywallError::Payment(format!(
                "Session creation failed ({status}): {body}"
            )));
        }

        let body: SessionBody = response.json().await?;
        Ok(body.into_session())
    }

    async fn retrieve_session(&self, session_id: &str) -> PaywallResult<CheckoutSession> {
        let response = self
            .http
            .get(format!(
                "{}/v1/checkout/sessions/{session_id}",
                self.api_base
            ))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PaywallError::SessionNotFound);
        }
        if !response.status().is_success() {
            let status = response.status();
            return Err(PaywallError::Payment(format!(
                "Session retrieval failed ({status})"
            )));
        }

        let body: SessionBody = response.json().await?;
        Ok(body.into_session())
    }
}

/// A verified webhook delivery
#[derive(Debug)]
pub struct WebhookEvent {
    pub event_type: String,
    pub session: CheckoutSession,
}

#[derive(Debug, Deserialize)]
struct WebhookBody {
    #[serde(rename = "type")]
    event_type: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: SessionBody,
}

/// Verify a webhook signature and parse the event
///
/// The signature header carries a timestamp and one or more HMAC
/// candidates: `t=<unix>,v1=<hex>[,v1=<hex>...]`. The signed payload
/// is `{t}.{body}` keyed with the endpoint secret. Any failure along
/// the way is reported as the same error; callers never learn which
/// part of the check failed.
pub fn verify_webhook(
    payload: &str,
    sig_header: &str,
    secret: &str,
) -> PaywallResult<WebhookEvent> {
    let mut timestamp: Option<&str> = None;
    let mut candidates: Vec<&str> = Vec::new();
    for part in sig_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(PaywallError::InvalidWebhook)?;
    if candidates.is_empty() {
        return Err(PaywallError::InvalidWebhook);
    }

    let signed_payload = format!("{timestamp}.{payload}");
    let expected = platform::crypto::hmac_sha256(secret.as_bytes(), signed_payload.as_bytes());

    let verified = candidates.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| platform::crypto::constant_time_eq(&bytes, &expected))
            .unwrap_or(false)
    });
    if !verified {
        return Err(PaywallError::InvalidWebhook);
    }

    let body: WebhookBody =
        serde_json::from_str(payload).map_err(|_| PaywallError::InvalidWebhook)?;

    Ok(WebhookEvent {
        event_type: body.event_type,
        session: body.data.object.into_session(),
    })
}
