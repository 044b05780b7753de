//! Request/Response DTOs

use crate::domain::catalog::{ContentKind, ContentRecord};
use serde::{Deserialize, Serialize};

/// Query parameters for content endpoints
#[derive(Debug, Deserialize)]
pub struct ContentQuery {
    /// Access key, as an alternative to the `x-api-key` header
    pub key: Option<String>,
}

/// Query parameters for search
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// One search hit; never carries the body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSummary {
    pub id: String,
    pub kind: ContentKind,
    pub title: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub price_cents: u32,
    pub free: bool,
}

impl From<&ContentRecord> for ContentSummary {
    fn from(record: &ContentRecord) -> Self {
        Self {
            id: record.id.clone(),
            kind: record.kind,
            title: record.title.clone(),
            summary: record.summary.clone(),
            tags: record.tags.clone(),
            price_cents: record.price_cents,
            free: record.is_free(),
        }
    }
}

/// Response for GET /content
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<ContentSummary>,
}

/// Response for GET /content/{id}
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentResponse {
    pub id: String,
    pub kind: ContentKind,
    pub title: String,
    pub body: String,
}

/// Request for POST /checkout
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub content_id: String,
}

/// Response for POST /checkout
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: String,
    pub checkout_url: Option<String>,
}

/// Request for POST /checkout/confirm
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub session_id: String,
}

/// Response carrying an issued key
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyResponse {
    pub key: String,
    pub content_ids: Vec<String>,
    pub created_at_ms: i64,
}

/// Request for POST /admin/trace
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceRequest {
    pub text: String,
}

/// Response for POST /admin/trace
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceResponse {
    pub found: bool,
    pub identity: Option<String>,
    pub content_ids: Vec<String>,
    pub session_id: Option<String>,
}
