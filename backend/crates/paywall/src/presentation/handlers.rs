//! HTTP Handlers

use crate::application::checkout::{ConfirmPurchaseUseCase, CreateCheckoutUseCase};
use crate::application::config::PaywallConfig;
use crate::application::trace_leak::TraceLeakUseCase;
use crate::application::unlock_content::{UnlockContentUseCase, UnlockRequest};
use crate::domain::catalog::Catalog;
use crate::domain::payment::PaymentProvider;
use crate::domain::repository::KeyRepository;
use crate::error::{PaywallError, PaywallResult};
use crate::infra::stripe;
use crate::presentation::dto::{
    CheckoutRequest, CheckoutResponse, ConfirmRequest, ContentQuery, ContentResponse, KeyResponse,
    SearchQuery, SearchResponse, TraceRequest, TraceResponse,
};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use platform::client::{client_key, extract_client_ip};
use platform::rate_limit::SlidingWindowLimiter;
use std::sync::Arc;

const API_KEY_HEADER: &str = "x-api-key";

/// Shared state for paywall handlers
pub struct PaywallAppState<R, P>
where
    R: KeyRepository + Send + Sync + 'static,
    P: PaymentProvider + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub payments: Arc<P>,
    pub catalog: Arc<Catalog>,
    pub limiter: Arc<SlidingWindowLimiter>,
    pub config: Arc<PaywallConfig>,
}

// Manual impl: Arc fields clone regardless of R and P
impl<R, P> Clone for PaywallAppState<R, P>
where
    R: KeyRepository + Send + Sync + 'static,
    P: PaymentProvider + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            payments: Arc::clone(&self.payments),
            catalog: Arc::clone(&self.catalog),
            limiter: Arc::clone(&self.limiter),
            config: Arc::clone(&self.config),
        }
    }
}

fn presented_key(headers: &HeaderMap, query_key: Option<String>) -> Option<String> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or(query_key)
        .filter(|k| !k.is_empty())
}

/// GET /content?q=
pub async fn search_content<R, P>(
    State(state): State<PaywallAppState<R, P>>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
    axum::extract::ConnectInfo(addr): axum::extract::ConnectInfo<std::net::SocketAddr>,
) -> PaywallResult<Json<SearchResponse>>
where
    R: KeyRepository + Send + Sync + 'static,
    P: PaymentProvider + Send + Sync + 'static,
{
    let client_ip = extract_client_ip(&headers, Some(addr.ip()));

    // Search is always billed at the base ceiling
    let verdict = state.limiter.check(&client_key(client_ip), false);
    if !verdict.allowed {
        return Err(PaywallError::RateLimited {
            retry_after_ms: verdict.reset_delay_ms,
        });
    }

    let results = match query.q.as_deref() {
        Some(q) => state.catalog.search(q),
        None => Vec::new(),
    };

    Ok(Json(SearchResponse {
        results: results.iter().map(|r| (*r).into()).collect(),
    }))
}

/// GET /content/{id}
pub async fn get_content<R, P>(
    State(state): State<PaywallAppState<R, P>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Query(query): Query<ContentQuery>,
    axum::extract::ConnectInfo(addr): axum::extract::ConnectInfo<std::net::SocketAddr>,
) -> PaywallResult<Json<ContentResponse>>
where
    R: KeyRepository + Send + Sync + 'static,
    P: PaymentProvider + Send + Sync + 'static,
{
    let client_ip = extract_client_ip(&headers, Some(addr.ip()));
    let token = presented_key(&headers, query.key);

    let use_case = UnlockContentUseCase::new(
        Arc::clone(&state.repo),
        Arc::clone(&state.catalog),
        Arc::clone(&state.limiter),
        Arc::clone(&state.config),
    );

    let unlocked = use_case
        .execute(UnlockRequest {
            client_id: client_key(client_ip),
            token,
            content_id: id.clone(),
            path: format!("/content/{id}"),
        })
        .await?;

    Ok(Json(ContentResponse {
        id: unlocked.record.id,
        kind: unlocked.record.kind,
        title: unlocked.record.title,
        body: unlocked.body,
    }))
}

/// POST /checkout
pub async fn create_checkout<R, P>(
    State(state): State<PaywallAppState<R, P>>,
    headers: HeaderMap,
    axum::extract::ConnectInfo(addr): axum::extract::ConnectInfo<std::net::SocketAddr>,
    Json(req): Json<CheckoutRequest>,
) -> PaywallResult<Json<CheckoutResponse>>
where
    R: KeyRepository + Send + Sync + 'static,
    P: PaymentProvider + Send + Sync + 'static,
{
    let client_ip = extract_client_ip(&headers, Some(addr.ip()));
    let verdict = state.limiter.check(&client_key(client_ip), false);
    if !verdict.allowed {
        return Err(PaywallError::RateLimited {
            retry_after_ms: verdict.reset_delay_ms,
        });
    }

    let use_case = CreateCheckoutUseCase::new(
        Arc::clone(&state.payments),
        Arc::clone(&state.catalog),
        Arc::clone(&state.config),
    );
    let session = use_case.execute(&req.content_id).await?;

    Ok(Json(CheckoutResponse {
        session_id: session.id,
        checkout_url: session.url,
    }))
}

/// POST /checkout/confirm
pub async fn confirm_purchase<R, P>(
    State(state): State<PaywallAppState<R, P>>,
    Json(req): Json<ConfirmRequest>,
) -> PaywallResult<Json<KeyResponse>>
where
    R: KeyRepository + Send + Sync + 'static,
    P: PaymentProvider + Send + Sync + 'static,
{
    let use_case = ConfirmPurchaseUseCase::new(
        Arc::clone(&state.repo),
        Arc::clone(&state.payments),
        Arc::clone(&state.config),
    );
    let key = use_case.execute(&req.session_id).await?;

    Ok(Json(KeyResponse {
        created_at_ms: key.created_at.timestamp_millis(),
        content_ids: key.content_ids.into_iter().collect(),
        key: key.token,
    }))
}

/// POST /webhook/payment
pub async fn payment_webhook<R, P>(
    State(state): State<PaywallAppState<R, P>>,
    headers: HeaderMap,
    body: String,
) -> PaywallResult<impl IntoResponse>
where
    R: KeyRepository + Send + Sync + 'static,
    P: PaymentProvider + Send + Sync + 'static,
{
    let secret = state
        .config
        .webhook_secret
        .as_deref()
        .ok_or_else(|| PaywallError::Misconfigured("webhook secret not set".to_string()))?;

    let sig_header = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(PaywallError::InvalidWebhook)?;

    let event = stripe::verify_webhook(&body, sig_header, secret)?;

    if event.event_type == "checkout.session.completed" {
        let use_case = ConfirmPurchaseUseCase::new(
            Arc::clone(&state.repo),
            Arc::clone(&state.payments),
            Arc::clone(&state.config),
        );
        use_case.issue_for_session(&event.session).await?;
    } else {
        tracing::debug!(event_type = %event.event_type, "Ignoring webhook event");
    }

    Ok(StatusCode::NO_CONTENT)
}

/// POST /admin/trace
pub async fn trace_leak<R, P>(
    State(state): State<PaywallAppState<R, P>>,
    Json(req): Json<TraceRequest>,
) -> PaywallResult<Json<TraceResponse>>
where
    R: KeyRepository + Send + Sync + 'static,
    P: PaymentProvider + Send + Sync + 'static,
{
    let use_case = TraceLeakUseCase::new(Arc::clone(&state.repo));
    let trace = use_case.execute(&req.text).await?;

    Ok(Json(match trace {
        Some(trace) => {
            let (content_ids, session_id) = match trace.key {
                Some(key) => (
                    key.content_ids.into_iter().collect(),
                    key.session_id,
                ),
                None => (Vec::new(), None),
            };
            TraceResponse {
                found: true,
                identity: Some(trace.identity),
                content_ids,
                session_id,
            }
        }
        None => TraceResponse {
            found: false,
            identity: None,
            content_ids: Vec::new(),
            session_id: None,
        },
    }))
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
