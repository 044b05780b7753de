//! Paywall Router

use crate::application::config::PaywallConfig;
use crate::domain::catalog::Catalog;
use crate::domain::payment::PaymentProvider;
use crate::domain::repository::KeyRepository;
use crate::presentation::handlers::{self, PaywallAppState};
use platform::rate_limit::SlidingWindowLimiter;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

/// Create the paywall router for any repository and payment provider
pub fn paywall_router<R, P>(
    repo: Arc<R>,
    payments: Arc<P>,
    catalog: Arc<Catalog>,
    config: PaywallConfig,
) -> Router
where
    R: KeyRepository + Send + Sync + 'static,
    P: PaymentProvider + Send + Sync + 'static,
{
    let limiter = Arc::new(SlidingWindowLimiter::new(config.rate_limit.clone()));
    let state = PaywallAppState {
        repo,
        payments,
        catalog,
        limiter,
        config: Arc::new(config),
    };

    Router::new()
        .route("/content", get(handlers::search_content::<R, P>))
        .route("/content/{id}", get(handlers::get_content::<R, P>))
        .route("/checkout", post(handlers::create_checkout::<R, P>))
        .route(
            "/checkout/confirm",
            post(handlers::confirm_purchase::<R, P>),
        )
        .route("/webhook/payment", post(handlers::payment_webhook::<R, P>))
        .route("/admin/trace", post(handlers::trace_leak::<R, P>))
        .route("/health", get(handlers::health))
        .with_state(state)
}
