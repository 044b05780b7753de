//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

use axum::{
    Router, http,
    http::{Method, header},
};
use paywall::domain::catalog::Catalog;
use paywall::{HttpPaymentProvider, MemoryKeyRepository, PaywallConfig, RedisKeyRepository};
use std::env;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,paywall=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Content catalog
    let catalog = match env::var("CONTENT_PATH") {
        Ok(path) => {
            let catalog = Catalog::from_json_file(Path::new(&path))?;
            tracing::info!(path = %path, records = catalog.len(), "Loaded content catalog");
            catalog
        }
        Err(_) => {
            tracing::info!("CONTENT_PATH not set, using built-in sample catalog");
            Catalog::sample()
        }
    };
    let catalog = Arc::new(catalog);

    // Paywall configuration
    let config = PaywallConfig {
        webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").ok(),
        ..PaywallConfig::default()
    };
    if config.webhook_secret.is_none() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET not set; webhook endpoint will refuse deliveries");
    }

    // Payment provider
    let secret_key = env::var("STRIPE_SECRET_KEY").unwrap_or_default();
    if secret_key.is_empty() {
        tracing::warn!("STRIPE_SECRET_KEY not set; checkout creation will fail");
    }
    let payments = Arc::new(match env::var("STRIPE_API_BASE") {
        Ok(base) => HttpPaymentProvider::with_api_base(secret_key, base),
        Err(_) => HttpPaymentProvider::new(secret_key),
    });

    // Key store: Redis when configured, in-process fallback otherwise
    let paywall_routes: Router = match env::var("REDIS_URL") {
        Ok(url) => {
            let repo = RedisKeyRepository::connect(
                &url,
                config.key_ttl_secs(),
                config.usage_log_cap,
            )
            .await?;
            paywall::paywall_router(Arc::new(repo), payments, catalog, config)
        }
        Err(_) => {
            tracing::warn!(
                "REDIS_URL not set; using in-memory key store (keys will not survive restarts)"
            );
            let repo = MemoryKeyRepository::with_usage_log_cap(config.usage_log_cap);
            paywall::paywall_router(Arc::new(repo), payments, catalog, config)
        }
    };

    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::HeaderName::from_static("x-api-key"),
        ]))
        .allow_credentials(true);

    // Build router
    let app = Router::new()
        .nest("/api", paywall_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(31113);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
