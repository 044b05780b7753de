//! Unlock Content Use Case

use crate::application::check_abuse::CheckAbuseUseCase;
use crate::application::config::PaywallConfig;
use crate::domain::catalog::{Catalog, ContentRecord};
use crate::domain::fingerprint;
use crate::domain::repository::KeyRepository;
use crate::error::{PaywallError, PaywallResult};
use platform::rate_limit::SlidingWindowLimiter;
use std::sync::Arc;

/// Input DTO for unlock content
#[derive(Debug, Clone)]
pub struct UnlockRequest {
    /// Rate-limit bucket key (normalized client address)
    pub client_id: String,
    /// Access key token, when one was presented
    pub token: Option<String>,
    pub content_id: String,
    /// Request path, recorded in the usage log
    pub path: String,
}

/// Output DTO for unlock content
#[derive(Debug, Clone)]
pub struct UnlockedContent {
    pub record: ContentRecord,
    /// Body as delivered, fingerprinted when a key resolved
    pub body: String,
}

/// Unlock Content Use Case
///
/// The full gate for one content request: rate limit, catalog lookup,
/// key resolution, usage recording, authorization, abuse check, and
/// fingerprinting of the delivered body.
pub struct UnlockContentUseCase<R>
where
    R: KeyRepository,
{
    key_repo: Arc<R>,
    catalog: Arc<Catalog>,
    limiter: Arc<SlidingWindowLimiter>,
    config: Arc<PaywallConfig>,
}

impl<R> UnlockContentUseCase<R>
where
    R: KeyRepository,
{
    pub fn new(
        key_repo: Arc<R>,
        catalog: Arc<Catalog>,
        limiter: Arc<SlidingWindowLimiter>,
        config: Arc<PaywallConfig>,
    ) -> Self {
        Self {
            key_repo,
            catalog,
            limiter,
            config,
        }
    }

    pub async fn execute(&self, request: UnlockRequest) -> PaywallResult<UnlockedContent> {
        // Presenting any key optimistically buys the elevated ceiling;
        // an invalid key still fails below with its own error.
        let verdict = self
            .limiter
            .check(&request.client_id, request.token.is_some());
        if !verdict.allowed {
            return Err(PaywallError::RateLimited {
                retry_after_ms: verdict.reset_delay_ms,
            });
        }

        let record = self
            .catalog
            .get(&request.content_id)
            .ok_or(PaywallError::ContentNotFound)?
            .clone();

        let key = match &request.token {
            Some(token) => {
                let key = self.key_repo.get(token).await?;
                if key.is_some() {
                    // Recorded before authorization so denied attempts
                    // still feed the abuse windows. Lost telemetry is
                    // never a reason to fail the request.
                    if let Err(e) = self
                        .key_repo
                        .record_usage(token, &request.path, Some(&request.content_id))
                        .await
                    {
                        tracing::warn!(error = %e, "Failed to record key usage");
                    }
                }
                key
            }
            None => None,
        };

        if !record.is_free() {
            let key = match (&request.token, &key) {
                (None, _) => return Err(PaywallError::PaymentRequired),
                (Some(_), None) => return Err(PaywallError::KeyNotFound),
                (Some(_), Some(key)) => key,
            };
            if !key.unlocks(&record.id) {
                return Err(PaywallError::PaymentRequired);
            }

            let abuse =
                CheckAbuseUseCase::new(Arc::clone(&self.key_repo), Arc::clone(&self.config));
            if abuse.execute(&key.token).await? {
                return Err(PaywallError::KeySuspended);
            }
        }

        // Every delivery under a resolved key carries its identity,
        // free content included.
        let body = match &key {
            Some(key) => fingerprint::embed(&record.body, &key.token),
            None => record.body.clone(),
        };

        tracing::info!(
            content_id = %record.id,
            authenticated = key.is_some(),
            "Content unlocked"
        );

        Ok(UnlockedContent { record, body })
    }
}
