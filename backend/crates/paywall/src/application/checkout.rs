//! Checkout Use Cases
//!
//! Creating a checkout session for a paid record, and converting a
//! settled session into an access key. Confirmation is shared by the
//! browser-redirect path and the provider webhook; both funnel into
//! the same idempotent issuance.

use crate::application::config::PaywallConfig;
use crate::application::issue_key::IssueKeyUseCase;
use crate::domain::catalog::Catalog;
use crate::domain::entities::AccessKey;
use crate::domain::payment::{CheckoutItem, CheckoutSession, PaymentProvider};
use crate::domain::repository::KeyRepository;
use crate::error::{PaywallError, PaywallResult};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Metadata key carrying the purchased content ids through the provider
const METADATA_CONTENT_IDS: &str = "contentIds";

/// Create Checkout Use Case
pub struct CreateCheckoutUseCase<P>
where
    P: PaymentProvider,
{
    payments: Arc<P>,
    catalog: Arc<Catalog>,
    config: Arc<PaywallConfig>,
}

impl<P> CreateCheckoutUseCase<P>
where
    P: PaymentProvider,
{
    pub fn new(payments: Arc<P>, catalog: Arc<Catalog>, config: Arc<PaywallConfig>) -> Self {
        Self {
            payments,
            catalog,
            config,
        }
    }

    pub async fn execute(&self, content_id: &str) -> PaywallResult<CheckoutSession> {
        let record = self
            .catalog
            .get(content_id)
            .ok_or(PaywallError::ContentNotFound)?;

        if record.is_free() {
            return Err(PaywallError::ContentIsFree);
        }

        let item = CheckoutItem {
            content_id: record.id.clone(),
            name: record.title.clone(),
            amount_cents: record.price_cents,
            currency: self.config.currency.clone(),
        };
        let metadata = HashMap::from([(METADATA_CONTENT_IDS.to_string(), record.id.clone())]);

        let session = self
            .payments
            .create_session(
                &item,
                &metadata,
                &self.config.success_url,
                &self.config.cancel_url,
            )
            .await?;

        tracing::info!(
            content_id = %record.id,
            session_id = %session.id,
            "Checkout session created"
        );

        Ok(session)
    }
}

/// Confirm Purchase Use Case
pub struct ConfirmPurchaseUseCase<R, P>
where
    R: KeyRepository,
    P: PaymentProvider,
{
    key_repo: Arc<R>,
    payments: Arc<P>,
    config: Arc<PaywallConfig>,
}

impl<R, P> ConfirmPurchaseUseCase<R, P>
where
    R: KeyRepository,
    P: PaymentProvider,
{
    pub fn new(key_repo: Arc<R>, payments: Arc<P>, config: Arc<PaywallConfig>) -> Self {
        Self {
            key_repo,
            payments,
            config,
        }
    }

    /// Browser-redirect path: re-fetch the session from the provider
    /// rather than trusting anything the client sent
    pub async fn execute(&self, session_id: &str) -> PaywallResult<AccessKey> {
        let session = self.payments.retrieve_session(session_id).await?;
        self.issue_for_session(&session).await
    }

    /// Issue (or replay) the key for a settled session
    ///
    /// Shared with the webhook path, which already holds a verified
    /// session body and must not round-trip to the provider again.
    pub async fn issue_for_session(&self, session: &CheckoutSession) -> PaywallResult<AccessKey> {
        if !session.is_paid() {
            return Err(PaywallError::PaymentNotConfirmed);
        }

        let content_ids: BTreeSet<String> = session
            .metadata
            .get(METADATA_CONTENT_IDS)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if content_ids.is_empty() {
            tracing::warn!(session_id = %session.id, "Paid session carries no content ids");
        }

        let issue = IssueKeyUseCase::new(Arc::clone(&self.key_repo), Arc::clone(&self.config));
        issue.execute(content_ids, Some(&session.id)).await
    }
}
