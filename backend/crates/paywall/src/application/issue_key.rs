//! Issue Key Use Case

use crate::application::config::PaywallConfig;
use crate::domain::entities::AccessKey;
use crate::domain::repository::KeyRepository;
use crate::error::PaywallResult;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Issue Key Use Case
///
/// Mints an access key unlocking the given content ids, or extends an
/// existing key. Issuance is idempotent per checkout session: repeated
/// calls with the same session id return the same token.
pub struct IssueKeyUseCase<R>
where
    R: KeyRepository,
{
    key_repo: Arc<R>,
    config: Arc<PaywallConfig>,
}

impl<R> IssueKeyUseCase<R>
where
    R: KeyRepository,
{
    pub fn new(key_repo: Arc<R>, config: Arc<PaywallConfig>) -> Self {
        Self { key_repo, config }
    }

    pub async fn execute(
        &self,
        content_ids: BTreeSet<String>,
        session_id: Option<&str>,
    ) -> PaywallResult<AccessKey> {
        // Replayed session: reuse the existing key, extend its grants
        if let Some(sid) = session_id {
            if let Some(existing) = self.key_repo.find_by_session(sid).await? {
                let mut merged = existing.clone();
                for content_id in &content_ids {
                    if !existing.unlocks(content_id) {
                        self.key_repo
                            .add_content_id(&existing.token, content_id)
                            .await?;
                        merged.grant(content_id);
                    }
                }
                tracing::info!(
                    session_id = %sid,
                    "Key issuance replayed; returning existing key"
                );
                return Ok(merged);
            }
        }

        let token = platform::crypto::random_token(&self.config.token_prefix, self.config.token_len);
        let key = AccessKey::new(token, content_ids, session_id.map(str::to_string));
        self.key_repo.create(&key).await?;

        tracing::info!(
            content_count = key.content_ids.len(),
            has_session = session_id.is_some(),
            "Access key issued"
        );

        Ok(key)
    }
}
