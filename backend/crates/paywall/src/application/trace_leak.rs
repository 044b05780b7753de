//! Trace Leak Use Case

use crate::domain::entities::{AccessKey, TOKEN_PREFIX};
use crate::domain::fingerprint;
use crate::domain::repository::KeyRepository;
use crate::error::PaywallResult;
use std::sync::Arc;

/// Output DTO for trace leak
#[derive(Debug, Clone)]
pub struct LeakTrace {
    /// Identity recovered from the text's zero-width payload
    pub identity: String,
    /// The matching key, when the identity resolves in the store
    pub key: Option<AccessKey>,
}

/// Trace Leak Use Case
///
/// Given text suspected to be leaked content, recover the embedded
/// identity and resolve it back to the key it was issued to.
pub struct TraceLeakUseCase<R>
where
    R: KeyRepository,
{
    key_repo: Arc<R>,
}

impl<R> TraceLeakUseCase<R>
where
    R: KeyRepository,
{
    pub fn new(key_repo: Arc<R>) -> Self {
        Self { key_repo }
    }

    pub async fn execute(&self, text: &str) -> PaywallResult<Option<LeakTrace>> {
        let Some(identity) = fingerprint::extract(text) else {
            return Ok(None);
        };

        let key = if identity.starts_with(TOKEN_PREFIX) {
            self.key_repo.get(&identity).await?
        } else {
            None
        };

        tracing::info!(
            resolved = key.is_some(),
            "Leak fingerprint extracted"
        );

        Ok(Some(LeakTrace { identity, key }))
    }
}
