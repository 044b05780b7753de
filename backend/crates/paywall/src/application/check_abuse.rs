//! Check Abuse Use Case

use crate::application::config::PaywallConfig;
use crate::domain::repository::KeyRepository;
use crate::error::PaywallResult;
use std::sync::Arc;

/// Check Abuse Use Case
///
/// A key is considered abusive when its recorded accesses exceed
/// either trailing window's ceiling. Evaluated per request against
/// recorded usage; suspension lifts on its own once the windows
/// drain below both ceilings.
pub struct CheckAbuseUseCase<R>
where
    R: KeyRepository,
{
    key_repo: Arc<R>,
    config: Arc<PaywallConfig>,
}

impl<R> CheckAbuseUseCase<R>
where
    R: KeyRepository,
{
    pub fn new(key_repo: Arc<R>, config: Arc<PaywallConfig>) -> Self {
        Self { key_repo, config }
    }

    pub async fn execute(&self, token: &str) -> PaywallResult<bool> {
        let short = self
            .key_repo
            .usage_count_since(token, self.config.abuse_short_window_ms())
            .await?;
        if short > self.config.abuse_short_limit {
            tracing::warn!(
                count = short,
                limit = self.config.abuse_short_limit,
                "Key exceeded short abuse window"
            );
            return Ok(true);
        }

        let long = self
            .key_repo
            .usage_count_since(token, self.config.abuse_long_window_ms())
            .await?;
        if long > self.config.abuse_long_limit {
            tracing::warn!(
                count = long,
                limit = self.config.abuse_long_limit,
                "Key exceeded long abuse window"
            );
            return Ok(true);
        }

        Ok(false)
    }
}
