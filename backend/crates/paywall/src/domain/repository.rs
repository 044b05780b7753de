//! Repository Traits
//!
//! Interfaces for data persistence. Implementations are in the
//! infrastructure layer: Redis when configured, an in-process map
//! otherwise. Both satisfy the same contract; the fallback does not
//! survive restarts and is not shared across replicas.

use crate::domain::entities::AccessKey;
use crate::error::PaywallResult;

/// Access-key repository trait
#[trait_variant::make(KeyRepository: Send)]
pub trait LocalKeyRepository {
    /// Persist a freshly minted key
    async fn create(&self, key: &AccessKey) -> PaywallResult<()>;

    /// Resolve a key by its token
    async fn get(&self, token: &str) -> PaywallResult<Option<AccessKey>>;

    /// Resolve a key by its originating checkout session
    async fn find_by_session(&self, session_id: &str) -> PaywallResult<Option<AccessKey>>;

    /// Add a content id to an existing key's unlocked set
    ///
    /// Idempotent. Returns false when the token does not resolve.
    async fn add_content_id(&self, token: &str, content_id: &str) -> PaywallResult<bool>;

    /// Record one authenticated access: bump the total counter,
    /// append to the bounded usage log, feed the trailing windows.
    ///
    /// Callers treat failures as lost telemetry, never as a reason to
    /// fail the request.
    async fn record_usage(
        &self,
        token: &str,
        path: &str,
        resource_id: Option<&str>,
    ) -> PaywallResult<()>;

    /// Number of accesses recorded within the trailing window
    async fn usage_count_since(&self, token: &str, window_ms: i64) -> PaywallResult<u64>;
}
