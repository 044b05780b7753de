//! In-Memory Repository Implementation
//!
//! Fallback store for development and tests. Nothing here survives a
//! restart, and nothing is shared across replicas; production deploys
//! configure the Redis implementation instead.

use crate::domain::entities::{AccessKey, UsageEntry};
use crate::domain::repository::KeyRepository;
use crate::error::PaywallResult;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Usage timestamps older than this are pruned on write
const USAGE_RETENTION_MS: i64 = 3_600_000;

#[derive(Default)]
struct MemoryState {
    /// Token -> key record
    keys: HashMap<String, AccessKey>,
    /// Checkout session id -> token
    sessions: HashMap<String, String>,
    /// Token -> access timestamps feeding the abuse windows
    usage_windows: HashMap<String, Vec<i64>>,
}

/// In-process key repository
pub struct MemoryKeyRepository {
    state: Mutex<MemoryState>,
    usage_log_cap: usize,
}

impl Default for MemoryKeyRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryKeyRepository {
    pub fn new() -> Self {
        Self::with_usage_log_cap(50)
    }

    pub fn with_usage_log_cap(usage_log_cap: usize) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            usage_log_cap,
        }
    }

    /// Lock the state, recovering from a poisoned mutex
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Record a usage event at an explicit timestamp
    ///
    /// Used directly by tests driving a synthetic clock.
    pub fn record_usage_at(
        &self,
        token: &str,
        path: &str,
        resource_id: Option<&str>,
        now_ms: i64,
    ) -> PaywallResult<()> {
        let mut state = self.lock();
        let Some(key) = state.keys.get_mut(token) else {
            return Ok(());
        };

        key.request_count += 1;
        key.push_usage(
            UsageEntry {
                at_ms: now_ms,
                path: path.to_string(),
                resource_id: resource_id.map(str::to_string),
            },
            self.usage_log_cap,
        );

        let window = state.usage_windows.entry(token.to_string()).or_default();
        window.push(now_ms);
        window.retain(|&ts| ts > now_ms - USAGE_RETENTION_MS);
        Ok(())
    }
}

impl KeyRepository for MemoryKeyRepository {
    async fn create(&self, key: &AccessKey) -> PaywallResult<()> {
        let mut state = self.lock();
        if let Some(session_id) = &key.session_id {
            state
                .sessions
                .insert(session_id.clone(), key.token.clone());
        }
        state.keys.insert(key.token.clone(), key.clone());
        Ok(())
    }

    async fn get(&self, token: &str) -> PaywallResult<Option<AccessKey>> {
        Ok(self.lock().keys.get(token).cloned())
    }

    async fn find_by_session(&self, session_id: &str) -> PaywallResult<Option<AccessKey>> {
        let state = self.lock();
        Ok(state
            .sessions
            .get(session_id)
            .and_then(|token| state.keys.get(token))
            .cloned())
    }

    async fn add_content_id(&self, token: &str, content_id: &str) -> PaywallResult<bool> {
        let mut state = self.lock();
        match state.keys.get_mut(token) {
            Some(key) => {
                key.grant(content_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_usage(
        &self,
        token: &str,
        path: &str,
        resource_id: Option<&str>,
    ) -> PaywallResult<()> {
        self.record_usage_at(token, path, resource_id, Utc::now().timestamp_millis())
    }

    async fn usage_count_since(&self, token: &str, window_ms: i64) -> PaywallResult<u64> {
        let cutoff = Utc::now().timestamp_millis() - window_ms;
        let state = self.lock();
        Ok(state
            .usage_windows
            .get(token)
            .map(|window| window.iter().filter(|&&ts| ts > cutoff).count() as u64)
            .unwrap_or(0))
    }
}
