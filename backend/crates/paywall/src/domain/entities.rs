//! Domain Entities
//!
//! Core business entities for the paywall domain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Recognizability prefix for access-key tokens
///
/// Signals "this looks like one of our keys" in logs and recovered
/// fingerprints. Never used for authorization; that is registry lookup
/// only.
pub const TOKEN_PREFIX: &str = "tspy_";

/// AccessKey entity - a grant of access to a set of content items
///
/// The token is globally unique and immutable after creation. The
/// unlocked set only grows (via explicit grant), never shrinks.
/// Serialized as JSON for the durable store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessKey {
    pub token: String,
    pub content_ids: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    /// Originating checkout session, for idempotent re-issuance
    pub session_id: Option<String>,
    /// Running total of authenticated accesses
    #[serde(default)]
    pub request_count: u64,
    /// Last N accesses, oldest first; oldest dropped past the cap
    #[serde(default)]
    pub usage_log: Vec<UsageEntry>,
}

impl AccessKey {
    /// Create a new access key
    pub fn new(token: String, content_ids: BTreeSet<String>, session_id: Option<String>) -> Self {
        Self {
            token,
            content_ids,
            created_at: Utc::now(),
            session_id,
            request_count: 0,
            usage_log: Vec::new(),
        }
    }

    /// Whether this key unlocks the given content item
    pub fn unlocks(&self, content_id: &str) -> bool {
        self.content_ids.contains(content_id)
    }

    /// Add a content id to the unlocked set
    ///
    /// Returns false if the id was already present (idempotent grant).
    pub fn grant(&mut self, content_id: &str) -> bool {
        self.content_ids.insert(content_id.to_string())
    }

    /// Append a usage entry, dropping the oldest past `cap`
    pub fn push_usage(&mut self, entry: UsageEntry, cap: usize) {
        self.usage_log.push(entry);
        if self.usage_log.len() > cap {
            let excess = self.usage_log.len() - cap;
            self.usage_log.drain(..excess);
        }
    }
}

/// One authenticated access, as kept in the bounded usage log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEntry {
    pub at_ms: i64,
    pub path: String,
    pub resource_id: Option<String>,
}

impl UsageEntry {
    pub fn new(path: &str, resource_id: Option<&str>) -> Self {
        Self {
            at_ms: Utc::now().timestamp_millis(),
            path: path.to_string(),
            resource_id: resource_id.map(str::to_string),
        }
    }
}
