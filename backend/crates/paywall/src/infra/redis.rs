//! Redis Repository Implementation
//!
//! Key records are JSON values with a TTL; the abuse windows are
//! sorted sets scored by timestamp; the bounded usage log is a
//! trimmed list. All per-access writes go through one atomic pipeline.

use crate::domain::entities::{AccessKey, UsageEntry};
use crate::domain::repository::KeyRepository;
use crate::error::PaywallResult;
use chrono::Utc;
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};

const KEY_NS: &str = "paywall:key:";
const SESSION_NS: &str = "paywall:sess:";
const USAGE_NS: &str = "paywall:usage:";
const COUNT_NS: &str = "paywall:count:";
const LOG_NS: &str = "paywall:log:";

/// Usage timestamps older than this are pruned on write
const USAGE_RETENTION_MS: i64 = 3_600_000;

/// Redis-backed key repository
#[derive(Clone)]
pub struct RedisKeyRepository {
    conn: MultiplexedConnection,
    key_ttl_secs: u64,
    usage_log_cap: usize,
}

impl RedisKeyRepository {
    /// Connect and verify the server responds
    pub async fn connect(
        url: &str,
        key_ttl_secs: u64,
        usage_log_cap: usize,
    ) -> PaywallResult<Self> {
        let client = Client::open(url)?;
        let mut conn = client.get_multiplexed_async_connection().await?;

        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        tracing::info!("Connected to Redis key store");

        Ok(Self {
            conn,
            key_ttl_secs,
            usage_log_cap,
        })
    }

    fn record_key(token: &str) -> String {
        format!("{KEY_NS}{token}")
    }

    fn session_key(session_id: &str) -> String {
        format!("{SESSION_NS}{session_id}")
    }

    async fn load(&self, token: &str) -> PaywallResult<Option<AccessKey>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(Self::record_key(token)).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn store(&self, key: &AccessKey) -> PaywallResult<()> {
        let mut conn = self.conn.clone();
        let raw = serde_json::to_string(key)?;
        let _: () = conn
            .set_ex(Self::record_key(&key.token), raw, self.key_ttl_secs)
            .await?;
        Ok(())
    }
}

impl KeyRepository for RedisKeyRepository {
    async fn create(&self, key: &AccessKey) -> PaywallResult<()> {
        self.store(key).await?;
        if let Some(session_id) = &key.session_id {
            let mut conn = self.conn.clone();
            let _: () = conn
                .set_ex(
                    Self::session_key(session_id),
                    key.token.clone(),
                    self.key_ttl_secs,
                )
                .await?;
        }
        Ok(())
    }

    async fn get(&self, token: &str) -> PaywallResult<Option<AccessKey>> {
        let Some(mut key) = self.load(token).await? else {
            return Ok(None);
        };

        // Counter and log live outside the JSON record so the hot
        // write path never has to read-modify-write it.
        let mut conn = self.conn.clone();
        let count: Option<u64> = conn.get(format!("{COUNT_NS}{token}")).await?;
        key.request_count = count.unwrap_or(0);

        let raw_log: Vec<String> = conn
            .lrange(format!("{LOG_NS}{token}"), 0, self.usage_log_cap as isize - 1)
            .await?;
        // Stored newest first; the entity keeps oldest first
        key.usage_log = raw_log
            .iter()
            .rev()
            .filter_map(|raw| serde_json::from_str(raw).ok())
            .collect();

        Ok(Some(key))
    }

    async fn find_by_session(&self, session_id: &str) -> PaywallResult<Option<AccessKey>> {
        let mut conn = self.conn.clone();
        let token: Option<String> = conn.get(Self::session_key(session_id)).await?;
        match token {
            Some(token) => self.get(&token).await,
            None => Ok(None),
        }
    }

    async fn add_content_id(&self, token: &str, content_id: &str) -> PaywallResult<bool> {
        let Some(mut key) = self.load(token).await? else {
            return Ok(false);
        };
        if key.grant(content_id) {
            self.store(&key).await?;
        }
        Ok(true)
    }

    async fn record_usage(
        &self,
        token: &str,
        path: &str,
        resource_id: Option<&str>,
    ) -> PaywallResult<()> {
        let now_ms = Utc::now().timestamp_millis();
        let entry = UsageEntry {
            at_ms: now_ms,
            path: path.to_string(),
            resource_id: resource_id.map(str::to_string),
        };
        let entry_json = serde_json::to_string(&entry)?;

        let usage_key = format!("{USAGE_NS}{token}");
        let count_key = format!("{COUNT_NS}{token}");
        let log_key = format!("{LOG_NS}{token}");

        // Member must be unique per event or concurrent accesses in
        // the same millisecond collapse into one
        let nanos = Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(now_ms * 1_000_000);
        let member = format!("{now_ms}:{nanos}");

        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .incr(&count_key, 1u64)
            .ignore()
            .zadd(&usage_key, member, now_ms)
            .ignore()
            .zrembyscore(&usage_key, 0, now_ms - USAGE_RETENTION_MS)
            .ignore()
            .lpush(&log_key, entry_json)
            .ignore()
            .ltrim(&log_key, 0, self.usage_log_cap as isize - 1)
            .ignore()
            .expire(&count_key, self.key_ttl_secs as i64)
            .ignore()
            .expire(&usage_key, (USAGE_RETENTION_MS / 1000) + 60)
            .ignore()
            .expire(&log_key, self.key_ttl_secs as i64)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(())
    }

    async fn usage_count_since(&self, token: &str, window_ms: i64) -> PaywallResult<u64> {
        let cutoff = Utc::now().timestamp_millis() - window_ms;
        let mut conn = self.conn.clone();
        let count: u64 = conn
            .zcount(format!("{USAGE_NS}{token}"), format!("({cutoff}"), "+inf")
            .await?;
        Ok(count)
    }
}
