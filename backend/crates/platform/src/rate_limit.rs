//! Rate Limiting Infrastructure
//!
//! Sliding-window request limiter, keyed by client identifier.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Ceiling for anonymous callers
    pub base_limit: u32,
    /// Ceiling for callers presenting an access key
    ///
    /// Granted on presentation alone, before the key is validated
    /// downstream. That keeps paying callers from being throttled
    /// while their key resolves, at the cost of letting anyone claim
    /// the higher ceiling with a non-empty value.
    pub elevated_limit: u32,
    /// Time window duration
    pub window: Duration,
    /// Maximum distinct clients tracked before FIFO eviction
    pub max_clients: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            base_limit: 30,
            elevated_limit: 100,
            window: Duration::from_secs(60),
            max_clients: 10_000,
        }
    }
}

impl RateLimitConfig {
    pub fn new(base_limit: u32, elevated_limit: u32, window_secs: u64) -> Self {
        Self {
            base_limit,
            elevated_limit,
            window: Duration::from_secs(window_secs),
            ..Default::default()
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window.as_millis() as i64
    }
}

/// Rate limit check result
#[derive(Debug, Clone)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    /// On denial, how long until the oldest counted request leaves
    /// the window. Zero when allowed.
    pub reset_delay_ms: i64,
}

/// In-process sliding-window rate limiter
///
/// Tracks request timestamps per client and prunes entries older than
/// the window on every check. Local to one serving process: replicas
/// each enforce independently, which is acceptable for abuse
/// deterrence rather than hard quota enforcement.
///
/// State is owned by the instance (no module globals) so tests can
/// construct isolated limiters and drive the clock via [`check_at`].
///
/// [`check_at`]: SlidingWindowLimiter::check_at
pub struct SlidingWindowLimiter {
    config: RateLimitConfig,
    state: Mutex<LimiterState>,
}

#[derive(Default)]
struct LimiterState {
    /// Per-client request timestamps inside the trailing window
    windows: HashMap<String, Vec<i64>>,
    /// Client ids in insertion order, for capacity eviction
    insertion_order: VecDeque<String>,
}

impl SlidingWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Mutex::new(LimiterState::default()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check and record a request for `client_id` at the current time
    pub fn check(&self, client_id: &str, has_key: bool) -> RateLimitResult {
        self.check_at(client_id, has_key, now_ms())
    }

    /// Check and record a request at an explicit clock reading
    ///
    /// The prune-and-append sequence runs under the interior lock so
    /// concurrent checks for the same client never lose updates.
    pub fn check_at(&self, client_id: &str, has_key: bool, now_ms: i64) -> RateLimitResult {
        let limit = if has_key {
            self.config.elevated_limit
        } else {
            self.config.base_limit
        };
        let window_ms = self.config.window_ms();

        let mut guard = match self.state.lock() {
            Ok(g) => g,
            // A poisoned lock means a panic mid-check; the window data
            // is still structurally sound, so keep serving.
            Err(poisoned) => poisoned.into_inner(),
        };
        let state = &mut *guard;

        if !state.windows.contains_key(client_id) {
            // Capacity bound: evict the oldest-inserted client. This is
            // FIFO, not LRU; a best-effort memory bound.
            if state.windows.len() >= self.config.max_clients {
                if let Some(oldest) = state.insertion_order.pop_front() {
                    state.windows.remove(&oldest);
                }
            }
            state.windows.insert(client_id.to_string(), Vec::new());
            state.insertion_order.push_back(client_id.to_string());
        }

        let Some(stamps) = state.windows.get_mut(client_id) else {
            // Unreachable after the insert above; fail open rather
            // than panic.
            return RateLimitResult {
                allowed: true,
                remaining: limit,
                reset_delay_ms: 0,
            };
        };

        stamps.retain(|&t| t > now_ms - window_ms);

        if stamps.len() as u32 >= limit {
            let oldest = stamps.iter().copied().min().unwrap_or(now_ms);
            return RateLimitResult {
                allowed: false,
                remaining: 0,
                reset_delay_ms: (oldest + window_ms - now_ms).max(0),
            };
        }

        stamps.push(now_ms);
        RateLimitResult {
            allowed: true,
            remaining: limit - stamps.len() as u32,
            reset_delay_ms: 0,
        }
    }

    /// Number of distinct clients currently tracked
    pub fn tracked_clients(&self) -> usize {
        match self.state.lock() {
            Ok(g) => g.windows.len(),
            Err(poisoned) => poisoned.into_inner().windows.len(),
        }
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> SlidingWindowLimiter {
        SlidingWindowLimiter::new(RateLimitConfig::default())
    }

    #[test]
    fn test_base_ceiling_is_enforced() {
        let limiter = limiter();
        let t0 = 1_000_000;

        for i in 0..30 {
            let result = limiter.check_at("1.2.3.4", false, t0 + i);
            assert!(result.allowed, "request {} should be allowed", i + 1);
        }

        let denied = limiter.check_at("1.2.3.4", false, t0 + 30);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert!(denied.reset_delay_ms > 0);
    }

    #[test]
    fn test_elevated_ceiling_is_enforced() {
        let limiter = limiter();
        let t0 = 1_000_000;

        for i in 0..100 {
            let result = limiter.check_at("1.2.3.4", true, t0 + i);
            assert!(result.allowed, "request {} should be allowed", i + 1);
        }

        assert!(!limiter.check_at("1.2.3.4", true, t0 + 100).allowed);
    }

    #[test]
    fn test_elevated_is_per_call_not_per_client() {
        // Presenting a key only raises the ceiling for that call
        let limiter = limiter();
        let t0 = 1_000_000;

        for i in 0..30 {
            assert!(limiter.check_at("ip", true, t0 + i).allowed);
        }
        // 30 recorded requests: at the base ceiling without a key
        assert!(!limiter.check_at("ip", false, t0 + 30).allowed);
        // but still under the elevated ceiling with one
        assert!(limiter.check_at("ip", true, t0 + 31).allowed);
    }

    #[test]
    fn test_window_recovery() {
        let limiter = limiter();
        let t0 = 1_000_000;

        for i in 0..30 {
            limiter.check_at("ip", false, t0 + i);
        }
        let denied = limiter.check_at("ip", false, t0 + 1000);
        assert!(!denied.allowed);

        // Advancing past the reported delay frees a slot
        let later = t0 + 1000 + denied.reset_delay_ms;
        assert!(limiter.check_at("ip", false, later).allowed);
    }

    #[test]
    fn test_sliding_window_never_exceeds_ceiling() {
        let limiter = limiter();
        let mut allowed_in_window = Vec::new();

        // One request every 3 seconds for 5 minutes
        for i in 0..100 {
            let now = 1_000_000 + i * 3_000;
            if limiter.check_at("ip", false, now).allowed {
                allowed_in_window.push(now);
            }
            allowed_in_window.retain(|&t| t > now - 60_000);
            assert!(
                allowed_in_window.len() <= 30,
                "more than 30 allowed in one trailing window"
            );
        }
    }

    #[test]
    fn test_remaining_counts_down() {
        let limiter = limiter();
        let first = limiter.check_at("ip", false, 1_000);
        assert_eq!(first.remaining, 29);
        let second = limiter.check_at("ip", false, 1_001);
        assert_eq!(second.remaining, 28);
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = limiter();
        let t0 = 1_000_000;

        for i in 0..30 {
            limiter.check_at("1.1.1.1", false, t0 + i);
        }
        assert!(!limiter.check_at("1.1.1.1", false, t0 + 30).allowed);
        assert!(limiter.check_at("2.2.2.2", false, t0 + 30).allowed);
    }

    #[test]
    fn test_capacity_eviction_is_fifo() {
        let config = RateLimitConfig {
            max_clients: 2,
            ..Default::default()
        };
        let limiter = SlidingWindowLimiter::new(config);
        let t0 = 1_000_000;

        limiter.check_at("a", false, t0);
        limiter.check_at("b", false, t0 + 1);
        assert_eq!(limiter.tracked_clients(), 2);

        // "c" evicts "a" (oldest by insertion), so "a" gets a fresh
        // window on its next check
        limiter.check_at("c", false, t0 + 2);
        assert_eq!(limiter.tracked_clients(), 2);

        let result = limiter.check_at("a", false, t0 + 3);
        assert_eq!(result.remaining, 29);
    }
}
