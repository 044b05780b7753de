//! Unit tests for the paywall crate

#[cfg(test)]
mod fingerprint_tests {
    use crate::domain::fingerprint::{embed, extract, strip};

    const ARTICLE: &str = "Teams that split a young product into microservices before the \
         domain boundaries have settled pay for every wrong guess twice: once in the \
         network hop and once in the migration that moves the boundary later on.";

    #[test]
    fn test_round_trip() {
        let token = "tspy_Zx9Qm3kP7aW2nR5tYv8bCd4eFg6hJk1L";
        let embedded = embed(ARTICLE, token);

        assert_ne!(embedded, ARTICLE);
        assert_eq!(extract(&embedded).as_deref(), Some(token));
    }

    #[test]
    fn test_round_trip_plain_identity() {
        let embedded = embed(ARTICLE, "user-42");
        assert_eq!(extract(&embedded).as_deref(), Some("user-42"));
    }

    #[test]
    fn test_embedding_is_invisible() {
        let embedded = embed(ARTICLE, "tspy_abc123");
        assert_eq!(strip(&embedded), ARTICLE);
    }

    #[test]
    fn test_embedding_is_deterministic() {
        let a = embed(ARTICLE, "tspy_abc123");
        let b = embed(ARTICLE, "tspy_abc123");
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_identities_differ() {
        let a = embed(ARTICLE, "tspy_abc123");
        let b = embed(ARTICLE, "tspy_xyz789");
        assert_ne!(a, b);
    }

    #[test]
    fn test_degenerate_inputs_unchanged() {
        assert_eq!(embed("", "tspy_abc"), "");
        assert_eq!(embed(ARTICLE, ""), ARTICLE);
        assert_eq!(extract(ARTICLE), None);
        assert_eq!(extract(""), None);
    }

    #[test]
    fn test_short_text_still_carries_payload() {
        let embedded = embed("word", "tspy_abc123");
        assert_eq!(extract(&embedded).as_deref(), Some("tspy_abc123"));
    }

    /// Encode a string into the marker alphabet the codec reads,
    /// for hand-crafting noisy payloads
    fn encode_with_markers(s: &str) -> String {
        const MARKERS: [char; 4] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}'];
        let mut out = String::new();
        for byte in s.bytes() {
            for shift in [6u8, 4, 2, 0] {
                out.push(MARKERS[((byte >> shift) & 0b11) as usize]);
            }
        }
        out
    }

    #[test]
    fn test_token_is_stripped_from_noisy_decode() {
        // A run whose decode surrounds the token with printable noise
        // yields exactly the token, nothing around it
        let noisy = encode_with_markers("xx tspy_abc123 yy");
        let text = format!("before {noisy}after");
        assert_eq!(extract(&text).as_deref(), Some("tspy_abc123"));
    }

    #[test]
    fn test_misaligned_run_is_skipped() {
        let token = "tspy_abc123";
        let good = encode_with_markers(token);
        // Dropping the first digit shifts every 4-digit chunk, so the
        // first run decodes to garbage and the intact one must win
        let broken: String = good.chars().skip(1).collect();
        let text = format!("start {broken} middle {good} end");
        assert_eq!(extract(&text).as_deref(), Some(token));
    }

    #[test]
    fn test_partial_excerpt_recovers_identity() {
        let token = "tspy_Zx9Qm3kP7aW2nR5tYv8bCd4eFg6hJk1L";
        let embedded = embed(ARTICLE, token);

        // A payload copy is inserted at a word start, so any single
        // word carrying markers carries one complete copy.
        let marked_word = embedded
            .split_whitespace()
            .find(|w| w.chars().any(|c| !c.is_ascii()))
            .expect("at least one word should carry the payload");

        assert_eq!(extract(marked_word).as_deref(), Some(token));
    }
}

#[cfg(test)]
mod registry_tests {
    use crate::application::check_abuse::CheckAbuseUseCase;
    use crate::application::config::PaywallConfig;
    use crate::application::issue_key::IssueKeyUseCase;
    use crate::domain::repository::KeyRepository;
    use crate::infra::memory::MemoryKeyRepository;
    use chrono::Utc;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn ids(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_issued_token_shape() {
        let repo = Arc::new(MemoryKeyRepository::new());
        let config = Arc::new(PaywallConfig::default());
        let use_case = IssueKeyUseCase::new(repo, config);

        let key = use_case.execute(ids(&["item-a"]), None).await.unwrap();
        assert!(key.token.starts_with("tspy_"));
        assert_eq!(key.token.len(), "tspy_".len() + 32);
        assert!(key.unlocks("item-a"));
    }

    #[tokio::test]
    async fn test_issuance_is_idempotent_per_session() {
        let repo = Arc::new(MemoryKeyRepository::new());
        let config = Arc::new(PaywallConfig::default());
        let use_case = IssueKeyUseCase::new(Arc::clone(&repo), config);

        let first = use_case
            .execute(ids(&["item-a"]), Some("sess_1"))
            .await
            .unwrap();
        let second = use_case
            .execute(ids(&["item-a"]), Some("sess_1"))
            .await
            .unwrap();

        assert_eq!(first.token, second.token);
        assert!(repo.find_by_session("sess_1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_replayed_session_extends_grants() {
        let repo = Arc::new(MemoryKeyRepository::new());
        let config = Arc::new(PaywallConfig::default());
        let use_case = IssueKeyUseCase::new(Arc::clone(&repo), config);

        let first = use_case
            .execute(ids(&["item-a"]), Some("sess_1"))
            .await
            .unwrap();
        let second = use_case
            .execute(ids(&["item-b"]), Some("sess_1"))
            .await
            .unwrap();

        assert_eq!(first.token, second.token);
        let stored = repo.get(&first.token).await.unwrap().unwrap();
        assert!(stored.unlocks("item-a"));
        assert!(stored.unlocks("item-b"));
    }

    #[tokio::test]
    async fn test_usage_feeds_count_and_log() {
        let repo = Arc::new(MemoryKeyRepository::new());
        let config = Arc::new(PaywallConfig::default());
        let use_case = IssueKeyUseCase::new(Arc::clone(&repo), config);
        let key = use_case.execute(ids(&["item-a"]), None).await.unwrap();

        for _ in 0..3 {
            repo.record_usage(&key.token, "/content/item-a", Some("item-a"))
                .await
                .unwrap();
        }

        let stored = repo.get(&key.token).await.unwrap().unwrap();
        assert_eq!(stored.request_count, 3);
        assert_eq!(stored.usage_log.len(), 3);
        assert_eq!(
            repo.usage_count_since(&key.token, 60_000).await.unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn test_abuse_trips_above_short_window_limit() {
        let repo = Arc::new(MemoryKeyRepository::new());
        let config = Arc::new(PaywallConfig::default());
        let issue = IssueKeyUseCase::new(Arc::clone(&repo), Arc::clone(&config));
        let key = issue.execute(ids(&["item-a"]), None).await.unwrap();

        let now = Utc::now().timestamp_millis();
        for i in 0..50 {
            repo.record_usage_at(&key.token, "/content/item-a", None, now - i)
                .unwrap();
        }

        let check = CheckAbuseUseCase::new(Arc::clone(&repo), Arc::clone(&config));
        // Exactly at the ceiling is still fine
        assert!(!check.execute(&key.token).await.unwrap());

        repo.record_usage_at(&key.token, "/content/item-a", None, now)
            .unwrap();
        assert!(check.execute(&key.token).await.unwrap());
    }

    #[tokio::test]
    async fn test_abuse_ignores_stale_usage() {
        let repo = Arc::new(MemoryKeyRepository::new());
        let config = Arc::new(PaywallConfig::default());
        let issue = IssueKeyUseCase::new(Arc::clone(&repo), Arc::clone(&config));
        let key = issue.execute(ids(&["item-a"]), None).await.unwrap();

        // Heavy use just outside the short window
        let old = Utc::now().timestamp_millis() - 700_000;
        for i in 0..60 {
            repo.record_usage_at(&key.token, "/content/item-a", None, old - i)
                .unwrap();
        }

        let check = CheckAbuseUseCase::new(repo, config);
        assert!(!check.execute(&key.token).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_token_does_not_resolve() {
        let repo = MemoryKeyRepository::new();
        assert!(repo.get("tspy_missing").await.unwrap().is_none());
        assert!(!repo.add_content_id("tspy_missing", "item-a").await.unwrap());
        assert_eq!(
            repo.usage_count_since("tspy_missing", 60_000).await.unwrap(),
            0
        );
    }
}

#[cfg(test)]
mod scenario_tests {
    use crate::application::checkout::{ConfirmPurchaseUseCase, CreateCheckoutUseCase};
    use crate::application::config::PaywallConfig;
    use crate::application::trace_leak::TraceLeakUseCase;
    use crate::application::unlock_content::{UnlockContentUseCase, UnlockRequest};
    use crate::domain::catalog::Catalog;
    use crate::domain::fingerprint;
    use crate::domain::payment::{
        CheckoutItem, CheckoutSession, PaymentProvider, PaymentStatus,
    };
    use crate::error::{PaywallError, PaywallResult};
    use crate::infra::memory::MemoryKeyRepository;
    use chrono::Utc;
    use platform::rate_limit::SlidingWindowLimiter;
    use std::collections::HashMap;
    use std::sync::Arc;

    const PAID_ID: &str = "pitfall-premature-microservices";
    const FREE_ID: &str = "signal-issue-triage-latency";

    /// Provider double holding predefined sessions
    struct MockPaymentProvider {
        sessions: HashMap<String, CheckoutSession>,
    }

    impl MockPaymentProvider {
        fn with_paid_session(session_id: &str, content_ids: &str) -> Self {
            let session = CheckoutSession {
                id: session_id.to_string(),
                url: None,
                payment_status: PaymentStatus::Paid,
                metadata: HashMap::from([(
                    "contentIds".to_string(),
                    content_ids.to_string(),
                )]),
                customer_email: Some("buyer@example.com".to_string()),
            };
            Self {
                sessions: HashMap::from([(session_id.to_string(), session)]),
            }
        }
    }

    impl PaymentProvider for MockPaymentProvider {
        async fn create_session(
            &self,
            item: &CheckoutItem,
            metadata: &HashMap<String, String>,
            _success_url: &str,
            _cancel_url: &str,
        ) -> PaywallResult<CheckoutSession> {
            Ok(CheckoutSession {
                id: format!("cs_mock_{}", item.content_id),
                url: Some("https://pay.example.com/cs_mock".to_string()),
                payment_status: PaymentStatus::Unpaid,
                metadata: metadata.clone(),
                customer_email: None,
            })
        }

        async fn retrieve_session(&self, session_id: &str) -> PaywallResult<CheckoutSession> {
            self.sessions
                .get(session_id)
                .cloned()
                .ok_or(PaywallError::SessionNotFound)
        }
    }

    struct Harness {
        repo: Arc<MemoryKeyRepository>,
        catalog: Arc<Catalog>,
        limiter: Arc<SlidingWindowLimiter>,
        config: Arc<PaywallConfig>,
    }

    impl Harness {
        fn new() -> Self {
            let config = Arc::new(PaywallConfig::default());
            Self {
                repo: Arc::new(MemoryKeyRepository::new()),
                catalog: Arc::new(Catalog::sample()),
                limiter: Arc::new(SlidingWindowLimiter::new(config.rate_limit.clone())),
                config,
            }
        }

        fn unlock(&self) -> UnlockContentUseCase<MemoryKeyRepository> {
            UnlockContentUseCase::new(
                Arc::clone(&self.repo),
                Arc::clone(&self.catalog),
                Arc::clone(&self.limiter),
                Arc::clone(&self.config),
            )
        }

        fn request(&self, client: &str, token: Option<&str>, content_id: &str) -> UnlockRequest {
            UnlockRequest {
                client_id: client.to_string(),
                token: token.map(str::to_string),
                content_id: content_id.to_string(),
                path: format!("/content/{content_id}"),
            }
        }
    }

    #[tokio::test]
    async fn test_purchase_unlock_and_trace() {
        let harness = Harness::new();
        let payments = Arc::new(MockPaymentProvider::with_paid_session("sess_1", PAID_ID));

        // Anonymous paid read is refused
        let err = harness
            .unlock()
            .execute(harness.request("1.1.1.1", None, PAID_ID))
            .await
            .unwrap_err();
        assert!(matches!(err, PaywallError::PaymentRequired));

        // Settled checkout mints a key
        let confirm = ConfirmPurchaseUseCase::new(
            Arc::clone(&harness.repo),
            Arc::clone(&payments),
            Arc::clone(&harness.config),
        );
        let key = confirm.execute("sess_1").await.unwrap();
        assert!(key.unlocks(PAID_ID));

        // Double webhook delivery replays the same key
        let replayed = confirm.execute("sess_1").await.unwrap();
        assert_eq!(key.token, replayed.token);

        // The key now unlocks the content, fingerprinted
        let unlocked = harness
            .unlock()
            .execute(harness.request("1.1.1.1", Some(&key.token), PAID_ID))
            .await
            .unwrap();
        assert_eq!(fingerprint::extract(&unlocked.body).as_deref(), Some(key.token.as_str()));
        assert_eq!(fingerprint::strip(&unlocked.body), unlocked.record.body);

        // And a leaked copy traces back to it
        let trace = TraceLeakUseCase::new(Arc::clone(&harness.repo))
            .execute(&unlocked.body)
            .await
            .unwrap()
            .expect("fingerprint should be found");
        assert_eq!(trace.identity, key.token);
        assert_eq!(
            trace.key.map(|k| k.session_id),
            Some(Some("sess_1".to_string()))
        );
    }

    #[tokio::test]
    async fn test_unpaid_session_is_rejected() {
        let harness = Harness::new();
        let mut provider = MockPaymentProvider::with_paid_session("sess_1", PAID_ID);
        if let Some(session) = provider.sessions.get_mut("sess_1") {
            session.payment_status = PaymentStatus::Unpaid;
        }

        let confirm = ConfirmPurchaseUseCase::new(
            Arc::clone(&harness.repo),
            Arc::new(provider),
            Arc::clone(&harness.config),
        );
        assert!(matches!(
            confirm.execute("sess_1").await,
            Err(PaywallError::PaymentNotConfirmed)
        ));
        assert!(matches!(
            confirm.execute("sess_missing").await,
            Err(PaywallError::SessionNotFound)
        ));
    }

    #[tokio::test]
    async fn test_checkout_refuses_free_content() {
        let harness = Harness::new();
        let payments = Arc::new(MockPaymentProvider::with_paid_session("sess_1", PAID_ID));
        let checkout = CreateCheckoutUseCase::new(
            payments,
            Arc::clone(&harness.catalog),
            Arc::clone(&harness.config),
        );

        assert!(matches!(
            checkout.execute(FREE_ID).await,
            Err(PaywallError::ContentIsFree)
        ));
        assert!(matches!(
            checkout.execute("missing").await,
            Err(PaywallError::ContentNotFound)
        ));

        let session = checkout.execute(PAID_ID).await.unwrap();
        assert_eq!(
            session.metadata.get("contentIds").map(String::as_str),
            Some(PAID_ID)
        );
    }

    #[tokio::test]
    async fn test_invalid_key_on_paid_content() {
        let harness = Harness::new();
        let err = harness
            .unlock()
            .execute(harness.request("1.1.1.1", Some("tspy_forged"), PAID_ID))
            .await
            .unwrap_err();
        assert!(matches!(err, PaywallError::KeyNotFound));
    }

    #[tokio::test]
    async fn test_free_content_needs_no_key() {
        let harness = Harness::new();
        let unlocked = harness
            .unlock()
            .execute(harness.request("1.1.1.1", None, FREE_ID))
            .await
            .unwrap();
        // No key resolved, so nothing is embedded
        assert_eq!(unlocked.body, unlocked.record.body);
    }

    #[tokio::test]
    async fn test_anonymous_ceiling_applies() {
        let harness = Harness::new();
        let base = harness.config.rate_limit.base_limit;

        for _ in 0..base {
            harness
                .unlock()
                .execute(harness.request("2.2.2.2", None, FREE_ID))
                .await
                .unwrap();
        }

        let err = harness
            .unlock()
            .execute(harness.request("2.2.2.2", None, FREE_ID))
            .await
            .unwrap_err();
        match err {
            PaywallError::RateLimited { retry_after_ms } => assert!(retry_after_ms > 0),
            other => panic!("expected RateLimited, got {other:?}"),
        }

        // Another client is unaffected
        harness
            .unlock()
            .execute(harness.request("3.3.3.3", None, FREE_ID))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_suspended_key_is_refused() {
        let harness = Harness::new();
        let payments = Arc::new(MockPaymentProvider::with_paid_session("sess_1", PAID_ID));
        let confirm = ConfirmPurchaseUseCase::new(
            Arc::clone(&harness.repo),
            payments,
            Arc::clone(&harness.config),
        );
        let key = confirm.execute("sess_1").await.unwrap();

        let now = Utc::now().timestamp_millis();
        for i in 0..60 {
            harness
                .repo
                .record_usage_at(&key.token, "/content", None, now - i)
                .unwrap();
        }

        let err = harness
            .unlock()
            .execute(harness.request("1.1.1.1", Some(&key.token), PAID_ID))
            .await
            .unwrap_err();
        assert!(matches!(err, PaywallError::KeySuspended));
    }
}
