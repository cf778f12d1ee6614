//! End-to-end scenarios against the public `Engine` API: each test seeds a
//! repository, bootstraps an engine, and drives `inspect` the way a caller
//! embedding this crate would.

use inspection_engine::bus::InMemoryEventBus;
use inspection_engine::clock::FixedClock;
use inspection_engine::config::{
    AnomalyConfig, BehaviorConfig, BlockConfig, BruteForceConfig, CacheConfig, DatabaseConfig, EngineRuntimeConfig, MetricsConfig, PublishConfig,
    RateConfig, RateTierConfig, RedisConfig, ThreatConfig,
};
use inspection_engine::metrics::EngineMetrics;
use inspection_engine::model::{BlockCategory, Operator, Rule, Severity, Signature};
use inspection_engine::repository::InMemoryRepository;
use inspection_engine::{Engine, EngineConfig, InspectionRequest, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A fully-populated config equivalent to `config/default.toml`, built here
/// rather than loaded from disk since the test binary's working directory
/// doesn't line up with the workspace root.
fn config() -> EngineConfig {
    EngineConfig {
        database: DatabaseConfig {
            url: "postgresql://localhost/engine".into(),
            max_connections: 10,
            min_connections: 1,
        },
        redis: RedisConfig {
            url: "redis://localhost".into(),
            max_connections: 10,
            stream_key: "engine-events".into(),
        },
        rate: RateConfig {
            window_seconds: 60,
            burst_threshold: 100,
            sustained_threshold: 1000,
            sustained_window_seconds: 3600,
            tiers: vec![
                RateTierConfig { window_seconds: 5, limit: 10, severity: Severity::High },
                RateTierConfig { window_seconds: 10, limit: 20, severity: Severity::Medium },
            ],
        },
        brute_force: BruteForceConfig {
            max_failed_attempts: 10,
            window_seconds: 300,
            auth_paths: vec!["/auth/".into(), "/login".into()],
        },
        block: BlockConfig {
            tier_seconds: vec![60, 300, 3600],
            repeat_offense_window_seconds: 86400,
            signature_block_severity: Severity::High,
            anomaly_block_severity: Severity::High,
        },
        anomaly: AnomalyConfig {
            z_score_low: 1.0,
            z_score_medium: 2.0,
            z_score_high: 3.0,
            z_score_critical: 4.0,
            min_baseline_samples: 30,
        },
        behavior: BehaviorConfig {
            sequence_window: 20,
            impossible_travel_window_seconds: 7200,
            sensitive_paths: vec!["/admin".into(), "/debug".into()],
        },
        threat: ThreatConfig { dedup_horizon_seconds: 600 },
        cache: CacheConfig {
            refresh_interval_seconds: 30,
            stale_after_seconds: 300,
            signature_set: "default".into(),
        },
        publish: PublishConfig {
            publish_timeout_ms: 500,
            max_retries: 3,
            queue_capacity: 1024,
            workers: 4,
        },
        runtime: EngineRuntimeConfig {
            environment: "testing".into(),
            log_level: "info".into(),
            fail_open: true,
            worker_concurrency: 4,
            maintenance_interval_seconds: 60,
            hard_deadline_ms: 50,
        },
        metrics: MetricsConfig {
            enabled: true,
            port: 9090,
            path: "/metrics".into(),
            namespace: "inspection_engine".into(),
        },
    }
}

fn request(client_ip: &str, path: &str) -> InspectionRequest {
    InspectionRequest {
        request_id: uuid::Uuid::new_v4().to_string(),
        observed_at: Utc::now(),
        client_ip: client_ip.to_string(),
        user_id: None,
        session_id: None,
        api_id: "api1".into(),
        endpoint_id: "checkout".into(),
        method: "GET".into(),
        path: path.to_string(),
        query: String::new(),
        headers: HashMap::new(),
        body: Vec::new(),
        response_status: None,
        response_size: None,
        response_time: None,
    }
}

async fn engine_with(repository: Arc<InMemoryRepository>) -> Engine {
    let bus = Arc::new(InMemoryEventBus::new());
    let clock = Arc::new(FixedClock::new(Utc::now()));
    let metrics = Arc::new(EngineMetrics::new("scenarios_test").unwrap());
    let engine = Engine::new(config(), repository, bus, clock, metrics);
    engine.bootstrap().await.unwrap();
    engine
}

/// S1 — a SQL-injection payload in the query string trips a signature and
/// the resulting block carries the matched signature through.
#[tokio::test]
async fn sql_injection_in_query_string_is_blocked() {
    let repository = Arc::new(InMemoryRepository::new());
    repository
        .seed_signatures(vec![Signature::new("sqli.union", "SQL injection via UNION SELECT", "sql_injection", Severity::High)
            .with_priority(100)
            .with_rule(Rule::new("r1", "query", Operator::Regex, r"(?i)\bunion\b.*\bselect\b"))])
        .await;
    let engine = engine_with(repository.clone()).await;

    let mut req = request("203.0.113.10", "/api/orders");
    req.query = "id=7' UNION SELECT password FROM users--".to_string();
    let decision = engine.inspect(&req).await.unwrap();

    assert!(decision.is_blocked());
    assert_eq!(decision.category, Some(BlockCategory::Signature));

    tokio::time::sleep(Duration::from_millis(20)).await;
    let threats = repository.persisted_threats().await;
    assert_eq!(threats.len(), 1);
    assert_eq!(threats[0].threat_type, "sql_injection");
}

/// S2 — a client that exceeds the tiered short-window threshold is
/// rate-limited before the signature/anomaly checks ever run.
#[tokio::test]
async fn request_flood_trips_the_tight_rate_tier() {
    let repository = Arc::new(InMemoryRepository::new());
    let engine = engine_with(repository).await;

    let mut decision = None;
    // The tightest configured tier allows 10 requests in a 5 second window.
    for _ in 0..11 {
        decision = Some(engine.inspect(&request("198.51.100.20", "/api/orders")).await.unwrap());
    }

    let decision = decision.unwrap();
    assert!(decision.is_blocked());
    assert_eq!(decision.category, Some(BlockCategory::Rate));
}

/// S3 — repeated failed logins against a configured auth path are treated
/// as brute-forcing and blocked, independent of plain request volume.
#[tokio::test]
async fn repeated_failed_logins_are_treated_as_brute_force() {
    let repository = Arc::new(InMemoryRepository::new());
    let engine = engine_with(repository).await;

    let mut decision = None;
    for _ in 0..11 {
        let mut req = request("198.51.100.30", "/auth/login");
        req.response_status = Some(401);
        decision = Some(engine.inspect(&req).await.unwrap());
    }

    let decision = decision.unwrap();
    assert!(decision.is_blocked());
    assert_eq!(decision.category, Some(BlockCategory::Rate));
}

/// S4 — the same user authenticating from two countries inside the
/// impossible-travel window is flagged even though nothing else about the
/// requests looks wrong.
#[tokio::test]
async fn impossible_travel_is_flagged_as_anomalous_behavior() {
    let repository = Arc::new(InMemoryRepository::new());
    let engine = engine_with(repository.clone()).await;

    let mut first = request("203.0.113.40", "/api/profile");
    first.user_id = Some("user-42".to_string());
    first.headers.insert("X-GeoIP-Country".into(), "US".into());
    let first_decision = engine.inspect(&first).await.unwrap();
    assert!(!first_decision.is_blocked());

    let mut second = request("203.0.113.40", "/api/profile");
    second.user_id = Some("user-42".to_string());
    second.observed_at = first.observed_at + chrono::Duration::minutes(10);
    second.headers.insert("X-GeoIP-Country".into(), "RU".into());
    let second_decision = engine.inspect(&second).await.unwrap();

    // Travel severity (Critical) clears the configured anomaly-block
    // threshold, so the second request is blocked and the finding is
    // recorded as a threat even though no signature matched either request.
    assert!(second_decision.is_blocked());
    assert_eq!(second_decision.category, Some(BlockCategory::Anomaly));

    tokio::time::sleep(Duration::from_millis(20)).await;
    let threats = repository.persisted_threats().await;
    assert!(threats.iter().any(|t| t.threat_type.contains("impossible")));
}

/// S5 — an operator-maintained whitelist entry bypasses every other check,
/// including a blacklist entry for the same address.
#[tokio::test]
async fn whitelist_overrides_a_blacklist_entry_for_the_same_ip() {
    let repository = Arc::new(InMemoryRepository::new());
    repository.seed_whitelist(["203.0.113.50".to_string()]).await;
    repository.seed_blacklist(["203.0.113.50".to_string()]).await;
    let engine = engine_with(repository).await;

    let decision = engine.inspect(&request("203.0.113.50", "/api/orders")).await.unwrap();
    assert!(!decision.is_blocked());
    assert_eq!(decision.reason, "client_ip is whitelisted");
}

/// S6 — an XSS payload in the request body trips a signature the same way
/// a query-string payload does.
#[tokio::test]
async fn xss_payload_in_body_is_blocked() {
    let repository = Arc::new(InMemoryRepository::new());
    repository
        .seed_signatures(vec![Signature::new("xss.script_tag", "XSS via <script> tag", "xss", Severity::High)
            .with_priority(100)
            .with_rule(Rule::new("r1", "body", Operator::Contains, "<script>"))])
        .await;
    let engine = engine_with(repository.clone()).await;

    let mut req = request("203.0.113.60", "/api/comments");
    req.method = "POST".to_string();
    req.body = br#"{"comment":"<script>alert(1)</script>"}"#.to_vec();
    let decision = engine.inspect(&req).await.unwrap();

    assert!(decision.is_blocked());
    assert_eq!(decision.category, Some(BlockCategory::Signature));

    tokio::time::sleep(Duration::from_millis(20)).await;
    let threats = repository.persisted_threats().await;
    assert_eq!(threats.len(), 1);
    assert_eq!(threats[0].threat_type, "xss");
}

/// A reload after adding an entry through the public list API is visible
/// to the very next inspection, without a process restart.
#[tokio::test]
async fn manual_blacklist_addition_takes_effect_immediately() {
    let repository = Arc::new(InMemoryRepository::new());
    let engine = engine_with(repository).await;

    let decision = engine.inspect(&request("203.0.113.70", "/api/orders")).await.unwrap();
    assert!(!decision.is_blocked());

    engine
        .add_to_list(inspection_engine::ListKind::Blacklist, "203.0.113.70", "reported by abuse desk")
        .await
        .unwrap();

    let decision = engine.inspect(&request("203.0.113.70", "/api/orders")).await.unwrap();
    assert!(decision.is_blocked());
    assert_eq!(decision.category, Some(BlockCategory::Blacklist));
}
