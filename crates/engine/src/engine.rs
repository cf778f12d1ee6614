//! The Decision Arbiter (C6) and the `Engine` that owns every other
//! component. `inspect` is the hot path: it reads the cache and the
//! in-memory stores, never awaits a database or bus call directly, and
//! answers with a `Decision` in one pass through a fixed precedence —
//! whitelist, blacklist, existing block, rate/brute-force, geo, signature,
//! anomaly/behavior, allow. Persistence and publishing are handed off.

use crate::block_store::BlockStore;
use crate::bus::EventBus;
use crate::cache::BaselineRuleCache;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::detectors::{extract_features, AnomalyScorer, BehavioralAnalyzer, EntityHistory, MatchFields, RateTier, RateTracker, RateVerdict, SignatureMatcher};
use crate::error::{Error, ErrorMetrics, Result};
use crate::health::Health;
use crate::metrics::EngineMetrics;
use crate::model::features::keys;
use crate::model::{ActiveBlock, BaselineProfile, BlockCategory, Decision, EntityType, Event, EventType, InspectionRequest, Severity, Threat};
use crate::publisher::Publisher;
pub use crate::repository::ListKind;
use crate::repository::Repository;
use crate::threat_store::ThreatStore;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// How long the engine tolerates an unloaded cache at startup before
/// `Health` escalates from `degraded` to `unhealthy`.
const STARTUP_GRACE: chrono::Duration = chrono::Duration::seconds(30);

struct OffenseRecord {
    window_start: DateTime<Utc>,
    count: u32,
}

fn severity_risk_score(severity: Severity) -> f64 {
    match severity {
        Severity::Info => 1.0,
        Severity::Low => 3.0,
        Severity::Medium => 5.0,
        Severity::High => 8.0,
        Severity::Critical => 10.0,
    }
}

pub struct Engine {
    config: EngineConfig,
    cache: Arc<BaselineRuleCache>,
    block_store: Arc<BlockStore>,
    threat_store: Arc<ThreatStore>,
    rate_tracker: Arc<RateTracker>,
    auth_rate_tracker: Arc<RateTracker>,
    rate_tiers: Vec<RateTier>,
    histories: DashMap<String, EntityHistory>,
    offenses: DashMap<String, OffenseRecord>,
    anomaly_scorer: AnomalyScorer,
    behavioral_analyzer: BehavioralAnalyzer,
    publisher: Publisher,
    repository: Arc<dyn Repository>,
    clock: Arc<dyn Clock>,
    metrics: Arc<EngineMetrics>,
    error_metrics: Arc<ErrorMetrics>,
    started_at: DateTime<Utc>,
}

impl Engine {
    pub fn new(config: EngineConfig, repository: Arc<dyn Repository>, bus: Arc<dyn EventBus>, clock: Arc<dyn Clock>, metrics: Arc<EngineMetrics>) -> Self {
        let rate_tiers = config.rate.tiers.iter().map(|t| RateTier { window_seconds: t.window_seconds, limit: t.limit, severity: t.severity }).collect();

        let anomaly_scorer = AnomalyScorer::new(config.anomaly.z_score_low);
        let behavioral_analyzer = BehavioralAnalyzer::new(
            config.behavior.sequence_window,
            chrono::Duration::seconds(config.behavior.impossible_travel_window_seconds),
            config.behavior.sensitive_paths.clone(),
        );

        let publisher = Publisher::spawn(bus, metrics.clone(), config.publish.queue_capacity, config.publish.workers);
        let cache = Arc::new(BaselineRuleCache::new(config.cache.signature_set.clone()));
        let threat_store = Arc::new(ThreatStore::new(chrono::Duration::seconds(config.threat.dedup_horizon_seconds as i64)));
        let started_at = clock.now();

        Self {
            config,
            cache,
            block_store: Arc::new(BlockStore::new()),
            threat_store,
            rate_tracker: Arc::new(RateTracker::new()),
            auth_rate_tracker: Arc::new(RateTracker::new()),
            rate_tiers,
            histories: DashMap::new(),
            offenses: DashMap::new(),
            anomaly_scorer,
            behavioral_analyzer,
            publisher,
            repository,
            clock,
            metrics,
            error_metrics: Arc::new(ErrorMetrics::new()),
            started_at,
        }
    }

    /// Blocking initial cache load; call once before serving `inspect`.
    pub async fn bootstrap(&self) -> Result<()> {
        self.cache.refresh(self.repository.as_ref(), self.clock.now()).await?;
        Ok(())
    }

    pub fn block_store(&self) -> &Arc<BlockStore> {
        &self.block_store
    }

    pub fn cache(&self) -> &Arc<BaselineRuleCache> {
        &self.cache
    }

    /// The one hot-path operation. Never awaits the repository or bus
    /// directly: persistence and publishing are both spawned or
    /// non-blocking, so the returned `Decision` reflects only what could be
    /// decided from in-memory state.
    pub async fn inspect(&self, request: &InspectionRequest) -> Result<Decision> {
        let start = Instant::now();
        let features = extract_features(request)?;
        let country = features.text(keys::COUNTRY).map(|s| s.to_string());
        let now = request.observed_at;

        if self.cache.is_whitelisted(&request.client_ip) {
            let elapsed = start.elapsed();
            self.metrics.record_inspection("allow", elapsed);
            return Ok(Decision::allow(request.request_id.clone(), "client_ip is whitelisted", elapsed));
        }

        if self.cache.is_blacklisted(&request.client_ip) {
            return Ok(self.enforce_block(request, "client_ip is blacklisted", BlockCategory::Blacklist, now, start).await);
        }

        if let Some(existing) = self.block_store.get(&request.client_ip, self.clock.as_ref()) {
            let elapsed = start.elapsed();
            self.metrics.record_inspection("block", elapsed);
            return Ok(Decision::block(request.request_id.clone(), existing.reason.clone(), existing.category, existing.block_id.clone(), existing.expires_at, elapsed));
        }

        let (recent_count, rate_verdict) = self.rate_probe(request);
        if let Some((severity, reason)) = rate_verdict {
            let _ = severity;
            return Ok(self.enforce_block(request, reason, BlockCategory::Rate, now, start).await);
        }
        if let Some(reason) = self.brute_force_probe(request) {
            return Ok(self.enforce_block(request, reason, BlockCategory::Rate, now, start).await);
        }

        if let Some(country) = &country {
            if self.cache.is_geo_blocked(country) {
                return Ok(self.enforce_block(request, format!("country {} is geo-blocked", country), BlockCategory::Geo, now, start).await);
            }
        }

        let snapshot = match self.cache.current() {
            Some(snapshot) => snapshot,
            None => {
                let err = Error::cache_not_ready("no baseline/rule cache snapshot loaded yet");
                self.error_metrics.record(&err);
                return Ok(if self.config.runtime.fail_open {
                    let elapsed = start.elapsed();
                    self.metrics.record_inspection("allow", elapsed);
                    Decision::allow(request.request_id.clone(), "cache not ready, failing open", elapsed)
                } else {
                    self.enforce_block(request, "cache not ready, failing closed", BlockCategory::Rule, now, start).await
                });
            }
        };

        let body = String::from_utf8_lossy(&request.body).into_owned();
        let fields = MatchFields {
            query: &request.query,
            body: &body,
            path: &request.path,
            user_agent: features.text(keys::USER_AGENT).unwrap_or(""),
            headers: &request.headers,
        };
        let matches = SignatureMatcher::matches(&snapshot.signatures, &snapshot.regexes, &fields);

        let mut pending: Vec<(Threat, EventType)> = Vec::new();
        let mut block_decision: Option<(String, BlockCategory)> = None;

        for matched in &matches {
            let threat = Threat::new(matched.category.clone(), request.primary_identity(), Some(&matched.signature_id), matched.severity, matched.confidence, severity_risk_score(matched.severity), now)
                .with_indicator(format!("matched_field={}", matched.matched_field));
            if block_decision.is_none() && matched.severity >= self.config.block.signature_block_severity {
                block_decision = Some((format!("signature match: {}", matched.signature_id), BlockCategory::Signature));
            }
            pending.push((threat, EventType::SignatureEvents));
        }

        if let Some((reason, category)) = block_decision {
            for (threat, event_type) in pending {
                self.record_threat(threat, request, event_type);
            }
            return Ok(self.enforce_block(request, reason, category, now, start).await);
        }

        let entity_type = if request.user_id.is_some() { EntityType::User } else { EntityType::Ip };
        let baseline = self.cache.baseline_for(request.primary_identity()).unwrap_or_else(|| BaselineProfile::empty(request.primary_identity(), entity_type));
        let recent_response_time = request.response_time.map(|d| d.as_millis() as f64);

        let anomaly_findings = self.anomaly_scorer.score(&features, &baseline, recent_count as f64, recent_response_time, country.as_deref());

        let mut history = self.histories.entry(request.primary_identity().to_string()).or_insert_with(|| EntityHistory::new(self.config.behavior.sequence_window));
        let behavior_findings = self.behavioral_analyzer.analyze(&features, &baseline, &history, country.as_deref(), now);
        history.record(&request.path, &request.method, country.as_deref(), now);
        drop(history);

        let threshold = self.config.block.anomaly_block_severity;
        for finding in anomaly_findings {
            if block_decision.is_none() && finding.severity >= threshold {
                block_decision = Some((finding.description.clone(), BlockCategory::Anomaly));
            }
            let threat = Threat::new(finding.kind.clone(), request.primary_identity(), None, finding.severity, finding.confidence, severity_risk_score(finding.severity), now)
                .with_context(serde_json::json!({ "description": finding.description, "feature": finding.feature, "z_score": finding.z_score }));
            pending.push((threat, EventType::AnomalyEvents));
        }
        for finding in behavior_findings {
            if block_decision.is_none() && finding.severity >= threshold {
                block_decision = Some((finding.description.clone(), BlockCategory::Anomaly));
            }
            let threat_type = format!("behavior_{:?}", finding.kind).to_lowercase();
            let threat = Threat::new(threat_type, request.primary_identity(), None, finding.severity, 0.8, severity_risk_score(finding.severity), now)
                .with_context(serde_json::json!({ "description": finding.description }));
            pending.push((threat, EventType::BehaviorEvents));
        }

        if let Some((reason, category)) = block_decision {
            for (threat, event_type) in pending {
                self.record_threat(threat, request, event_type);
            }
            return Ok(self.enforce_block(request, reason, category, now, start).await);
        }

        let mut threat_ids = Vec::with_capacity(pending.len());
        for (threat, event_type) in pending {
            threat_ids.push(threat.threat_id.clone());
            self.record_threat(threat, request, event_type);
        }

        let elapsed = start.elapsed();
        if elapsed.as_millis() as u64 > self.config.runtime.hard_deadline_ms {
            warn!(request_id = %request.request_id, elapsed_ms = elapsed.as_millis() as u64, "inspection exceeded its soft deadline");
        }
        self.metrics.record_inspection("allow", elapsed);
        Ok(Decision::allow(request.request_id.clone(), "passed all checks", elapsed).with_threats(threat_ids))
    }

    /// Runs the configured rate checks for this request and returns the
    /// window's current count (for the anomaly scorer's volume ratio) plus
    /// a block verdict, if any limit was exceeded. Tiered thresholds are
    /// checked ahead of the plain burst/sustained pair so a short, sharp
    /// burst escalates severity before the slower window would even trip.
    fn rate_probe(&self, request: &InspectionRequest) -> (u64, Option<(Severity, String)>) {
        let key = request.rate_key();
        let mut worst: Option<(Severity, String)> = None;

        if !self.rate_tiers.is_empty() {
            if let Some(RateVerdict::BurstExceeded { count, severity }) = self.rate_tracker.record_tiered(&key, &self.rate_tiers, self.clock.as_ref()) {
                worst = Some((severity, format!("rate tier exceeded: {} requests", count)));
            }
        }

        let burst = self.rate_tracker.record(&format!("{}:burst", key), chrono::Duration::seconds(self.config.rate.window_seconds as i64), self.config.rate.burst_threshold, self.clock.as_ref());
        let recent_count = match burst {
            RateVerdict::Ok { count } | RateVerdict::SustainedExceeded { count } => count,
            RateVerdict::BurstExceeded { count, .. } => count,
        };
        if worst.is_none() {
            if let RateVerdict::SustainedExceeded { count } = burst {
                worst = Some((Severity::High, format!("burst threshold exceeded: {} requests", count)));
            }
        }

        let sustained = self.rate_tracker.record(
            &format!("{}:sustained", key),
            chrono::Duration::seconds(self.config.rate.sustained_window_seconds as i64),
            self.config.rate.sustained_threshold,
            self.clock.as_ref(),
        );
        if worst.is_none() {
            if let RateVerdict::SustainedExceeded { count } = sustained {
                worst = Some((Severity::Medium, format!("sustained threshold exceeded: {} requests", count)));
            }
        }

        (recent_count, worst)
    }

    /// Failed-auth volume, tracked only for requests against a configured
    /// auth path that came back `401`/`403`.
    fn brute_force_probe(&self, request: &InspectionRequest) -> Option<String> {
        let is_auth_path = self.config.brute_force.auth_paths.iter().any(|prefix| request.path.starts_with(prefix.as_str()));
        if !is_auth_path || !matches!(request.response_status, Some(401) | Some(403)) {
            return None;
        }

        let verdict = self.auth_rate_tracker.record(&request.client_ip, chrono::Duration::seconds(self.config.brute_force.window_seconds as i64), self.config.brute_force.max_failed_attempts, self.clock.as_ref());
        match verdict {
            RateVerdict::SustainedExceeded { count } => Some(format!("{} failed authentication attempts", count)),
            _ => None,
        }
    }

    /// Tiered block duration keyed by offense count within the repeat-
    /// offense window: `tier_seconds[i]` for the `(i+1)`th offense, the
    /// last tier repeating for every offense beyond the list.
    fn block_ttl(&self, key: &str, now: DateTime<Utc>) -> chrono::Duration {
        let horizon = chrono::Duration::seconds(self.config.block.repeat_offense_window_seconds as i64);
        let mut entry = self.offenses.entry(key.to_string()).or_insert_with(|| OffenseRecord { window_start: now, count: 0 });

        if now - entry.window_start > horizon {
            entry.window_start = now;
            entry.count = 0;
        }
        entry.count += 1;

        let tiers = &self.config.block.tier_seconds;
        let idx = (entry.count as usize - 1).min(tiers.len().saturating_sub(1));
        chrono::Duration::seconds(tiers[idx] as i64)
    }

    async fn enforce_block(&self, request: &InspectionRequest, reason: impl Into<String>, category: BlockCategory, now: DateTime<Utc>, start: Instant) -> Decision {
        let reason = reason.into();
        let ttl = self.block_ttl(&request.client_ip, now);
        let block = ActiveBlock::new(request.client_ip.clone(), reason.clone(), category, now, ttl);
        self.block_store.put(block.clone());
        self.metrics.active_blocks.set(self.block_store.len() as i64);

        let repository = self.repository.clone();
        let persisted = block.clone();
        tokio::spawn(async move {
            if let Err(err) = repository.persist_active_block_change(&persisted).await {
                warn!(error = %err, "failed to persist active block");
            }
        });

        let payload = serde_json::json!({
            "block_id": block.block_id,
            "key": block.key,
            "reason": block.reason,
            "category": block.category,
            "created_at": block.created_at,
            "expires_at": block.expires_at,
        });
        self.publisher.publish(&Event::new(EventType::AttackBlockingEvents, block.key.clone(), payload, now), &self.metrics);

        let elapsed = start.elapsed();
        self.metrics.record_inspection("block", elapsed);
        Decision::block(request.request_id.clone(), reason, category, block.block_id, block.expires_at, elapsed)
    }

    /// Dedups into the in-memory threat store, then hands durable
    /// persistence and event publishing off so `inspect` never awaits them.
    fn record_threat(&self, threat: Threat, request: &InspectionRequest, event_type: EventType) {
        let stored = self.threat_store.upsert(threat, request.observed_at);

        let repository = self.repository.clone();
        let durable = stored.clone();
        tokio::spawn(async move {
            if let Err(err) = repository.persist_threat(&durable).await {
                warn!(error = %err, "failed to persist threat");
            }
        });

        let payload = serde_json::json!({
            "threat_id": stored.threat_id,
            "fingerprint": stored.fingerprint,
            "threat_type": stored.threat_type,
            "severity": stored.severity,
            "count": stored.count,
            "client_ip": request.client_ip,
            "request_id": request.request_id,
        });
        self.publisher.publish(&Event::new(event_type, request.client_ip.clone(), payload, request.observed_at), &self.metrics);
    }

    /// Durably adds or removes `key` from `kind` and applies the change to
    /// the in-memory cache immediately, ahead of the next periodic refresh.
    /// `GeoBlock` is admin-managed out of band and is not a valid target.
    pub async fn add_to_list(&self, kind: ListKind, key: &str, reason: &str) -> Result<()> {
        if kind == ListKind::GeoBlock {
            return Err(Error::invalid_input("geo-block set is admin-managed and not a valid AddToList target"));
        }
        self.cache.patch_list(kind, key, true)?;
        self.repository.persist_ip_list_change(kind, key, reason, true).await?;
        info!(key, ?kind, "added to list");
        Ok(())
    }

    pub async fn remove_from_list(&self, kind: ListKind, key: &str) -> Result<()> {
        if kind == ListKind::GeoBlock {
            return Err(Error::invalid_input("geo-block set is admin-managed and not a valid RemoveFromList target"));
        }
        self.cache.patch_list(kind, key, false)?;
        self.repository.persist_ip_list_change(kind, key, "", false).await?;
        info!(key, ?kind, "removed from list");
        Ok(())
    }

    /// Clears an active block early. Persists an already-expired record so
    /// a durable reload doesn't resurrect it.
    pub fn unblock(&self, key: &str, reason: &str) -> bool {
        let removed = self.block_store.unblock(key);
        if removed {
            let now = self.clock.now();
            let expired = ActiveBlock::new(key, reason, BlockCategory::Rule, now, chrono::Duration::zero());
            let repository = self.repository.clone();
            tokio::spawn(async move {
                if let Err(err) = repository.persist_active_block_change(&expired).await {
                    warn!(error = %err, "failed to persist unblock");
                }
            });
            info!(key, reason, "manually unblocked");
        }
        removed
    }

    pub async fn reload_rules(&self) -> Result<usize> {
        self.cache.refresh(self.repository.as_ref(), self.clock.now()).await
    }

    pub fn health(&self) -> Health {
        let cache_age_seconds = self.cache.age(self.clock.now()).map(|d| d.num_seconds());
        let dropped_events = self.publisher.dropped_total();
        let detector_transient_ratio = self.error_metrics.detector_transient_ratio();
        let startup_grace_elapsed = self.clock.now() - self.started_at > STARTUP_GRACE;

        let status = Health::classify(cache_age_seconds, dropped_events, detector_transient_ratio, startup_grace_elapsed);
        Health {
            status,
            queue_depths: self.publisher.queue_depths(),
            cache_age_seconds,
            dropped_events,
            detector_transient_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::InMemoryEventBus;
    use crate::clock::FixedClock;
    use crate::model::{Operator, Rule, Signature};
    use crate::repository::InMemoryRepository;
    use std::collections::HashMap as StdHashMap;

    fn test_config() -> EngineConfig {
        crate::config::sample()
    }

    fn request(client_ip: &str, path: &str) -> InspectionRequest {
        InspectionRequest {
            request_id: uuid::Uuid::new_v4().to_string(),
            observed_at: Utc::now(),
            client_ip: client_ip.to_string(),
            user_id: None,
            session_id: None,
            api_id: "api1".into(),
            endpoint_id: "E1".into(),
            method: "GET".into(),
            path: path.to_string(),
            query: String::new(),
            headers: StdHashMap::new(),
            body: Vec::new(),
            response_status: None,
            response_size: None,
            response_time: None,
        }
    }

    async fn engine_with(repository: Arc<InMemoryRepository>) -> Engine {
        let bus = Arc::new(InMemoryEventBus::new());
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let metrics = Arc::new(EngineMetrics::new("test_engine_inspect").unwrap());
        let engine = Engine::new(test_config(), repository, bus, clock, metrics);
        engine.bootstrap().await.unwrap();
        engine
    }

    #[tokio::test]
    async fn whitelisted_ip_is_always_allowed() {
        let repository = Arc::new(InMemoryRepository::new());
        repository.seed_whitelist(["203.0.113.1".to_string()]).await;
        let engine = engine_with(repository).await;

        let decision = engine.inspect(&request("203.0.113.1", "/api/items")).await.unwrap();
        assert!(!decision.is_blocked());
        assert_eq!(decision.reason, "client_ip is whitelisted");
    }

    #[tokio::test]
    async fn blacklisted_ip_is_blocked() {
        let repository = Arc::new(InMemoryRepository::new());
        repository.seed_blacklist(["198.51.100.9".to_string()]).await;
        let engine = engine_with(repository).await;

        let decision = engine.inspect(&request("198.51.100.9", "/api/items")).await.unwrap();
        assert!(decision.is_blocked());
        assert_eq!(decision.category, Some(BlockCategory::Blacklist));
    }

    #[tokio::test]
    async fn an_existing_active_block_is_reused_without_creating_a_new_one() {
        let repository = Arc::new(InMemoryRepository::new());
        let engine = engine_with(repository).await;
        engine.block_store.put(ActiveBlock::new("203.0.113.44", "prior offense", BlockCategory::Rate, Utc::now(), chrono::Duration::hours(1)));

        let decision = engine.inspect(&request("203.0.113.44", "/api/items")).await.unwrap();
        assert!(decision.is_blocked());
        assert_eq!(decision.reason, "prior offense");
    }

    #[tokio::test]
    async fn sql_injection_in_query_is_blocked_and_recorded() {
        let repository = Arc::new(InMemoryRepository::new());
        repository
            .seed_signatures(vec![Signature::new("sqli.union", "SQL injection", "sql_injection", Severity::High)
                .with_priority(100)
                .with_rule(Rule::new("r1", "query", Operator::Regex, r"(?i)\bunion\b.*\bselect\b"))])
            .await;
        let engine = engine_with(repository.clone()).await;

        let mut req = request("203.0.113.77", "/api/items");
        req.query = "id=1' UNION SELECT 1--".to_string();
        let decision = engine.inspect(&req).await.unwrap();

        assert!(decision.is_blocked());
        assert_eq!(decision.category, Some(BlockCategory::Signature));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(repository.persisted_threats().await.len(), 1);
    }

    #[tokio::test]
    async fn geo_blocked_country_is_blocked() {
        let repository = Arc::new(InMemoryRepository::new());
        repository.seed_geo_block(["RU".to_string()]).await;
        let engine = engine_with(repository).await;

        let mut req = request("203.0.113.5", "/api/items");
        req.headers.insert("X-GeoIP-Country".into(), "RU".into());
        let decision = engine.inspect(&req).await.unwrap();

        assert!(decision.is_blocked());
        assert_eq!(decision.category, Some(BlockCategory::Geo));
    }

    #[tokio::test]
    async fn brute_force_on_auth_path_is_blocked() {
        let repository = Arc::new(InMemoryRepository::new());
        let engine = engine_with(repository).await;

        let mut decision = Decision::allow("warmup", "warmup", std::time::Duration::ZERO);
        for _ in 0..6 {
            let mut req = request("203.0.113.200", "/auth/login");
            req.response_status = Some(401);
            decision = engine.inspect(&req).await.unwrap();
        }

        assert!(decision.is_blocked());
        assert_eq!(decision.category, Some(BlockCategory::Rate));
    }

    #[tokio::test]
    async fn add_to_list_rejects_geo_block_target() {
        let repository = Arc::new(InMemoryRepository::new());
        let engine = engine_with(repository).await;
        assert!(engine.add_to_list(ListKind::GeoBlock, "RU", "manual").await.is_err());
    }

    #[tokio::test]
    async fn add_to_list_is_visible_to_the_next_inspection() {
        let repository = Arc::new(InMemoryRepository::new());
        let engine = engine_with(repository).await;
        engine.add_to_list(ListKind::Blacklist, "203.0.113.250", "manual block").await.unwrap();

        let decision = engine.inspect(&request("203.0.113.250", "/api/items")).await.unwrap();
        assert!(decision.is_blocked());
    }

    #[tokio::test]
    async fn unblock_clears_an_active_block() {
        let repository = Arc::new(InMemoryRepository::new());
        let engine = engine_with(repository).await;
        engine.block_store.put(ActiveBlock::new("203.0.113.9", "rate", BlockCategory::Rate, Utc::now(), chrono::Duration::hours(1)));

        assert!(engine.unblock("203.0.113.9", "operator override"));
        let decision = engine.inspect(&request("203.0.113.9", "/api/items")).await.unwrap();
        assert!(!decision.is_blocked());
    }

    #[tokio::test]
    async fn health_is_healthy_once_bootstrapped() {
        let repository = Arc::new(InMemoryRepository::new());
        let engine = engine_with(repository).await;
        let health = engine.health();
        assert_eq!(health.status, crate::health::HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn health_is_degraded_before_bootstrap() {
        let bus = Arc::new(InMemoryEventBus::new());
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let metrics = Arc::new(EngineMetrics::new("test_engine_health_degraded").unwrap());
        let engine = Engine::new(test_config(), Arc::new(InMemoryRepository::new()), bus, clock, metrics);

        let health = engine.health();
        assert_eq!(health.status, crate::health::HealthStatus::Degraded);
    }
}
