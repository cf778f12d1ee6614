use super::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatStatus {
    New,
    Acknowledged,
    Mitigated,
    Resolved,
    FalsePositive,
}

/// A detected threat, deduplicated by `fingerprint`. Context is
/// a bounded request/response snapshot — callers should not expect the full
/// body to round-trip here, only what the detector that raised it chose to
/// carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Threat {
    pub threat_id: String,
    pub fingerprint: String,
    pub threat_type: String,
    pub severity: Severity,
    pub status: ThreatStatus,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub count: u64,
    pub confidence: f64,
    pub risk_score: f64,
    pub indicators: Vec<String>,
    pub context: serde_json::Value,
}

impl Threat {
    pub fn new(threat_type: impl Into<String>, primary_key: &str, signature_id: Option<&str>, severity: Severity, confidence: f64, risk_score: f64, now: DateTime<Utc>) -> Self {
        let threat_type = threat_type.into();
        Self {
            threat_id: uuid::Uuid::new_v4().to_string(),
            fingerprint: fingerprint(&threat_type, primary_key, signature_id),
            threat_type,
            severity,
            status: ThreatStatus::New,
            first_seen: now,
            last_seen: now,
            count: 1,
            confidence,
            risk_score: risk_score.clamp(0.0, 10.0),
            indicators: Vec::new(),
            context: serde_json::Value::Null,
        }
    }

    pub fn with_indicator(mut self, indicator: impl Into<String>) -> Self {
        self.indicators.push(indicator.into());
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }

    /// Merge an incoming duplicate (same fingerprint, within the dedup
    /// horizon) into this one: `count` increments, `last_seen` refreshes,
    /// `risk_score` takes the max, `severity` takes the higher —
    /// combining threats never decreases severity.
    pub fn merge(&mut self, incoming: &Threat) {
        self.count += 1;
        self.last_seen = incoming.last_seen.max(self.last_seen);
        self.risk_score = self.risk_score.max(incoming.risk_score);
        self.severity = self.severity.max(incoming.severity);
        self.confidence = self.confidence.max(incoming.confidence);
        for indicator in &incoming.indicators {
            if !self.indicators.contains(indicator) {
                self.indicators.push(indicator.clone());
            }
        }
    }
}

/// `hash(type || primary_key || signature_id?)`. Deterministic and stable
/// across process restarts so dedup survives a cache reload.
pub fn fingerprint(threat_type: &str, primary_key: &str, signature_id: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(threat_type.as_bytes());
    hasher.update(b"|");
    hasher.update(primary_key.as_bytes());
    if let Some(sig) = signature_id {
        hasher.update(b"|");
        hasher.update(sig.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
