use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The five topics the engine produces to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    ThreatEvents,
    AnomalyEvents,
    BehaviorEvents,
    SignatureEvents,
    AttackBlockingEvents,
}

impl EventType {
    pub fn topic(&self) -> &'static str {
        match self {
            EventType::ThreatEvents => "threat_events",
            EventType::AnomalyEvents => "anomaly_events",
            EventType::BehaviorEvents => "behavior_events",
            EventType::SignatureEvents => "signature_events",
            EventType::AttackBlockingEvents => "attack-blocking-events",
        }
    }
}

/// Envelope published to the bus: `{event_id, event_type, key,
/// produced_at, payload}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub event_type: EventType,
    pub key: String,
    pub produced_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl Event {
    pub fn new(event_type: EventType, key: impl Into<String>, payload: serde_json::Value, produced_at: DateTime<Utc>) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            event_type,
            key: key.into(),
            produced_at,
            payload,
        }
    }

    pub fn topic(&self) -> &'static str {
        self.event_type.topic()
    }
}
