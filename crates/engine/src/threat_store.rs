//! Threat Record Store (C8): in-memory dedup by fingerprint, with durable
//! writes handed off to the [`crate::repository::Repository`] off the hot
//! path. `upsert` is synchronous and lock-free per fingerprint shard;
//! durable persistence (including retries) happens in the caller's
//! background task.

use crate::model::Threat;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

#[derive(Debug)]
pub struct ThreatStore {
    by_fingerprint: DashMap<String, Threat>,
    dedup_horizon: chrono::Duration,
}

impl ThreatStore {
    pub fn new(dedup_horizon: chrono::Duration) -> Self {
        Self {
            by_fingerprint: DashMap::new(),
            dedup_horizon,
        }
    }

    /// Merges `incoming` into an existing threat with the same fingerprint
    /// if it was last seen within the dedup horizon, otherwise stores it
    /// as a new threat. Returns the stored (possibly merged) threat.
    pub fn upsert(&self, incoming: Threat, now: DateTime<Utc>) -> Threat {
        let mut entry = self.by_fingerprint.entry(incoming.fingerprint.clone()).or_insert_with(|| incoming.clone());

        if entry.threat_id != incoming.threat_id && now - entry.last_seen <= self.dedup_horizon {
            entry.merge(&incoming);
        } else if entry.threat_id != incoming.threat_id {
            *entry = incoming;
        }

        entry.clone()
    }

    pub fn get(&self, fingerprint: &str) -> Option<Threat> {
        self.by_fingerprint.get(fingerprint).map(|t| t.clone())
    }

    pub fn len(&self) -> usize {
        self.by_fingerprint.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_fingerprint.is_empty()
    }

    /// Drops in-memory dedup entries older than the horizon so the map
    /// doesn't grow unbounded; durable records are unaffected.
    pub fn compact(&self, now: DateTime<Utc>) {
        self.by_fingerprint.retain(|_, threat| now - threat.last_seen <= self.dedup_horizon);
    }
}
