use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Ip,
    User,
    Session,
    Endpoint,
}

/// A feature's learned `(mean, std)` against which live values are
/// z-scored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NumericStat {
    pub mean: f64,
    pub std: f64,
}

/// Persisted "normal behavior" statistics for one entity. Populated by a
/// separate batch training job and a bounded observation
/// queue — never mutated synchronously on the hot path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineProfile {
    pub entity_id: String,
    pub entity_type: EntityType,
    pub access_hours: HashSet<u8>,
    pub method_freq: HashMap<String, f64>,
    pub endpoint_freq: HashMap<String, f64>,
    pub expected_sequence: Vec<String>,
    pub response_time_mean: f64,
    pub numeric_stats: HashMap<String, NumericStat>,
    pub countries: HashSet<String>,
    pub last_updated: DateTime<Utc>,
    /// Baseline request-rate used by C4's volume-ratio test.
    pub baseline_request_rate: f64,
}

impl BaselineProfile {
    pub fn empty(entity_id: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            entity_id: entity_id.into(),
            entity_type,
            access_hours: HashSet::new(),
            method_freq: HashMap::new(),
            endpoint_freq: HashMap::new(),
            expected_sequence: Vec::new(),
            response_time_mean: 0.0,
            numeric_stats: HashMap::new(),
            countries: HashSet::new(),
            last_updated: Utc::now(),
            baseline_request_rate: 0.0,
        }
    }

    /// An hour counts as unusual when it falls outside ±2 of every observed access hour.
    pub fn is_unusual_hour(&self, hour: u8) -> bool {
        if self.access_hours.is_empty() {
            return false;
        }
        !self.access_hours.iter().any(|h| hour_distance(*h, hour) <= 2)
    }
}

fn hour_distance(a: u8, b: u8) -> u8 {
    let diff = (a as i16 - b as i16).unsigned_abs() as u8;
    diff.min(24 - diff)
}
