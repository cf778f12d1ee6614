use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockCategory {
    Blacklist,
    Rate,
    Geo,
    Signature,
    Anomaly,
    Rule,
    Intel,
}

/// A currently-effective block for a key, usually a `client_ip`.
/// Invariant: at most one active block per key; a later block supersedes an
/// earlier one by replacement (new `block_id`), never by mutating the old
/// one in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveBlock {
    pub block_id: String,
    pub key: String,
    pub reason: String,
    pub category: BlockCategory,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ActiveBlock {
    pub fn new(key: impl Into<String>, reason: impl Into<String>, category: BlockCategory, created_at: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            block_id: uuid::Uuid::new_v4().to_string(),
            key: key.into(),
            reason: reason.into(),
            category,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
