use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bodies larger than this are rejected with `InvalidInput` by the feature
/// extractor rather than fed into the pipeline.
pub const MAX_BODY_BYTES: usize = 256 * 1024;

/// One observed request/response pair. Immutable; owned by the caller until
/// `Inspect` returns — detectors borrow it, never retain it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionRequest {
    pub request_id: String,
    pub observed_at: DateTime<Utc>,
    pub client_ip: String,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub api_id: String,
    pub endpoint_id: String,
    pub method: String,
    pub path: String,
    pub query: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub response_status: Option<u16>,
    pub response_size: Option<u64>,
    pub response_time: Option<std::time::Duration>,
}

impl InspectionRequest {
    /// The best-available identity for baseline/dedup lookups: prefer
    /// `user_id`, else `session_id`, else `client_ip`.
    pub fn primary_identity(&self) -> &str {
        self.user_id
            .as_deref()
            .or(self.session_id.as_deref())
            .unwrap_or(&self.client_ip)
    }

    pub fn rate_key(&self) -> String {
        format!("{}:{}", self.client_ip, self.endpoint_id)
    }
}
