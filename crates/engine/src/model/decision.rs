use super::BlockCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Allow,
    Block,
}

/// The engine's synchronous answer to one `Inspect` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub request_id: String,
    pub verdict: Verdict,
    pub reason: String,
    pub category: Option<BlockCategory>,
    pub block_id: Option<String>,
    pub blocked_until: Option<DateTime<Utc>>,
    pub threats: Vec<String>,
    pub processing_time: std::time::Duration,
}

impl Decision {
    pub fn allow(request_id: impl Into<String>, reason: impl Into<String>, processing_time: std::time::Duration) -> Self {
        Self {
            request_id: request_id.into(),
            verdict: Verdict::Allow,
            reason: reason.into(),
            category: None,
            block_id: None,
            blocked_until: None,
            threats: Vec::new(),
            processing_time,
        }
    }

    pub fn block(
        request_id: impl Into<String>,
        reason: impl Into<String>,
        category: BlockCategory,
        block_id: impl Into<String>,
        blocked_until: DateTime<Utc>,
        processing_time: std::time::Duration,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            verdict: Verdict::Block,
            reason: reason.into(),
            category: Some(category),
            block_id: Some(block_id.into()),
            blocked_until: Some(blocked_until),
            threats: Vec::new(),
            processing_time,
        }
    }

    pub fn with_threats(mut self, threats: Vec<String>) -> Self {
        self.threats = threats;
        self
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self.verdict, Verdict::Block)
    }
}
