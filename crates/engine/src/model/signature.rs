use super::{Rule, Severity};
use serde::{Deserialize, Serialize};

/// An ordered, AND-combined set of rules identifying a known threat
/// pattern. Evaluated in descending `priority` at the cache layer;
/// individual rules are evaluated in declaration order with short-circuit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    pub signature_id: String,
    pub name: String,
    pub category: String,
    pub severity: Severity,
    pub confidence: f64,
    pub enabled: bool,
    pub priority: i32,
    pub rules: Vec<Rule>,
    pub signature_set: String,
}

impl Signature {
    pub fn new(signature_id: impl Into<String>, name: impl Into<String>, category: impl Into<String>, severity: Severity) -> Self {
        Self {
            signature_id: signature_id.into(),
            name: name.into(),
            category: category.into(),
            severity,
            confidence: 1.0,
            enabled: true,
            priority: 0,
            rules: Vec::new(),
            signature_set: "default".into(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }
}

/// The outcome of a matched signature, carrying just enough to build a
/// `Threat` and an event payload without re-borrowing the signature cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedSignature {
    pub signature_id: String,
    pub category: String,
    pub severity: Severity,
    pub confidence: f64,
    pub matched_field: String,
    pub matched_value: String,
}
