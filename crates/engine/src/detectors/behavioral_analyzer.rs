//! Behavioral Analyzer (C5): compares the current request against a
//! per-entity `BaselineProfile` and a short in-memory history of recent
//! paths/countries for that entity. Baselines themselves are refreshed out
//! of band (C10); this module only reads them.

use crate::model::{BaselineProfile, Features, Severity};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorKind {
    UnusualHour,
    UnusualEndpoint,
    UnusualMethod,
    ResponseTimeAnomaly,
    EndpointScanning,
    SensitiveEndpointAccess,
    SuspiciousMethodSequence,
    ImpossibleTravel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorFinding {
    pub kind: BehaviorKind,
    pub severity: Severity,
    pub description: String,
}

/// Bounded per-entity history the hot path reads and appends to; this is
/// the "recent path sequence" and "previous country" state, kept separate
/// from the persisted baseline so updates don't require a cache swap.
#[derive(Debug, Clone)]
pub struct EntityHistory {
    pub recent_paths: VecDeque<String>,
    pub recent_methods: VecDeque<String>,
    pub last_country: Option<String>,
    pub last_observed_at: Option<DateTime<Utc>>,
    window: usize,
}

impl EntityHistory {
    pub fn new(window: usize) -> Self {
        Self {
            recent_paths: VecDeque::with_capacity(window),
            recent_methods: VecDeque::with_capacity(window),
            last_country: None,
            last_observed_at: None,
            window,
        }
    }

    pub fn record(&mut self, path: &str, method: &str, country: Option<&str>, observed_at: DateTime<Utc>) {
        self.recent_paths.push_back(path.to_string());
        if self.recent_paths.len() > self.window {
            self.recent_paths.pop_front();
        }

        self.recent_methods.push_back(method.to_string());
        if self.recent_methods.len() > self.window {
            self.recent_methods.pop_front();
        }

        self.last_country = country.map(|c| c.to_string()).or(self.last_country.take());
        self.last_observed_at = Some(observed_at);
    }
}

pub struct BehavioralAnalyzer {
    pub sequence_window: usize,
    pub impossible_travel_window: chrono::Duration,
    pub sensitive_paths: Vec<String>,
}

const SUSPICIOUS_SEQUENCES: &[&[&str]] = &[&["GET", "DELETE"], &["POST", "DELETE"], &["GET", "PUT", "DELETE"], &["OPTIONS", "POST"]];

impl BehavioralAnalyzer {
    pub fn new(sequence_window: usize, impossible_travel_window: chrono::Duration, sensitive_paths: Vec<String>) -> Self {
        Self {
            sequence_window,
            impossible_travel_window,
            sensitive_paths,
        }
    }

    pub fn analyze(&self, features: &Features, baseline: &BaselineProfile, history: &EntityHistory, current_country: Option<&str>, current_observed_at: DateTime<Utc>) -> Vec<BehaviorFinding> {
        let mut findings = Vec::new();

        if let Some(hour) = features.number(crate::model::features::keys::HOUR_OF_DAY) {
            if baseline.is_unusual_hour(hour as u8) {
                findings.push(BehaviorFinding {
                    kind: BehaviorKind::UnusualHour,
                    severity: Severity::Low,
                    description: format!("hour {} not within normal access hours", hour as u8),
                });
            }
        }

        if let Some(path) = features.text(crate::model::features::keys::PATH) {
            if !baseline.endpoint_freq.is_empty() && !baseline.endpoint_freq.contains_key(path) {
                findings.push(BehaviorFinding {
                    kind: BehaviorKind::UnusualEndpoint,
                    severity: Severity::Low,
                    description: format!("endpoint {} not seen in baseline", path),
                });
            }

            if self.sensitive_paths.iter().any(|prefix| path.starts_with(prefix.as_str())) {
                findings.push(BehaviorFinding {
                    kind: BehaviorKind::SensitiveEndpointAccess,
                    severity: Severity::Medium,
                    description: format!("access to sensitive path {}", path),
                });
            }
        }

        if let Some(method) = features.text(crate::model::features::keys::METHOD) {
            if !baseline.method_freq.is_empty() {
                let freq = baseline.method_freq.get(method).copied().unwrap_or(0.0);
                if freq < 0.1 {
                    findings.push(BehaviorFinding {
                        kind: BehaviorKind::UnusualMethod,
                        severity: Severity::Low,
                        description: format!("method {} used in only {:.1}% of baseline traffic", method, freq * 100.0),
                    });
                }
            }
        }

        if let Some(response_time) = features.number(crate::model::features::keys::RESPONSE_TIME_MS) {
            if baseline.response_time_mean > 0.0 && response_time >= baseline.response_time_mean * 2.0 {
                findings.push(BehaviorFinding {
                    kind: BehaviorKind::ResponseTimeAnomaly,
                    severity: Severity::Low,
                    description: format!("response time {:.0}ms is >=2x baseline {:.0}ms", response_time, baseline.response_time_mean),
                });
            }
        }

        let unique_recent_paths: std::collections::HashSet<&String> = history.recent_paths.iter().collect();
        if history.recent_paths.len() >= self.sequence_window.min(3) && unique_recent_paths.len() >= 3 {
            findings.push(BehaviorFinding {
                kind: BehaviorKind::EndpointScanning,
                severity: Severity::Medium,
                description: format!("{} unique endpoints hit in last {} requests", unique_recent_paths.len(), history.recent_paths.len()),
            });
        }

        if let Some(kind) = self.suspicious_method_sequence(&history.recent_methods) {
            findings.push(kind);
        }

        if let (Some(previous), Some(current)) = (&history.last_country, current_country) {
            if previous != current {
                if let Some(last_seen) = history.last_observed_at {
                    if current_observed_at - last_seen < self.impossible_travel_window {
                        findings.push(BehaviorFinding {
                            kind: BehaviorKind::ImpossibleTravel,
                            severity: Severity::Critical,
                            description: format!("country changed {} -> {} in {}", previous, current, current_observed_at - last_seen),
                        });
                    }
                }
            }
        }

        findings
    }

    fn suspicious_method_sequence(&self, recent_methods: &VecDeque<String>) -> Option<BehaviorFinding> {
        let methods: Vec<&str> = recent_methods.iter().map(String::as_str).collect();
        for pattern in SUSPICIOUS_SEQUENCES {
            if methods.len() >= pattern.len() && &methods[methods.len() - pattern.len()..] == *pattern {
                return Some(BehaviorFinding {
                    kind: BehaviorKind::SuspiciousMethodSequence,
                    severity: Severity::Medium,
                    description: format!("suspicious method sequence {}", pattern.join("->")),
                });
            }
        }
        None
    }
}
