//! Statistical Anomaly Scorer (C4): z-score and ratio tests against a
//! persisted baseline. Pure function of `(Features, BaselineProfile,
//! recent counts)`; no I/O.

use crate::model::{BaselineProfile, Features, Severity};
use statrs::distribution::{ContinuousCDF, Normal};

#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyFinding {
    pub kind: String,
    pub feature: Option<String>,
    pub z_score: Option<f64>,
    pub severity: Severity,
    pub confidence: f64,
    pub description: String,
}

pub struct AnomalyScorer {
    pub z_threshold: f64,
}

impl AnomalyScorer {
    pub fn new(z_threshold: f64) -> Self {
        Self { z_threshold }
    }

    pub fn score(&self, features: &Features, baseline: &BaselineProfile, recent_request_count: f64, recent_response_time: Option<f64>, current_country: Option<&str>) -> Vec<AnomalyFinding> {
        let mut findings = Vec::new();

        for (feature, stat) in &baseline.numeric_stats {
            if stat.std <= 0.0 {
                continue;
            }
            if let Some(value) = features.number(feature) {
                let z = (value - stat.mean) / stat.std;
                if z.abs() > self.z_threshold {
                    findings.push(self.z_score_finding(feature, z));
                }
            }
        }

        if baseline.baseline_request_rate > 0.0 {
            let ratio = recent_request_count / baseline.baseline_request_rate;
            if !(0.1..=5.0).contains(&ratio) {
                findings.push(AnomalyFinding {
                    kind: "volume_anomaly".to_string(),
                    feature: None,
                    z_score: None,
                    severity: if ratio > 10.0 { Severity::High } else { Severity::Medium },
                    confidence: self.confidence(ratio.log2().abs()),
                    description: format!("request volume ratio {:.2} outside [0.1, 5.0]", ratio),
                });
            }
        }

        if baseline.response_time_mean > 0.0 {
            if let Some(response_time) = recent_response_time {
                let ratio = response_time / baseline.response_time_mean;
                if ratio > 3.0 {
                    findings.push(AnomalyFinding {
                        kind: "response_time_anomaly".to_string(),
                        feature: None,
                        z_score: None,
                        severity: Severity::Medium,
                        confidence: self.confidence(ratio),
                        description: format!("response time {:.0}ms is {:.1}x baseline", response_time, ratio),
                    });
                }
            }
        }

        if !baseline.countries.is_empty() {
            if let Some(country) = current_country {
                if !baseline.countries.contains(country) {
                    findings.push(AnomalyFinding {
                        kind: "geo_anomaly".to_string(),
                        feature: None,
                        z_score: None,
                        severity: Severity::Medium,
                        confidence: 0.7,
                        description: format!("country {} not in historical set", country),
                    });
                }
            }
        }

        findings
    }

    fn z_score_finding(&self, feature: &str, z: f64) -> AnomalyFinding {
        AnomalyFinding {
            kind: "z_score_anomaly".to_string(),
            feature: Some(feature.to_string()),
            z_score: Some(z),
            severity: Severity::from_z_score(z.abs()),
            confidence: self.confidence(z.abs()),
            description: format!("feature {} z-score {:.2} exceeds threshold {:.2}", feature, z, self.z_threshold),
        }
    }

    /// Sigmoid-shaped confidence over the absolute deviation, using the
    /// standard normal CDF rather than a hand-rolled logistic curve: a
    /// deviation of 3 already yields high confidence, asymptoting to 1.0.
    fn confidence(&self, abs_deviation: f64) -> f64 {
        let normal = Normal::new(0.0, 1.0).expect("standard normal parameters are always valid");
        (2.0 * (normal.cdf(abs_deviation) - 0.5)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityType, NumericStat};
    use std::collections::HashMap;

    fn baseline_with_stat(feature: &str, mean: f64, std: f64) -> BaselineProfile {
        let mut baseline = BaselineProfile::empty("u1", EntityType::User);
        baseline.numeric_stats.insert(feature.to_string(), NumericStat { mean, std });
        baseline
    }

    #[test]
    fn flags_feature_exceeding_z_threshold() {
        let scorer = AnomalyScorer::new(3.0);
        let baseline = baseline_with_stat("request_size", 100.0, 10.0);
        let mut features = Features::new();
        features.insert(crate::model::features::keys::REQUEST_SIZE, crate::model::FeatureValue::Number(200.0));
        let findings = scorer.score(&features, &baseline, 0.0, None, None);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, "z_score_anomaly");
    }

    #[test]
    fn zero_std_feature_never_flags() {
        let scorer = AnomalyScorer::new(3.0);
        let baseline = baseline_with_stat("request_size", 100.0, 0.0);
        let mut features = Features::new();
        features.insert(crate::model::features::keys::REQUEST_SIZE, crate::model::FeatureValue::Number(10_000.0));
        assert!(scorer.score(&features, &baseline, 0.0, None, None).is_empty());
    }

    #[test]
    fn volume_ratio_outside_band_flags() {
        let scorer = AnomalyScorer::new(3.0);
        let mut baseline = BaselineProfile::empty("u1", EntityType::User);
        baseline.baseline_request_rate = 10.0;
        let features = Features::new();
        let findings = scorer.score(&features, &baseline, 60.0, None, None);
        assert!(findings.iter().any(|f| f.kind == "volume_anomaly"));
    }

    #[test]
    fn unseen_country_flags_when_history_nonempty() {
        let scorer = AnomalyScorer::new(3.0);
        let mut baseline = BaselineProfile::empty("u1", EntityType::User);
        baseline.countries.insert("US".to_string());
        let features = Features::new();
        let findings = scorer.score(&features, &baseline, 0.0, None, Some("RU"));
        assert!(findings.iter().any(|f| f.kind == "geo_anomaly"));
    }
}
