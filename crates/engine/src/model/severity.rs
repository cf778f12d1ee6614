use serde::{Deserialize, Serialize};

/// Shared severity ordering used by signatures, behavioral findings and
/// threats alike. `Ord` is derived from declaration order so
/// `Severity::Critical > Severity::High` etc., which is what lets merging
/// two threats always keep the higher severity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Maps `|z|` to severity: `|z|≥5 critical, ≥4 high, ≥3
    /// medium, ≥2 low, else info`.
    pub fn from_z_score(abs_z: f64) -> Self {
        if abs_z >= 5.0 {
            Severity::Critical
        } else if abs_z >= 4.0 {
            Severity::High
        } else if abs_z >= 3.0 {
            Severity::Medium
        } else if abs_z >= 2.0 {
            Severity::Low
        } else {
            Severity::Info
        }
    }

    pub fn max(self, other: Self) -> Self {
        std::cmp::max(self, other)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
