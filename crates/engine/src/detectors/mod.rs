//! Detectors (C1–C5): pure functions and small stateful trackers that turn
//! an [`crate::InspectionRequest`] and the cached rule/baseline snapshot
//! into findings for the arbiter. None of these hold a lock across an
//! `.await` point and none perform I/O.

pub mod anomaly_scorer;
pub mod behavioral_analyzer;
pub mod feature_extractor;
pub mod rate_tracker;
pub mod signature_matcher;

pub use anomaly_scorer::{AnomalyFinding, AnomalyScorer};
pub use behavioral_analyzer::{BehaviorFinding, BehaviorKind, BehavioralAnalyzer, EntityHistory};
pub use feature_extractor::extract_features;
pub use rate_tracker::{RateTier, RateTracker, RateVerdict};
pub use signature_matcher::{CompiledRegexes, MatchFields, SignatureMatcher};
