use super::{Error, ErrorCategory, ErrorSeverity};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Tracks error occurrences for `Health()`'s "detector transient ratio" and
/// the `degraded`/`unhealthy` thresholds. Lock-free on the hot path —
/// readers and writers both go through `DashMap`'s sharded buckets.
#[derive(Debug, Default)]
pub struct ErrorMetrics {
    by_category: DashMap<ErrorCategory, AtomicU64>,
    by_severity: DashMap<ErrorSeverity, AtomicU64>,
    total: AtomicU64,
}

impl ErrorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, error: &Error) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.by_category
            .entry(error.category())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
        self.by_severity
            .entry(error.severity)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn count_for(&self, category: ErrorCategory) -> u64 {
        self.by_category
            .get(&category)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Ratio of detector-transient errors to all recorded errors; used by
    /// `Health` to decide `degraded` vs `healthy`.
    pub fn detector_transient_ratio(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.count_for(ErrorCategory::Detector) as f64 / total as f64
    }
}
