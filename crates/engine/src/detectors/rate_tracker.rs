//! Rate/Volume Tracker (C3): fixed-window counters per `(client_ip,
//! endpoint_id)`, a separate failed-auth window per `client_ip`, and
//! optional tiered DDoS thresholds for escalating severity on short
//! bursts. Safe for concurrent readers/writers via per-key sharding
//! (`DashMap`); no detector holds its lock across an `.await`.

use crate::clock::Clock;
use crate::model::Severity;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone)]
pub struct RateTier {
    pub window_seconds: u64,
    pub limit: u32,
    pub severity: Severity,
}

#[derive(Debug)]
struct Window {
    window_start: DateTime<Utc>,
    count: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateVerdict {
    Ok { count: u64 },
    BurstExceeded { count: u64, severity: Severity },
    SustainedExceeded { count: u64 },
}

/// One sliding-window tracker instance; the engine owns one for request
/// volume and one for failed-auth counts.
#[derive(Debug, Default)]
pub struct RateTracker {
    windows: DashMap<String, Window>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Increments the counter for `key`, resetting the window if
    /// `window_len` has elapsed, and returns whether the limit was
    /// exceeded by this increment.
    pub fn record(&self, key: &str, window_len: chrono::Duration, limit: u32, clock: &dyn Clock) -> RateVerdict {
        let now = clock.now();

        let still_fresh = self.windows.get(key).map(|window| now - window.window_start <= window_len).unwrap_or(false);

        let count = if still_fresh {
            self.windows.get(key).map(|window| window.count.fetch_add(1, Ordering::SeqCst) + 1).unwrap_or(1)
        } else {
            self.windows.insert(
                key.to_string(),
                Window {
                    window_start: now,
                    count: AtomicU64::new(1),
                },
            );
            1
        };

        if count > limit as u64 {
            RateVerdict::SustainedExceeded { count }
        } else {
            RateVerdict::Ok { count }
        }
    }

    /// Tiered DDoS check: records against each tier's own window/limit and
    /// returns the highest-severity tier exceeded, if any. Tiers let short
    /// high-rate bursts (e.g. 10 req/5s) escalate severity ahead of the
    /// slower sustained-window check.
    pub fn record_tiered(&self, key: &str, tiers: &[RateTier], clock: &dyn Clock) -> Option<RateVerdict> {
        let mut worst: Option<(Severity, RateVerdict)> = None;

        for tier in tiers {
            let tier_key = format!("{}:tier:{}", key, tier.window_seconds);
            let verdict = self.record(&tier_key, chrono::Duration::seconds(tier.window_seconds as i64), tier.limit, clock);
            if let RateVerdict::SustainedExceeded { count } = verdict {
                let burst = RateVerdict::BurstExceeded { count, severity: tier.severity };
                if worst.as_ref().map(|(s, _)| tier.severity > *s).unwrap_or(true) {
                    worst = Some((tier.severity, burst));
                }
            }
        }

        worst.map(|(_, verdict)| verdict)
    }

    /// Removes windows untouched since before `cutoff`, bounding memory
    /// for clients that stop sending traffic.
    pub fn reap_stale(&self, cutoff: DateTime<Utc>) {
        self.windows.retain(|_, window| window.window_start >= cutoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    #[test]
    fn sustained_window_resets_after_elapsed() {
        let tracker = RateTracker::new();
        let clock = FixedClock::new(Utc::now());
        let window = chrono::Duration::seconds(60);

        for _ in 0..100 {
            let verdict = tracker.record("198.51.100.7:E1", window, 100, &clock);
            assert!(matches!(verdict, RateVerdict::Ok { .. }));
        }

        let verdict = tracker.record("198.51.100.7:E1", window, 100, &clock);
        assert_eq!(verdict, RateVerdict::SustainedExceeded { count: 101 });

        clock.advance(chrono::Duration::seconds(61));
        let verdict = tracker.record("198.51.100.7:E1", window, 100, &clock);
        assert_eq!(verdict, RateVerdict::Ok { count: 1 });
    }

    #[test]
    fn tiered_burst_escalates_severity() {
        let tracker = RateTracker::new();
        let clock = FixedClock::new(Utc::now());
        let tiers = vec![
            RateTier { window_seconds: 5, limit: 10, severity: Severity::High },
            RateTier { window_seconds: 60, limit: 100, severity: Severity::Medium },
        ];

        let mut last = None;
        for _ in 0..11 {
            last = tracker.record_tiered("192.0.2.1", &tiers, &clock);
        }

        assert_eq!(last, Some(RateVerdict::BurstExceeded { count: 11, severity: Severity::High }));
    }

    #[test]
    fn reap_stale_removes_old_windows() {
        let tracker = RateTracker::new();
        let clock = FixedClock::new(Utc::now());
        tracker.record("a", chrono::Duration::seconds(60), 100, &clock);
        assert_eq!(tracker.len(), 1);
        clock.advance(chrono::Duration::hours(2));
        tracker.reap_stale(clock.now() - chrono::Duration::hours(1));
        assert_eq!(tracker.len(), 0);
    }
}
