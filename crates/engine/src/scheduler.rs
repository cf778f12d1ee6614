//! Maintenance Scheduler (C11): three independent cooperative timers —
//! block-store sweep, baseline/rule cache refresh, and rate-tracker
//! reap — each running on its own interval and each stoppable without
//! waiting on the others. Session/auth-token expiry is a collaborator
//! service's concern and is out of scope here.

use crate::block_store::BlockStore;
use crate::cache::BaselineRuleCache;
use crate::clock::Clock;
use crate::detectors::RateTracker;
use crate::repository::Repository;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub block_sweep_interval: StdDuration,
    pub cache_refresh_interval: StdDuration,
    pub rate_reap_interval: StdDuration,
    pub rate_reap_horizon: chrono::Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            block_sweep_interval: StdDuration::from_secs(60),
            cache_refresh_interval: StdDuration::from_secs(300),
            rate_reap_interval: StdDuration::from_secs(3600),
            rate_reap_horizon: chrono::Duration::hours(1),
        }
    }
}

/// One shutdown sender per timer so a caller can stop all three, or let
/// them run until the process exits.
pub struct MaintenanceScheduler {
    shutdown_txs: Vec<mpsc::Sender<()>>,
}

impl MaintenanceScheduler {
    /// Spawns the three timers and returns immediately. `clock` is used
    /// only to stamp the sweep/refresh calls; the interval itself always
    /// runs on wall-clock time via `tokio::time`.
    pub fn spawn(
        config: SchedulerConfig,
        block_store: Arc<BlockStore>,
        cache: Arc<BaselineRuleCache>,
        rate_tracker: Arc<RateTracker>,
        repository: Arc<dyn Repository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut shutdown_txs = Vec::with_capacity(3);

        shutdown_txs.push(Self::spawn_timer("block-sweep", config.block_sweep_interval, {
            let block_store = block_store.clone();
            let clock = clock.clone();
            move || {
                let block_store = block_store.clone();
                let clock = clock.clone();
                async move {
                    let removed = block_store.sweep(clock.now());
                    if !removed.is_empty() {
                        info!(count = removed.len(), "swept expired active blocks");
                    }
                }
            }
        }));

        shutdown_txs.push(Self::spawn_timer("cache-refresh", config.cache_refresh_interval, {
            let cache = cache.clone();
            let repository = repository.clone();
            let clock = clock.clone();
            move || {
                let cache = cache.clone();
                let repository = repository.clone();
                let clock = clock.clone();
                async move {
                    if let Err(err) = cache.refresh(repository.as_ref(), clock.now()).await {
                        warn!(error = %err, "scheduled cache refresh failed");
                    }
                }
            }
        }));

        shutdown_txs.push(Self::spawn_timer("rate-reap", config.rate_reap_interval, {
            let rate_tracker = rate_tracker.clone();
            let clock = clock.clone();
            let horizon = config.rate_reap_horizon;
            move || {
                let rate_tracker = rate_tracker.clone();
                let clock = clock.clone();
                async move {
                    let cutoff = clock.now() - horizon;
                    rate_tracker.reap_stale(cutoff);
                }
            }
        }));

        Self { shutdown_txs }
    }

    fn spawn_timer<F, Fut>(name: &'static str, interval: StdDuration, make_tick: F) -> mpsc::Sender<()>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        make_tick().await;
                    }
                    _ = shutdown_rx.recv() => {
                        info!(timer = name, "maintenance timer stopped");
                        break;
                    }
                }
            }
        });
        shutdown_tx
    }

    /// Signals every timer to stop and returns once the signals are
    /// sent; does not wait for the timers' in-flight tick to finish.
    pub async fn stop(&self) {
        for tx in &self.shutdown_txs {
            let _ = tx.send(()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::repository::InMemoryRepository;

    #[tokio::test]
    async fn sweeps_expired_blocks_on_its_own_interval() {
        let block_store = Arc::new(BlockStore::new());
        let clock = Arc::new(FixedClock::new(chrono::Utc::now()));
        let now = clock.now();
        block_store.put(crate::model::ActiveBlock::new(
            "1.2.3.4",
            "rate",
            crate::model::BlockCategory::Rate,
            now,
            chrono::Duration::milliseconds(1),
        ));

        let config = SchedulerConfig {
            block_sweep_interval: StdDuration::from_millis(20),
            cache_refresh_interval: StdDuration::from_secs(3600),
            rate_reap_interval: StdDuration::from_secs(3600),
            rate_reap_horizon: chrono::Duration::hours(1),
        };

        clock.advance(chrono::Duration::seconds(1));
        let scheduler = MaintenanceScheduler::spawn(
            config,
            block_store.clone(),
            Arc::new(BaselineRuleCache::new("")),
            Arc::new(RateTracker::new()),
            Arc::new(InMemoryRepository::new()),
            clock.clone(),
        );

        tokio::time::sleep(StdDuration::from_millis(80)).await;
        scheduler.stop().await;

        assert!(block_store.is_empty());
    }

    #[tokio::test]
    async fn stop_does_not_panic_when_called_once() {
        let scheduler = MaintenanceScheduler::spawn(
            SchedulerConfig {
                block_sweep_interval: StdDuration::from_secs(3600),
                cache_refresh_interval: StdDuration::from_secs(3600),
                rate_reap_interval: StdDuration::from_secs(3600),
                rate_reap_horizon: chrono::Duration::hours(1),
            },
            Arc::new(BlockStore::new()),
            Arc::new(BaselineRuleCache::new("")),
            Arc::new(RateTracker::new()),
            Arc::new(InMemoryRepository::new()),
            Arc::new(FixedClock::new(chrono::Utc::now())),
        );
        scheduler.stop().await;
    }
}
