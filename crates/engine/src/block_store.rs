//! Active-Block Store (C7): a TTL-indexed map of currently-blocking keys.
//! Reads are lock-free relative to sweeps; a sweep takes each shard's
//! write lock only long enough to drop expired entries. At most one
//! active block per key — `put` replaces, it never mutates in place.

use crate::clock::Clock;
use crate::model::{ActiveBlock, BlockCategory};
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct BlockStore {
    blocks: DashMap<String, ActiveBlock>,
}

impl BlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the active block for `key`, re-checking `expires_at`
    /// against `now` so a reader never acts on a stale entry even if the
    /// sweep hasn't run yet.
    pub fn get(&self, key: &str, clock: &dyn Clock) -> Option<ActiveBlock> {
        self.blocks.get(key).filter(|b| b.is_active(clock.now())).map(|b| b.clone())
    }

    /// Idempotent by key: a block with a later expiry replaces the
    /// existing one; an earlier or equal expiry is a no-op.
    pub fn put(&self, block: ActiveBlock) {
        match self.blocks.get(&block.key) {
            Some(existing) if existing.expires_at >= block.expires_at => {}
            _ => {
                self.blocks.insert(block.key.clone(), block);
            }
        }
    }

    pub fn unblock(&self, key: &str) -> bool {
        self.blocks.remove(key).is_some()
    }

    /// Removes every entry expired as of `now`. Returns the removed
    /// blocks so the caller can emit `unblocked` events for each.
    pub fn sweep(&self, now: chrono::DateTime<chrono::Utc>) -> Vec<ActiveBlock> {
        let expired: Vec<String> = self.blocks.iter().filter(|entry| !entry.is_active(now)).map(|entry| entry.key().clone()).collect();

        let mut removed = Vec::with_capacity(expired.len());
        for key in expired {
            if let Some((_, block)) = self.blocks.remove(&key) {
                removed.push(block);
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn reload(&self, blocks: Vec<ActiveBlock>) {
        self.blocks.clear();
        for block in blocks {
            self.blocks.insert(block.key.clone(), block);
        }
    }

    pub fn category_of(&self, key: &str, clock: &dyn Clock) -> Option<BlockCategory> {
        self.get(key, clock).map(|b| b.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::Utc;

    #[test]
    fn put_ignores_block_with_earlier_expiry() {
        let store = BlockStore::new();
        let now = Utc::now();
        let long = ActiveBlock::new("1.2.3.4", "rate", BlockCategory::Rate, now, chrono::Duration::hours(1));
        let short = ActiveBlock::new("1.2.3.4", "rate", BlockCategory::Rate, now, chrono::Duration::minutes(1));
        store.put(long.clone());
        store.put(short);
        let clock = FixedClock::new(now);
        assert_eq!(store.get("1.2.3.4", &clock).unwrap().block_id, long.block_id);
    }

    #[test]
    fn sweep_removes_expired_and_returns_them() {
        let store = BlockStore::new();
        let now = Utc::now();
        let block = ActiveBlock::new("1.2.3.4", "rate", BlockCategory::Rate, now, chrono::Duration::minutes(1));
        store.put(block);
        let removed = store.sweep(now + chrono::Duration::minutes(2));
        assert_eq!(removed.len(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn get_filters_expired_before_sweep_runs() {
        let store = BlockStore::new();
        let now = Utc::now();
        let block = ActiveBlock::new("1.2.3.4", "rate", BlockCategory::Rate, now, chrono::Duration::minutes(1));
        store.put(block);
        let clock = FixedClock::new(now + chrono::Duration::minutes(2));
        assert!(store.get("1.2.3.4", &clock).is_none());
        assert_eq!(store.len(), 1); // still present until swept
    }
}
