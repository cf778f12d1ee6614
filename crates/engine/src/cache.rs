//! Baseline & Rule Cache (C10): a read-mostly snapshot of active
//! signatures (pre-sorted, regexes precompiled), IP whitelist/blacklist
//! sets, and per-entity baselines. A refresh swaps the whole snapshot
//! atomically via `ArcSwap`-style replacement (here: a `RwLock<Arc<_>>`,
//! replace-wholesale-never-mutate-in-place); readers always see one
//! consistent generation.

use crate::detectors::signature_matcher::CompiledRegexes;
use crate::error::{Error, Result};
use crate::model::{BaselineProfile, EntityType, Signature};
use crate::repository::{ListKind, Repository};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

pub struct CacheSnapshot {
    pub signatures: Vec<Signature>,
    pub regexes: CompiledRegexes,
    pub whitelist: HashSet<String>,
    pub blacklist: HashSet<String>,
    pub geo_block: HashSet<String>,
    pub baselines: HashMap<String, BaselineProfile>,
    pub loaded_at: DateTime<Utc>,
    pub load_warnings: Vec<String>,
}

pub struct BaselineRuleCache {
    snapshot: RwLock<Option<Arc<CacheSnapshot>>>,
    signature_set: String,
}

impl BaselineRuleCache {
    pub fn new(signature_set: impl Into<String>) -> Self {
        Self {
            snapshot: RwLock::new(None),
            signature_set: signature_set.into(),
        }
    }

    pub fn current(&self) -> Option<Arc<CacheSnapshot>> {
        self.snapshot.read().expect("cache lock poisoned").clone()
    }

    pub fn age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.current().map(|s| now - s.loaded_at)
    }

    /// Blocking initial load at startup; subsequent calls are the
    /// periodic/on-signal refresh path. Signatures with an unenabled or
    /// ill-formed rule set are dropped with a warning rather than
    /// disabling the whole signature silently.
    pub async fn refresh(&self, repository: &dyn Repository, now: DateTime<Utc>) -> Result<usize> {
        let mut signatures = repository.load_signatures(&self.signature_set).await?;
        signatures.retain(|s| s.rules.iter().all(|r| r.is_well_formed()));
        signatures.sort_by(|a, b| b.priority.cmp(&a.priority));

        let (regexes, warnings) = CompiledRegexes::build(&signatures);
        for warning in &warnings {
            warn!("{}", warning);
        }

        let whitelist = repository.load_ip_list(ListKind::Whitelist).await?;
        let blacklist = repository.load_ip_list(ListKind::Blacklist).await?;
        let geo_block = repository.load_ip_list(ListKind::GeoBlock).await?;

        let count = signatures.len();
        let snapshot = CacheSnapshot {
            signatures,
            regexes,
            whitelist,
            blacklist,
            geo_block,
            baselines: self.current().map(|s| s.baselines.clone()).unwrap_or_default(),
            loaded_at: now,
            load_warnings: warnings,
        };

        *self.snapshot.write().expect("cache lock poisoned") = Some(Arc::new(snapshot));
        info!(signature_count = count, "baseline/rule cache refreshed");
        Ok(count)
    }

    pub async fn refresh_baseline(&self, repository: &dyn Repository, entity_id: &str, entity_type: EntityType) -> Result<()> {
        let baseline = repository.load_baseline(entity_id, entity_type).await?;
        let Some(baseline) = baseline else { return Ok(()) };

        let current = self.current().ok_or_else(|| Error::cache_not_ready("cache has no snapshot to update a baseline into"))?;
        let mut baselines = current.baselines.clone();
        baselines.insert(entity_id.to_string(), baseline);

        let updated = CacheSnapshot {
            signatures: current.signatures.clone(),
            regexes: CompiledRegexes::build(&current.signatures).0,
            whitelist: current.whitelist.clone(),
            blacklist: current.blacklist.clone(),
            geo_block: current.geo_block.clone(),
            baselines,
            loaded_at: current.loaded_at,
            load_warnings: current.load_warnings.clone(),
        };

        *self.snapshot.write().expect("cache lock poisoned") = Some(Arc::new(updated));
        Ok(())
    }

    pub fn baseline_for(&self, entity_id: &str) -> Option<BaselineProfile> {
        self.current().and_then(|s| s.baselines.get(entity_id).cloned())
    }

    pub fn is_whitelisted(&self, ip: &str) -> bool {
        self.current().map(|s| s.whitelist.contains(ip)).unwrap_or(false)
    }

    pub fn is_blacklisted(&self, ip: &str) -> bool {
        self.current().map(|s| s.blacklist.contains(ip)).unwrap_or(false)
    }

    pub fn is_geo_blocked(&self, country: &str) -> bool {
        self.current().map(|s| s.geo_block.contains(country)).unwrap_or(false)
    }

    /// Applies an `AddToList`/`RemoveFromList` mutation to the in-memory
    /// snapshot immediately, ahead of the next periodic refresh. Callers
    /// are still expected to persist the change through the repository.
    pub fn patch_list(&self, kind: ListKind, key: &str, add: bool) -> Result<()> {
        let current = self.current().ok_or_else(|| Error::cache_not_ready("cache has no snapshot to patch"))?;

        let mut whitelist = current.whitelist.clone();
        let mut blacklist = current.blacklist.clone();
        let mut geo_block = current.geo_block.clone();
        let target = match kind {
            ListKind::Whitelist => &mut whitelist,
            ListKind::Blacklist => &mut blacklist,
            ListKind::GeoBlock => &mut geo_block,
        };
        if add {
            target.insert(key.to_string());
        } else {
            target.remove(key);
        }

        let updated = CacheSnapshot {
            signatures: current.signatures.clone(),
            regexes: CompiledRegexes::build(&current.signatures).0,
            whitelist,
            blacklist,
            geo_block,
            baselines: current.baselines.clone(),
            loaded_at: current.loaded_at,
            load_warnings: current.load_warnings.clone(),
        };

        *self.snapshot.write().expect("cache lock poisoned") = Some(Arc::new(updated));
        Ok(())
    }
}
