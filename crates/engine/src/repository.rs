//! The Rule/Baseline Repository: the engine's one outbound dependency on
//! durable storage. Signatures, IP lists and baselines are read; threats
//! and active-block changes are written. Wire format and schema are the
//! caller's concern — the engine only needs the trait.

use crate::error::Result;
use crate::model::{ActiveBlock, BaselineProfile, EntityType, Signature, Threat};
use async_trait::async_trait;
use chrono::Duration;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Whitelist,
    Blacklist,
    /// Blocked country codes for the cache's geo-blocking set. Not an
    /// `AddToList`/`RemoveFromList` target — admin-managed out of band.
    GeoBlock,
}

#[async_trait]
pub trait Repository: Send + Sync {
    async fn load_signatures(&self, signature_set: &str) -> Result<Vec<Signature>>;
    async fn load_ip_list(&self, kind: ListKind) -> Result<HashSet<String>>;
    async fn load_baseline(&self, entity_id: &str, entity_type: EntityType) -> Result<Option<BaselineProfile>>;
    async fn persist_threat(&self, threat: &Threat) -> Result<()>;
    async fn persist_active_block_change(&self, block: &ActiveBlock) -> Result<()>;
    async fn recent_counts(&self, key: &str, window: Duration) -> Result<u64>;
    /// Adds (`add = true`) or removes (`add = false`) `key` from the given
    /// list. Idempotent: adding an already-present key, or removing an
    /// absent one, succeeds without changing anything.
    async fn persist_ip_list_change(&self, kind: ListKind, key: &str, reason: &str, add: bool) -> Result<()>;
}

/// Deterministic in-process double used by tests and embeddable
/// single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    signatures: RwLock<Vec<Signature>>,
    whitelist: RwLock<HashSet<String>>,
    blacklist: RwLock<HashSet<String>>,
    geo_block: RwLock<HashSet<String>>,
    baselines: RwLock<HashMap<String, BaselineProfile>>,
    threats: RwLock<Vec<Threat>>,
    blocks: RwLock<Vec<ActiveBlock>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_signatures(&self, signatures: Vec<Signature>) {
        *self.signatures.write().await = signatures;
    }

    pub async fn seed_whitelist(&self, ips: impl IntoIterator<Item = String>) {
        self.whitelist.write().await.extend(ips);
    }

    pub async fn seed_blacklist(&self, ips: impl IntoIterator<Item = String>) {
        self.blacklist.write().await.extend(ips);
    }

    pub async fn seed_geo_block(&self, countries: impl IntoIterator<Item = String>) {
        self.geo_block.write().await.extend(countries);
    }

    pub async fn seed_baseline(&self, profile: BaselineProfile) {
        self.baselines.write().await.insert(profile.entity_id.clone(), profile);
    }

    pub async fn persisted_threats(&self) -> Vec<Threat> {
        self.threats.read().await.clone()
    }

    pub async fn persisted_blocks(&self) -> Vec<ActiveBlock> {
        self.blocks.read().await.clone()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn load_signatures(&self, signature_set: &str) -> Result<Vec<Signature>> {
        Ok(self
            .signatures
            .read()
            .await
            .iter()
            .filter(|s| s.signature_set == signature_set || signature_set.is_empty())
            .cloned()
            .collect())
    }

    async fn load_ip_list(&self, kind: ListKind) -> Result<HashSet<String>> {
        Ok(match kind {
            ListKind::Whitelist => self.whitelist.read().await.clone(),
            ListKind::Blacklist => self.blacklist.read().await.clone(),
            ListKind::GeoBlock => self.geo_block.read().await.clone(),
        })
    }

    async fn load_baseline(&self, entity_id: &str, _entity_type: EntityType) -> Result<Option<BaselineProfile>> {
        Ok(self.baselines.read().await.get(entity_id).cloned())
    }

    async fn persist_threat(&self, threat: &Threat) -> Result<()> {
        let mut threats = self.threats.write().await;
        if let Some(existing) = threats.iter_mut().find(|t| t.fingerprint == threat.fingerprint) {
            existing.merge(threat);
        } else {
            threats.push(threat.clone());
        }
        Ok(())
    }

    async fn persist_active_block_change(&self, block: &ActiveBlock) -> Result<()> {
        let mut blocks = self.blocks.write().await;
        blocks.retain(|b| b.key != block.key);
        blocks.push(block.clone());
        Ok(())
    }

    async fn recent_counts(&self, _key: &str, _window: Duration) -> Result<u64> {
        Ok(0)
    }

    async fn persist_ip_list_change(&self, kind: ListKind, key: &str, _reason: &str, add: bool) -> Result<()> {
        let list = match kind {
            ListKind::Whitelist => &self.whitelist,
            ListKind::Blacklist => &self.blacklist,
            ListKind::GeoBlock => &self.geo_block,
        };
        let mut list = list.write().await;
        if add {
            list.insert(key.to_string());
        } else {
            list.remove(key);
        }
        Ok(())
    }
}

#[cfg(feature = "postgres-repository")]
pub mod postgres {
    use super::*;
    use crate::error::Error;
    use sqlx::{PgPool, Row};
    use tracing::{debug, info};

    /// `sqlx::PgPool`-backed `Repository`. A single pool, no multi-tenant
    /// schema concept: the engine has one signature set, one IP-list pair,
    /// one baseline table.
    pub struct PgRepository {
        pool: Arc<PgPool>,
    }

    impl PgRepository {
        pub fn new(pool: Arc<PgPool>) -> Self {
            Self { pool }
        }

        pub async fn initialize(&self) -> Result<()> {
            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS threats (
                    threat_id TEXT PRIMARY KEY,
                    fingerprint TEXT NOT NULL,
                    threat_type TEXT NOT NULL,
                    severity TEXT NOT NULL,
                    status TEXT NOT NULL,
                    first_seen TIMESTAMPTZ NOT NULL,
                    last_seen TIMESTAMPTZ NOT NULL,
                    count BIGINT NOT NULL,
                    confidence DOUBLE PRECISION NOT NULL,
                    risk_score DOUBLE PRECISION NOT NULL,
                    indicators JSONB NOT NULL,
                    context JSONB NOT NULL
                );
                CREATE UNIQUE INDEX IF NOT EXISTS idx_threats_fingerprint ON threats (fingerprint);

                CREATE TABLE IF NOT EXISTS active_blocks (
                    block_id TEXT PRIMARY KEY,
                    key TEXT NOT NULL,
                    reason TEXT NOT NULL,
                    category TEXT NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL,
                    expires_at TIMESTAMPTZ NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_active_blocks_key ON active_blocks (key);

                CREATE TABLE IF NOT EXISTS ip_lists (
                    ip TEXT NOT NULL,
                    kind TEXT NOT NULL,
                    reason TEXT NOT NULL DEFAULT '',
                    PRIMARY KEY (ip, kind)
                );
                "#,
            )
            .execute(self.pool.as_ref())
            .await?;
            info!("repository tables initialized");
            Ok(())
        }
    }

    #[async_trait]
    impl Repository for PgRepository {
        async fn load_signatures(&self, signature_set: &str) -> Result<Vec<Signature>> {
            let rows = sqlx::query("SELECT payload FROM signatures WHERE signature_set = $1 AND enabled = true")
                .bind(signature_set)
                .fetch_all(self.pool.as_ref())
                .await?;

            rows.into_iter()
                .map(|row| {
                    let payload: serde_json::Value = row.try_get("payload")?;
                    serde_json::from_value(payload).map_err(Error::from)
                })
                .collect()
        }

        async fn load_ip_list(&self, kind: ListKind) -> Result<HashSet<String>> {
            let kind_str = match kind {
                ListKind::Whitelist => "whitelist",
                ListKind::Blacklist => "blacklist",
                ListKind::GeoBlock => "geo_block",
            };
            let rows = sqlx::query("SELECT ip FROM ip_lists WHERE kind = $1")
                .bind(kind_str)
                .fetch_all(self.pool.as_ref())
                .await?;
            Ok(rows.into_iter().filter_map(|r| r.try_get::<String, _>("ip").ok()).collect())
        }

        async fn load_baseline(&self, entity_id: &str, entity_type: EntityType) -> Result<Option<BaselineProfile>> {
            let row = sqlx::query("SELECT payload FROM baselines WHERE entity_id = $1 AND entity_type = $2")
                .bind(entity_id)
                .bind(format!("{:?}", entity_type).to_lowercase())
                .fetch_optional(self.pool.as_ref())
                .await?;

            match row {
                Some(row) => {
                    let payload: serde_json::Value = row.try_get("payload")?;
                    Ok(Some(serde_json::from_value(payload)?))
                }
                None => Ok(None),
            }
        }

        async fn persist_threat(&self, threat: &Threat) -> Result<()> {
            debug!(fingerprint = %threat.fingerprint, "persisting threat");
            sqlx::query(
                r#"
                INSERT INTO threats (threat_id, fingerprint, threat_type, severity, status, first_seen, last_seen, count, confidence, risk_score, indicators, context)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ON CONFLICT (fingerprint) DO UPDATE SET
                    last_seen = EXCLUDED.last_seen,
                    count = threats.count + 1,
                    risk_score = GREATEST(threats.risk_score, EXCLUDED.risk_score),
                    confidence = GREATEST(threats.confidence, EXCLUDED.confidence)
                "#,
            )
            .bind(&threat.threat_id)
            .bind(&threat.fingerprint)
            .bind(&threat.threat_type)
            .bind(format!("{:?}", threat.severity).to_lowercase())
            .bind(format!("{:?}", threat.status).to_lowercase())
            .bind(threat.first_seen)
            .bind(threat.last_seen)
            .bind(threat.count as i64)
            .bind(threat.confidence)
            .bind(threat.risk_score)
            .bind(serde_json::to_value(&threat.indicators)?)
            .bind(&threat.context)
            .execute(self.pool.as_ref())
            .await?;
            Ok(())
        }

        async fn persist_active_block_change(&self, block: &ActiveBlock) -> Result<()> {
            sqlx::query(
                r#"
                INSERT INTO active_blocks (block_id, key, reason, category, created_at, expires_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (block_id) DO UPDATE SET expires_at = EXCLUDED.expires_at
                "#,
            )
            .bind(&block.block_id)
            .bind(&block.key)
            .bind(&block.reason)
            .bind(format!("{:?}", block.category).to_lowercase())
            .bind(block.created_at)
            .bind(block.expires_at)
            .execute(self.pool.as_ref())
            .await?;
            Ok(())
        }

        async fn recent_counts(&self, key: &str, window: Duration) -> Result<u64> {
            let since = chrono::Utc::now() - window;
            let row = sqlx::query("SELECT COUNT(*) AS c FROM active_blocks WHERE key = $1 AND created_at >= $2")
                .bind(key)
                .bind(since)
                .fetch_one(self.pool.as_ref())
                .await?;
            let count: i64 = row.try_get("c")?;
            Ok(count.max(0) as u64)
        }

        async fn persist_ip_list_change(&self, kind: ListKind, key: &str, reason: &str, add: bool) -> Result<()> {
            let kind_str = match kind {
                ListKind::Whitelist => "whitelist",
                ListKind::Blacklist => "blacklist",
                ListKind::GeoBlock => "geo_block",
            };
            if add {
                sqlx::query("INSERT INTO ip_lists (ip, kind, reason) VALUES ($1, $2, $3) ON CONFLICT (ip, kind) DO UPDATE SET reason = EXCLUDED.reason")
                    .bind(key)
                    .bind(kind_str)
                    .bind(reason)
                    .execute(self.pool.as_ref())
                    .await?;
            } else {
                sqlx::query("DELETE FROM ip_lists WHERE ip = $1 AND kind = $2")
                    .bind(key)
                    .bind(kind_str)
                    .execute(self.pool.as_ref())
                    .await?;
            }
            Ok(())
        }
    }
}

#[cfg(feature = "postgres-repository")]
pub use postgres::PgRepository;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;

    #[tokio::test]
    async fn in_memory_repository_round_trips_lists() {
        let repo = InMemoryRepository::new();
        repo.seed_whitelist(["198.51.100.1".to_string()]).await;
        let whitelist = repo.load_ip_list(ListKind::Whitelist).await.unwrap();
        assert!(whitelist.contains("198.51.100.1"));
    }

    #[tokio::test]
    async fn ip_list_change_is_idempotent() {
        let repo = InMemoryRepository::new();
        repo.persist_ip_list_change(ListKind::Blacklist, "203.0.113.9", "manual", true).await.unwrap();
        repo.persist_ip_list_change(ListKind::Blacklist, "203.0.113.9", "manual", true).await.unwrap();
        assert_eq!(repo.load_ip_list(ListKind::Blacklist).await.unwrap().len(), 1);

        repo.persist_ip_list_change(ListKind::Blacklist, "203.0.113.9", "manual", false).await.unwrap();
        repo.persist_ip_list_change(ListKind::Blacklist, "203.0.113.9", "manual", false).await.unwrap();
        assert!(repo.load_ip_list(ListKind::Blacklist).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn persist_threat_merges_by_fingerprint() {
        let repo = InMemoryRepository::new();
        let now = chrono::Utc::now();
        let threat = Threat::new("sql_injection", "203.0.113.5", Some("sig1"), Severity::High, 0.9, 8.0, now);
        repo.persist_threat(&threat).await.unwrap();
        repo.persist_threat(&threat).await.unwrap();
        let stored = repo.persisted_threats().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].count, 2);
    }
}
