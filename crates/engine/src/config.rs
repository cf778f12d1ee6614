//! Hierarchical configuration for the inspection engine.
//!
//! Loaded in order of increasing precedence:
//!
//! 1. `config/default.toml` - base values
//! 2. `config/{environment}.toml` - environment overrides (`ENVIRONMENT`, default `development`)
//! 3. Environment variables, prefixed `ENGINE_` with `__` as the nesting separator
//!
//! ```rust,no_run
//! use inspection_engine::EngineConfig;
//!
//! let config = EngineConfig::load().expect("failed to load configuration");
//! println!("fail_open: {}", config.runtime.fail_open);
//! ```

use crate::model::Severity;
use config::{ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub rate: RateConfig,
    pub brute_force: BruteForceConfig,
    pub block: BlockConfig,
    pub anomaly: AnomalyConfig,
    pub behavior: BehaviorConfig,
    pub threat: ThreatConfig,
    pub cache: CacheConfig,
    pub publish: PublishConfig,
    pub runtime: EngineRuntimeConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub max_connections: u32,
    pub stream_key: String,
}

/// One tier of the tiered DDoS detection ladder: a short, high-rate window
/// escalates severity ahead of the slower sustained-window check.
#[derive(Debug, Deserialize, Clone)]
pub struct RateTierConfig {
    pub window_seconds: u64,
    pub limit: u32,
    pub severity: Severity,
}

/// Sliding-window rate/volume tracking thresholds (C3).
#[derive(Debug, Deserialize, Clone)]
pub struct RateConfig {
    pub window_seconds: u64,
    pub burst_threshold: u32,
    pub sustained_threshold: u32,
    pub sustained_window_seconds: u64,
    #[serde(default)]
    pub tiers: Vec<RateTierConfig>,
}

/// Brute-force login detection thresholds, folded into C3's scope.
#[derive(Debug, Deserialize, Clone)]
pub struct BruteForceConfig {
    pub max_failed_attempts: u32,
    pub window_seconds: u64,
    pub auth_paths: Vec<String>,
}

/// Tiered block durations (C7), keyed by offense count within a rolling
/// horizon; `tier_seconds[i]` applies to the `(i+1)`th offense, the last
/// entry repeats for all further offenses.
#[derive(Debug, Deserialize, Clone)]
pub struct BlockConfig {
    pub tier_seconds: Vec<u64>,
    pub repeat_offense_window_seconds: u64,
    /// Minimum signature severity that turns a match into a block rather
    /// than a recorded-only threat.
    pub signature_block_severity: Severity,
    /// Minimum anomaly/behavioral severity that turns a finding into a
    /// block.
    pub anomaly_block_severity: Severity,
}

/// Statistical anomaly scoring thresholds (C4).
#[derive(Debug, Deserialize, Clone)]
pub struct AnomalyConfig {
    pub z_score_low: f64,
    pub z_score_medium: f64,
    pub z_score_high: f64,
    pub z_score_critical: f64,
    pub min_baseline_samples: u32,
}

/// Behavioral sequence analysis thresholds (C5).
#[derive(Debug, Deserialize, Clone)]
pub struct BehaviorConfig {
    pub sequence_window: usize,
    pub impossible_travel_window_seconds: i64,
    #[serde(default)]
    pub sensitive_paths: Vec<String>,
}

/// Threat Record Store dedup policy (C8).
#[derive(Debug, Deserialize, Clone)]
pub struct ThreatConfig {
    pub dedup_horizon_seconds: u64,
}

/// Baseline/rule cache refresh policy (C10).
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub refresh_interval_seconds: u64,
    pub stale_after_seconds: u64,
    #[serde(default = "default_signature_set")]
    pub signature_set: String,
}

fn default_signature_set() -> String {
    "default".to_string()
}

/// Event publishing policy (C9).
#[derive(Debug, Deserialize, Clone)]
pub struct PublishConfig {
    pub publish_timeout_ms: u64,
    pub max_retries: u32,
    pub queue_capacity: usize,
    pub workers: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineRuntimeConfig {
    pub environment: String,
    pub log_level: String,
    /// Whether a detector/store failure allows the request through (`true`)
    /// or blocks it (`false`). Defaults to `true` — see DESIGN.md.
    pub fail_open: bool,
    pub worker_concurrency: usize,
    pub maintenance_interval_seconds: u64,
    /// Soft budget for one `Inspect` call; exceeding it is logged and
    /// counted but never truncates a decision already reached, since every
    /// detector here is a synchronous, non-blocking function.
    pub hard_deadline_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
    pub path: String,
    pub namespace: String,
}

impl EngineConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let builder = config::Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            .add_source(Environment::with_prefix("ENGINE").separator("__"));

        let config = builder.build()?;
        let loaded: EngineConfig = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.database.url.starts_with("postgresql://") {
            return Err(ConfigError::Message(
                "database.url must be a PostgreSQL connection string starting with 'postgresql://'".to_string(),
            ));
        }

        if !self.redis.url.starts_with("redis://") {
            return Err(ConfigError::Message(
                "redis.url must be a Redis connection string starting with 'redis://'".to_string(),
            ));
        }

        if self.block.tier_seconds.is_empty() {
            return Err(ConfigError::Message("block.tier_seconds must have at least one tier".to_string()));
        }

        if self.rate.burst_threshold == 0 || self.rate.sustained_threshold == 0 {
            return Err(ConfigError::Message("rate thresholds must be non-zero".to_string()));
        }

        let levels = [
            self.anomaly.z_score_low,
            self.anomaly.z_score_medium,
            self.anomaly.z_score_high,
            self.anomaly.z_score_critical,
        ];
        if !levels.windows(2).all(|w| w[0] < w[1]) {
            return Err(ConfigError::Message(
                "anomaly z-score thresholds must be strictly increasing: low < medium < high < critical".to_string(),
            ));
        }

        if self.anomaly.min_baseline_samples == 0 {
            return Err(ConfigError::Message("anomaly.min_baseline_samples must be non-zero".to_string()));
        }

        if self.runtime.worker_concurrency == 0 {
            return Err(ConfigError::Message("runtime.worker_concurrency must be non-zero".to_string()));
        }

        Ok(())
    }
}

/// A fully-populated config for tests elsewhere in the crate that need an
/// `EngineConfig` without going through file/env loading.
#[cfg(test)]
pub(crate) fn sample() -> EngineConfig {
    tests::sample()
}
