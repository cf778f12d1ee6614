//! Request Inspection & Threat-Decision Engine.
//!
//! The online pipeline that takes each observed API request/response,
//! classifies it against signature, anomaly and behavioral detectors, and
//! emits an allow/block decision together with a durable threat record and a
//! stream of security events. HTTP routing, operator auth, the admin
//! console, gateway adapters and ingestion parsing are collaborators outside
//! this crate; see `repository` and `bus` for the trait seams they plug
//! into.

pub mod block_store;
pub mod bus;
pub mod cache;
pub mod clock;
pub mod config;
pub mod detectors;
pub mod engine;
pub mod error;
pub mod health;
pub mod metrics;
pub mod model;
pub mod publisher;
pub mod repository;
pub mod scheduler;
pub mod threat_store;

pub use clock::{Clock, SystemClock};
pub use config::EngineConfig;
pub use engine::{Engine, ListKind};
pub use error::{Error, ErrorCode, Result};
pub use health::{Health, HealthStatus};
pub use model::{
    ActiveBlock, BaselineProfile, Decision, Event, Features, InspectionRequest, Rule, Signature,
    Threat, Verdict,
};

pub use chrono::{DateTime, Utc};
pub use uuid::Uuid;
