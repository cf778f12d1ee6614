//! The Event Bus: the engine's one outbound dependency for publishing
//! decisions and threats. Per-key ordering and at-least-once delivery are
//! the bus's contract; the engine only promises it calls `produce` in the
//! order events were handed to it for a given key.

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

#[async_trait]
pub trait EventBus: Send + Sync {
    async fn produce(&self, topic: &str, key: &str, bytes: Vec<u8>) -> Result<()>;
}

/// Deterministic in-process double: records every publish in arrival
/// order, per topic.
#[derive(Debug, Default)]
pub struct InMemoryEventBus {
    published: RwLock<Vec<(String, String, Vec<u8>)>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn published(&self) -> Vec<(String, String, Vec<u8>)> {
        self.published.read().await.clone()
    }

    pub async fn published_on(&self, topic: &str) -> Vec<Vec<u8>> {
        self.published
            .read()
            .await
            .iter()
            .filter(|(t, _, _)| t == topic)
            .map(|(_, _, payload)| payload.clone())
            .collect()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn produce(&self, topic: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.published.write().await.push((topic.to_string(), key.to_string(), bytes));
        Ok(())
    }
}

#[cfg(feature = "redis-bus")]
pub mod redis_streams {
    use super::*;
    use crate::error::Error;
    use redis::{aio::ConnectionManager, AsyncCommands};
    use tracing::debug;

    /// `redis::aio::ConnectionManager`-backed `EventBus`, publishing to
    /// Redis Streams (`XADD`) keyed by topic.
    pub struct RedisEventBus {
        conn: Arc<RwLock<ConnectionManager>>,
        stream_prefix: String,
    }

    impl RedisEventBus {
        pub fn new(conn: ConnectionManager, stream_prefix: impl Into<String>) -> Self {
            Self {
                conn: Arc::new(RwLock::new(conn)),
                stream_prefix: stream_prefix.into(),
            }
        }

        fn stream_name(&self, topic: &str) -> String {
            format!("{}:{}", self.stream_prefix, topic)
        }
    }

    #[async_trait]
    impl EventBus for RedisEventBus {
        async fn produce(&self, topic: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
            let stream = self.stream_name(topic);
            debug!(stream = %stream, key, "publishing to redis stream");
            let mut conn = self.conn.write().await;
            conn.xadd::<_, _, _, _, ()>(&stream, "*", &[("key", key.as_bytes()), ("payload", bytes.as_slice())])
                .await
                .map_err(Error::from)?;
            Ok(())
        }
    }
}

#[cfg(feature = "redis-bus")]
pub use redis_streams::RedisEventBus;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_bus_preserves_per_key_order() {
        let bus = InMemoryEventBus::new();
        bus.produce("threat_events", "203.0.113.5", b"e1".to_vec()).await.unwrap();
        bus.produce("threat_events", "203.0.113.5", b"e2".to_vec()).await.unwrap();
        let published = bus.published_on("threat_events").await;
        assert_eq!(published, vec![b"e1".to_vec(), b"e2".to_vec()]);
    }
}
