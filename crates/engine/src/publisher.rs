//! Event Publisher (C9): one bounded queue per topic, each topic further
//! split into `workers` key-hashed shards so a single drain task per
//! shard is enough to guarantee per-key ordering even when several
//! workers are draining the same topic concurrently. Publication never
//! blocks the hot path — a full shard drops the oldest queued event (not
//! the one being published) and `publish_dropped_total` is incremented;
//! `Health` surfaces the per-topic depth and the drop rate.

use crate::bus::EventBus;
use crate::metrics::EngineMetrics;
use crate::model::{Event, EventType};
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, warn};

const TOPICS: [EventType; 5] = [
    EventType::ThreatEvents,
    EventType::AnomalyEvents,
    EventType::BehaviorEvents,
    EventType::SignatureEvents,
    EventType::AttackBlockingEvents,
];

struct Outbound {
    topic: &'static str,
    key: String,
    bytes: Vec<u8>,
}

/// One FIFO drained by at most one worker; a key hashes to the same shard
/// every time, so ordering within a key only needs "one worker per
/// shard", not a lock held across the whole topic.
struct Shard {
    capacity: usize,
    queue: Mutex<VecDeque<Outbound>>,
    notify: Notify,
}

impl Shard {
    fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), queue: Mutex::new(VecDeque::new()), notify: Notify::new() }
    }

    /// Enqueues `item`, discarding the oldest queued event first if the
    /// shard is already at capacity. Returns the topic of whatever was
    /// discarded, if anything.
    fn push(&self, item: Outbound) -> Option<&'static str> {
        let dropped = {
            let mut queue = self.queue.lock().expect("publisher shard lock poisoned");
            let dropped = if queue.len() >= self.capacity { queue.pop_front().map(|e| e.topic) } else { None };
            queue.push_back(item);
            dropped
        };
        self.notify.notify_one();
        dropped
    }

    fn pop(&self) -> Option<Outbound> {
        self.queue.lock().expect("publisher shard lock poisoned").pop_front()
    }

    fn len(&self) -> usize {
        self.queue.lock().expect("publisher shard lock poisoned").len()
    }
}

fn shard_index(key: &str, shard_count: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() as usize) % shard_count
}

pub struct Publisher {
    topics: HashMap<&'static str, Vec<Arc<Shard>>>,
    dropped_total: Arc<AtomicU64>,
    shutdown_txs: Vec<mpsc::Sender<()>>,
}

impl Publisher {
    /// Spawns `workers` drain tasks per topic, one per shard, each fed by
    /// its own bounded queue of `queue_capacity`. A key always hashes to
    /// the same shard within its topic, so the single worker behind that
    /// shard is what actually preserves per-key submission order;
    /// `workers` only controls how many independent shards — and thus how
    /// much unrelated-key concurrency — a topic gets.
    pub fn spawn(bus: Arc<dyn EventBus>, metrics: Arc<EngineMetrics>, queue_capacity: usize, workers: usize) -> Self {
        let shard_count = workers.max(1);
        let dropped_total = Arc::new(AtomicU64::new(0));
        let mut topics = HashMap::with_capacity(TOPICS.len());
        let mut shutdown_txs = Vec::new();

        for event_type in TOPICS {
            let topic = event_type.topic();
            let shards: Vec<Arc<Shard>> = (0..shard_count).map(|_| Arc::new(Shard::new(queue_capacity))).collect();

            for (shard_id, shard) in shards.iter().cloned().enumerate().take(workers) {
                let bus = bus.clone();
                let metrics = metrics.clone();
                let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
                shutdown_txs.push(shutdown_tx);

                tokio::spawn(async move {
                    loop {
                        while let Some(item) = shard.pop() {
                            Self::deliver(bus.as_ref(), &metrics, item, topic, shard_id).await;
                        }
                        tokio::select! {
                            _ = shard.notify.notified() => {}
                            _ = shutdown_rx.recv() => {
                                while let Some(item) = shard.pop() {
                                    Self::deliver(bus.as_ref(), &metrics, item, topic, shard_id).await;
                                }
                                break;
                            }
                        }
                    }
                });
            }

            topics.insert(topic, shards);
        }

        Self { topics, dropped_total, shutdown_txs }
    }

    async fn deliver(bus: &dyn EventBus, metrics: &EngineMetrics, item: Outbound, topic: &'static str, shard_id: usize) {
        if let Err(err) = bus.produce(item.topic, &item.key, item.bytes).await {
            warn!(shard_id, topic, error = %err, "event bus produce failed");
            metrics.record_publish_dropped(item.topic);
        } else {
            debug!(shard_id, topic, "published event");
        }
    }

    /// Non-blocking publish: serializes `event` and always enqueues it,
    /// evicting the oldest queued event on that key's shard if it was
    /// already full. Returns `false` when an eviction happened.
    pub fn publish(&self, event: &Event, metrics: &EngineMetrics) -> bool {
        let bytes = match serde_json::to_vec(event) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, "failed to serialize event for publish");
                return false;
            }
        };

        let topic = event.topic();
        let Some(shards) = self.topics.get(topic) else {
            warn!(topic, "publish for a topic with no configured queue");
            return false;
        };

        let shard = &shards[shard_index(&event.key, shards.len())];
        let outbound = Outbound { topic, key: event.key.clone(), bytes };

        match shard.push(outbound) {
            None => true,
            Some(dropped_topic) => {
                self.dropped_total.fetch_add(1, Ordering::Relaxed);
                metrics.record_publish_dropped(dropped_topic);
                false
            }
        }
    }

    pub fn dropped_total(&self) -> u64 {
        self.dropped_total.load(Ordering::Relaxed)
    }

    /// Current per-topic queue depth, summed across shards, for `Health`.
    pub fn queue_depths(&self) -> HashMap<String, u64> {
        self.topics
            .iter()
            .map(|(topic, shards)| (topic.to_string(), shards.iter().map(|s| s.len() as u64).sum()))
            .collect()
    }

    /// Signals every drain task to finish its shard and stop; does not
    /// wait for in-flight deliveries to complete.
    pub async fn stop(&self) {
        for tx in &self.shutdown_txs {
            let _ = tx.send(()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::InMemoryEventBus;
    use crate::model::EventType;

    #[tokio::test]
    async fn publishes_to_the_bus() {
        let bus = Arc::new(InMemoryEventBus::new());
        let metrics = Arc::new(EngineMetrics::new("test_publisher").unwrap());
        let publisher = Publisher::spawn(bus.clone(), metrics.clone(), 16, 1);

        let event = Event::new(EventType::ThreatEvents, "203.0.113.5", serde_json::json!({"x": 1}), chrono::Utc::now());
        assert!(publisher.publish(&event, &metrics));

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(bus.published().await.len(), 1);
    }

    #[tokio::test]
    async fn drops_oldest_when_the_shard_is_full() {
        let bus = Arc::new(InMemoryEventBus::new());
        let metrics = Arc::new(EngineMetrics::new("test_publisher_drop").unwrap());
        // zero workers: nothing ever drains, so a capacity-1 shard must
        // start evicting from the second publish onward.
        let publisher = Publisher::spawn(bus.clone(), metrics.clone(), 1, 0);

        let event = |n: u32| Event::new(EventType::ThreatEvents, "k", serde_json::json!({ "n": n }), chrono::Utc::now());
        assert!(publisher.publish(&event(1), &metrics));
        assert!(!publisher.publish(&event(2), &metrics));
        assert!(!publisher.publish(&event(3), &metrics));

        assert_eq!(publisher.dropped_total(), 2);
    }

    #[tokio::test]
    async fn preserves_per_key_order_with_multiple_workers() {
        let bus = Arc::new(InMemoryEventBus::new());
        let metrics = Arc::new(EngineMetrics::new("test_publisher_ordering").unwrap());
        // Four drain workers per topic, matching the shipped default, but
        // every event below shares one key so they all land on the same
        // shard and must reach the bus in submission order.
        let publisher = Publisher::spawn(bus.clone(), metrics.clone(), 64, 4);

        for n in 0..20u32 {
            let event = Event::new(EventType::ThreatEvents, "203.0.113.9", serde_json::json!({ "n": n }), chrono::Utc::now());
            assert!(publisher.publish(&event, &metrics));
        }

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let published = bus.published_on("threat_events").await;
        assert_eq!(published.len(), 20);

        let sequence: Vec<u32> = published
            .iter()
            .map(|bytes| serde_json::from_slice::<serde_json::Value>(bytes).unwrap()["payload"]["n"].as_u64().unwrap() as u32)
            .collect();
        let expected: Vec<u32> = (0..20).collect();
        assert_eq!(sequence, expected);
    }

    #[tokio::test]
    async fn different_topics_get_independent_queue_depths() {
        let bus = Arc::new(InMemoryEventBus::new());
        let metrics = Arc::new(EngineMetrics::new("test_publisher_depths").unwrap());
        let publisher = Publisher::spawn(bus.clone(), metrics.clone(), 4, 0);

        publisher.publish(&Event::new(EventType::ThreatEvents, "a", serde_json::json!({}), chrono::Utc::now()), &metrics);
        publisher.publish(&Event::new(EventType::AnomalyEvents, "b", serde_json::json!({}), chrono::Utc::now()), &metrics);
        publisher.publish(&Event::new(EventType::AnomalyEvents, "c", serde_json::json!({}), chrono::Utc::now()), &metrics);

        let depths = publisher.queue_depths();
        assert_eq!(depths.get("threat_events"), Some(&1));
        assert_eq!(depths.get("anomaly_events"), Some(&2));
    }
}
