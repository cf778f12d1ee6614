use super::MetricsRegistry;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts};

/// Prometheus collectors for the inspection hot path: one collector field
/// per concern, registered together, recorded from call sites that already
/// have the label values at hand.
#[derive(Debug, Clone)]
pub struct EngineMetrics {
    pub inspections_total: IntCounterVec,
    pub inspection_duration_seconds: HistogramVec,
    pub detector_duration_seconds: HistogramVec,
    pub detector_failures_total: IntCounterVec,
    pub publish_dropped_total: IntCounterVec,
    pub cache_age_seconds: IntGauge,
    pub active_blocks: IntGauge,
    pub rate_tracker_cardinality: IntGauge,
}

impl EngineMetrics {
    pub fn new(namespace: &str) -> Result<Self, prometheus::Error> {
        let inspections_total = IntCounterVec::new(
            Opts::new("inspections_total", "Total inspections by verdict").namespace(namespace),
            &["verdict"],
        )?;

        let inspection_duration_seconds = HistogramVec::new(
            HistogramOpts::new("inspection_duration_seconds", "End-to-end inspection latency")
                .namespace(namespace)
                .buckets(vec![0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25]),
            &[],
        )?;

        let detector_duration_seconds = HistogramVec::new(
            HistogramOpts::new("detector_duration_seconds", "Per-detector latency")
                .namespace(namespace)
                .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1]),
            &["detector"],
        )?;

        let detector_failures_total = IntCounterVec::new(
            Opts::new("detector_failures_total", "Detector failures by detector").namespace(namespace),
            &["detector"],
        )?;

        let publish_dropped_total = IntCounterVec::new(
            Opts::new("publish_dropped_total", "Events dropped instead of published, by topic").namespace(namespace),
            &["topic"],
        )?;

        let cache_age_seconds = IntGauge::with_opts(Opts::new("cache_age_seconds", "Age of the baseline/rule cache").namespace(namespace))?;

        let active_blocks = IntGauge::with_opts(Opts::new("active_blocks", "Currently active blocks").namespace(namespace))?;

        let rate_tracker_cardinality =
            IntGauge::with_opts(Opts::new("rate_tracker_cardinality", "Distinct keys tracked by the rate tracker").namespace(namespace))?;

        Ok(Self {
            inspections_total,
            inspection_duration_seconds,
            detector_duration_seconds,
            detector_failures_total,
            publish_dropped_total,
            cache_age_seconds,
            active_blocks,
            rate_tracker_cardinality,
        })
    }

    pub fn register_all(&self, registry: &MetricsRegistry) -> Result<(), prometheus::Error> {
        registry.register(self.inspections_total.clone())?;
        registry.register(self.inspection_duration_seconds.clone())?;
        registry.register(self.detector_duration_seconds.clone())?;
        registry.register(self.detector_failures_total.clone())?;
        registry.register(self.publish_dropped_total.clone())?;
        registry.register(self.cache_age_seconds.clone())?;
        registry.register(self.active_blocks.clone())?;
        registry.register(self.rate_tracker_cardinality.clone())?;
        Ok(())
    }

    pub fn record_inspection(&self, verdict: &str, duration: std::time::Duration) {
        self.inspections_total.with_label_values(&[verdict]).inc();
        self.inspection_duration_seconds.with_label_values(&[] as &[&str]).observe(duration.as_secs_f64());
    }

    pub fn record_detector(&self, detector: &str, duration: std::time::Duration) {
        self.detector_duration_seconds.with_label_values(&[detector]).observe(duration.as_secs_f64());
    }

    pub fn record_detector_failure(&self, detector: &str) {
        self.detector_failures_total.with_label_values(&[detector]).inc();
    }

    pub fn record_publish_dropped(&self, topic: &str) {
        self.publish_dropped_total.with_label_values(&[topic]).inc();
    }
}
