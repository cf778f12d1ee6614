use crate::config::MetricsConfig;
use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Thin wrapper around `prometheus::Registry`, kept separate from
/// [`super::EngineMetrics`] so the collectors themselves don't need to know
/// about text encoding or scrape endpoints.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    registry: Arc<Mutex<Registry>>,
    config: MetricsConfig,
}

impl MetricsRegistry {
    pub fn new(config: MetricsConfig) -> Self {
        let registry = Registry::new_custom(Some(config.namespace.clone()), None).unwrap_or_else(|_| {
            warn!("failed to create custom prometheus registry, falling back to default");
            Registry::new()
        });

        Self {
            registry: Arc::new(Mutex::new(registry)),
            config,
        }
    }

    pub fn register<T>(&self, collector: T) -> Result<(), prometheus::Error>
    where
        T: prometheus::core::Collector + 'static,
    {
        match self.registry.lock() {
            Ok(registry) => registry.register(Box::new(collector)),
            Err(_) => Err(prometheus::Error::Msg("failed to acquire registry lock".into())),
        }
    }

    pub fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.lock().map(|r| r.gather()).unwrap_or_default()
    }

    pub fn metrics_text(&self) -> String {
        let encoder = TextEncoder::new();
        let families = self.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&families, &mut buffer) {
            warn!("failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}

/// Serves the scrape endpoint's text body; the HTTP route itself lives in
/// the surrounding gateway service, out of scope here.
pub struct MetricsService {
    registry: MetricsRegistry,
}

impl MetricsService {
    pub fn new(registry: MetricsRegistry) -> Self {
        if registry.is_enabled() {
            info!("metrics enabled on path {}", registry.config.path);
        }
        Self { registry }
    }

    pub fn get_metrics(&self) -> String {
        if !self.registry.is_enabled() {
            return "# metrics disabled\n".to_string();
        }
        let mut response = format!(
            "# HELP inspection_engine_info build information\n# TYPE inspection_engine_info gauge\ninspection_engine_info{{version=\"{}\"}} 1\n",
            env!("CARGO_PKG_VERSION")
        );
        response.push_str(&self.registry.metrics_text());
        response
    }

    pub fn registry(&self) -> &MetricsRegistry {
        &self.registry
    }
}
