// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for the order service
// ============================================================================
//
// Covers:
// - Orchestrator operations (outcome, latency)
// - Cache lookups and absorbed cache failures
// - Absorbed event publish failures
// - Change feed watchers and dropped records
//
// Each Metrics owns its own Registry so tests can build as many as they
// like without colliding on the global default registry.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Orchestrator Metrics
    pub operations_total: IntCounterVec,
    pub operation_duration: HistogramVec,
    pub concurrent_modifications: IntCounter,

    // Cache Metrics
    pub cache_requests: IntCounterVec,
    pub cache_errors: IntCounterVec,

    // Publisher Metrics
    pub publish_failures: IntCounterVec,

    // Change Feed Metrics
    pub active_watchers: IntGauge,
    pub records_dropped: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        // Orchestrator Metrics
        let operations_total = IntCounterVec::new(
            Opts::new("order_operations_total", "Orchestrator operations by outcome"),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let operation_duration = HistogramVec::new(
            HistogramOpts::new("order_operation_duration_seconds", "Orchestrator operation latency")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        let concurrent_modifications = IntCounter::new(
            "order_concurrent_modifications_total",
            "Writes rejected because the order changed since it was read",
        )?;
        registry.register(Box::new(concurrent_modifications.clone()))?;

        // Cache Metrics
        let cache_requests = IntCounterVec::new(
            Opts::new("order_cache_requests_total", "Cache lookups by result"),
            &["result"],
        )?;
        registry.register(Box::new(cache_requests.clone()))?;

        let cache_errors = IntCounterVec::new(
            Opts::new("order_cache_errors_total", "Cache failures absorbed by the orchestrator"),
            &["operation"],
        )?;
        registry.register(Box::new(cache_errors.clone()))?;

        // Publisher Metrics
        let publish_failures = IntCounterVec::new(
            Opts::new("order_event_publish_failures_total", "Event publish failures absorbed after commit"),
            &["event_type"],
        )?;
        registry.register(Box::new(publish_failures.clone()))?;

        // Change Feed Metrics
        let active_watchers = IntGauge::new("change_feed_active_watchers", "Open change feed sessions")?;
        registry.register(Box::new(active_watchers.clone()))?;

        let records_dropped = IntCounterVec::new(
            Opts::new("change_feed_records_dropped_total", "Change feed records skipped"),
            &["reason"],
        )?;
        registry.register(Box::new(records_dropped.clone()))?;

        Ok(Self {
            registry,
            operations_total,
            operation_duration,
            concurrent_modifications,
            cache_requests,
            cache_errors,
            publish_failures,
            active_watchers,
            records_dropped,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_operation(&self, operation: &str, outcome: &str, duration_secs: f64) {
        self.operations_total.with_label_values(&[operation, outcome]).inc();
        self.operation_duration.with_label_values(&[operation]).observe(duration_secs);
    }

    /// `result` is one of hit, miss, error.
    pub fn record_cache_lookup(&self, result: &str) {
        self.cache_requests.with_label_values(&[result]).inc();
    }

    pub fn record_cache_error(&self, operation: &str) {
        self.cache_errors.with_label_values(&[operation]).inc();
    }

    pub fn record_publish_failure(&self, event_type: &str) {
        self.publish_failures.with_label_values(&[event_type]).inc();
    }

    pub fn record_concurrent_modification(&self) {
        self.concurrent_modifications.inc();
    }

    pub fn record_dropped_record(&self, reason: &str) {
        self.records_dropped.with_label_values(&[reason]).inc();
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
