//! Prometheus counters for the pipeline loops and the aggregation cache.
//!
//! The registry is built once in `main` and handed to each component, which
//! records one outcome label per processed item.

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::info;

/// Metrics registry shared by the collector, relay, ingester and aggregation engine
pub struct MetricsRegistry {
    registry: Registry,

    pub collector_events_total: IntCounterVec,
    pub relay_transactions_total: IntCounterVec,
    pub ingester_transactions_total: IntCounterVec,
    pub ingester_program_metrics_total: IntCounterVec,
    pub ingester_processing_duration: HistogramVec,
    pub aggregation_cache_total: IntCounterVec,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let collector_events_total = IntCounterVec::new(
            Opts::new("collector_events_total", "Client events seen by the collector, by outcome"),
            &["outcome"],
        )?;

        let relay_transactions_total = IntCounterVec::new(
            Opts::new("relay_transactions_total", "Transactions handled by the relay, by outcome"),
            &["outcome"],
        )?;

        let ingester_transactions_total = IntCounterVec::new(
            Opts::new("ingester_transactions_total", "Transactions handled by the ingester, by outcome"),
            &["outcome"],
        )?;

        let ingester_program_metrics_total = IntCounterVec::new(
            Opts::new(
                "ingester_program_metrics_total",
                "Per-instruction program metric writes, by sink and outcome",
            ),
            &["sink", "outcome"],
        )?;

        let ingester_processing_duration = HistogramVec::new(
            HistogramOpts::new(
                "ingester_processing_duration_seconds",
                "Time spent ingesting one transaction",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            &["outcome"],
        )?;

        let aggregation_cache_total = IntCounterVec::new(
            Opts::new("aggregation_cache_total", "Aggregation cache lookups, by scope and result"),
            &["scope", "result"],
        )?;

        registry.register(Box::new(collector_events_total.clone()))?;
        registry.register(Box::new(relay_transactions_total.clone()))?;
        registry.register(Box::new(ingester_transactions_total.clone()))?;
        registry.register(Box::new(ingester_program_metrics_total.clone()))?;
        registry.register(Box::new(ingester_processing_duration.clone()))?;
        registry.register(Box::new(aggregation_cache_total.clone()))?;

        info!("Prometheus metrics registry initialized with 6 pipeline metrics");

        Ok(Self {
            registry,
            collector_events_total,
            relay_transactions_total,
            ingester_transactions_total,
            ingester_program_metrics_total,
            ingester_processing_duration,
            aggregation_cache_total,
        })
    }

    /// Export metrics in Prometheus text format
    pub fn export_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        encoder.encode(&metric_families, &mut buffer)?;

        String::from_utf8(buffer)
            .map_err(|e| prometheus::Error::Msg(format!("UTF-8 encoding error: {}", e)))
    }

    pub fn record_collector_event(&self, outcome: &str) {
        self.collector_events_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_relay_transaction(&self, outcome: &str) {
        self.relay_transactions_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_ingested_transaction(&self, outcome: &str, duration_seconds: f64) {
        self.ingester_transactions_total.with_label_values(&[outcome]).inc();
        self.ingester_processing_duration
            .with_label_values(&[outcome])
            .observe(duration_seconds);
    }

    pub fn record_program_metric(&self, sink: &str, outcome: &str) {
        self.ingester_program_metrics_total
            .with_label_values(&[sink, outcome])
            .inc();
    }

    pub fn record_cache_lookup(&self, scope: &str, hit: bool) {
        let result = if hit { "hit" } else { "miss" };
        self.aggregation_cache_total
            .with_label_values(&[scope, result])
            .inc();
    }
}
