use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::apdex::{ApdexCounts, ApdexThresholds, EmptyBucketPolicy};
use super::buckets::{bucket_width, BucketWindow};
use super::cache::SnapshotCache;
use super::errors::AggregationError;
use super::AggregationConfig;
use crate::metrics::MetricsRegistry;
use crate::model::{ErrorPoint, LatencyKind, PerformanceSeries, ProgramShare, SeriesPoint};
use crate::postgres::DetailRepository;
use crate::timeseries::point::{
    ERROR_TAG, PROGRAMS_MEASUREMENT, PROGRAM_ADDRESS_TAG, RPC_TIME_FIELD, SOLANA_TIME_FIELD,
    TRANSACTIONS_MEASUREMENT,
};
use crate::timeseries::{Aggregate, SeriesQuery, SeriesRecord, TimeSeriesStore};

/// Apdex of a bucket without samples
pub const APDEX_EMPTY_BUCKET: EmptyBucketPolicy = EmptyBucketPolicy::Perfect;
/// Error rate of a bucket without samples
pub const ERROR_RATE_EMPTY_BUCKET: EmptyBucketPolicy = EmptyBucketPolicy::Zero;

/// Which slice of the metrics a query covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricScope {
    Global,
    Program(String),
}

impl MetricScope {
    fn measurement(&self) -> &'static str {
        match self {
            MetricScope::Global => TRANSACTIONS_MEASUREMENT,
            MetricScope::Program(_) => PROGRAMS_MEASUREMENT,
        }
    }

    fn query(&self, window: &BucketWindow) -> SeriesQuery {
        let query = SeriesQuery::new(self.measurement(), window.start(), window.stop()).window(bucket_width());
        match self {
            MetricScope::Global => query,
            MetricScope::Program(address) => query.tag(PROGRAM_ADDRESS_TAG, address.as_str()),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            MetricScope::Global => "global",
            MetricScope::Program(_) => "program",
        }
    }
}

/// Everything the global dashboard shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalSnapshot {
    pub performance: PerformanceSeries,
    pub throughput: Vec<SeriesPoint<i64>>,
    pub apdex: Vec<SeriesPoint<f64>>,
    pub errors: Vec<ErrorPoint>,
}

/// Everything the per-program dashboard shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramSnapshot {
    pub performance: PerformanceSeries,
    pub throughput: Vec<SeriesPoint<i64>>,
    pub apdex: Vec<SeriesPoint<f64>>,
}

/// Metrics Aggregation Engine.
///
/// Every series it returns is dense: one point per 30-minute slot of the
/// lookback, whatever the store had to say about that slot.
pub struct MetricsEngine {
    store: Arc<dyn TimeSeriesStore>,
    details: Arc<dyn DetailRepository>,
    config: AggregationConfig,
    global_cache: SnapshotCache<(), GlobalSnapshot>,
    program_cache: SnapshotCache<String, ProgramSnapshot>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl MetricsEngine {
    pub fn new(store: Arc<dyn TimeSeriesStore>, details: Arc<dyn DetailRepository>, config: AggregationConfig) -> Self {
        let ttl = StdDuration::from_secs(config.cache_ttl_seconds);
        info!(
            "✅ Aggregation engine ready (global lookback {}m, program lookback {}m, cache ttl {}s)",
            config.global_lookback_minutes, config.program_lookback_minutes, config.cache_ttl_seconds
        );

        Self {
            store,
            details,
            config,
            global_cache: SnapshotCache::new(ttl),
            program_cache: SnapshotCache::new(ttl),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Global snapshot, served from cache while fresh
    pub async fn global_snapshot(&self) -> Result<GlobalSnapshot, AggregationError> {
        if let Some(snapshot) = self.global_cache.get(&()).await {
            self.record_cache(&MetricScope::Global, true);
            return Ok(snapshot);
        }
        self.record_cache(&MetricScope::Global, false);

        let snapshot = self.compute_global(Utc::now()).await?;
        self.global_cache.insert((), snapshot.clone()).await;
        Ok(snapshot)
    }

    /// Per-program snapshot, cached per program address
    pub async fn program_snapshot(&self, program: &str) -> Result<ProgramSnapshot, AggregationError> {
        let scope = MetricScope::Program(program.to_string());
        if let Some(snapshot) = self.program_cache.get(&program.to_string()).await {
            self.record_cache(&scope, true);
            return Ok(snapshot);
        }
        self.record_cache(&scope, false);

        let snapshot = self.compute_program(program, Utc::now()).await?;
        self.program_cache.insert(program.to_string(), snapshot.clone()).await;
        Ok(snapshot)
    }

    pub async fn compute_global(&self, now: DateTime<Utc>) -> Result<GlobalSnapshot, AggregationError> {
        let window = BucketWindow::ending_at(now, self.config.global_lookback())?;
        let scope = MetricScope::Global;

        let snapshot = GlobalSnapshot {
            performance: self.performance(&scope, &window).await?,
            throughput: self.throughput(&scope, &window).await?,
            apdex: self.apdex(&scope, &window, &self.config.global_apdex).await?,
            errors: self.error_rate(&window).await?,
        };
        debug!("🧠 Computed global snapshot over {} buckets", window.len());
        Ok(snapshot)
    }

    pub async fn compute_program(&self, program: &str, now: DateTime<Utc>) -> Result<ProgramSnapshot, AggregationError> {
        let window = BucketWindow::ending_at(now, self.config.program_lookback())?;
        let scope = MetricScope::Program(program.to_string());

        let snapshot = ProgramSnapshot {
            performance: self.performance(&scope, &window).await?,
            throughput: self.throughput(&scope, &window).await?,
            apdex: self.apdex(&scope, &window, &self.config.program_apdex).await?,
        };
        debug!(program = %program, "🧠 Computed program snapshot over {} buckets", window.len());
        Ok(snapshot)
    }

    /// Mean RPC and settlement latency per bucket
    pub async fn performance(&self, scope: &MetricScope, window: &BucketWindow) -> Result<PerformanceSeries, AggregationError> {
        let query = scope
            .query(window)
            .field(RPC_TIME_FIELD)
            .field(SOLANA_TIME_FIELD)
            .aggregate(Aggregate::Mean);
        let records = self.store.query(&query).await?;

        let mut series = PerformanceSeries {
            rpc: window.dense(0.0),
            solana: window.dense(0.0),
        };
        for record in records {
            let target = match LatencyKind::from_field(&record.field) {
                Some(LatencyKind::RpcTime) => &mut series.rpc,
                Some(LatencyKind::SolanaTime) => &mut series.solana,
                None => {
                    warn!(field = %record.field, "unexpected field in performance query");
                    continue;
                }
            };
            if let Some(slot) = matched_slot(window, &record) {
                target[slot].value = record.value;
            }
        }
        Ok(series)
    }

    /// Number of metrics per bucket
    pub async fn throughput(&self, scope: &MetricScope, window: &BucketWindow) -> Result<Vec<SeriesPoint<i64>>, AggregationError> {
        let query = scope
            .query(window)
            .field(SOLANA_TIME_FIELD)
            .aggregate(Aggregate::Count);
        let records = self.store.query(&query).await?;

        let mut series = window.dense(0i64);
        for record in records {
            if let Some(slot) = matched_slot(window, &record) {
                series[slot].value += record.value.round() as i64;
            }
        }
        Ok(series)
    }

    /// Apdex of settlement latency per bucket, classifying every raw sample
    pub async fn apdex(
        &self,
        scope: &MetricScope,
        window: &BucketWindow,
        thresholds: &ApdexThresholds,
    ) -> Result<Vec<SeriesPoint<f64>>, AggregationError> {
        let query = scope.query(window).field(SOLANA_TIME_FIELD);
        let samples = self.store.query(&query).await?;

        let mut counts = vec![ApdexCounts::default(); window.len()];
        for sample in samples {
            match window.containing(sample.time) {
                Some(slot) => counts[slot].classify(sample.value, thresholds),
                None => warn!(time = %sample.time, "apdex sample outside the lookback window"),
            }
        }

        Ok(window
            .slots()
            .zip(counts)
            .map(|(time, counts)| SeriesPoint {
                time,
                value: counts.score(APDEX_EMPTY_BUCKET),
            })
            .collect())
    }

    /// Failed / total transactions per bucket
    pub async fn error_rate(&self, window: &BucketWindow) -> Result<Vec<ErrorPoint>, AggregationError> {
        let totals_query = MetricScope::Global
            .query(window)
            .field(SOLANA_TIME_FIELD)
            .aggregate(Aggregate::Count);
        let errors_query = totals_query.clone().tag(ERROR_TAG, "true");

        let totals = self.store.query(&totals_query).await?;
        let errors = self.store.query(&errors_query).await?;

        let mut series: Vec<ErrorPoint> = window
            .slots()
            .map(|time| ErrorPoint {
                time,
                total_errors: 0,
                total_count: 0,
                value: ERROR_RATE_EMPTY_BUCKET.value(),
            })
            .collect();

        for record in totals {
            if let Some(slot) = matched_slot(window, &record) {
                series[slot].total_count += record.value.round() as i64;
            }
        }
        for record in errors {
            if let Some(slot) = matched_slot(window, &record) {
                series[slot].total_errors += record.value.round() as i64;
            }
        }
        for point in series.iter_mut().filter(|p| p.total_count > 0) {
            point.value = point.total_errors as f64 / point.total_count as f64;
        }

        Ok(series)
    }

    /// Each program's percentage of total latency over the detail lookback
    pub async fn program_shares(&self) -> Result<Vec<ProgramShare>, AggregationError> {
        let since = Utc::now() - self.config.detail_lookback();
        Ok(self.details.program_shares(since).await?)
    }

    fn record_cache(&self, scope: &MetricScope, hit: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.record_cache_lookup(scope.label(), hit);
        }
    }
}

/// Slot for an aggregated record; only an exact bucket-start match counts
fn matched_slot(window: &BucketWindow, record: &SeriesRecord) -> Option<usize> {
    let slot = window.slot_index(record.time);
    if slot.is_none() {
        warn!(
            time = %record.time,
            field = %record.field,
            "dropping aggregate not aligned to a bucket in the window"
        );
    }
    slot
}

impl AggregationConfig {
    pub fn global_lookback(&self) -> Duration {
        Duration::minutes(self.global_lookback_minutes)
    }

    pub fn program_lookback(&self) -> Duration {
        Duration::minutes(self.program_lookback_minutes)
    }

    pub fn detail_lookback(&self) -> Duration {
        Duration::minutes(self.detail_lookback_minutes)
    }
}
