//! Metrics Aggregation Engine: dense 30-minute series for the dashboards,
//! read through a short-lived snapshot cache.

pub mod apdex;
pub mod buckets;
pub mod cache;
pub mod engine;
pub mod errors;

use serde::Deserialize;

pub use apdex::{ApdexCounts, ApdexThresholds, EmptyBucketPolicy};
pub use buckets::{bucket_start, BucketWindow, BUCKET_MINUTES, MAX_BUCKETS};
pub use cache::SnapshotCache;
pub use engine::{GlobalSnapshot, MetricScope, MetricsEngine, ProgramSnapshot};
pub use errors::AggregationError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub global_lookback_minutes: i64,
    pub program_lookback_minutes: i64,
    /// Lookback of the per-program percentage query over the detail table
    pub detail_lookback_minutes: i64,
    pub cache_ttl_seconds: u64,
    pub global_apdex: ApdexThresholds,
    pub program_apdex: ApdexThresholds,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            global_lookback_minutes: 48 * 60,
            program_lookback_minutes: 8 * 60,
            detail_lookback_minutes: 24 * 60,
            cache_ttl_seconds: 600,
            global_apdex: ApdexThresholds::global(),
            program_apdex: ApdexThresholds::program(),
        }
    }
}
