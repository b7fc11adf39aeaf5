//! Dashboard JSON shapes: every series is rendered as `[[time, value], ...]`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::aggregation::{GlobalSnapshot, ProgramSnapshot};
use crate::model::{ErrorPoint, ProgramShare, SeriesPoint};

#[derive(Debug, Serialize)]
pub struct PerformancePairs {
    pub solana: Vec<Value>,
    pub rpc: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct GlobalMetricsResponse {
    pub performance: PerformancePairs,
    pub throughput: Vec<Value>,
    pub apdex: Vec<Value>,
    pub errors: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct ProgramMetricsResponse {
    pub performance: PerformancePairs,
    pub throughput: Vec<Value>,
    pub apdex: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<ProgramShare>,
}

fn timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Mean latencies are reported in whole milliseconds
fn latency_pairs(series: &[SeriesPoint<f64>]) -> Vec<Value> {
    series
        .iter()
        .map(|p| json!([timestamp(p.time), p.value as i64]))
        .collect()
}

fn pairs<T: Serialize + Copy>(series: &[SeriesPoint<T>]) -> Vec<Value> {
    series.iter().map(|p| json!([timestamp(p.time), p.value])).collect()
}

fn error_pairs(series: &[ErrorPoint]) -> Vec<Value> {
    series.iter().map(|p| json!([timestamp(p.time), p.value])).collect()
}

impl From<&GlobalSnapshot> for GlobalMetricsResponse {
    fn from(snapshot: &GlobalSnapshot) -> Self {
        Self {
            performance: PerformancePairs {
                solana: latency_pairs(&snapshot.performance.solana),
                rpc: latency_pairs(&snapshot.performance.rpc),
            },
            throughput: pairs(&snapshot.throughput),
            apdex: pairs(&snapshot.apdex),
            errors: error_pairs(&snapshot.errors),
        }
    }
}

impl From<&ProgramSnapshot> for ProgramMetricsResponse {
    fn from(snapshot: &ProgramSnapshot) -> Self {
        Self {
            performance: PerformancePairs {
                solana: latency_pairs(&snapshot.performance.solana),
                rpc: latency_pairs(&snapshot.performance.rpc),
            },
            throughput: pairs(&snapshot.throughput),
            apdex: pairs(&snapshot.apdex),
        }
    }
}
