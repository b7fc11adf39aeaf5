use chrono::{DateTime, Utc};
use serde::Serialize;

/// Latency metrics derived from one confirmed transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionMetric {
    /// Id of the correlated client event, or the signature for synthesized demo metrics
    pub event_id: String,
    /// Base58 transaction signature
    pub signature: String,
    /// Client submit → RPC response, in milliseconds
    pub rpc_time: i64,
    /// RPC response → chain confirmation, in milliseconds
    pub solana_time: i64,
    pub error: bool,
    /// Chain confirmation timestamp
    pub updated_on: DateTime<Utc>,
}

impl TransactionMetric {
    pub fn total_time(&self) -> i64 {
        self.rpc_time + self.solana_time
    }
}

/// One instruction's share of a transaction, attributed to its program
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramMetric {
    /// Base58 program address
    pub program_address: String,
    pub updated_on: DateTime<Utc>,
    pub rpc_time: i64,
    pub solana_time: i64,
}

impl ProgramMetric {
    pub fn total_time(&self) -> i64 {
        self.rpc_time + self.solana_time
    }
}

/// A program's share of the aggregate latency across all programs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramShare {
    pub program_address: String,
    pub percentage: f64,
}

/// Which latency a performance series tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LatencyKind {
    RpcTime,
    SolanaTime,
}

impl LatencyKind {
    /// Field name used in the time-series store
    pub fn field(&self) -> &'static str {
        match self {
            LatencyKind::RpcTime => "rpc_time",
            LatencyKind::SolanaTime => "solana_time",
        }
    }

    pub fn from_field(field: &str) -> Option<Self> {
        match field {
            "rpc_time" => Some(LatencyKind::RpcTime),
            "solana_time" => Some(LatencyKind::SolanaTime),
            _ => None,
        }
    }
}

/// One bucket of an aggregated series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint<T> {
    pub time: DateTime<Utc>,
    pub value: T,
}

/// Mean latency per bucket, one series per latency kind
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceSeries {
    pub rpc: Vec<SeriesPoint<f64>>,
    pub solana: Vec<SeriesPoint<f64>>,
}

/// Error rate of one bucket with the counts it was derived from
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorPoint {
    pub time: DateTime<Utc>,
    pub total_errors: i64,
    pub total_count: i64,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_time() {
        let metric = TransactionMetric {
            event_id: "e".to_string(),
            signature: "s".to_string(),
            rpc_time: 120,
            solana_time: 380,
            error: false,
            updated_on: Utc::now(),
        };
        assert_eq!(metric.total_time(), 500);
    }

    #[test]
    fn test_latency_kind_fields() {
        for kind in [LatencyKind::RpcTime, LatencyKind::SolanaTime] {
            assert_eq!(LatencyKind::from_field(kind.field()), Some(kind));
        }
        assert_eq!(LatencyKind::from_field("total_time"), None);
    }
}
