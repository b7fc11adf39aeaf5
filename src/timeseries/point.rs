use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::model::{ProgramMetric, TransactionMetric};

/// Per-transaction latency points, tagged with event id, signature and error flag
pub const TRANSACTIONS_MEASUREMENT: &str = "transactions";
/// Per-instruction latency points, tagged with the program address
pub const PROGRAMS_MEASUREMENT: &str = "programs";

pub const RPC_TIME_FIELD: &str = "rpc_time";
pub const SOLANA_TIME_FIELD: &str = "solana_time";
pub const TOTAL_TIME_FIELD: &str = "total_time";

pub const EVENT_ID_TAG: &str = "event_id";
pub const SIGNATURE_TAG: &str = "signature";
pub const ERROR_TAG: &str = "error";
pub const PROGRAM_ADDRESS_TAG: &str = "program_address";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl FieldValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            FieldValue::Int(v) => v as f64,
            FieldValue::Float(v) => v,
            FieldValue::Bool(v) => {
                if v {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// A tagged, timestamped sample
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
    pub time: DateTime<Utc>,
}

impl Point {
    pub fn new(measurement: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            time,
        }
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// InfluxDB line protocol with a millisecond timestamp.
    /// Tags with empty values are left out since the protocol rejects them.
    pub fn to_line_protocol(&self) -> String {
        let mut line = escape(&self.measurement, &[',', ' ']);

        for (key, value) in self.tags.iter().filter(|(_, v)| !v.is_empty()) {
            let _ = write!(
                line,
                ",{}={}",
                escape(key, &[',', '=', ' ']),
                escape(value, &[',', '=', ' '])
            );
        }

        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|(key, value)| {
                let rendered = match value {
                    FieldValue::Int(v) => format!("{}i", v),
                    FieldValue::Float(v) => format!("{}", v),
                    FieldValue::Bool(v) => format!("{}", v),
                };
                format!("{}={}", escape(key, &[',', '=', ' ']), rendered)
            })
            .collect();

        let _ = write!(line, " {} {}", fields.join(","), self.time.timestamp_millis());
        line
    }
}

fn escape(raw: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '\\' || special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl From<&TransactionMetric> for Point {
    fn from(metric: &TransactionMetric) -> Self {
        Point::new(TRANSACTIONS_MEASUREMENT, metric.updated_on)
            .tag(EVENT_ID_TAG, metric.event_id.as_str())
            .tag(SIGNATURE_TAG, metric.signature.as_str())
            .tag(ERROR_TAG, metric.error.to_string())
            .field(RPC_TIME_FIELD, FieldValue::Int(metric.rpc_time))
            .field(SOLANA_TIME_FIELD, FieldValue::Int(metric.solana_time))
            .field(TOTAL_TIME_FIELD, FieldValue::Int(metric.total_time()))
    }
}

impl From<&ProgramMetric> for Point {
    fn from(metric: &ProgramMetric) -> Self {
        Point::new(PROGRAMS_MEASUREMENT, metric.updated_on)
            .tag(PROGRAM_ADDRESS_TAG, metric.program_address.as_str())
            .field(RPC_TIME_FIELD, FieldValue::Int(metric.rpc_time))
            .field(SOLANA_TIME_FIELD, FieldValue::Int(metric.solana_time))
            .field(TOTAL_TIME_FIELD, FieldValue::Int(metric.total_time()))
    }
}
