//! Time-series sink and query seam: InfluxDB v2 over HTTP, or in memory.

pub mod errors;
pub mod influx;
pub mod memory;
pub mod point;
pub mod query;
pub mod store;

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

pub use errors::TimeSeriesError;
pub use influx::{parse_flux_csv, InfluxStore};
pub use memory::MemoryTimeSeries;
pub use point::{FieldValue, Point};
pub use query::{Aggregate, SeriesQuery, SeriesRecord};
pub use store::TimeSeriesStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeSeriesBackend {
    Influx,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeSeriesConfig {
    pub backend: TimeSeriesBackend,
    pub url: String,
    pub org: String,
    pub bucket: String,
    pub token: String,
    pub request_timeout_ms: u64,
}

impl Default for TimeSeriesConfig {
    fn default() -> Self {
        Self {
            backend: TimeSeriesBackend::Influx,
            url: "http://localhost:8086".to_string(),
            org: "txn_pulse".to_string(),
            bucket: "metrics".to_string(),
            token: String::new(),
            request_timeout_ms: 10000,
        }
    }
}

pub fn build_time_series(config: &TimeSeriesConfig) -> Result<Arc<dyn TimeSeriesStore>, TimeSeriesError> {
    match config.backend {
        TimeSeriesBackend::Influx => {
            info!("📈 Using InfluxDB at {} (bucket {})", config.url, config.bucket);
            Ok(Arc::new(InfluxStore::new(config)?))
        }
        TimeSeriesBackend::Memory => {
            info!("🧠 Using in-memory time-series store");
            Ok(Arc::new(MemoryTimeSeries::new()))
        }
    }
}
