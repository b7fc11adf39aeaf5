use thiserror::Error;

use crate::postgres::PostgresError;
use crate::timeseries::TimeSeriesError;

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("Time-series query failed: {0}")]
    TimeSeries(#[from] TimeSeriesError),

    #[error("Detail query failed: {0}")]
    Postgres(#[from] PostgresError),

    #[error("Invalid aggregation window: {0}")]
    InvalidWindow(String),
}
