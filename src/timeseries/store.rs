use async_trait::async_trait;

use super::errors::TimeSeriesError;
use super::point::Point;
use super::query::{SeriesQuery, SeriesRecord};

/// Write/query seam over the time-series database
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    async fn write(&self, point: &Point) -> Result<(), TimeSeriesError>;

    async fn query(&self, query: &SeriesQuery) -> Result<Vec<SeriesRecord>, TimeSeriesError>;
}
