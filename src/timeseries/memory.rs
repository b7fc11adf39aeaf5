use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::errors::TimeSeriesError;
use super::point::Point;
use super::query::{Aggregate, SeriesQuery, SeriesRecord};
use super::store::TimeSeriesStore;

/// In-process store evaluating queries with the same window semantics as
/// the Flux rendering: epoch-aligned windows, stamped at window start,
/// empty windows omitted.
#[derive(Default)]
pub struct MemoryTimeSeries {
    points: RwLock<Vec<Point>>,
}

impl MemoryTimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn points(&self) -> Vec<Point> {
        self.points.read().await.clone()
    }
}

fn window_start(time: DateTime<Utc>, window_ms: i64) -> DateTime<Utc> {
    let ms = time.timestamp_millis();
    let aligned = ms - ms.rem_euclid(window_ms);
    DateTime::from_timestamp_millis(aligned).unwrap_or(time)
}

#[async_trait]
impl TimeSeriesStore for MemoryTimeSeries {
    async fn write(&self, point: &Point) -> Result<(), TimeSeriesError> {
        self.points.write().await.push(point.clone());
        Ok(())
    }

    async fn query(&self, query: &SeriesQuery) -> Result<Vec<SeriesRecord>, TimeSeriesError> {
        let window_ms = query.window.num_milliseconds();
        if window_ms <= 0 {
            return Err(TimeSeriesError::Config(format!(
                "query window must be positive, got {}",
                query.window
            )));
        }

        let points = self.points.read().await;
        let samples = points
            .iter()
            .filter(|p| p.measurement == query.measurement)
            .filter(|p| p.time >= query.start && p.time < query.stop)
            .filter(|p| {
                query
                    .tags
                    .iter()
                    .all(|(key, value)| p.tags.get(key).is_some_and(|v| v == value))
            })
            .flat_map(|p| {
                p.fields
                    .iter()
                    .filter(|(name, _)| query.fields.is_empty() || query.fields.contains(*name))
                    .map(move |(name, value)| SeriesRecord {
                        time: p.time,
                        field: name.clone(),
                        value: value.as_f64(),
                    })
            });

        let Some(aggregate) = query.aggregate else {
            let mut raw: Vec<SeriesRecord> = samples.collect();
            raw.sort_by(|a, b| a.field.cmp(&b.field).then(a.time.cmp(&b.time)));
            return Ok(raw);
        };

        // (field, window start) -> (sum, count)
        let mut windows: BTreeMap<(String, DateTime<Utc>), (f64, u64)> = BTreeMap::new();
        for record in samples {
            let entry = windows
                .entry((record.field, window_start(record.time, window_ms)))
                .or_insert((0.0, 0));
            entry.0 += record.value;
            entry.1 += 1;
        }

        Ok(windows
            .into_iter()
            .map(|((field, time), (sum, count))| SeriesRecord {
                time,
                field,
                value: match aggregate {
                    Aggregate::Mean => sum / count as f64,
                    Aggregate::Count => count as f64,
                    Aggregate::Sum => sum,
                },
            })
            .collect())
    }
}
