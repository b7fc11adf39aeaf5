//! Fixed 30-minute slot alignment shared by every aggregation.

use chrono::{DateTime, Duration, Utc};

use super::errors::AggregationError;
use crate::model::SeriesPoint;

pub const BUCKET_MINUTES: i64 = 30;

/// Widest window served: 30 days of slots
pub const MAX_BUCKETS: i64 = 30 * 24 * 60 / BUCKET_MINUTES;

pub fn bucket_width() -> Duration {
    Duration::minutes(BUCKET_MINUTES)
}

/// Start of the epoch-aligned slot containing `time`
pub fn bucket_start(time: DateTime<Utc>) -> DateTime<Utc> {
    let width = bucket_width().num_seconds();
    let secs = time.timestamp();
    let aligned = secs - secs.rem_euclid(width);
    DateTime::from_timestamp(aligned, 0).unwrap_or(time)
}

/// Span of `n` slots; callers keep `n` within `MAX_BUCKETS`
fn span(n: i64) -> Duration {
    Duration::minutes(BUCKET_MINUTES * n)
}

/// The consecutive slots covering a lookback that ends at the current slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketWindow {
    first: DateTime<Utc>,
    len: usize,
}

impl BucketWindow {
    /// `lookback / 30min` slots, the last one being the slot that contains `now`
    pub fn ending_at(now: DateTime<Utc>, lookback: Duration) -> Result<Self, AggregationError> {
        let width = bucket_width();
        if lookback <= Duration::zero() || lookback.num_seconds() % width.num_seconds() != 0 {
            return Err(AggregationError::InvalidWindow(format!(
                "lookback {} is not a positive multiple of {} minutes",
                lookback, BUCKET_MINUTES
            )));
        }

        let buckets = lookback.num_seconds() / width.num_seconds();
        if buckets > MAX_BUCKETS {
            return Err(AggregationError::InvalidWindow(format!(
                "lookback {} exceeds {} slots of {} minutes",
                lookback, MAX_BUCKETS, BUCKET_MINUTES
            )));
        }

        let first = bucket_start(now) - span(buckets - 1);
        Ok(Self {
            first,
            len: buckets as usize,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inclusive start of the first slot
    pub fn start(&self) -> DateTime<Utc> {
        self.first
    }

    /// Exclusive end of the last slot
    pub fn stop(&self) -> DateTime<Utc> {
        self.first + span(self.len as i64)
    }

    pub fn slots(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        (0..self.len as i64).map(move |i| self.first + span(i))
    }

    /// Index of the slot starting exactly at `time`
    pub fn slot_index(&self, time: DateTime<Utc>) -> Option<usize> {
        if time < self.first || time >= self.stop() || bucket_start(time) != time {
            return None;
        }
        let offset = (time - self.first).num_seconds() / bucket_width().num_seconds();
        Some(offset as usize)
    }

    /// Index of the slot containing `time`
    pub fn containing(&self, time: DateTime<Utc>) -> Option<usize> {
        self.slot_index(bucket_start(time))
    }

    /// One placeholder point per slot
    pub fn dense<T: Clone>(&self, placeholder: T) -> Vec<SeriesPoint<T>> {
        self.slots()
            .map(|time| SeriesPoint {
                time,
                value: placeholder.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_bucket_start_alignment() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 10, 47, 13).unwrap();
        assert_eq!(bucket_start(t), Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap());

        let aligned = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(bucket_start(aligned), aligned);
    }

    #[test]
    fn test_window_length_matches_lookback() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 47, 0).unwrap();

        let window = BucketWindow::ending_at(now, Duration::hours(8)).unwrap();
        assert_eq!(window.len(), 16);
        assert_eq!(window.slots().last(), Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap()));
        assert_eq!(window.start(), Utc.with_ymd_and_hms(2024, 5, 1, 3, 0, 0).unwrap());
        assert_eq!(window.stop(), Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap());

        assert_eq!(BucketWindow::ending_at(now, Duration::hours(48)).unwrap().len(), 96);
    }

    #[test]
    fn test_invalid_lookbacks() {
        let now = Utc::now();
        assert!(BucketWindow::ending_at(now, Duration::zero()).is_err());
        assert!(BucketWindow::ending_at(now, Duration::minutes(45)).is_err());
        assert!(BucketWindow::ending_at(now, Duration::minutes(-30)).is_err());
    }

    #[test]
    fn test_oversized_lookbacks_rejected() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 47, 0).unwrap();

        let widest = BucketWindow::ending_at(now, Duration::minutes(BUCKET_MINUTES * MAX_BUCKETS)).unwrap();
        assert_eq!(widest.len(), MAX_BUCKETS as usize);
        assert_eq!(widest.stop() - widest.start(), Duration::days(30));

        // 2^32 + 1 slots wraps to a single slot under 32-bit arithmetic
        let wrapping = Duration::minutes(BUCKET_MINUTES * ((1i64 << 32) + 1));
        for lookback in [Duration::minutes(BUCKET_MINUTES * (MAX_BUCKETS + 1)), wrapping] {
            assert!(matches!(
                BucketWindow::ending_at(now, lookback),
                Err(AggregationError::InvalidWindow(_))
            ));
        }
    }

    #[test]
    fn test_slot_lookup_is_exact() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 47, 0).unwrap();
        let window = BucketWindow::ending_at(now, Duration::hours(1)).unwrap();

        assert_eq!(window.slot_index(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()), Some(0));
        assert_eq!(window.slot_index(Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap()), Some(1));
        assert_eq!(window.slot_index(Utc.with_ymd_and_hms(2024, 5, 1, 10, 31, 0).unwrap()), None);
        assert_eq!(window.slot_index(Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap()), None);
        assert_eq!(window.containing(Utc.with_ymd_and_hms(2024, 5, 1, 10, 31, 0).unwrap()), Some(1));
    }

    #[test]
    fn test_dense_series() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let series = BucketWindow::ending_at(now, Duration::hours(2)).unwrap().dense(0i64);
        assert_eq!(series.len(), 4);
        assert!(series.iter().all(|p| p.value == 0));
        assert_eq!(series[3].time, now);
    }
}
