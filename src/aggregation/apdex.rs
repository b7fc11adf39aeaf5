use serde::Deserialize;

/// Value reported for a bucket that holds no samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyBucketPolicy {
    /// 1.0; indistinguishable from a bucket where everything was satisfactory
    Perfect,
    /// 0.0
    Zero,
}

impl EmptyBucketPolicy {
    pub fn value(&self) -> f64 {
        match self {
            EmptyBucketPolicy::Perfect => 1.0,
            EmptyBucketPolicy::Zero => 0.0,
        }
    }
}

/// Latency thresholds in milliseconds: satisfied at or below `satisfied_ms`,
/// tolerating at or below `tolerating_ms`, frustrated above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ApdexThresholds {
    pub satisfied_ms: i64,
    pub tolerating_ms: i64,
}

impl ApdexThresholds {
    pub fn global() -> Self {
        Self {
            satisfied_ms: 500,
            tolerating_ms: 1500,
        }
    }

    pub fn program() -> Self {
        Self {
            satisfied_ms: 21000,
            tolerating_ms: 24000,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.satisfied_ms >= 0 && self.satisfied_ms <= self.tolerating_ms
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApdexCounts {
    pub satisfied: u64,
    pub tolerating: u64,
    pub frustrated: u64,
}

impl ApdexCounts {
    pub fn classify(&mut self, latency_ms: f64, thresholds: &ApdexThresholds) {
        if latency_ms <= thresholds.satisfied_ms as f64 {
            self.satisfied += 1;
        } else if latency_ms <= thresholds.tolerating_ms as f64 {
            self.tolerating += 1;
        } else {
            self.frustrated += 1;
        }
    }

    pub fn total(&self) -> u64 {
        self.satisfied + self.tolerating + self.frustrated
    }

    /// `(satisfied + tolerating / 2) / total`
    pub fn score(&self, empty: EmptyBucketPolicy) -> f64 {
        let total = self.total();
        if total == 0 {
            return empty.value();
        }
        (self.satisfied as f64 + self.tolerating as f64 / 2.0) / total as f64
    }
}
