use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;

use super::errors::PostgresError;
use crate::model::{ProgramMetric, ProgramShare, Transaction};

/// Outbox side of the `transactions` table, driven by the relay
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Up to `limit` rows whose relay watermark is still unset
    async fn select_unrelayed(&self, limit: i64) -> Result<Vec<Transaction>, PostgresError>;

    /// Set the relay watermark of the row with this bytea-text signature
    async fn mark_relayed(&self, signature: &str, processed_at: DateTime<Utc>) -> Result<(), PostgresError>;
}

/// Per-instruction detail rows and the cross-program share query over them
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DetailRepository: Send + Sync {
    async fn insert_detail(&self, detail: &ProgramMetric) -> Result<(), PostgresError>;

    /// Each program's percentage of total latency recorded since `since`,
    /// heaviest first
    async fn program_shares(&self, since: DateTime<Utc>) -> Result<Vec<ProgramShare>, PostgresError>;
}

/// Percentage of the grand total contributed by each program.
///
/// Rows for the same program are summed first. When every total is zero the
/// share is split evenly, so a non-empty result always sums to 100.
pub fn compute_program_shares<I>(totals: I) -> Vec<ProgramShare>
where
    I: IntoIterator<Item = (String, i64)>,
{
    let mut per_program: FxHashMap<String, i64> = FxHashMap::default();
    for (program, total) in totals {
        *per_program.entry(program).or_insert(0) += total;
    }

    if per_program.is_empty() {
        return Vec::new();
    }

    let overall: i64 = per_program.values().sum();
    let count = per_program.len() as f64;

    let mut shares: Vec<ProgramShare> = per_program
        .into_iter()
        .map(|(program_address, total)| {
            let fraction = if overall == 0 {
                1.0 / count
            } else {
                total as f64 / overall as f64
            };
            ProgramShare {
                program_address,
                percentage: fraction * 100.0,
            }
        })
        .collect();

    shares.sort_by(|a, b| {
        b.percentage
            .total_cmp(&a.percentage)
            .then_with(|| a.program_address.cmp(&b.program_address))
    });
    shares
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total_percentage(shares: &[ProgramShare]) -> f64 {
        shares.iter().map(|s| s.percentage).sum()
    }

    #[test]
    fn test_shares_sum_to_hundred() {
        let shares = compute_program_shares(vec![
            ("A".to_string(), 300),
            ("B".to_string(), 100),
            ("A".to_string(), 100),
            ("C".to_string(), 500),
        ]);

        assert_eq!(shares.len(), 3);
        assert_eq!(shares[0].program_address, "C");
        assert!((shares[0].percentage - 50.0).abs() < 1e-9);
        assert!((shares[1].percentage - 40.0).abs() < 1e-9);
        assert!((shares[2].percentage - 10.0).abs() < 1e-9);
        assert!((total_percentage(&shares) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_totals_split_evenly() {
        let shares = compute_program_shares(vec![("A".to_string(), 0), ("B".to_string(), 0)]);
        assert_eq!(shares.len(), 2);
        assert!(shares.iter().all(|s| (s.percentage - 50.0).abs() < 1e-9));
    }

    #[test]
    fn test_empty_dataset() {
        assert!(compute_program_shares(Vec::new()).is_empty());
    }

    #[test]
    fn test_sum_is_stable_for_many_programs() {
        let totals = (0..37).map(|i| (format!("program-{}", i), (i * 13 + 7) as i64));
        let shares = compute_program_shares(totals);
        assert_eq!(shares.len(), 37);
        assert!((total_percentage(&shares) - 100.0).abs() < 1e-6);
        assert!(shares.windows(2).all(|w| w[0].percentage >= w[1].percentage));
    }
}
