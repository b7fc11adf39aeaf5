use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::errors::PostgresError;
use super::repository::{compute_program_shares, DetailRepository, TransactionRepository};
use crate::model::{ProgramMetric, ProgramShare, Transaction};

/// In-memory stand-in for the `transactions` and `transaction_details` tables
#[derive(Default)]
pub struct MemoryRelationalStore {
    transactions: RwLock<Vec<Transaction>>,
    details: RwLock<Vec<ProgramMetric>>,
}

impl MemoryRelationalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row the way the chain ingestion would
    pub async fn insert_transaction(&self, transaction: Transaction) {
        self.transactions.write().await.push(transaction);
    }

    pub async fn transactions(&self) -> Vec<Transaction> {
        self.transactions.read().await.clone()
    }

    pub async fn details(&self) -> Vec<ProgramMetric> {
        self.details.read().await.clone()
    }
}

#[async_trait]
impl TransactionRepository for MemoryRelationalStore {
    async fn select_unrelayed(&self, limit: i64) -> Result<Vec<Transaction>, PostgresError> {
        let limit = usize::try_from(limit)
            .map_err(|_| PostgresError::Conversion(format!("invalid row limit {}", limit)))?;

        Ok(self
            .transactions
            .read()
            .await
            .iter()
            .filter(|t| t.processed_at.is_none())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_relayed(&self, signature: &str, processed_at: DateTime<Utc>) -> Result<(), PostgresError> {
        for transaction in self
            .transactions
            .write()
            .await
            .iter_mut()
            .filter(|t| t.signature == signature)
        {
            transaction.processed_at = Some(processed_at);
        }
        Ok(())
    }
}

#[async_trait]
impl DetailRepository for MemoryRelationalStore {
    async fn insert_detail(&self, detail: &ProgramMetric) -> Result<(), PostgresError> {
        self.details.write().await.push(detail.clone());
        Ok(())
    }

    async fn program_shares(&self, since: DateTime<Utc>) -> Result<Vec<ProgramShare>, PostgresError> {
        let details = self.details.read().await;
        Ok(compute_program_shares(
            details
                .iter()
                .filter(|d| d.updated_on >= since)
                .map(|d| (d.program_address.clone(), d.total_time())),
        ))
    }
}
