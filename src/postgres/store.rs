use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use tracing::debug;

use super::errors::PostgresError;
use super::repository::{DetailRepository, TransactionRepository};
use crate::model::{ProgramMetric, ProgramShare, Transaction};
use crate::solana::{decode_bytea_hex, encode_bytea_hex};

/// Relational store backed by a deadpool connection pool
#[derive(Clone)]
pub struct PostgresStore {
    pool: Pool,
}

impl PostgresStore {
    const SELECT_UNRELAYED_SQL: &'static str = r#"
        SELECT slot, signature, is_vote, message_type, legacy_message, v0_loaded_message,
               signatures, message_hash, meta, write_version, updated_on, txn_index,
               error_info, processed_at
        FROM transactions
        WHERE processed_at IS NULL
        LIMIT $1
    "#;

    const MARK_RELAYED_SQL: &'static str = r#"
        UPDATE transactions SET processed_at = $1 WHERE signature = $2
    "#;

    const INSERT_DETAIL_SQL: &'static str = r#"
        INSERT INTO transaction_details (program_address, updated_on, rpc_time, solana_time, total_time)
        VALUES ($1, $2, $3, $4, $5)
    "#;

    const PROGRAM_SHARES_SQL: &'static str = r#"
        WITH per_program AS (
            SELECT program_address, SUM(total_time)::DOUBLE PRECISION AS total_time
            FROM transaction_details
            WHERE updated_on >= $1
            GROUP BY program_address
        ),
        overall AS (
            SELECT SUM(total_time) AS overall FROM per_program
        )
        SELECT p.program_address,
               COALESCE(
                   p.total_time / NULLIF(o.overall, 0),
                   (1.0 / COUNT(*) OVER ())::DOUBLE PRECISION
               ) * 100 AS percentage
        FROM per_program p, overall o
        ORDER BY percentage DESC, p.program_address
    "#;

    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn row_to_transaction(row: &Row) -> Result<Transaction, PostgresError> {
        let signature: Vec<u8> = row.try_get("signature")?;

        Ok(Transaction {
            slot: row.try_get("slot")?,
            signature: encode_bytea_hex(&signature),
            is_vote: row.try_get("is_vote")?,
            message_type: row.try_get("message_type")?,
            legacy_message: row.try_get::<_, Option<String>>("legacy_message")?.unwrap_or_default(),
            v0_loaded_message: row.try_get("v0_loaded_message")?,
            signatures: row.try_get::<_, Option<String>>("signatures")?.unwrap_or_default(),
            message_hash: row.try_get::<_, Option<Vec<u8>>>("message_hash")?.unwrap_or_default(),
            meta: row.try_get::<_, Option<String>>("meta")?.unwrap_or_default(),
            write_version: row.try_get("write_version")?,
            updated_on: row.try_get("updated_on")?,
            txn_index: row.try_get("txn_index")?,
            error_info: row.try_get("error_info")?,
            processed_at: row.try_get("processed_at")?,
        })
    }
}

#[async_trait]
impl TransactionRepository for PostgresStore {
    async fn select_unrelayed(&self, limit: i64) -> Result<Vec<Transaction>, PostgresError> {
        let client = self.pool.get().await?;
        let rows = client.query(Self::SELECT_UNRELAYED_SQL, &[&limit]).await?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    async fn mark_relayed(&self, signature: &str, processed_at: DateTime<Utc>) -> Result<(), PostgresError> {
        let signature_bytes = decode_bytea_hex(signature)?;
        let client = self.pool.get().await?;
        let updated = client
            .execute(Self::MARK_RELAYED_SQL, &[&processed_at, &signature_bytes])
            .await?;

        debug!("Marked {} relayed ({} rows)", signature, updated);
        Ok(())
    }
}

#[async_trait]
impl DetailRepository for PostgresStore {
    async fn insert_detail(&self, detail: &ProgramMetric) -> Result<(), PostgresError> {
        let client = self.pool.get().await?;
        client
            .execute(
                Self::INSERT_DETAIL_SQL,
                &[
                    &detail.program_address,
                    &detail.updated_on,
                    &detail.rpc_time,
                    &detail.solana_time,
                    &detail.total_time(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn program_shares(&self, since: DateTime<Utc>) -> Result<Vec<ProgramShare>, PostgresError> {
        let client = self.pool.get().await?;
        let rows = client.query(Self::PROGRAM_SHARES_SQL, &[&since]).await?;

        rows.iter()
            .map(|row| {
                Ok(ProgramShare {
                    program_address: row.try_get("program_address")?,
                    percentage: row.try_get("percentage")?,
                })
            })
            .collect()
    }
}
