//! Transaction Relay: a watermark-based outbox from the `transactions` table
//! onto the transactions topic.
//!
//! Delivery is at-least-once. A row whose watermark update fails after a
//! successful publish stays unrelayed and is published again on the next tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bus::EventBus;
use crate::metrics::MetricsRegistry;
use crate::postgres::{PostgresError, TransactionRepository};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub poll_interval_ms: u64,
    pub batch_size: i64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            batch_size: 1000,
        }
    }
}

/// What one polling tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub selected: usize,
    pub published: usize,
    pub publish_failed: usize,
    pub marked: usize,
    pub mark_failed: usize,
}

pub struct TransactionRelay {
    repository: Arc<dyn TransactionRepository>,
    bus: Arc<dyn EventBus>,
    config: RelayConfig,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl TransactionRelay {
    pub fn new(repository: Arc<dyn TransactionRepository>, bus: Arc<dyn EventBus>, config: RelayConfig) -> Self {
        Self {
            repository,
            bus,
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Poll every `poll_interval_ms` until cancelled. Cancellation is only
    /// observed between ticks; a batch in progress runs to completion.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.poll_interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "🚀 Transaction relay started (interval: {}ms, batch: {})",
            self.config.poll_interval_ms, self.config.batch_size
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("🛑 Transaction relay cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.relay_batch().await {
                        error!("❌ Failed to select unrelayed transactions: {}", e);
                    }
                }
            }
        }
    }

    /// Publish one batch of unrelayed rows, marking each one after its publish succeeds
    pub async fn relay_batch(&self) -> Result<RelayReport, PostgresError> {
        let batch = self.repository.select_unrelayed(self.config.batch_size).await?;
        let mut report = RelayReport {
            selected: batch.len(),
            ..RelayReport::default()
        };

        for transaction in &batch {
            if let Err(e) = self.bus.publish_transaction(transaction).await {
                warn!(signature = %transaction.signature, error = %e, "failed to publish transaction");
                report.publish_failed += 1;
                self.record("publish_failed");
                continue;
            }
            report.published += 1;

            match self.repository.mark_relayed(&transaction.signature, Utc::now()).await {
                Ok(()) => {
                    report.marked += 1;
                    self.record("relayed");
                }
                Err(e) => {
                    error!(signature = %transaction.signature, error = %e, "❌ failed to set relay watermark");
                    report.mark_failed += 1;
                    self.record("mark_failed");
                }
            }
        }

        if report.selected > 0 {
            debug!("📤 Relay tick: {:?}", report);
        }
        Ok(report)
    }

    fn record(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_relay_transaction(outcome);
        }
    }
}
