use std::sync::Arc;
use std::time::Instant;

use chrono::{Timelike, Utc};
use rand::Rng;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::dedup::RecentSignatures;
use super::demo::DemoSynthesizer;
use crate::bus::Subscription;
use crate::correlation::{CorrelationError, CorrelationKey, CorrelationStore};
use crate::metrics::MetricsRegistry;
use crate::model::{ClientEvent, ProgramMetric, Transaction, TransactionMetric};
use crate::postgres::DetailRepository;
use crate::solana::bytea_to_base58;
use crate::timeseries::{Point, TimeSeriesStore};

pub const DEFAULT_DEMO_PROGRAM: &str = "8tfDNiaEyrV6Q1U4DEXrEigs9DoDtkugzFbybENEbCDz";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngesterConfig {
    /// Programs that get synthesized metrics when no client event correlates
    pub demo_program_ids: Vec<String>,
    /// Probability of flagging a transaction as failed when the chain reports no error
    pub error_probability: f64,
    /// Recently ingested signatures remembered for duplicate suppression; 0 disables
    pub dedup_window: usize,
}

impl Default for IngesterConfig {
    fn default() -> Self {
        Self {
            demo_program_ids: vec![DEFAULT_DEMO_PROGRAM.to_string()],
            error_probability: 0.018,
            dedup_window: 4096,
        }
    }
}

/// How far one transaction got through the ingester
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Metric written from a correlated client event
    Correlated { programs: usize },
    /// Metric written from synthesized demo latencies
    Synthesized { programs: usize },
    Duplicate,
    InvalidSignature,
    Uncorrelated,
    MetricWriteFailed,
}

impl IngestOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            IngestOutcome::Correlated { .. } => "correlated",
            IngestOutcome::Synthesized { .. } => "synthesized",
            IngestOutcome::Duplicate => "duplicate",
            IngestOutcome::InvalidSignature => "invalid_signature",
            IngestOutcome::Uncorrelated => "uncorrelated",
            IngestOutcome::MetricWriteFailed => "metric_write_failed",
        }
    }
}

/// Metrics Ingester: turns each confirmed transaction into a transaction
/// metric plus one program metric per instruction.
pub struct MetricsIngester {
    correlation: Arc<dyn CorrelationStore>,
    time_series: Arc<dyn TimeSeriesStore>,
    details: Arc<dyn DetailRepository>,
    demo: DemoSynthesizer,
    error_probability: f64,
    recent: RecentSignatures,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl MetricsIngester {
    pub fn new(
        correlation: Arc<dyn CorrelationStore>,
        time_series: Arc<dyn TimeSeriesStore>,
        details: Arc<dyn DetailRepository>,
        config: &IngesterConfig,
    ) -> Self {
        // gen_bool panics outside [0, 1]; NaN survives clamp
        let error_probability = if config.error_probability.is_finite() {
            config.error_probability.clamp(0.0, 1.0)
        } else {
            warn!("Non-finite error probability {}, using 0", config.error_probability);
            0.0
        };
        Self {
            correlation,
            time_series,
            details,
            demo: DemoSynthesizer::new(config.demo_program_ids.clone()),
            error_probability,
            recent: RecentSignatures::new(config.dedup_window),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Ingest transactions one at a time until cancelled or the subscription ends
    pub async fn run(&self, mut transactions: Subscription<Transaction>, cancel: CancellationToken) {
        info!("🚀 Metrics ingester started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("🛑 Metrics ingester cancelled");
                    break;
                }
                received = transactions.recv() => match received {
                    Some(Ok(transaction)) => {
                        self.handle_transaction(&transaction).await;
                    }
                    Some(Err(e)) => {
                        error!("❌ Error on the transactions subscription: {}", e);
                    }
                    None => {
                        warn!("Transactions subscription closed, ingester stopping");
                        break;
                    }
                },
            }
        }
    }

    pub async fn handle_transaction(&self, transaction: &Transaction) -> IngestOutcome {
        self.handle_transaction_at(transaction, Utc::now().hour()).await
    }

    /// Ingest with an explicit UTC hour driving the demo day-part bands
    pub async fn handle_transaction_at(&self, transaction: &Transaction, hour: u32) -> IngestOutcome {
        let started = Instant::now();
        let outcome = self.ingest(transaction, hour).await;

        if let Some(metrics) = &self.metrics {
            metrics.record_ingested_transaction(outcome.label(), started.elapsed().as_secs_f64());
        }
        outcome
    }

    async fn ingest(&self, transaction: &Transaction, hour: u32) -> IngestOutcome {
        let signature = match bytea_to_base58(&transaction.signature) {
            Ok(signature) => signature,
            Err(e) => {
                warn!(signature = %transaction.signature, error = %e, "can't decode transaction signature");
                return IngestOutcome::InvalidSignature;
            }
        };

        if self.recent.contains(&signature) {
            debug!(signature = %signature, "skipping already ingested transaction");
            return IngestOutcome::Duplicate;
        }

        let mut metric = TransactionMetric {
            event_id: String::new(),
            signature: signature.clone(),
            rpc_time: 0,
            solana_time: 0,
            error: self.error_flag(transaction),
            updated_on: transaction.updated_on,
        };

        let key = CorrelationKey::for_send_transaction(&signature);
        let correlated = match self.correlation.get(&key).await {
            Ok(event) => latencies(&event, transaction).map(|times| (event.id.to_string(), times)),
            Err(CorrelationError::NotFound(_)) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "correlation lookup failed");
                None
            }
        };

        let synthesized = match correlated {
            Some((event_id, (rpc_time, solana_time))) => {
                metric.event_id = event_id;
                metric.rpc_time = rpc_time;
                metric.solana_time = solana_time;
                false
            }
            None if self.demo.is_demo(&transaction.meta) => {
                let (rpc_time, solana_time) = {
                    let mut rng = rand::thread_rng();
                    self.demo.synthesize(hour, &mut rng)
                };
                metric.event_id = signature.clone();
                metric.rpc_time = rpc_time;
                metric.solana_time = solana_time;
                true
            }
            None => {
                warn!(key = %key, "no client event correlates with transaction");
                return IngestOutcome::Uncorrelated;
            }
        };

        if let Err(e) = self.time_series.write(&Point::from(&metric)).await {
            error!(signature = %signature, error = %e, "❌ failed to write transaction metric");
            return IngestOutcome::MetricWriteFailed;
        }
        self.recent.remember(&signature);

        let programs = self.write_program_metrics(transaction, &metric).await;
        debug!(
            signature = %signature,
            rpc_time = metric.rpc_time,
            solana_time = metric.solana_time,
            programs,
            "📥 Ingested transaction"
        );

        if synthesized {
            IngestOutcome::Synthesized { programs }
        } else {
            IngestOutcome::Correlated { programs }
        }
    }

    /// Real chain error wins; otherwise a synthetic draw
    fn error_flag(&self, transaction: &Transaction) -> bool {
        if transaction.error_info.is_some() {
            return true;
        }
        rand::thread_rng().gen_bool(self.error_probability)
    }

    /// Write one program metric per resolvable instruction to both sinks.
    /// Returns how many instructions resolved to a program.
    async fn write_program_metrics(&self, transaction: &Transaction, metric: &TransactionMetric) -> usize {
        let message = match transaction.parse_message() {
            Ok(message) => message,
            Err(e) => {
                warn!(signature = %metric.signature, error = %e, "can't parse transaction message");
                return 0;
            }
        };

        let mut resolved = 0;
        for instruction in &message.instructions {
            let Some(account) = message.account_keys.get(instruction.program_id_index) else {
                warn!(
                    signature = %metric.signature,
                    index = instruction.program_id_index,
                    keys = message.account_keys.len(),
                    "program id index outside the static account keys"
                );
                continue;
            };

            let program_address = match bytea_to_base58(account) {
                Ok(address) => address,
                Err(e) => {
                    warn!(signature = %metric.signature, program = %account, error = %e, "can't decode program account");
                    continue;
                }
            };
            resolved += 1;

            let program_metric = ProgramMetric {
                program_address,
                updated_on: metric.updated_on,
                rpc_time: metric.rpc_time,
                solana_time: metric.solana_time,
            };

            match self.details.insert_detail(&program_metric).await {
                Ok(()) => self.record_program("detail", "ok"),
                Err(e) => {
                    error!(program = %program_metric.program_address, error = %e, "❌ failed to insert transaction detail");
                    self.record_program("detail", "failed");
                }
            }

            match self.time_series.write(&Point::from(&program_metric)).await {
                Ok(()) => self.record_program("timeseries", "ok"),
                Err(e) => {
                    error!(program = %program_metric.program_address, error = %e, "❌ failed to write program metric");
                    self.record_program("timeseries", "failed");
                }
            }
        }

        resolved
    }

    fn record_program(&self, sink: &str, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_program_metric(sink, outcome);
        }
    }
}

/// `(rpc_time, solana_time)` in milliseconds from a correlated event.
/// `None` when the event lacks a request or response timestamp.
fn latencies(event: &ClientEvent, transaction: &Transaction) -> Option<(i64, i64)> {
    let request = event.request.as_ref()?;
    let response = event.response.as_ref()?;

    let rpc_time = (response.response_time - request.request_time).num_milliseconds();
    let solana_time = (transaction.updated_on - response.response_time).num_milliseconds();
    Some((rpc_time, solana_time))
}
