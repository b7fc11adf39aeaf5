use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use txn_pulse::aggregation::{AggregationConfig, MetricsEngine};
use txn_pulse::bus::{EventBus, MemoryBus};
use txn_pulse::collector::{EventCollector, EventPublisher};
use txn_pulse::correlation::{CorrelationKey, CorrelationStore, MemoryCorrelationStore};
use txn_pulse::ingester::{IngesterConfig, MetricsIngester};
use txn_pulse::logging::init_simple_logging;
use txn_pulse::postgres::MemoryRelationalStore;
use txn_pulse::relay::{RelayConfig, TransactionRelay};
use txn_pulse::solana::to_base58;
use txn_pulse::timeseries::point::{PROGRAMS_MEASUREMENT, TRANSACTIONS_MEASUREMENT};
use txn_pulse::timeseries::MemoryTimeSeries;

mod fixtures;
use fixtures::{create_send_transaction_event, create_transaction, DEMO_PROGRAM};

const PROGRAM: [u8; 32] = [42u8; 32];

struct Pipeline {
    bus: Arc<MemoryBus>,
    correlation: Arc<MemoryCorrelationStore>,
    relational: Arc<MemoryRelationalStore>,
    series: Arc<MemoryTimeSeries>,
    cancel: CancellationToken,
}

impl Pipeline {
    async fn start() -> Self {
        let _ = init_simple_logging();
        let bus = Arc::new(MemoryBus::new("agent_events".into(), "solana_transactions".into(), 64));
        let correlation = Arc::new(MemoryCorrelationStore::new());
        let relational = Arc::new(MemoryRelationalStore::new());
        let series = Arc::new(MemoryTimeSeries::new());
        let cancel = CancellationToken::new();

        let events = bus.subscribe_events().await.unwrap();
        let transactions = bus.subscribe_transactions().await.unwrap();

        let collector = EventCollector::new(correlation.clone());
        let ingester = MetricsIngester::new(
            correlation.clone(),
            series.clone(),
            relational.clone(),
            &IngesterConfig {
                error_probability: 0.0,
                ..IngesterConfig::default()
            },
        );

        let c = cancel.clone();
        tokio::spawn(async move { collector.run(events, c).await });
        let c = cancel.clone();
        tokio::spawn(async move { ingester.run(transactions, c).await });

        Self {
            bus,
            correlation,
            relational,
            series,
            cancel,
        }
    }

    fn relay(&self) -> TransactionRelay {
        TransactionRelay::new(self.relational.clone(), self.bus.clone(), RelayConfig::default())
    }

    async fn wait_for_points(&self, count: usize) {
        timeout(StdDuration::from_secs(5), async {
            while self.series.points().await.len() < count {
                tokio::time::sleep(StdDuration::from_millis(10)).await;
            }
        })
        .await
        .expect("pipeline did not write the expected points");
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[tokio::test]
async fn test_event_and_transaction_correlate_end_to_end() {
    let pipeline = Pipeline::start().await;
    let signature = [9u8; 64];
    let requested_at = Utc::now() - Duration::seconds(5);
    let event = create_send_transaction_event(signature, PROGRAM, requested_at, 180);

    let publisher = EventPublisher::new(pipeline.bus.clone());
    publisher.publish(event.clone()).await.unwrap();

    let key = CorrelationKey::for_send_transaction(&to_base58(&signature));
    timeout(StdDuration::from_secs(5), async {
        while pipeline.correlation.get(&key).await.is_err() {
            tokio::time::sleep(StdDuration::from_millis(10)).await;
        }
    })
    .await
    .expect("collector never stored the event");

    let stored = pipeline.correlation.get(&key).await.unwrap();
    assert_eq!(stored.program_ids, vec![to_base58(&PROGRAM)]);

    let confirmed_at = requested_at + Duration::milliseconds(180 + 620);
    pipeline
        .relational
        .insert_transaction(create_transaction(signature, PROGRAM, confirmed_at, "{}"))
        .await;

    let report = pipeline.relay().relay_batch().await.unwrap();
    assert_eq!(report.published, 1);
    assert_eq!(report.marked, 1);

    pipeline.wait_for_points(2).await;
    let points = pipeline.series.points().await;

    let metrics: Vec<_> = points.iter().filter(|p| p.measurement == TRANSACTIONS_MEASUREMENT).collect();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].tags.get("event_id"), Some(&event.id.to_string()));
    assert_eq!(metrics[0].fields["rpc_time"].as_f64(), 180.0);
    assert_eq!(metrics[0].fields["solana_time"].as_f64(), 620.0);

    let programs: Vec<_> = points.iter().filter(|p| p.measurement == PROGRAMS_MEASUREMENT).collect();
    assert_eq!(programs.len(), 1);
    assert_eq!(programs[0].tags.get("program_address"), Some(&to_base58(&PROGRAM)));

    let engine = MetricsEngine::new(pipeline.series.clone(), pipeline.relational.clone(), AggregationConfig::default());
    let snapshot = engine.compute_global(Utc::now()).await.unwrap();
    assert_eq!(snapshot.throughput.iter().map(|p| p.value).sum::<i64>(), 1);

    let shares = engine.program_shares().await.unwrap();
    assert_eq!(shares.len(), 1);
    assert!((shares[0].percentage - 100.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_relay_republish_is_deduplicated_by_ingester() {
    let pipeline = Pipeline::start().await;
    let meta = format!(r#"{{"log_messages":["Program {} invoke [1]"]}}"#, DEMO_PROGRAM);
    let transaction = create_transaction([3u8; 64], PROGRAM, Utc::now(), &meta);

    pipeline.bus.publish_transaction(&transaction).await.unwrap();
    pipeline.wait_for_points(2).await;

    pipeline.bus.publish_transaction(&transaction).await.unwrap();
    tokio::time::sleep(StdDuration::from_millis(100)).await;

    assert_eq!(pipeline.series.points().await.len(), 2);
    assert_eq!(pipeline.relational.details().await.len(), 1);
}

#[tokio::test]
async fn test_uncorrelated_transaction_only_marks_watermark() {
    let pipeline = Pipeline::start().await;
    pipeline
        .relational
        .insert_transaction(create_transaction([4u8; 64], PROGRAM, Utc::now(), "{}"))
        .await;

    let report = pipeline.relay().relay_batch().await.unwrap();
    assert_eq!(report.marked, 1);

    tokio::time::sleep(StdDuration::from_millis(100)).await;
    assert!(pipeline.series.points().await.is_empty());
    assert!(pipeline
        .relational
        .transactions()
        .await
        .iter()
        .all(|t| t.processed_at.is_some()));
}
