use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use txn_pulse::aggregation::MetricsEngine;
use txn_pulse::bus::build_event_bus;
use txn_pulse::collector::{EventCollector, EventPublisher};
use txn_pulse::config::AppConfig;
use txn_pulse::correlation::build_correlation_store;
use txn_pulse::http::{self, HttpState};
use txn_pulse::ingester::MetricsIngester;
use txn_pulse::logging::{cleanup_old_logs, init_dual_logging};
use txn_pulse::metrics::MetricsRegistry;
use txn_pulse::postgres::{initialize_pool, PostgresStore};
use txn_pulse::relay::TransactionRelay;
use txn_pulse::timeseries::build_time_series;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = AppConfig::from_toml(&config_path)?;

    let _log_guard = init_dual_logging(config.logging.clone())?;
    if let Err(e) = cleanup_old_logs(&config.logging.log_dir, config.logging.cleanup_days) {
        warn!("Failed to clean up old log files: {}", e);
    }
    info!("🚀 Starting txn_pulse with {}", config_path);

    let cancel = CancellationToken::new();
    let metrics = Arc::new(MetricsRegistry::new()?);

    let correlation = build_correlation_store(&config.correlation, &cancel)?;
    let bus = build_event_bus(&config.bus)?;
    let time_series = build_time_series(&config.timeseries)?;
    let relational = Arc::new(PostgresStore::new(initialize_pool(&config.database).await?));

    // Subscriptions are created up front so a setup failure stops the process
    let events = bus.subscribe_events().await?;
    let transactions = bus.subscribe_transactions().await?;

    let collector = EventCollector::new(correlation.clone()).with_metrics(metrics.clone());
    let relay = TransactionRelay::new(relational.clone(), bus.clone(), config.relay.clone())
        .with_metrics(metrics.clone());
    let ingester = MetricsIngester::new(correlation, time_series.clone(), relational.clone(), &config.ingester)
        .with_metrics(metrics.clone());
    let engine = MetricsEngine::new(time_series, relational, config.aggregation.clone())
        .with_metrics(metrics.clone());

    let collector_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { collector.run(events, cancel).await })
    };
    let relay_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { relay.run(cancel).await })
    };
    let ingester_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { ingester.run(transactions, cancel).await })
    };

    let state = HttpState {
        publisher: Arc::new(EventPublisher::new(bus)),
        engine: Arc::new(engine),
        metrics,
    };
    let http_task = {
        let cancel = cancel.clone();
        let http_config = config.http.clone();
        tokio::spawn(async move {
            if let Err(e) = http::serve(http_config, state, cancel.clone()).await {
                error!("❌ HTTP server failed: {}", e);
                cancel.cancel();
            }
        })
    };

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("🛑 Ctrl+C received, shutting down"),
                Err(e) => error!("❌ Failed to listen for Ctrl+C: {}", e),
            }
            cancel.cancel();
        });
    }

    for (name, task) in [
        ("collector", collector_task),
        ("relay", relay_task),
        ("ingester", ingester_task),
        ("http", http_task),
    ] {
        if let Err(e) = task.await {
            error!("❌ {} task failed: {}", name, e);
        }
    }

    info!("✅ txn_pulse stopped");
    Ok(())
}
