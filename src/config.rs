//! `config.toml` loading and validation.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::aggregation::{AggregationConfig, ApdexThresholds, BUCKET_MINUTES, MAX_BUCKETS};
use crate::bus::BusConfig;
use crate::correlation::CorrelationConfig;
use crate::http::HttpConfig;
use crate::ingester::IngesterConfig;
use crate::logging::LoggingConfig;
use crate::postgres::PostgresConfig;
use crate::relay::RelayConfig;
use crate::timeseries::TimeSeriesConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Whole-process configuration; every section is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub correlation: CorrelationConfig,
    pub bus: BusConfig,
    pub database: PostgresConfig,
    pub timeseries: TimeSeriesConfig,
    pub ingester: IngesterConfig,
    pub relay: RelayConfig,
    pub aggregation: AggregationConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_thresholds("aggregation.global_apdex", &self.aggregation.global_apdex)?;
        check_thresholds("aggregation.program_apdex", &self.aggregation.program_apdex)?;

        for (name, minutes) in [
            ("aggregation.global_lookback_minutes", self.aggregation.global_lookback_minutes),
            ("aggregation.program_lookback_minutes", self.aggregation.program_lookback_minutes),
            ("aggregation.detail_lookback_minutes", self.aggregation.detail_lookback_minutes),
        ] {
            if minutes <= 0 || minutes % BUCKET_MINUTES != 0 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a positive multiple of {}, got {}",
                    name, BUCKET_MINUTES, minutes
                )));
            }
            if minutes / BUCKET_MINUTES > MAX_BUCKETS {
                return Err(ConfigError::Invalid(format!(
                    "{} must not exceed {} minutes, got {}",
                    name,
                    BUCKET_MINUTES * MAX_BUCKETS,
                    minutes
                )));
            }
        }

        let p = self.ingester.error_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(ConfigError::Invalid(format!(
                "ingester.error_probability must be within [0, 1], got {}",
                p
            )));
        }

        if self.bus.events_topic.is_empty() || self.bus.transactions_topic.is_empty() {
            return Err(ConfigError::Invalid("bus topic names must not be empty".to_string()));
        }

        if self.relay.batch_size <= 0 || self.relay.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "relay.batch_size and relay.poll_interval_ms must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

fn check_thresholds(name: &str, thresholds: &ApdexThresholds) -> Result<(), ConfigError> {
    if thresholds.is_valid() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{}: satisfied_ms ({}) must not exceed tolerating_ms ({})",
            name, thresholds.satisfied_ms, thresholds.tolerating_ms
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusBackend;
    use crate::correlation::CorrelationBackend;
    use crate::timeseries::TimeSeriesBackend;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.bus.events_topic, "agent_events");
        assert_eq!(config.bus.transactions_topic, "solana_transactions");
        assert_eq!(config.relay.batch_size, 1000);
        assert_eq!(config.relay.poll_interval_ms, 1000);
        assert_eq!(config.aggregation.cache_ttl_seconds, 600);
        assert_eq!(config.aggregation.global_apdex, ApdexThresholds::global());
        assert_eq!(config.ingester.dedup_window, 4096);
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config = AppConfig::from_toml_str(include_str!("../config.toml")).unwrap();
        assert_eq!(config.bus.kafka.bootstrap_servers, vec!["localhost:9092"]);
        assert_eq!(config.aggregation.program_apdex, ApdexThresholds::program());
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.correlation.ttl_seconds, None);
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [correlation]
            backend = "memory"

            [bus]
            backend = "memory"

            [timeseries]
            backend = "memory"

            [ingester]
            demo_program_ids = []
            error_probability = 0.0

            [aggregation]
            global_lookback_minutes = 120
            global_apdex = { satisfied_ms = 100, tolerating_ms = 400 }

            [http]
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(config.correlation.backend, CorrelationBackend::Memory);
        assert_eq!(config.bus.backend, BusBackend::Memory);
        assert_eq!(config.timeseries.backend, TimeSeriesBackend::Memory);
        assert!(config.ingester.demo_program_ids.is_empty());
        assert_eq!(config.aggregation.global_lookback_minutes, 120);
        assert_eq!(config.aggregation.global_apdex.tolerating_ms, 400);
        assert_eq!(config.aggregation.program_lookback_minutes, 480);
        assert_eq!(config.http.port, 9000);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let cases = [
            "[aggregation]\nglobal_apdex = { satisfied_ms = 2000, tolerating_ms = 1000 }",
            "[aggregation]\nprogram_lookback_minutes = 45",
            "[aggregation]\ndetail_lookback_minutes = 0",
            "[aggregation]\nglobal_lookback_minutes = 43230",
            "[aggregation]\nprogram_lookback_minutes = 128849018910",
            "[ingester]\nerror_probability = 1.5",
            "[bus]\nevents_topic = \"\"",
            "[relay]\nbatch_size = 0",
        ];

        for case in cases {
            assert!(
                matches!(AppConfig::from_toml_str(case), Err(ConfigError::Invalid(_))),
                "accepted: {}",
                case
            );
        }
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[relay]\nbatch_size = 50").unwrap();

        let config = AppConfig::from_toml(file.path()).unwrap();
        assert_eq!(config.relay.batch_size, 50);

        assert!(matches!(AppConfig::from_toml("/nonexistent/config.toml"), Err(ConfigError::Io(_))));
        assert!(matches!(AppConfig::from_toml_str("relay = 3"), Err(ConfigError::Toml(_))));
    }
}
