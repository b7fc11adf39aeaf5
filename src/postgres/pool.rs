use std::time::Duration;

use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime, SslMode, Timeouts};
use serde::Deserialize;
use tokio_postgres::NoTls;
use tracing::info;

use super::errors::PostgresError;

/// Connection settings for the database holding `transactions` and `transaction_details`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_connections: usize,
    pub application_name: String,
    /// Bound on waiting for a free connection and on opening a new one
    pub connect_timeout_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "txn_pulse".to_string(),
            username: "postgres".to_string(),
            password: "password".to_string(),
            max_connections: 10,
            application_name: "txn_pulse".to_string(),
            connect_timeout_ms: 5000,
        }
    }
}

/// Build the connection pool and check it with a round trip
pub async fn initialize_pool(config: &PostgresConfig) -> Result<Pool, PostgresError> {
    info!(
        host = %config.host,
        port = config.port,
        database = %config.database,
        username = %config.username,
        max_connections = config.max_connections,
        "💾 Connecting to PostgreSQL"
    );

    let mut cfg = Config::new();
    cfg.host = Some(config.host.clone());
    cfg.port = Some(config.port);
    cfg.dbname = Some(config.database.clone());
    cfg.user = Some(config.username.clone());
    cfg.password = Some(config.password.clone());
    cfg.application_name = Some(config.application_name.clone());
    cfg.ssl_mode = Some(SslMode::Disable);
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    let timeout = Duration::from_millis(config.connect_timeout_ms);
    cfg.pool = Some(PoolConfig {
        max_size: config.max_connections,
        timeouts: Timeouts {
            wait: Some(timeout),
            create: Some(timeout),
            recycle: None,
        },
    });

    let pool = cfg
        .create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| PostgresError::Config(format!("can't build connection pool: {}", e)))?;

    // Both relay tables must exist before the loops start
    let client = pool.get().await?;
    let row = client
        .query_one(
            "SELECT to_regclass('transactions') IS NOT NULL AND to_regclass('transaction_details') IS NOT NULL AS ready",
            &[],
        )
        .await?;
    let ready: bool = row.try_get("ready")?;
    if !ready {
        return Err(PostgresError::Config(
            "tables transactions/transaction_details are missing; apply sql/schema.sql".to_string(),
        ));
    }

    info!("✅ PostgreSQL pool ready");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_config_default() {
        let config = PostgresConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5432);
        assert_eq!(config.database, "txn_pulse");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.connect_timeout_ms, 5000);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: PostgresConfig = toml::from_str("host = \"db.internal\"\nport = 6432").unwrap();
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 6432);
        assert_eq!(config.username, "postgres");
    }
}
