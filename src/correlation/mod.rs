//! Correlation Store Adapter: the index from `"{method}.{result}"` keys to the
//! client events the collector captured.

pub mod errors;
pub mod lmdb;
pub mod memory;
pub mod store;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use errors::CorrelationError;
pub use lmdb::LmdbCorrelationStore;
pub use memory::MemoryCorrelationStore;
pub use store::{CorrelationKey, CorrelationStore, SEND_TRANSACTION_METHOD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationBackend {
    Lmdb,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    pub backend: CorrelationBackend,
    pub path: PathBuf,
    pub map_size_mb: usize,
    /// Entries older than this read as missing; `None` keeps them forever
    pub ttl_seconds: Option<u64>,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            backend: CorrelationBackend::Lmdb,
            path: PathBuf::from("data/correlation"),
            map_size_mb: 1024,
            ttl_seconds: None,
        }
    }
}

const MIN_PURGE_INTERVAL_SECS: u64 = 60;

/// Open the configured backend. An LMDB store with a TTL also gets a
/// background purge task that stops with `cancel`.
pub fn build_correlation_store(
    config: &CorrelationConfig,
    cancel: &CancellationToken,
) -> Result<Arc<dyn CorrelationStore>, CorrelationError> {
    match config.backend {
        CorrelationBackend::Lmdb => {
            let store = Arc::new(LmdbCorrelationStore::open(
                &config.path,
                config.map_size_mb * 1024 * 1024,
                config.ttl_seconds.map(Duration::from_secs),
            )?);

            if let Some(ttl) = config.ttl_seconds {
                let purger = store.clone();
                let cancel = cancel.clone();
                let every = Duration::from_secs(ttl.max(MIN_PURGE_INTERVAL_SECS));
                tokio::spawn(async move { purger.run_purge(every, cancel).await });
            }
            Ok(store as Arc<dyn CorrelationStore>)
        }
        CorrelationBackend::Memory => {
            info!("🧠 Using in-memory correlation store");
            Ok(Arc::new(MemoryCorrelationStore::new()))
        }
    }
}
