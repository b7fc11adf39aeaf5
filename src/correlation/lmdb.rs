use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::errors::CorrelationError;
use super::store::{CorrelationKey, CorrelationStore};
use crate::model::ClientEvent;

const EVENTS_DB_NAME: &str = "client_events";
const LMDB_MAX_DBS: u32 = 4;
const LMDB_MAX_READERS: u32 = 256;

/// Value stored per key; the write time backs TTL expiry
#[derive(Serialize, Deserialize)]
struct StoredEvent {
    written_at_ms: i64,
    event: ClientEvent,
}

/// Correlation store persisted in an LMDB environment.
///
/// Entries are JSON-encoded. LMDB calls block, so every operation runs on the
/// blocking thread pool.
pub struct LmdbCorrelationStore {
    env: Env,
    events: Database<Str, Bytes>,
    ttl_ms: Option<i64>,
}

impl LmdbCorrelationStore {
    pub fn open(path: &Path, map_size: usize, ttl: Option<Duration>) -> Result<Self, CorrelationError> {
        std::fs::create_dir_all(path).map_err(|e| {
            CorrelationError::Storage(format!(
                "Failed to create correlation store directory {}: {}",
                path.display(),
                e
            ))
        })?;

        // SAFETY: the environment is opened once per path for the lifetime of the store
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(LMDB_MAX_DBS)
                .max_readers(LMDB_MAX_READERS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let events = env.create_database::<Str, Bytes>(&mut wtxn, Some(EVENTS_DB_NAME))?;
        wtxn.commit()?;

        info!(
            "✅ Opened correlation store at {} (ttl: {:?})",
            path.display(),
            ttl
        );

        Ok(Self {
            env,
            events,
            ttl_ms: ttl.map(|d| d.as_millis() as i64),
        })
    }

    fn is_expired(ttl_ms: Option<i64>, written_at_ms: i64, now_ms: i64) -> bool {
        ttl_ms.is_some_and(|ttl| now_ms - written_at_ms >= ttl)
    }

    /// Delete every entry older than the TTL; returns how many were removed
    pub async fn purge_expired(&self) -> Result<usize, CorrelationError> {
        let Some(ttl_ms) = self.ttl_ms else {
            return Ok(0);
        };

        let env = self.env.clone();
        let events = self.events;

        let removed = tokio::task::spawn_blocking(move || -> Result<usize, CorrelationError> {
            let now_ms = Utc::now().timestamp_millis();
            let mut wtxn = env.write_txn()?;

            let mut expired = Vec::new();
            for entry in events.iter(&wtxn)? {
                let (key, bytes) = entry?;
                let stored: StoredEvent = serde_json::from_slice(bytes)?;
                if Self::is_expired(Some(ttl_ms), stored.written_at_ms, now_ms) {
                    expired.push(key.to_string());
                }
            }

            for key in &expired {
                events.delete(&mut wtxn, key)?;
            }
            wtxn.commit()?;

            Ok(expired.len())
        })
        .await??;

        if removed > 0 {
            info!("🧹 Purged {} expired correlation entries", removed);
        }
        Ok(removed)
    }

    /// Purge expired entries every `every` until cancelled
    pub async fn run_purge(&self, every: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(every);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.purge_expired().await {
                        warn!("❌ Failed to purge expired correlation entries: {}", e);
                    }
                }
            }
        }
    }
}

#[async_trait]
impl CorrelationStore for LmdbCorrelationStore {
    async fn put(&self, key: &CorrelationKey, event: &ClientEvent) -> Result<(), CorrelationError> {
        let stored = StoredEvent {
            written_at_ms: Utc::now().timestamp_millis(),
            event: event.clone(),
        };
        let bytes = serde_json::to_vec(&stored)?;
        let env = self.env.clone();
        let events = self.events;
        let key_str = key.as_str().to_string();

        tokio::task::spawn_blocking(move || -> Result<(), CorrelationError> {
            let mut wtxn = env.write_txn()?;
            events.put(&mut wtxn, &key_str, &bytes)?;
            wtxn.commit()?;
            Ok(())
        })
        .await??;

        debug!("💾 Stored client event {} under {}", event.id, key);
        Ok(())
    }

    async fn get(&self, key: &CorrelationKey) -> Result<ClientEvent, CorrelationError> {
        let env = self.env.clone();
        let events = self.events;
        let key_str = key.as_str().to_string();

        let bytes = tokio::task::spawn_blocking(move || -> Result<Option<Vec<u8>>, CorrelationError> {
            let rtxn = env.read_txn()?;
            Ok(events.get(&rtxn, &key_str)?.map(<[u8]>::to_vec))
        })
        .await??;

        let bytes = bytes.ok_or_else(|| CorrelationError::NotFound(key.to_string()))?;
        let stored: StoredEvent = serde_json::from_slice(&bytes)?;

        if Self::is_expired(self.ttl_ms, stored.written_at_ms, Utc::now().timestamp_millis()) {
            return Err(CorrelationError::NotFound(key.to_string()));
        }

        Ok(stored.event)
    }
}
