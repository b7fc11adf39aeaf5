use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;

use super::errors::CorrelationError;
use super::store::{CorrelationKey, CorrelationStore};
use crate::model::ClientEvent;

/// Process-local correlation store for tests and single-node setups
#[derive(Default)]
pub struct MemoryCorrelationStore {
    events: RwLock<FxHashMap<String, ClientEvent>>,
}

impl MemoryCorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[async_trait]
impl CorrelationStore for MemoryCorrelationStore {
    async fn put(&self, key: &CorrelationKey, event: &ClientEvent) -> Result<(), CorrelationError> {
        self.events
            .write()
            .await
            .insert(key.as_str().to_string(), event.clone());
        Ok(())
    }

    async fn get(&self, key: &CorrelationKey) -> Result<ClientEvent, CorrelationError> {
        self.events
            .read()
            .await
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| CorrelationError::NotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = MemoryCorrelationStore::new();
        let key = CorrelationKey::for_send_transaction("sig");

        let first = ClientEvent::new(Uuid::new_v4());
        let second = ClientEvent::new(Uuid::new_v4());
        store.put(&key, &first).await.unwrap();
        store.put(&key, &second).await.unwrap();

        assert_eq!(store.get(&key).await.unwrap().id, second.id);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_key() {
        let store = MemoryCorrelationStore::new();
        let result = store.get(&CorrelationKey::for_send_transaction("missing")).await;
        assert!(matches!(result, Err(CorrelationError::NotFound(key)) if key == "sendTransaction.missing"));
        assert!(store.is_empty().await);
    }
}
