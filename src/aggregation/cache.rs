use std::hash::Hash;
use std::time::Duration;

use rustc_hash::FxHashMap;
use tokio::sync::RwLock;
use tokio::time::Instant;

struct Entry<V> {
    stored_at: Instant,
    value: V,
}

/// Whole-value cache with a fixed time to live.
///
/// Readers share the lock; a refresh replaces the entry for its key in one
/// write, so nobody sees a partially updated value. Expired entries are
/// dropped on every insert, so the map never holds more than the keys
/// refreshed within one TTL.
pub struct SnapshotCache<K, V> {
    ttl: Duration,
    entries: RwLock<FxHashMap<K, Entry<V>>>,
}

impl<K, V> SnapshotCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(FxHashMap::default()),
        }
    }

    /// The cached value, unless missing or older than the TTL
    pub async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() <= self.ttl)
            .map(|entry| entry.value.clone())
    }

    pub async fn insert(&self, key: K, value: V) {
        let ttl = self.ttl;
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.stored_at.elapsed() <= ttl);
        entries.insert(
            key,
            Entry {
                stored_at: Instant::now(),
                value,
            },
        );
    }

    pub async fn invalidate(&self, key: &K) {
        self.entries.write().await.remove(key);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
