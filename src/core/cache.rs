use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// A byte-oriented key-value collection, either in memory or on disk.
/// Entries stay until overwritten or removed.
#[async_trait]
pub trait KeyValueCollection: Send + Sync {
    async fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    async fn put(&self, key: &[u8], value: &[u8]);
    async fn remove(&self, key: &[u8]);
}

/// A set of named collections.
pub trait Store: Send + Sync {
    fn get_collection(
        &self,
        name: &str,
        persist: bool,
        create_if_missing: bool,
    ) -> Option<Arc<dyn KeyValueCollection>>;
}

/// A value plus the instant it was fetched.
#[derive(Debug, Clone)]
pub struct TimedEntry<V> {
    pub value: V,
    pub fetched_at: Instant,
}

impl<V> TimedEntry<V> {
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// In-memory cache keyed by symbol that keeps entries past their TTL, so a
/// stale value can still be served when the provider throttles.
pub struct TimedCache<V>
where
    V: Clone + Send + Sync,
{
    inner: Mutex<HashMap<String, TimedEntry<V>>>,
}

impl<V> TimedCache<V>
where
    V: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the entry regardless of its age.
    pub async fn get(&self, key: &str) -> Option<TimedEntry<V>> {
        let cache = self.inner.lock().await;
        cache.get(key).cloned()
    }

    /// Returns the value only if it is younger than `ttl`.
    pub async fn get_fresh(&self, key: &str, ttl: Duration) -> Option<V> {
        let cache = self.inner.lock().await;
        match cache.get(key) {
            Some(entry) if entry.is_fresh(ttl) => {
                debug!("Cache HIT for key: {}", key);
                Some(entry.value.clone())
            }
            Some(_) => {
                debug!("Cache entry expired for key: {}", key);
                None
            }
            None => {
                debug!("Cache MISS for key: {}", key);
                None
            }
        }
    }

    pub async fn put(&self, key: &str, value: V) {
        let mut cache = self.inner.lock().await;
        debug!("Cache PUT for key: {}", key);
        cache.insert(
            key.to_string(),
            TimedEntry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }
}

impl<V> Default for TimedCache<V>
where
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}
