use crate::core::cache::KeyValueCollection;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory collection using HashMap and Mutex
pub struct MemoryCollection {
    inner: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryCollection {
    /// Creates a new MemoryCollection instance
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCollection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueCollection for MemoryCollection {
    async fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let cache = self.inner.lock().await;
        cache.get(key).cloned()
    }

    async fn put(&self, key: &[u8], value: &[u8]) {
        let mut cache = self.inner.lock().await;
        debug!("Collection PUT for key: {}", String::from_utf8_lossy(key));
        cache.insert(key.to_vec(), value.to_vec());
    }

    async fn remove(&self, key: &[u8]) {
        let mut cache = self.inner.lock().await;
        if cache.remove(key).is_some() {
            debug!("Collection REMOVE for key: {}", String::from_utf8_lossy(key));
        }
    }
}
