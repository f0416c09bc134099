use crate::core::cache::KeyValueCollection;
use anyhow::Result;
use async_trait::async_trait;
use fjall::{Keyspace, PartitionHandle, PersistMode};
use tracing::debug;

/// A collection backed by one fjall partition. Holds on to its keyspace so
/// the journal outlives the store that opened it. Every write is synced.
pub struct DiskCollection {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskCollection {
    pub fn new(keyspace: Keyspace, partition: PartitionHandle) -> Self {
        Self {
            keyspace,
            partition,
        }
    }

    fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value = self.partition.get(key)?.map(|raw| raw.to_vec());
        match value {
            Some(_) => debug!("Disk HIT for key: {}", String::from_utf8_lossy(key)),
            None => debug!("Disk MISS for key: {}", String::from_utf8_lossy(key)),
        }
        Ok(value)
    }

    fn write(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.partition.insert(key, value)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!("Disk PUT for key: {}", String::from_utf8_lossy(key));
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.partition.remove(key)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueCollection for DiskCollection {
    async fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.read(key) {
            Ok(value) => value,
            Err(e) => {
                debug!("DiskCollection get error: {}", e);
                None
            }
        }
    }

    async fn put(&self, key: &[u8], value: &[u8]) {
        if let Err(e) = self.write(key, value) {
            debug!("DiskCollection put error: {}", e);
        }
    }

    async fn remove(&self, key: &[u8]) {
        if let Err(e) = self.delete(key) {
            debug!("DiskCollection remove error: {}", e);
        }
    }
}
