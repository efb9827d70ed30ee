use std::collections::BTreeMap;
use tokio::sync::RwLock;
use async_trait::async_trait;
use tracing::trace;

use crate::{Storage, StorageError, StorageOptions, StorageResult, WriteBatch};

/// In-memory storage implementation
#[derive(Default)]
pub struct MemoryStorage {
    data: RwLock<BTreeMap<String, Vec<u8>>>,
    options: StorageOptions,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::with_options(StorageOptions::default())
    }

    /// Create a memory storage instance with explicit limits
    pub fn with_options(options: StorageOptions) -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            options,
        }
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    /// Whether nothing is stored
    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        self.options.check(key, data)?;
        let mut storage = self.data.write().await;
        storage.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let storage = self.data.read().await;
        storage.get(key)
            .cloned()
            .ok_or_else(|| StorageError::KeyNotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let mut storage = self.data.write().await;
        if storage.remove(key).is_none() {
            return Err(StorageError::KeyNotFound(key.to_string()));
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let storage = self.data.read().await;
        Ok(storage.contains_key(key))
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let storage = self.data.read().await;
        Ok(storage.range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn write_batch(&self, batch: WriteBatch) -> StorageResult<()> {
        let puts = batch.into_puts();

        // validate everything before touching the map
        for (key, data) in &puts {
            self.options.check(key, data)?;
        }

        let mut storage = self.data.write().await;
        trace!("Applying batch of {} writes", puts.len());
        for (key, data) in puts {
            storage.insert(key, data);
        }
        Ok(())
    }
}
