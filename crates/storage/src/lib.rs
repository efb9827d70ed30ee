//! Storage system for spacegov
//!
//! This crate provides the persistence seam used by the governance engine:
//! - An async key/value [`Storage`] trait
//! - JSON helpers through the [`JsonStorage`] extension trait
//! - All-or-nothing [`WriteBatch`] commits
//! - An in-memory implementation

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

pub mod memory_storage;

pub use memory_storage::MemoryStorage;

/// Storage-related errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Insufficient resources: {0}")]
    InsufficientResources(String),

    #[error("Unexpected error: {0}")]
    Other(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() {
            StorageError::DeserializationError(err.to_string())
        } else {
            StorageError::SerializationError(err.to_string())
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage options
#[derive(Debug, Clone)]
pub struct StorageOptions {
    pub max_key_size: usize,
    pub max_value_size: usize,
}

impl Default for StorageOptions {
    fn default() -> Self {
        StorageOptions {
            max_key_size: 1024,  // 1KB
            max_value_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

impl StorageOptions {
    /// Check a key/value pair against the configured limits
    pub fn check(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("key cannot be empty".to_string()));
        }
        if key.len() > self.max_key_size {
            return Err(StorageError::InvalidKey(format!(
                "key of {} bytes exceeds limit of {}", key.len(), self.max_key_size
            )));
        }
        if value.len() > self.max_value_size {
            return Err(StorageError::InsufficientResources(format!(
                "value of {} bytes for {} exceeds limit of {}", value.len(), key, self.max_value_size
            )));
        }
        Ok(())
    }
}

/// A set of writes applied all-or-nothing by [`Storage::write_batch`]
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    puts: Vec<(String, Vec<u8>)>,
}

impl WriteBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue raw bytes for a key
    pub fn put(&mut self, key: impl Into<String>, data: Vec<u8>) -> &mut Self {
        self.puts.push((key.into(), data));
        self
    }

    /// Queue a serializable value for a key
    pub fn put_json<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> StorageResult<&mut Self> {
        let data = serde_json::to_vec(value)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        Ok(self.put(key, data))
    }

    /// Number of queued writes
    pub fn len(&self) -> usize {
        self.puts.len()
    }

    /// Whether the batch has no writes
    pub fn is_empty(&self) -> bool {
        self.puts.is_empty()
    }

    /// Keys touched by the batch, in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.puts.iter().map(|(k, _)| k.as_str())
    }

    /// Consume the batch into its queued writes
    pub fn into_puts(self) -> Vec<(String, Vec<u8>)> {
        self.puts
    }
}

/// The core Storage trait defining the operations all storage implementations must support
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Store data at the specified key
    async fn put(&self, key: &str, data: &[u8]) -> StorageResult<()>;

    /// Retrieve data from the specified key
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Delete data at the specified key
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check if a key exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// List all keys with a given prefix
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Apply every write in the batch, or none of them.
    ///
    /// Readers must never observe a state in which only part of the batch
    /// has been applied.
    async fn write_batch(&self, batch: WriteBatch) -> StorageResult<()>;
}

/// Extension trait for JSON serialization/deserialization
#[async_trait]
pub trait JsonStorage: Storage {
    /// Store a serializable value at the specified key
    async fn put_json<T: Serialize + Send + Sync>(&self, key: &str, value: &T) -> StorageResult<()> {
        let json_data = serde_json::to_vec(value)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        self.put(key, &json_data).await
    }

    /// Retrieve and deserialize a value from the specified key
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> StorageResult<T> {
        let data = self.get(key).await?;
        serde_json::from_slice(&data)
            .map_err(|e| StorageError::DeserializationError(e.to_string()))
    }

    /// Retrieve a value, mapping a missing key to `None`
    async fn find_json<T: DeserializeOwned + Send>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.get_json(key).await {
            Ok(value) => Ok(Some(value)),
            Err(StorageError::KeyNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Retrieve and deserialize every value stored under a prefix, ordered by key
    async fn list_json<T: DeserializeOwned + Send>(&self, prefix: &str) -> StorageResult<Vec<T>> {
        let mut keys = self.list(prefix).await?;
        keys.sort();

        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get_json(&key).await?);
        }
        Ok(values)
    }

    /// Update a JSON value at the specified key with a transformation function
    async fn update_json<T, F>(&self, key: &str, update_fn: F) -> StorageResult<T>
    where
        T: DeserializeOwned + Serialize + Send,
        F: FnOnce(&mut T) -> StorageResult<()> + Send,
    {
        let mut value: T = self.get_json(key).await?;

        update_fn(&mut value)?;

        let json_data = serde_json::to_vec(&value)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        self.put(key, &json_data).await?;

        Ok(value)
    }
}

// Implement JsonStorage for any type that implements Storage
impl<T: Storage + ?Sized> JsonStorage for T {}
