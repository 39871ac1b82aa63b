//! Durable key-value persistence behind the aggregation cache.

pub mod file_store;
pub mod memory_store;

pub use file_store::FileStore;
pub use memory_store::MemoryStore;

use async_trait::async_trait;

/// Cache keys as constants.
pub mod keys {
    /// Serialized reconciled timeline.
    pub const ACTIVITIES: &str = "activities";
}

/// Opaque byte storage keyed by string.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value. A missing key is `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace the value stored under `key`.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;
}

/// Persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}
