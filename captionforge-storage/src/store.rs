//! The object-store capability consumed by fetch and sync.

use async_trait::async_trait;

use crate::error::StorageError;

/// Flat key/value object storage with prefix listing.
///
/// Keys use `/` as separator. Implementations must return every key under a
/// prefix from [`list`](ObjectStore::list), following pagination internally.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// All keys starting with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Object body for `key`; [`StorageError::NotFound`] when absent.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Create or replace the object at `key`.
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), StorageError>;
}
