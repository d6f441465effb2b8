//! In-process object store.
//!
//! Backs dry runs against a snapshot and every storage/pipeline test. Puts
//! can be made to fail per key to exercise partial-failure handling.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{remote_err, StorageError};
use crate::store::ObjectStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    failing_puts: Mutex<BTreeSet<String>>,
    puts: AtomicUsize,
    gets: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `keys` (empty bodies).
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        {
            let mut objects = lock(&store.objects);
            for key in keys {
                objects.insert(key.into(), Vec::new());
            }
        }
        store
    }

    /// Make every future `put` for `key` fail.
    pub fn fail_puts_for(&self, key: impl Into<String>) {
        lock(&self.failing_puts).insert(key.into());
    }

    pub fn insert(&self, key: impl Into<String>, body: Vec<u8>) {
        lock(&self.objects).insert(key.into(), body);
    }

    pub fn keys(&self) -> Vec<String> {
        lock(&self.objects).keys().cloned().collect()
    }

    pub fn body(&self, key: &str) -> Option<Vec<u8>> {
        lock(&self.objects).get(key).cloned()
    }

    /// Number of `put` calls attempted, failed ones included.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(lock(&self.objects)
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        lock(&self.objects)
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                key: key.to_string(),
            })
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), StorageError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if lock(&self.failing_puts).contains(key) {
            return Err(remote_err("put", key, "injected failure"));
        }
        lock(&self.objects).insert(key.to_string(), body);
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_filters_by_prefix() {
        let store = MemoryStore::with_keys(["a/1.png", "a/2.png", "b/1.png"]);
        let keys = store.list("a/").await.unwrap();
        assert_eq!(keys, vec!["a/1.png".to_string(), "a/2.png".to_string()]);
    }

    #[tokio::test]
    async fn injected_put_failure_leaves_store_untouched() {
        let store = MemoryStore::new();
        store.fail_puts_for("x");
        assert!(store.put("x", vec![1]).await.is_err());
        assert!(store.body("x").is_none());
        assert_eq!(store.put_count(), 1);
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = tokio_test::block_on(store.get("nope")).unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
        assert_eq!(store.get_count(), 1);
    }
}
