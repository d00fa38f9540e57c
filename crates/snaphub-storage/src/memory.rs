//! In-memory storage for tests in downstream crates.
//!
//! Supports failure injection so callers can exercise partial-batch and
//! removal-failure paths without a real backend.

use crate::keys::validate_key;
use crate::traits::{Storage, StorageError, StorageResult, StoredObject};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
struct Blob {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    blobs: HashMap<String, Blob>,
    fail_put_containing: Vec<String>,
    fail_remove_containing: Vec<String>,
    put_calls: usize,
}

/// Storage that keeps blobs in a map
#[derive(Clone)]
pub struct MemoryStorage {
    state: Arc<Mutex<State>>,
    base_url: String,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            base_url: "https://files.test".to_string(),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every `put` whose key contains `needle` fail.
    pub fn fail_put_containing(&self, needle: &str) {
        self.state().fail_put_containing.push(needle.to_string());
    }

    /// Make every `remove` whose key contains `needle` fail.
    pub fn fail_remove_containing(&self, needle: &str) {
        self.state().fail_remove_containing.push(needle.to_string());
    }

    /// Insert a blob directly, bypassing the no-overwrite rule.
    pub fn insert_blob(&self, key: &str, data: &[u8], last_modified: DateTime<Utc>) {
        self.state().blobs.insert(
            key.to_string(),
            Blob {
                data: Bytes::copy_from_slice(data),
                last_modified,
            },
        );
    }

    pub fn has_blob(&self, key: &str) -> bool {
        self.state().blobs.contains_key(key)
    }

    pub fn blob(&self, key: &str) -> Option<Bytes> {
        self.state().blobs.get(key).map(|b| b.data.clone())
    }

    /// All stored keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.state().blobs.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of `put` calls, successful or not
    pub fn put_calls(&self) -> usize {
        self.state().put_calls
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(&self, storage_key: &str, data: Bytes, _content_type: &str) -> StorageResult<()> {
        validate_key(storage_key)?;
        let mut state = self.state();
        state.put_calls += 1;

        if state
            .fail_put_containing
            .iter()
            .any(|needle| storage_key.contains(needle.as_str()))
        {
            return Err(StorageError::UploadFailed(format!(
                "injected put failure for {}",
                storage_key
            )));
        }
        if state.blobs.contains_key(storage_key) {
            return Err(StorageError::AlreadyExists(storage_key.to_string()));
        }

        state.blobs.insert(
            storage_key.to_string(),
            Blob {
                data,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn remove(&self, storage_key: &str) -> StorageResult<()> {
        validate_key(storage_key)?;
        let mut state = self.state();

        if state
            .fail_remove_containing
            .iter()
            .any(|needle| storage_key.contains(needle.as_str()))
        {
            return Err(StorageError::DeleteFailed(format!(
                "injected remove failure for {}",
                storage_key
            )));
        }
        state.blobs.remove(storage_key);
        Ok(())
    }

    fn public_url(&self, storage_key: &str) -> String {
        format!("{}/{}", self.base_url, storage_key)
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        validate_key(storage_key)?;
        Ok(self.state().blobs.contains_key(storage_key))
    }

    async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<StoredObject>> {
        let prefix = prefix.map(|p| format!("{}/", p.trim_end_matches('/')));
        let mut objects: Vec<StoredObject> = self
            .state()
            .blobs
            .iter()
            .filter(|(key, _)| prefix.as_deref().map_or(true, |p| key.starts_with(p)))
            .map(|(key, blob)| StoredObject {
                key: key.clone(),
                size: blob.data.len() as u64,
                last_modified: blob.last_modified,
            })
            .collect();
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn injected_failures_only_hit_matching_keys() {
        let storage = MemoryStorage::new();
        storage.fail_put_containing("_1_");

        assert!(storage.put("1/5_0_a.jpg", Bytes::from_static(b"a"), "image/jpeg").await.is_ok());
        assert!(storage.put("1/5_1_b.jpg", Bytes::from_static(b"b"), "image/jpeg").await.is_err());
        assert_eq!(storage.keys(), vec!["1/5_0_a.jpg".to_string()]);
        assert_eq!(storage.put_calls(), 2);
    }

    #[tokio::test]
    async fn put_never_overwrites() {
        let storage = MemoryStorage::new();
        storage.put("1/x", Bytes::from_static(b"a"), "image/png").await.unwrap();
        let second = storage.put("1/x", Bytes::from_static(b"b"), "image/png").await;
        assert!(matches!(second, Err(StorageError::AlreadyExists(_))));
        assert_eq!(storage.blob("1/x").unwrap(), Bytes::from_static(b"a"));
    }
}
