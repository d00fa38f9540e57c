//! Storage abstraction trait
//!
//! This module defines the Storage trait that all blob store backends implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use snaphub_core::AppError;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidKey(msg) => AppError::Validation(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// A blob as reported by [`Storage::list`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Blob store contract
///
/// Reads are public once a blob is stored: [`Storage::public_url`] returns an
/// unauthenticated URL.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `data` under `storage_key`.
    ///
    /// Never overwrites: fails with [`StorageError::AlreadyExists`] when the key is taken.
    async fn put(&self, storage_key: &str, data: Bytes, content_type: &str) -> StorageResult<()>;

    /// Remove a blob. Removing a missing blob succeeds.
    async fn remove(&self, storage_key: &str) -> StorageResult<()>;

    /// Remove several blobs, stopping at the first failure.
    async fn remove_many(&self, storage_keys: &[String]) -> StorageResult<()> {
        for key in storage_keys {
            self.remove(key).await?;
        }
        Ok(())
    }

    /// Public URL of a blob
    fn public_url(&self, storage_key: &str) -> String;

    /// Check if a blob exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// List blobs, optionally below a key prefix
    async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<StoredObject>>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
