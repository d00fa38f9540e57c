//! SnapHub Storage Library
//!
//! Blob storage abstraction and its backends (local filesystem, S3).
//!
//! # Storage key format
//!
//! Upload keys are `{process_number}/{timestamp_ms}_{index}_{sanitized_name}`
//! and are built by [`keys::upload_key`]. Keys must be relative, use `/` as the
//! separator and must not contain empty, `.` or `..` segments. Every backend
//! checks this with [`keys::validate_key`].

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "test-helpers")]
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "test-helpers")]
pub use memory::MemoryStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use snaphub_core::StorageBackend;
pub use traits::{Storage, StorageError, StorageResult, StoredObject};
