//! SnapHub Database Layer
//!
//! Store traits consumed by the services, their PostgreSQL repositories and
//! an in-memory store for tests.

pub mod db;
#[cfg(feature = "test-helpers")]
pub mod memory;
pub mod store_traits;
pub mod stores;

// Re-exports: repositories
pub use db::{
    CategoryRepository, DepartmentRepository, PgHealth, ProcessRepository, TokenRepository,
    UploadRepository,
};

// Re-exports: Transaction utilities
pub use db::transaction::TransactionGuard;

// Re-exports: Store traits and bundle
pub use store_traits::{
    CategoryStore, DepartmentStore, ProcessStore, StoreHealth, TokenStore, UploadStore,
};
pub use stores::Stores;

#[cfg(feature = "test-helpers")]
pub use memory::MemoryStore;
