use std::sync::Arc;

use sqlx::PgPool;

use crate::db::{
    CategoryRepository, DepartmentRepository, PgHealth, ProcessRepository, TokenRepository,
    UploadRepository,
};
use crate::store_traits::{
    CategoryStore, DepartmentStore, ProcessStore, StoreHealth, TokenStore, UploadStore,
};

/// Every store the services need, behind trait objects
#[derive(Clone)]
pub struct Stores {
    pub tokens: Arc<dyn TokenStore>,
    pub departments: Arc<dyn DepartmentStore>,
    pub categories: Arc<dyn CategoryStore>,
    pub processes: Arc<dyn ProcessStore>,
    pub uploads: Arc<dyn UploadStore>,
    pub health: Arc<dyn StoreHealth>,
}

impl Stores {
    /// Stores backed by PostgreSQL repositories sharing one pool
    pub fn postgres(pool: PgPool) -> Self {
        Stores {
            tokens: Arc::new(TokenRepository::new(pool.clone())),
            departments: Arc::new(DepartmentRepository::new(pool.clone())),
            categories: Arc::new(CategoryRepository::new(pool.clone())),
            processes: Arc::new(ProcessRepository::new(pool.clone())),
            uploads: Arc::new(UploadRepository::new(pool.clone())),
            health: Arc::new(PgHealth::new(pool)),
        }
    }

    /// Stores backed by one shared in-memory store
    #[cfg(feature = "test-helpers")]
    pub fn memory(store: crate::MemoryStore) -> Self {
        Stores {
            tokens: Arc::new(store.clone()),
            departments: Arc::new(store.clone()),
            categories: Arc::new(store.clone()),
            processes: Arc::new(store.clone()),
            uploads: Arc::new(store.clone()),
            health: Arc::new(store),
        }
    }
}
