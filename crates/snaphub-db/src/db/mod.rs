//! PostgreSQL repositories
//!
//! Repositories are split into reference/ (tokens, departments, categories)
//! and intake/ (processes, uploads). Each one owns the queries for one table.

pub mod intake;
pub mod reference;
pub mod transaction;

pub use intake::{ProcessRepository, UploadRepository};
pub use reference::{CategoryRepository, DepartmentRepository, TokenRepository};

use snaphub_core::AppError;
use sqlx::{PgPool, Postgres};

/// Connectivity probe used by readiness checks
#[derive(Clone)]
pub struct PgHealth {
    pool: PgPool,
}

impl PgHealth {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.operation = "ping"))]
    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query_scalar::<Postgres, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}
