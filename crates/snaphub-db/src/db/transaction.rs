//! Database transaction utilities
//!
//! Multi-statement writes (token creation with memberships, membership
//! replacement) go through [`TransactionGuard`].

use anyhow::Context;
use snaphub_core::AppError;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

/// A transaction that must be committed explicitly.
///
/// Dropping an uncommitted guard rolls the transaction back (sqlx queues the
/// rollback on the connection before it returns to the pool).
///
/// # Example
///
/// ```ignore
/// use snaphub_db::TransactionGuard;
///
/// async fn example(pool: &sqlx::PgPool) -> Result<(), snaphub_core::AppError> {
///     let mut tx = TransactionGuard::begin(pool).await?;
///     sqlx::query("DELETE FROM token_departments WHERE token_id = $1")
///         .bind(uuid::Uuid::nil())
///         .execute(tx.conn()?)
///         .await?;
///     tx.commit().await
/// }
/// ```
pub struct TransactionGuard {
    transaction: Option<Transaction<'static, Postgres>>,
}

impl TransactionGuard {
    /// Begin a new database transaction
    pub async fn begin(pool: &PgPool) -> Result<Self, AppError> {
        let transaction = pool
            .begin()
            .await
            .context("Failed to begin database transaction")?;

        Ok(Self {
            transaction: Some(transaction),
        })
    }

    /// Connection to run statements on
    pub fn conn(&mut self) -> Result<&mut PgConnection, AppError> {
        self.transaction
            .as_deref_mut()
            .ok_or_else(|| AppError::Internal("transaction already finished".to_string()))
    }

    /// Commit the transaction
    pub async fn commit(mut self) -> Result<(), AppError> {
        if let Some(tx) = self.transaction.take() {
            tx.commit()
                .await
                .context("Failed to commit database transaction")?;
        }
        Ok(())
    }

    /// Roll the transaction back
    pub async fn rollback(mut self) -> Result<(), AppError> {
        if let Some(tx) = self.transaction.take() {
            tx.rollback()
                .await
                .context("Failed to rollback database transaction")?;
        }
        Ok(())
    }
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        if self.transaction.is_some() {
            tracing::debug!("Transaction dropped without commit - rolling back");
        }
    }
}
