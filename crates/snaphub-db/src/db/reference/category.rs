use snaphub_core::{models::Category, AppError};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for intake categories
#[derive(Clone)]
pub struct CategoryRepository {
    pool: PgPool,
}

impl CategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List all categories ordered by name
    #[tracing::instrument(skip(self), fields(db.table = "categories", db.operation = "select"))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<Postgres, Category>(
            "SELECT id, name, notes_required, created_at FROM categories ORDER BY name ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    #[tracing::instrument(skip(self), fields(db.table = "categories", db.operation = "select", db.record_id = %id))]
    pub async fn get_category(&self, id: Uuid) -> Result<Option<Category>, AppError> {
        let category = sqlx::query_as::<Postgres, Category>(
            "SELECT id, name, notes_required, created_at FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    #[tracing::instrument(skip(self), fields(db.table = "categories", db.operation = "insert"))]
    pub async fn create_category(
        &self,
        name: &str,
        notes_required: bool,
    ) -> Result<Category, AppError> {
        let category = sqlx::query_as::<Postgres, Category>(
            r#"
            INSERT INTO categories (name, notes_required)
            VALUES ($1, $2)
            RETURNING id, name, notes_required, created_at
            "#,
        )
        .bind(name)
        .bind(notes_required)
        .fetch_one(&self.pool)
        .await?;

        Ok(category)
    }

    /// Update name and/or `notes_required`; `None` keeps the current value
    #[tracing::instrument(skip(self), fields(db.table = "categories", db.operation = "update", db.record_id = %id))]
    pub async fn update_category(
        &self,
        id: Uuid,
        name: Option<&str>,
        notes_required: Option<bool>,
    ) -> Result<Option<Category>, AppError> {
        let category = sqlx::query_as::<Postgres, Category>(
            r#"
            UPDATE categories
            SET name = COALESCE($2, name),
                notes_required = COALESCE($3, notes_required)
            WHERE id = $1
            RETURNING id, name, notes_required, created_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(notes_required)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    /// Delete a category; its processes keep existing with `category_id = NULL`
    #[tracing::instrument(skip(self), fields(db.table = "categories", db.operation = "delete", db.record_id = %id))]
    pub async fn delete_category(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
