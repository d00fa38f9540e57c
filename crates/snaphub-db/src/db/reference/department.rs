use snaphub_core::{models::Department, AppError};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for departments
#[derive(Clone)]
pub struct DepartmentRepository {
    pool: PgPool,
}

impl DepartmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List all departments ordered by name
    #[tracing::instrument(skip(self), fields(db.table = "departments", db.operation = "select"))]
    pub async fn list_departments(&self) -> Result<Vec<Department>, AppError> {
        let departments = sqlx::query_as::<Postgres, Department>(
            "SELECT id, name, created_at FROM departments ORDER BY name ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(departments)
    }

    #[tracing::instrument(skip(self), fields(db.table = "departments", db.operation = "select", db.record_id = %id))]
    pub async fn get_department(&self, id: Uuid) -> Result<Option<Department>, AppError> {
        let department = sqlx::query_as::<Postgres, Department>(
            "SELECT id, name, created_at FROM departments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(department)
    }

    #[tracing::instrument(skip(self), fields(db.table = "departments", db.operation = "insert"))]
    pub async fn create_department(&self, name: &str) -> Result<Department, AppError> {
        let department = sqlx::query_as::<Postgres, Department>(
            r#"
            INSERT INTO departments (name)
            VALUES ($1)
            RETURNING id, name, created_at
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(department)
    }

    #[tracing::instrument(skip(self), fields(db.table = "departments", db.operation = "update", db.record_id = %id))]
    pub async fn rename_department(
        &self,
        id: Uuid,
        name: &str,
    ) -> Result<Option<Department>, AppError> {
        let department = sqlx::query_as::<Postgres, Department>(
            r#"
            UPDATE departments
            SET name = $2
            WHERE id = $1
            RETURNING id, name, created_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(department)
    }

    /// Delete a department; memberships cascade
    #[tracing::instrument(skip(self), fields(db.table = "departments", db.operation = "delete", db.record_id = %id))]
    pub async fn delete_department(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
