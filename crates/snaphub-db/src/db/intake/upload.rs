use snaphub_core::{
    models::{NewUpload, Upload},
    AppError,
};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for upload metadata records
#[derive(Clone)]
pub struct UploadRepository {
    pool: PgPool,
}

impl UploadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a stored blob against its process.
    ///
    /// Returns `None` when the process no longer exists.
    #[tracing::instrument(skip(self, upload), fields(db.table = "uploads", db.operation = "insert", file_path = %upload.file_path))]
    pub async fn add_upload(&self, upload: NewUpload) -> Result<Option<Upload>, AppError> {
        let record = sqlx::query_as::<Postgres, Upload>(
            r#"
            INSERT INTO uploads (process_id, file_path, mime_type, size)
            SELECT id, $2, $3, $4 FROM processes WHERE id = $1
            RETURNING id, process_id, file_path, mime_type, size, created_at
            "#,
        )
        .bind(upload.process_id)
        .bind(&upload.file_path)
        .bind(&upload.mime_type)
        .bind(upload.size)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploads", db.operation = "select", db.record_id = %id))]
    pub async fn get_upload(&self, id: Uuid) -> Result<Option<Upload>, AppError> {
        let upload = sqlx::query_as::<Postgres, Upload>(
            r#"
            SELECT id, process_id, file_path, mime_type, size, created_at
            FROM uploads
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(upload)
    }

    /// List all uploads, newest first
    #[tracing::instrument(skip(self), fields(db.table = "uploads", db.operation = "select"))]
    pub async fn list_uploads(&self) -> Result<Vec<Upload>, AppError> {
        let uploads = sqlx::query_as::<Postgres, Upload>(
            r#"
            SELECT id, process_id, file_path, mime_type, size, created_at
            FROM uploads
            ORDER BY created_at DESC, file_path DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(uploads)
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploads", db.operation = "select", process_id = %process_id))]
    pub async fn list_uploads_for_process(&self, process_id: Uuid) -> Result<Vec<Upload>, AppError> {
        let uploads = sqlx::query_as::<Postgres, Upload>(
            r#"
            SELECT id, process_id, file_path, mime_type, size, created_at
            FROM uploads
            WHERE process_id = $1
            ORDER BY created_at DESC, file_path DESC
            "#,
        )
        .bind(process_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(uploads)
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploads", db.operation = "delete", db.record_id = %id))]
    pub async fn delete_upload(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM uploads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
