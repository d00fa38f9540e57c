use snaphub_core::{models::Process, AppError};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for intake processes
#[derive(Clone)]
pub struct ProcessRepository {
    pool: PgPool,
}

impl ProcessRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a process for a token in a single statement.
    ///
    /// The row is only inserted while the token is still active, so a token
    /// deactivated after it was resolved yields `None` and nothing is written.
    /// `process_number` comes from the identity sequence.
    #[tracing::instrument(skip(self, note), fields(db.table = "processes", db.operation = "insert"))]
    pub async fn start_process(
        &self,
        token_id: Uuid,
        category_id: Option<Uuid>,
        note: Option<&str>,
    ) -> Result<Option<Process>, AppError> {
        let process = sqlx::query_as::<Postgres, Process>(
            r#"
            INSERT INTO processes (token_id, category_id, note)
            SELECT id, $2, $3 FROM tokens WHERE id = $1 AND active
            RETURNING id, process_number, token_id, category_id, note, created_at
            "#,
        )
        .bind(token_id)
        .bind(category_id)
        .bind(note)
        .fetch_optional(&self.pool)
        .await?;

        Ok(process)
    }

    #[tracing::instrument(skip(self), fields(db.table = "processes", db.operation = "select", db.record_id = %id))]
    pub async fn get_process(&self, id: Uuid) -> Result<Option<Process>, AppError> {
        let process = sqlx::query_as::<Postgres, Process>(
            r#"
            SELECT id, process_number, token_id, category_id, note, created_at
            FROM processes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(process)
    }

    /// List all processes, newest first
    #[tracing::instrument(skip(self), fields(db.table = "processes", db.operation = "select"))]
    pub async fn list_processes(&self) -> Result<Vec<Process>, AppError> {
        let processes = sqlx::query_as::<Postgres, Process>(
            r#"
            SELECT id, process_number, token_id, category_id, note, created_at
            FROM processes
            ORDER BY created_at DESC, process_number DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(processes)
    }
}
