use crate::db::transaction::TransactionGuard;
use snaphub_core::{
    models::{NewToken, Token, TokenMembership, TokenPatch},
    AppError,
};
use sqlx::{PgConnection, PgPool, Postgres};
use uuid::Uuid;

const TOKEN_COLUMNS: &str = "id, token, label, email, active, created_at";

/// Repository for access tokens and their department memberships
#[derive(Clone)]
pub struct TokenRepository {
    pool: PgPool,
}

impl TokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Look up a token by its secret, active or not
    #[tracing::instrument(skip(self, secret), fields(db.table = "tokens", db.operation = "select"))]
    pub async fn find_by_secret(&self, secret: &str) -> Result<Option<Token>, AppError> {
        let token = sqlx::query_as::<Postgres, Token>(&format!(
            "SELECT {} FROM tokens WHERE token = $1",
            TOKEN_COLUMNS
        ))
        .bind(secret)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    #[tracing::instrument(skip(self), fields(db.table = "tokens", db.operation = "select", db.record_id = %id))]
    pub async fn get_token(&self, id: Uuid) -> Result<Option<Token>, AppError> {
        let token = sqlx::query_as::<Postgres, Token>(&format!(
            "SELECT {} FROM tokens WHERE id = $1",
            TOKEN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    /// List all tokens, newest first
    #[tracing::instrument(skip(self), fields(db.table = "tokens", db.operation = "select"))]
    pub async fn list_tokens(&self) -> Result<Vec<Token>, AppError> {
        let tokens = sqlx::query_as::<Postgres, Token>(&format!(
            "SELECT {} FROM tokens ORDER BY created_at DESC, id ASC",
            TOKEN_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(tokens)
    }

    #[tracing::instrument(skip(self), fields(db.table = "token_departments", db.operation = "select"))]
    pub async fn list_memberships(&self) -> Result<Vec<TokenMembership>, AppError> {
        let memberships = sqlx::query_as::<Postgres, TokenMembership>(
            "SELECT token_id, department_id FROM token_departments",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(memberships)
    }

    #[tracing::instrument(skip(self), fields(db.table = "token_departments", db.operation = "select", db.record_id = %token_id))]
    pub async fn department_ids_for(&self, token_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<Postgres, Uuid>(
            r#"
            SELECT td.department_id
            FROM token_departments td
            JOIN departments d ON d.id = td.department_id
            WHERE td.token_id = $1
            ORDER BY d.name ASC, d.id ASC
            "#,
        )
        .bind(token_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Insert a token and its memberships in one transaction.
    ///
    /// Unknown department ids fail with a validation error and nothing is written.
    #[tracing::instrument(skip(self, new_token), fields(db.table = "tokens", db.operation = "insert"))]
    pub async fn create_token(&self, new_token: NewToken) -> Result<Token, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        ensure_departments_exist(tx.conn()?, &new_token.department_ids).await?;

        let token = sqlx::query_as::<Postgres, Token>(&format!(
            r#"
            INSERT INTO tokens (token, label, email)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            TOKEN_COLUMNS
        ))
        .bind(&new_token.token)
        .bind(&new_token.label)
        .bind(&new_token.email)
        .fetch_one(tx.conn()?)
        .await?;

        insert_memberships(tx.conn()?, token.id, &new_token.department_ids).await?;

        tx.commit().await?;

        Ok(token)
    }

    /// Apply a label/email patch. The secret is never touched.
    #[tracing::instrument(skip(self, patch), fields(db.table = "tokens", db.operation = "update", db.record_id = %id))]
    pub async fn update_token(&self, id: Uuid, patch: TokenPatch) -> Result<Option<Token>, AppError> {
        let token = sqlx::query_as::<Postgres, Token>(&format!(
            r#"
            UPDATE tokens
            SET label = CASE WHEN $2 THEN $3 ELSE label END,
                email = CASE WHEN $4 THEN $5 ELSE email END
            WHERE id = $1
            RETURNING {}
            "#,
            TOKEN_COLUMNS
        ))
        .bind(id)
        .bind(patch.label.is_some())
        .bind(patch.label.flatten())
        .bind(patch.email.is_some())
        .bind(patch.email.flatten())
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    #[tracing::instrument(skip(self), fields(db.table = "tokens", db.operation = "update", db.record_id = %id))]
    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<Token>, AppError> {
        let token = sqlx::query_as::<Postgres, Token>(&format!(
            "UPDATE tokens SET active = $2 WHERE id = $1 RETURNING {}",
            TOKEN_COLUMNS
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    /// Replace the token's memberships. Returns `false` when the token does not exist.
    #[tracing::instrument(skip(self), fields(db.table = "token_departments", db.operation = "replace", db.record_id = %id))]
    pub async fn set_departments(&self, id: Uuid, department_ids: &[Uuid]) -> Result<bool, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        let locked = sqlx::query_scalar::<Postgres, Uuid>(
            "SELECT id FROM tokens WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(tx.conn()?)
        .await?;

        if locked.is_none() {
            tx.rollback().await?;
            return Ok(false);
        }

        ensure_departments_exist(tx.conn()?, department_ids).await?;

        sqlx::query("DELETE FROM token_departments WHERE token_id = $1")
            .bind(id)
            .execute(tx.conn()?)
            .await?;

        insert_memberships(tx.conn()?, id, department_ids).await?;

        tx.commit().await?;

        Ok(true)
    }
}

fn distinct(ids: &[Uuid]) -> Vec<Uuid> {
    let mut unique = ids.to_vec();
    unique.sort();
    unique.dedup();
    unique
}

async fn ensure_departments_exist(conn: &mut PgConnection, ids: &[Uuid]) -> Result<(), AppError> {
    let unique = distinct(ids);
    if unique.is_empty() {
        return Ok(());
    }

    let found = sqlx::query_scalar::<Postgres, i64>(
        "SELECT COUNT(*) FROM departments WHERE id = ANY($1)",
    )
    .bind(&unique)
    .fetch_one(&mut *conn)
    .await?;

    if found as usize != unique.len() {
        return Err(AppError::Validation("unknown department id".to_string()));
    }
    Ok(())
}

async fn insert_memberships(
    conn: &mut PgConnection,
    token_id: Uuid,
    department_ids: &[Uuid],
) -> Result<(), AppError> {
    let unique = distinct(department_ids);
    if unique.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO token_departments (token_id, department_id)
        SELECT $1, UNNEST($2::uuid[])
        "#,
    )
    .bind(token_id)
    .bind(&unique)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
