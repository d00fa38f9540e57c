use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A numbered intake process grouping the files of one submission.
///
/// `process_number` is assigned by the store on insert and never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Process {
    pub id: Uuid,
    pub process_number: i64,
    pub token_id: Uuid,
    pub category_id: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}
