use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Organizational unit a token can belong to. Used for audit filtering only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Request DTO for creating or renaming a department
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct DepartmentRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Department name must be between 1 and 255 characters"
    ))]
    pub name: String,
}
