use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Category, Department, Token, TokenMembership, UploadView};

/// Placeholder shown for absent display values
pub const EMPTY_DISPLAY: &str = "—";

/// One denormalized overview row per process
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AuditRow {
    pub process_id: Uuid,
    pub process_number: i64,
    /// Department names joined with ", ", or "—"
    pub department: String,
    /// Resolved department names in name order
    pub departments: Vec<String>,
    /// `label (secret)`, the bare secret, or "—"
    pub token: String,
    pub token_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_secret: Option<String>,
    pub category: String,
    pub category_id: Option<Uuid>,
    pub note: String,
    pub upload_count: usize,
    pub created_at: DateTime<Utc>,
    /// Creation time of the newest upload, or of the process itself
    pub last_edit: DateTime<Utc>,
}

/// Optional overview filters; all present filters must match
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
pub struct OverviewFilter {
    #[serde(default)]
    pub department_id: Option<Uuid>,
    #[serde(default)]
    pub token_id: Option<Uuid>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
}

impl OverviewFilter {
    pub fn is_empty(&self) -> bool {
        self.department_id.is_none() && self.token_id.is_none() && self.category_id.is_none()
    }
}

/// Overview ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OverviewSort {
    #[default]
    CreatedDesc,
    CreatedAsc,
    LastEditDesc,
    ProcessNumberDesc,
    ProcessNumberAsc,
}

/// Reference data captured at one point in time and passed by value
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ReferenceSnapshot {
    pub departments: Vec<Department>,
    pub categories: Vec<Category>,
    pub tokens: Vec<Token>,
    pub memberships: Vec<TokenMembership>,
}

/// A process row together with its uploads (newest first)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProcessDetail {
    pub row: AuditRow,
    pub uploads: Vec<UploadView>,
}
