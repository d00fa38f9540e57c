use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Intake category chosen by the submitter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    /// Whether processes in this category must carry a note
    pub notes_required: bool,
    pub created_at: DateTime<Utc>,
}

/// Public view of a category for the intake form
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryOption {
    pub id: Uuid,
    pub name: String,
    pub notes_required: bool,
}

impl From<Category> for CategoryOption {
    fn from(category: Category) -> Self {
        CategoryOption {
            id: category.id,
            name: category.name,
            notes_required: category.notes_required,
        }
    }
}

/// Request DTO for creating a category
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Category name must be between 1 and 255 characters"
    ))]
    pub name: String,
    #[serde(default)]
    pub notes_required: bool,
}

/// Request DTO for updating a category; absent fields stay unchanged
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateCategoryRequest {
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 255,
        message = "Category name must be between 1 and 255 characters"
    ))]
    pub name: Option<String>,
    #[serde(default)]
    pub notes_required: Option<bool>,
}
