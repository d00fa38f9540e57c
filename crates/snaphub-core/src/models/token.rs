use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Shared access token handed out to external submitters.
///
/// The secret (`token`) is unique and never changes after creation. Tokens are
/// deactivated, not deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Token {
    pub id: Uuid,
    pub token: String,
    pub label: Option<String>,
    /// Notification address
    pub email: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Token {
    /// Admin-facing display: `label (secret)` when labeled, the bare secret otherwise
    pub fn display_name(&self) -> String {
        match self.label.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => format!("{} ({})", label, self.token),
            _ => self.token.clone(),
        }
    }
}

/// Token↔Department membership row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TokenMembership {
    pub token_id: Uuid,
    pub department_id: Uuid,
}

/// A resolved, active token together with its department memberships
#[derive(Debug, Clone)]
pub struct TokenIdentity {
    pub token: Token,
    pub department_ids: Vec<Uuid>,
}

/// Token as returned by the admin API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenResponse {
    pub id: Uuid,
    pub token: String,
    pub label: Option<String>,
    pub email: Option<String>,
    pub active: bool,
    pub department_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl TokenResponse {
    pub fn new(token: Token, department_ids: Vec<Uuid>) -> Self {
        TokenResponse {
            id: token.id,
            token: token.token,
            label: token.label,
            email: token.email,
            active: token.active,
            department_ids,
            created_at: token.created_at,
        }
    }
}

/// Request DTO for creating a token. The secret is generated server-side.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct CreateTokenRequest {
    #[serde(default)]
    #[validate(length(max = 255, message = "Label must be at most 255 characters"))]
    pub label: Option<String>,
    #[serde(default)]
    #[validate(length(max = 320, message = "Email must be at most 320 characters"))]
    pub email: Option<String>,
    #[serde(default)]
    pub department_ids: Vec<Uuid>,
}

/// Request DTO for updating label or email. An empty string clears the field.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateTokenRequest {
    #[serde(default)]
    #[validate(length(max = 255, message = "Label must be at most 255 characters"))]
    pub label: Option<String>,
    #[serde(default)]
    #[validate(length(max = 320, message = "Email must be at most 320 characters"))]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetActiveRequest {
    pub active: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetDepartmentsRequest {
    pub department_ids: Vec<Uuid>,
}

/// Fields of a token to insert
#[derive(Debug, Clone)]
pub struct NewToken {
    pub token: String,
    pub label: Option<String>,
    pub email: Option<String>,
    pub department_ids: Vec<Uuid>,
}

/// Field-level patch of a token. `Some(None)` clears a field.
#[derive(Debug, Clone, Default)]
pub struct TokenPatch {
    pub label: Option<Option<String>>,
    pub email: Option<Option<String>>,
}
