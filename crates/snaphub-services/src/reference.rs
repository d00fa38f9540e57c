//! Reference Data Manager
//!
//! Administration of departments, categories and tokens. Authorization is
//! enforced by the admin middleware before any call reaches this service.

use std::collections::HashMap;

use snaphub_core::models::{
    Category, CategoryOption, CreateTokenRequest, Department, NewToken, ReferenceSnapshot,
    TokenPatch, TokenResponse, UpdateTokenRequest,
};
use snaphub_core::AppError;
use snaphub_db::Stores;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::registry::generate_secret;

const MAX_NAME_LENGTH: usize = 255;
const SECRET_ATTEMPTS: usize = 3;

fn clean_name(kind: &str, name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation(format!("{} name is required", kind)));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AppError::Validation(format!(
            "{} name must be at most {} characters",
            kind, MAX_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

/// Trim; empty means "no value"
fn optional_text(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

fn checked_email(email: Option<&str>) -> Result<Option<String>, AppError> {
    match optional_text(email) {
        Some(address) if !address.validate_email() => Err(AppError::Validation(format!(
            "invalid email address '{}'",
            address
        ))),
        other => Ok(other),
    }
}

#[derive(Clone)]
pub struct ReferenceDataManager {
    stores: Stores,
}

impl ReferenceDataManager {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn list_departments(&self) -> Result<Vec<Department>, AppError> {
        self.stores.departments.list_departments().await
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_department(&self, name: &str) -> Result<Department, AppError> {
        let name = clean_name("department", name)?;
        let department = self.stores.departments.create_department(&name).await?;
        tracing::info!(department_id = %department.id, "Department created");
        Ok(department)
    }

    #[tracing::instrument(skip(self))]
    pub async fn rename_department(&self, id: Uuid, name: &str) -> Result<Department, AppError> {
        let name = clean_name("department", name)?;
        self.stores
            .departments
            .rename_department(id, &name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("department {} not found", id)))
    }

    /// Delete a department and its memberships
    #[tracing::instrument(skip(self))]
    pub async fn delete_department(&self, id: Uuid) -> Result<(), AppError> {
        if !self.stores.departments.delete_department(id).await? {
            return Err(AppError::NotFound(format!("department {} not found", id)));
        }
        tracing::info!(department_id = %id, "Department deleted");
        Ok(())
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        self.stores.categories.list_categories().await
    }

    /// Categories as offered on the public intake form
    pub async fn category_options(&self) -> Result<Vec<CategoryOption>, AppError> {
        Ok(self
            .list_categories()
            .await?
            .into_iter()
            .map(CategoryOption::from)
            .collect())
    }

    pub async fn get_category(&self, id: Uuid) -> Result<Category, AppError> {
        self.stores
            .categories
            .get_category(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("category {} not found", id)))
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_category(
        &self,
        name: &str,
        notes_required: bool,
    ) -> Result<Category, AppError> {
        let name = clean_name("category", name)?;
        let category = self
            .stores
            .categories
            .create_category(&name, notes_required)
            .await?;
        tracing::info!(category_id = %category.id, "Category created");
        Ok(category)
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_category(
        &self,
        id: Uuid,
        name: Option<&str>,
        notes_required: Option<bool>,
    ) -> Result<Category, AppError> {
        let name = name.map(|n| clean_name("category", n)).transpose()?;
        self.stores
            .categories
            .update_category(id, name.as_deref(), notes_required)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("category {} not found", id)))
    }

    /// Delete a category. Its processes keep existing without one.
    #[tracing::instrument(skip(self))]
    pub async fn delete_category(&self, id: Uuid) -> Result<(), AppError> {
        if !self.stores.categories.delete_category(id).await? {
            return Err(AppError::NotFound(format!("category {} not found", id)));
        }
        tracing::info!(category_id = %id, "Category deleted");
        Ok(())
    }

    /// Tokens newest first, each with its department ids
    pub async fn list_tokens(&self) -> Result<Vec<TokenResponse>, AppError> {
        let (tokens, memberships) = tokio::try_join!(
            self.stores.tokens.list_tokens(),
            self.stores.tokens.list_memberships(),
        )?;

        let mut by_token: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for membership in memberships {
            by_token
                .entry(membership.token_id)
                .or_default()
                .push(membership.department_id);
        }

        Ok(tokens
            .into_iter()
            .map(|token| {
                let department_ids = by_token.remove(&token.id).unwrap_or_default();
                TokenResponse::new(token, department_ids)
            })
            .collect())
    }

    pub async fn get_token(&self, id: Uuid) -> Result<TokenResponse, AppError> {
        let token = self
            .stores
            .tokens
            .get_token(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("token {} not found", id)))?;
        let department_ids = self.stores.tokens.department_ids_for(id).await?;
        Ok(TokenResponse::new(token, department_ids))
    }

    /// Create a token with a generated secret and its memberships.
    ///
    /// A secret collision is retried with a fresh secret.
    #[tracing::instrument(skip(self, request))]
    pub async fn create_token(&self, request: CreateTokenRequest) -> Result<TokenResponse, AppError> {
        let label = optional_text(request.label.as_deref());
        let email = checked_email(request.email.as_deref())?;
        let mut department_ids = request.department_ids;
        department_ids.sort();
        department_ids.dedup();

        let mut attempt = 0;
        let token = loop {
            attempt += 1;
            let new_token = NewToken {
                token: generate_secret(),
                label: label.clone(),
                email: email.clone(),
                department_ids: department_ids.clone(),
            };
            match self.stores.tokens.create_token(new_token).await {
                Err(AppError::Conflict(msg)) if attempt < SECRET_ATTEMPTS => {
                    tracing::warn!(attempt, error = %msg, "Token secret collision, retrying");
                }
                other => break other?,
            }
        };

        tracing::info!(token_id = %token.id, departments = department_ids.len(), "Token created");
        let department_ids = self.stores.tokens.department_ids_for(token.id).await?;
        Ok(TokenResponse::new(token, department_ids))
    }

    /// Update label and email. Absent fields stay, empty strings clear.
    #[tracing::instrument(skip(self, request))]
    pub async fn update_token(
        &self,
        id: Uuid,
        request: UpdateTokenRequest,
    ) -> Result<TokenResponse, AppError> {
        let patch = TokenPatch {
            label: request.label.as_deref().map(|l| optional_text(Some(l))),
            email: match request.email.as_deref() {
                Some(email) => Some(checked_email(Some(email))?),
                None => None,
            },
        };

        let token = self
            .stores
            .tokens
            .update_token(id, patch)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("token {} not found", id)))?;
        let department_ids = self.stores.tokens.department_ids_for(id).await?;
        Ok(TokenResponse::new(token, department_ids))
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<TokenResponse, AppError> {
        let token = self
            .stores
            .tokens
            .set_active(id, active)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("token {} not found", id)))?;
        tracing::info!(token_id = %id, active, "Token activation changed");
        let department_ids = self.stores.tokens.department_ids_for(id).await?;
        Ok(TokenResponse::new(token, department_ids))
    }

    /// Replace the token's memberships in one transaction
    #[tracing::instrument(skip(self))]
    pub async fn set_departments(
        &self,
        id: Uuid,
        department_ids: &[Uuid],
    ) -> Result<TokenResponse, AppError> {
        let mut ids = department_ids.to_vec();
        ids.sort();
        ids.dedup();
        if !self.stores.tokens.set_departments(id, &ids).await? {
            return Err(AppError::NotFound(format!("token {} not found", id)));
        }
        self.get_token(id).await
    }

    /// Fresh by-value copy of all reference data
    pub async fn snapshot(&self) -> Result<ReferenceSnapshot, AppError> {
        let (departments, categories, tokens, memberships) = tokio::try_join!(
            self.stores.departments.list_departments(),
            self.stores.categories.list_categories(),
            self.stores.tokens.list_tokens(),
            self.stores.tokens.list_memberships(),
        )?;
        Ok(ReferenceSnapshot {
            departments,
            categories,
            tokens,
            memberships,
        })
    }
}
