//! Process Lifecycle Manager
//!
//! Opens numbered processes for a resolved token, category and note.

use std::sync::Arc;

use snaphub_core::models::{Category, Process, Token};
use snaphub_core::AppError;
use snaphub_db::{CategoryStore, ProcessStore};
use uuid::Uuid;

use crate::registry::TokenRegistry;

/// A freshly opened process with the token and category it was opened for
#[derive(Debug, Clone)]
pub struct OpenedProcess {
    pub process: Process,
    pub token: Token,
    pub category: Category,
}

#[derive(Clone)]
pub struct ProcessLifecycleManager {
    registry: TokenRegistry,
    categories: Arc<dyn CategoryStore>,
    processes: Arc<dyn ProcessStore>,
}

fn normalize_note(note: Option<&str>) -> Option<String> {
    note.map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from)
}

impl ProcessLifecycleManager {
    pub fn new(
        registry: TokenRegistry,
        categories: Arc<dyn CategoryStore>,
        processes: Arc<dyn ProcessStore>,
    ) -> Self {
        Self {
            registry,
            categories,
            processes,
        }
    }

    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    /// Create a new process. See [`Self::open`].
    pub async fn start_process(
        &self,
        secret: &str,
        category_id: Uuid,
        note: Option<&str>,
    ) -> Result<Process, AppError> {
        Ok(self.open(secret, category_id, note).await?.process)
    }

    /// Validate token, category and note in that order, then insert the process.
    ///
    /// Nothing is written unless every check passes. A token deactivated
    /// between resolution and insert fails with an authorization error.
    #[tracing::instrument(skip(self, secret, note), fields(category_id = %category_id))]
    pub async fn open(
        &self,
        secret: &str,
        category_id: Uuid,
        note: Option<&str>,
    ) -> Result<OpenedProcess, AppError> {
        let token = self.registry.resolve(secret).await?;

        let category = self
            .categories
            .get_category(category_id)
            .await?
            .ok_or_else(|| AppError::Validation("category not found".to_string()))?;

        let note = normalize_note(note);
        if category.notes_required && note.is_none() {
            return Err(AppError::Validation(
                "note is required for this category".to_string(),
            ));
        }

        let process = self
            .processes
            .start_process(token.id, Some(category.id), note.as_deref())
            .await?
            .ok_or_else(|| {
                tracing::info!(token_id = %token.id, "Token deactivated before process insert");
                AppError::Authorization("invalid or inactive token".to_string())
            })?;

        tracing::info!(
            process_id = %process.id,
            process_number = process.process_number,
            token_id = %token.id,
            "Process opened"
        );

        Ok(OpenedProcess {
            process,
            token,
            category,
        })
    }

    /// Resolve the token and check that it owns the process.
    ///
    /// Missing and foreign processes are both authorization failures.
    #[tracing::instrument(skip(self, secret), fields(process_id = %process_id))]
    pub async fn authorize_process(
        &self,
        secret: &str,
        process_id: Uuid,
    ) -> Result<(Token, Process), AppError> {
        let token = self.registry.resolve(secret).await?;
        match self.processes.get_process(process_id).await? {
            Some(process) if process.token_id == token.id => Ok((token, process)),
            _ => Err(AppError::Authorization(
                "process does not belong to this token".to_string(),
            )),
        }
    }

    pub async fn get_process(&self, id: Uuid) -> Result<Process, AppError> {
        self.processes
            .get_process(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("process {} not found", id)))
    }
}
