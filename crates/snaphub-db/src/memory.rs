//! In-memory store for tests in downstream crates.
//!
//! Implements every store trait over one shared state and mirrors the
//! PostgreSQL constraints the services rely on: unique secrets and file
//! paths, the conditional process insert, cascades and `SET NULL` on
//! category delete. Failure injection covers the persistence error paths.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use snaphub_core::models::{
    Category, Department, NewToken, NewUpload, Process, Token, TokenMembership, TokenPatch, Upload,
};
use snaphub_core::AppError;
use uuid::Uuid;

use crate::store_traits::{
    CategoryStore, DepartmentStore, ProcessStore, StoreHealth, TokenStore, UploadStore,
};

#[derive(Default)]
struct State {
    tokens: Vec<Token>,
    departments: Vec<Department>,
    categories: Vec<Category>,
    memberships: Vec<TokenMembership>,
    processes: Vec<Process>,
    uploads: Vec<Upload>,
    next_process_number: i64,
    last_timestamp: Option<DateTime<Utc>>,
    fail_add_upload_containing: Vec<String>,
    fail_delete_upload: bool,
    fail_reads: bool,
    deactivate_on_start: Vec<Uuid>,
}

impl State {
    /// Strictly increasing timestamps so ordering by creation time is stable
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(next);
        next
    }

    fn check_reads(&self) -> Result<(), AppError> {
        if self.fail_reads {
            return Err(AppError::Internal("injected read failure".to_string()));
        }
        Ok(())
    }

    fn ensure_departments_exist(&self, ids: &[Uuid]) -> Result<(), AppError> {
        if ids
            .iter()
            .all(|id| self.departments.iter().any(|d| d.id == *id))
        {
            Ok(())
        } else {
            Err(AppError::Validation("unknown department id".to_string()))
        }
    }

    fn replace_memberships(&mut self, token_id: Uuid, department_ids: &[Uuid]) {
        self.memberships.retain(|m| m.token_id != token_id);
        for department_id in department_ids {
            let membership = TokenMembership {
                token_id,
                department_id: *department_id,
            };
            if !self.memberships.contains(&membership) {
                self.memberships.push(membership);
            }
        }
    }
}

/// Shared in-memory store; clones see the same data
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let state = State {
            next_process_number: 1,
            ..State::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Next process number the identity sequence will hand out
    pub fn set_next_process_number(&self, next: i64) {
        self.state().next_process_number = next;
    }

    /// Make `add_upload` fail for file paths containing `needle`
    pub fn fail_add_upload_containing(&self, needle: &str) {
        self.state().fail_add_upload_containing.push(needle.to_string());
    }

    pub fn fail_delete_upload(&self, fail: bool) {
        self.state().fail_delete_upload = fail;
    }

    /// Make every list query fail
    pub fn fail_reads(&self, fail: bool) {
        self.state().fail_reads = fail;
    }

    /// Deactivate `token_id` right before the next process insert, as if an
    /// administrator toggled it between resolve and insert.
    pub fn deactivate_on_start(&self, token_id: Uuid) {
        self.state().deactivate_on_start.push(token_id);
    }

    pub fn seed_token(&self, secret: &str, label: Option<&str>, email: Option<&str>) -> Token {
        let mut state = self.state();
        let token = Token {
            id: Uuid::new_v4(),
            token: secret.to_string(),
            label: label.map(String::from),
            email: email.map(String::from),
            active: true,
            created_at: state.tick(),
        };
        state.tokens.push(token.clone());
        token
    }

    pub fn seed_department(&self, name: &str) -> Department {
        let mut state = self.state();
        let department = Department {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: state.tick(),
        };
        state.departments.push(department.clone());
        department
    }

    pub fn seed_category(&self, name: &str, notes_required: bool) -> Category {
        let mut state = self.state();
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            notes_required,
            created_at: state.tick(),
        };
        state.categories.push(category.clone());
        category
    }

    pub fn link(&self, token_id: Uuid, department_id: Uuid) {
        let membership = TokenMembership {
            token_id,
            department_id,
        };
        let mut state = self.state();
        if !state.memberships.contains(&membership) {
            state.memberships.push(membership);
        }
    }

    /// Overwrite an upload's creation time
    pub fn set_upload_created_at(&self, id: Uuid, created_at: DateTime<Utc>) {
        if let Some(upload) = self.state().uploads.iter_mut().find(|u| u.id == id) {
            upload.created_at = created_at;
        }
    }

    /// Overwrite a process's creation time
    pub fn set_process_created_at(&self, id: Uuid, created_at: DateTime<Utc>) {
        if let Some(process) = self.state().processes.iter_mut().find(|p| p.id == id) {
            process.created_at = created_at;
        }
    }

    pub fn process_count(&self) -> usize {
        self.state().processes.len()
    }

    pub fn uploads_snapshot(&self) -> Vec<Upload> {
        self.state().uploads.clone()
    }
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by_key(|item| std::cmp::Reverse(key(item)));
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn find_by_secret(&self, secret: &str) -> Result<Option<Token>, AppError> {
        let state = self.state();
        state.check_reads()?;
        Ok(state.tokens.iter().find(|t| t.token == secret).cloned())
    }

    async fn get_token(&self, id: Uuid) -> Result<Option<Token>, AppError> {
        let state = self.state();
        state.check_reads()?;
        Ok(state.tokens.iter().find(|t| t.id == id).cloned())
    }

    async fn list_tokens(&self) -> Result<Vec<Token>, AppError> {
        let state = self.state();
        state.check_reads()?;
        let mut tokens = state.tokens.clone();
        newest_first(&mut tokens, |t| t.created_at);
        Ok(tokens)
    }

    async fn list_memberships(&self) -> Result<Vec<TokenMembership>, AppError> {
        let state = self.state();
        state.check_reads()?;
        Ok(state.memberships.clone())
    }

    async fn department_ids_for(&self, token_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let state = self.state();
        state.check_reads()?;
        let mut departments: Vec<&Department> = state
            .departments
            .iter()
            .filter(|d| {
                state
                    .memberships
                    .iter()
                    .any(|m| m.token_id == token_id && m.department_id == d.id)
            })
            .collect();
        departments.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(departments.into_iter().map(|d| d.id).collect())
    }

    async fn create_token(&self, new_token: NewToken) -> Result<Token, AppError> {
        let mut state = self.state();
        state.ensure_departments_exist(&new_token.department_ids)?;
        if state.tokens.iter().any(|t| t.token == new_token.token) {
            return Err(AppError::Conflict(
                "duplicate value violates tokens_token_key".to_string(),
            ));
        }

        let token = Token {
            id: Uuid::new_v4(),
            token: new_token.token,
            label: new_token.label,
            email: new_token.email,
            active: true,
            created_at: state.tick(),
        };
        state.tokens.push(token.clone());
        state.replace_memberships(token.id, &new_token.department_ids);
        Ok(token)
    }

    async fn update_token(&self, id: Uuid, patch: TokenPatch) -> Result<Option<Token>, AppError> {
        let mut state = self.state();
        let Some(token) = state.tokens.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        if let Some(label) = patch.label {
            token.label = label;
        }
        if let Some(email) = patch.email {
            token.email = email;
        }
        Ok(Some(token.clone()))
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<Token>, AppError> {
        let mut state = self.state();
        let Some(token) = state.tokens.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        token.active = active;
        Ok(Some(token.clone()))
    }

    async fn set_departments(&self, id: Uuid, department_ids: &[Uuid]) -> Result<bool, AppError> {
        let mut state = self.state();
        if !state.tokens.iter().any(|t| t.id == id) {
            return Ok(false);
        }
        state.ensure_departments_exist(department_ids)?;
        state.replace_memberships(id, department_ids);
        Ok(true)
    }
}

#[async_trait]
impl DepartmentStore for MemoryStore {
    async fn list_departments(&self) -> Result<Vec<Department>, AppError> {
        let state = self.state();
        state.check_reads()?;
        let mut departments = state.departments.clone();
        departments.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(departments)
    }

    async fn get_department(&self, id: Uuid) -> Result<Option<Department>, AppError> {
        let state = self.state();
        state.check_reads()?;
        Ok(state.departments.iter().find(|d| d.id == id).cloned())
    }

    async fn create_department(&self, name: &str) -> Result<Department, AppError> {
        let mut state = self.state();
        let department = Department {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: state.tick(),
        };
        state.departments.push(department.clone());
        Ok(department)
    }

    async fn rename_department(&self, id: Uuid, name: &str) -> Result<Option<Department>, AppError> {
        let mut state = self.state();
        let Some(department) = state.departments.iter_mut().find(|d| d.id == id) else {
            return Ok(None);
        };
        department.name = name.to_string();
        Ok(Some(department.clone()))
    }

    async fn delete_department(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state();
        let before = state.departments.len();
        state.departments.retain(|d| d.id != id);
        state.memberships.retain(|m| m.department_id != id);
        Ok(state.departments.len() < before)
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let state = self.state();
        state.check_reads()?;
        let mut categories = state.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, AppError> {
        let state = self.state();
        state.check_reads()?;
        Ok(state.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn create_category(&self, name: &str, notes_required: bool) -> Result<Category, AppError> {
        let mut state = self.state();
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            notes_required,
            created_at: state.tick(),
        };
        state.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: Uuid,
        name: Option<&str>,
        notes_required: Option<bool>,
    ) -> Result<Option<Category>, AppError> {
        let mut state = self.state();
        let Some(category) = state.categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(name) = name {
            category.name = name.to_string();
        }
        if let Some(notes_required) = notes_required {
            category.notes_required = notes_required;
        }
        Ok(Some(category.clone()))
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state();
        let before = state.categories.len();
        state.categories.retain(|c| c.id != id);
        for process in state.processes.iter_mut() {
            if process.category_id == Some(id) {
                process.category_id = None;
            }
        }
        Ok(state.categories.len() < before)
    }
}

#[async_trait]
impl ProcessStore for MemoryStore {
    async fn start_process(
        &self,
        token_id: Uuid,
        category_id: Option<Uuid>,
        note: Option<&str>,
    ) -> Result<Option<Process>, AppError> {
        let mut state = self.state();

        if state.deactivate_on_start.contains(&token_id) {
            state.deactivate_on_start.retain(|id| *id != token_id);
            if let Some(token) = state.tokens.iter_mut().find(|t| t.id == token_id) {
                token.active = false;
            }
        }

        if !state.tokens.iter().any(|t| t.id == token_id && t.active) {
            return Ok(None);
        }
        if let Some(category_id) = category_id {
            if !state.categories.iter().any(|c| c.id == category_id) {
                return Err(AppError::Conflict(
                    "record is still referenced or references a missing record (processes_category_id_fkey)"
                        .to_string(),
                ));
            }
        }

        let process_number = state.next_process_number;
        state.next_process_number += 1;
        let process = Process {
            id: Uuid::new_v4(),
            process_number,
            token_id,
            category_id,
            note: note.map(String::from),
            created_at: state.tick(),
        };
        state.processes.push(process.clone());
        Ok(Some(process))
    }

    async fn get_process(&self, id: Uuid) -> Result<Option<Process>, AppError> {
        let state = self.state();
        state.check_reads()?;
        Ok(state.processes.iter().find(|p| p.id == id).cloned())
    }

    async fn list_processes(&self) -> Result<Vec<Process>, AppError> {
        let state = self.state();
        state.check_reads()?;
        let mut processes = state.processes.clone();
        processes.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.process_number.cmp(&a.process_number))
        });
        Ok(processes)
    }
}

#[async_trait]
impl UploadStore for MemoryStore {
    async fn add_upload(&self, upload: NewUpload) -> Result<Option<Upload>, AppError> {
        let mut state = self.state();

        if state
            .fail_add_upload_containing
            .iter()
            .any(|needle| upload.file_path.contains(needle.as_str()))
        {
            return Err(AppError::Internal(format!(
                "injected insert failure for {}",
                upload.file_path
            )));
        }
        if !state.processes.iter().any(|p| p.id == upload.process_id) {
            return Ok(None);
        }
        if state.uploads.iter().any(|u| u.file_path == upload.file_path) {
            return Err(AppError::Conflict(
                "duplicate value violates uploads_file_path_key".to_string(),
            ));
        }

        let record = Upload {
            id: Uuid::new_v4(),
            process_id: upload.process_id,
            file_path: upload.file_path,
            mime_type: upload.mime_type,
            size: upload.size,
            created_at: state.tick(),
        };
        state.uploads.push(record.clone());
        Ok(Some(record))
    }

    async fn get_upload(&self, id: Uuid) -> Result<Option<Upload>, AppError> {
        let state = self.state();
        state.check_reads()?;
        Ok(state.uploads.iter().find(|u| u.id == id).cloned())
    }

    async fn list_uploads(&self) -> Result<Vec<Upload>, AppError> {
        let state = self.state();
        state.check_reads()?;
        let mut uploads = state.uploads.clone();
        newest_first(&mut uploads, |u| u.created_at);
        Ok(uploads)
    }

    async fn list_uploads_for_process(&self, process_id: Uuid) -> Result<Vec<Upload>, AppError> {
        let state = self.state();
        state.check_reads()?;
        let mut uploads: Vec<Upload> = state
            .uploads
            .iter()
            .filter(|u| u.process_id == process_id)
            .cloned()
            .collect();
        newest_first(&mut uploads, |u| u.created_at);
        Ok(uploads)
    }

    async fn delete_upload(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state();
        if state.fail_delete_upload {
            return Err(AppError::Internal("injected delete failure".to_string()));
        }
        let before = state.uploads.len();
        state.uploads.retain(|u| u.id != id);
        Ok(state.uploads.len() < before)
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        self.state().check_reads()
    }
}
