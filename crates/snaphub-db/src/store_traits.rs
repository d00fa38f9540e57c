//! Store trait abstractions
//!
//! The services depend on these traits rather than on the concrete
//! repositories, so they can run against PostgreSQL in production and
//! against [`crate::MemoryStore`] in tests.

use async_trait::async_trait;
use snaphub_core::models::{
    Category, Department, NewToken, NewUpload, Process, Token, TokenMembership, TokenPatch, Upload,
};
use snaphub_core::AppError;
use uuid::Uuid;

use crate::db::{
    CategoryRepository, DepartmentRepository, PgHealth, ProcessRepository, TokenRepository,
    UploadRepository,
};

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Token with this exact secret, active or not
    async fn find_by_secret(&self, secret: &str) -> Result<Option<Token>, AppError>;

    async fn get_token(&self, id: Uuid) -> Result<Option<Token>, AppError>;

    /// All tokens, newest first
    async fn list_tokens(&self) -> Result<Vec<Token>, AppError>;

    async fn list_memberships(&self) -> Result<Vec<TokenMembership>, AppError>;

    /// Department ids of a token, in department-name order
    async fn department_ids_for(&self, token_id: Uuid) -> Result<Vec<Uuid>, AppError>;

    /// Insert a token together with its memberships, atomically
    async fn create_token(&self, new_token: NewToken) -> Result<Token, AppError>;

    async fn update_token(&self, id: Uuid, patch: TokenPatch) -> Result<Option<Token>, AppError>;

    async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<Token>, AppError>;

    /// Replace memberships atomically; `false` when the token does not exist
    async fn set_departments(&self, id: Uuid, department_ids: &[Uuid]) -> Result<bool, AppError>;
}

#[async_trait]
pub trait DepartmentStore: Send + Sync {
    /// All departments ordered by name
    async fn list_departments(&self) -> Result<Vec<Department>, AppError>;

    async fn get_department(&self, id: Uuid) -> Result<Option<Department>, AppError>;

    async fn create_department(&self, name: &str) -> Result<Department, AppError>;

    async fn rename_department(&self, id: Uuid, name: &str) -> Result<Option<Department>, AppError>;

    /// Delete a department and its memberships
    async fn delete_department(&self, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// All categories ordered by name
    async fn list_categories(&self) -> Result<Vec<Category>, AppError>;

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, AppError>;

    async fn create_category(&self, name: &str, notes_required: bool) -> Result<Category, AppError>;

    async fn update_category(
        &self,
        id: Uuid,
        name: Option<&str>,
        notes_required: Option<bool>,
    ) -> Result<Option<Category>, AppError>;

    /// Delete a category; its processes keep existing without a category
    async fn delete_category(&self, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait ProcessStore: Send + Sync {
    /// Atomically insert a process for an active token.
    ///
    /// `None` when the token is missing or inactive at insert time.
    async fn start_process(
        &self,
        token_id: Uuid,
        category_id: Option<Uuid>,
        note: Option<&str>,
    ) -> Result<Option<Process>, AppError>;

    async fn get_process(&self, id: Uuid) -> Result<Option<Process>, AppError>;

    /// All processes, newest first
    async fn list_processes(&self) -> Result<Vec<Process>, AppError>;
}

#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Insert an upload record; `None` when the process does not exist
    async fn add_upload(&self, upload: NewUpload) -> Result<Option<Upload>, AppError>;

    async fn get_upload(&self, id: Uuid) -> Result<Option<Upload>, AppError>;

    /// All uploads, newest first
    async fn list_uploads(&self) -> Result<Vec<Upload>, AppError>;

    /// Uploads of one process, newest first
    async fn list_uploads_for_process(&self, process_id: Uuid) -> Result<Vec<Upload>, AppError>;

    async fn delete_upload(&self, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<(), AppError>;
}

// Implementations for the PostgreSQL repositories

#[async_trait]
impl TokenStore for TokenRepository {
    async fn find_by_secret(&self, secret: &str) -> Result<Option<Token>, AppError> {
        self.find_by_secret(secret).await
    }

    async fn get_token(&self, id: Uuid) -> Result<Option<Token>, AppError> {
        self.get_token(id).await
    }

    async fn list_tokens(&self) -> Result<Vec<Token>, AppError> {
        self.list_tokens().await
    }

    async fn list_memberships(&self) -> Result<Vec<TokenMembership>, AppError> {
        self.list_memberships().await
    }

    async fn department_ids_for(&self, token_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        self.department_ids_for(token_id).await
    }

    async fn create_token(&self, new_token: NewToken) -> Result<Token, AppError> {
        self.create_token(new_token).await
    }

    async fn update_token(&self, id: Uuid, patch: TokenPatch) -> Result<Option<Token>, AppError> {
        self.update_token(id, patch).await
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<Token>, AppError> {
        self.set_active(id, active).await
    }

    async fn set_departments(&self, id: Uuid, department_ids: &[Uuid]) -> Result<bool, AppError> {
        self.set_departments(id, department_ids).await
    }
}

#[async_trait]
impl DepartmentStore for DepartmentRepository {
    async fn list_departments(&self) -> Result<Vec<Department>, AppError> {
        self.list_departments().await
    }

    async fn get_department(&self, id: Uuid) -> Result<Option<Department>, AppError> {
        self.get_department(id).await
    }

    async fn create_department(&self, name: &str) -> Result<Department, AppError> {
        self.create_department(name).await
    }

    async fn rename_department(&self, id: Uuid, name: &str) -> Result<Option<Department>, AppError> {
        self.rename_department(id, name).await
    }

    async fn delete_department(&self, id: Uuid) -> Result<bool, AppError> {
        self.delete_department(id).await
    }
}

#[async_trait]
impl CategoryStore for CategoryRepository {
    async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        self.list_categories().await
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, AppError> {
        self.get_category(id).await
    }

    async fn create_category(&self, name: &str, notes_required: bool) -> Result<Category, AppError> {
        self.create_category(name, notes_required).await
    }

    async fn update_category(
        &self,
        id: Uuid,
        name: Option<&str>,
        notes_required: Option<bool>,
    ) -> Result<Option<Category>, AppError> {
        self.update_category(id, name, notes_required).await
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool, AppError> {
        self.delete_category(id).await
    }
}

#[async_trait]
impl ProcessStore for ProcessRepository {
    async fn start_process(
        &self,
        token_id: Uuid,
        category_id: Option<Uuid>,
        note: Option<&str>,
    ) -> Result<Option<Process>, AppError> {
        self.start_process(token_id, category_id, note).await
    }

    async fn get_process(&self, id: Uuid) -> Result<Option<Process>, AppError> {
        self.get_process(id).await
    }

    async fn list_processes(&self) -> Result<Vec<Process>, AppError> {
        self.list_processes().await
    }
}

#[async_trait]
impl UploadStore for UploadRepository {
    async fn add_upload(&self, upload: NewUpload) -> Result<Option<Upload>, AppError> {
        self.add_upload(upload).await
    }

    async fn get_upload(&self, id: Uuid) -> Result<Option<Upload>, AppError> {
        self.get_upload(id).await
    }

    async fn list_uploads(&self) -> Result<Vec<Upload>, AppError> {
        self.list_uploads().await
    }

    async fn list_uploads_for_process(&self, process_id: Uuid) -> Result<Vec<Upload>, AppError> {
        self.list_uploads_for_process(process_id).await
    }

    async fn delete_upload(&self, id: Uuid) -> Result<bool, AppError> {
        self.delete_upload(id).await
    }
}

#[async_trait]
impl StoreHealth for PgHealth {
    async fn ping(&self) -> Result<(), AppError> {
        self.ping().await
    }
}
