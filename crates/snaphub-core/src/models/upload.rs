use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Metadata record of a stored blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Upload {
    pub id: Uuid,
    pub process_id: Uuid,
    pub file_path: String,
    pub mime_type: Option<String>,
    pub size: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Fields of an upload record to insert
#[derive(Debug, Clone)]
pub struct NewUpload {
    pub process_id: Uuid,
    pub file_path: String,
    pub mime_type: Option<String>,
    pub size: Option<i64>,
}

/// Upload with its public URL, as shown in the process detail
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UploadView {
    pub id: Uuid,
    pub process_id: Uuid,
    pub file_path: String,
    pub mime_type: Option<String>,
    pub size: Option<i64>,
    pub public_url: String,
    pub created_at: DateTime<Utc>,
}

impl UploadView {
    pub fn new(upload: Upload, public_url: String) -> Self {
        UploadView {
            id: upload.id,
            process_id: upload.process_id,
            file_path: upload.file_path,
            mime_type: upload.mime_type,
            size: upload.size,
            public_url,
            created_at: upload.created_at,
        }
    }
}
