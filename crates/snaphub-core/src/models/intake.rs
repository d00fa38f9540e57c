use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Process, Upload};

/// Step at which a single file failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FileStage {
    /// Blob put failed; nothing was stored for this file
    Storage,
    /// Blob stored but the metadata record failed; the blob is orphaned
    Persistence,
}

/// Failure of one file in a batch, with enough detail to retry only that file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FileError {
    /// 0-based position in the submitted batch
    pub index: usize,
    pub name: String,
    pub stage: FileStage,
    pub message: String,
}

impl std::fmt::Display for FileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "file #{} '{}' failed at {:?}: {}",
            self.index + 1,
            self.name,
            self.stage,
            self.message
        )
    }
}

/// Result of the best-effort notification step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotifyOutcome {
    /// Caller did not opt in, or nothing was stored
    NotRequested,
    /// No notification channel configured
    Disabled,
    /// Token has no address on file
    SkippedNoAddress,
    Sent,
    Failed { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Complete,
    Partial,
}

/// What the submitter gets back after an intake or append call
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IntakeReport {
    pub process: Process,
    pub status: BatchStatus,
    pub uploaded: Vec<Upload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<FileError>,
    /// Names of files that were not attempted after the failure
    pub skipped: Vec<String>,
    pub notification: NotifyOutcome,
    pub message: String,
}
