//! Upload Pipeline
//!
//! Stores a batch strictly one file at a time: blob first, then its record.
//! The batch is a fold over the files; once the accumulator holds a failure
//! it is halted and the remaining files are only listed as not attempted.

mod policy;

pub use policy::{FilePolicy, IncomingFile};

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use snaphub_core::models::{FileError, FileStage, NewUpload, Process, Upload};
use snaphub_core::{AppError, ErrorMetadata};
use snaphub_db::UploadStore;
use snaphub_storage::keys::upload_key;
use snaphub_storage::Storage;

/// Shown to the submitter; backend detail stays in the logs
const STORAGE_FAILURE_MESSAGE: &str = "Datei konnte nicht gespeichert werden";
const PERSISTENCE_FAILURE_MESSAGE: &str = "Datei konnte nicht erfasst werden";

/// Per-file results of one batch
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Results in submission order; at most the last one is an error
    pub results: Vec<Result<Upload, FileError>>,
    /// Names of files after the failure, never attempted
    pub skipped: Vec<String>,
}

impl BatchOutcome {
    pub fn uploaded(&self) -> Vec<Upload> {
        self.results
            .iter()
            .filter_map(|r| r.as_ref().ok().cloned())
            .collect()
    }

    pub fn failure(&self) -> Option<&FileError> {
        self.results.iter().find_map(|r| r.as_ref().err())
    }

    pub fn stored_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.failure().is_none()
    }

    /// Number of files submitted in the batch
    pub fn total(&self) -> usize {
        self.results.len() + self.skipped.len()
    }
}

#[derive(Default)]
struct BatchAccumulator {
    results: Vec<Result<Upload, FileError>>,
    skipped: Vec<String>,
}

impl BatchAccumulator {
    fn is_halted(&self) -> bool {
        self.results.last().is_some_and(|r| r.is_err())
    }

    fn into_outcome(self) -> BatchOutcome {
        BatchOutcome {
            results: self.results,
            skipped: self.skipped,
        }
    }
}

#[derive(Clone)]
pub struct UploadPipeline {
    storage: Arc<dyn Storage>,
    uploads: Arc<dyn UploadStore>,
    policy: FilePolicy,
}

impl UploadPipeline {
    pub fn new(storage: Arc<dyn Storage>, uploads: Arc<dyn UploadStore>, policy: FilePolicy) -> Self {
        Self {
            storage,
            uploads,
            policy,
        }
    }

    pub fn policy(&self) -> &FilePolicy {
        &self.policy
    }

    /// Validate a batch without touching storage
    pub fn check(&self, files: &[IncomingFile]) -> Result<(), AppError> {
        self.policy.check_batch(files)
    }

    /// Store `files` against `process`.
    ///
    /// Policy violations fail the call before any write. After that, errors
    /// are captured per file in the outcome and end the batch.
    #[tracing::instrument(
        skip(self, process, files),
        fields(process_id = %process.id, process_number = process.process_number, file_count = files.len())
    )]
    pub async fn add_files(
        &self,
        process: &Process,
        files: Vec<IncomingFile>,
    ) -> Result<BatchOutcome, AppError> {
        self.check(&files)?;

        let accumulator = stream::iter(files.into_iter().enumerate())
            .fold(BatchAccumulator::default(), move |acc, (index, file)| {
                self.step(acc, process, index, file)
            })
            .await;

        let outcome = accumulator.into_outcome();
        tracing::info!(
            stored = outcome.stored_count(),
            skipped = outcome.skipped.len(),
            complete = outcome.is_complete(),
            "Batch finished"
        );
        Ok(outcome)
    }

    async fn step(
        &self,
        mut acc: BatchAccumulator,
        process: &Process,
        index: usize,
        file: IncomingFile,
    ) -> BatchAccumulator {
        if acc.is_halted() {
            acc.skipped.push(file.name);
            return acc;
        }
        let result = self.store_one(process, index, file).await;
        acc.results.push(result);
        acc
    }

    async fn store_one(
        &self,
        process: &Process,
        index: usize,
        file: IncomingFile,
    ) -> Result<Upload, FileError> {
        let mime_type = file.mime_type();
        let size = file.size() as i64;
        let file_path = upload_key(
            process.process_number,
            Utc::now().timestamp_millis(),
            index,
            &file.name,
        );
        let fail = |stage: FileStage, message: String| FileError {
            index,
            name: file.name.clone(),
            stage,
            message,
        };

        if let Err(e) = self.storage.put(&file_path, file.data.clone(), &mime_type).await {
            tracing::warn!(error = %e, file_path = %file_path, index, "Blob put failed");
            return Err(fail(FileStage::Storage, STORAGE_FAILURE_MESSAGE.to_string()));
        }

        let record = NewUpload {
            process_id: process.id,
            file_path: file_path.clone(),
            mime_type: Some(mime_type),
            size: Some(size),
        };

        match self.uploads.add_upload(record).await {
            Ok(Some(upload)) => Ok(upload),
            Ok(None) => {
                tracing::error!(file_path = %file_path, process_id = %process.id, "Process vanished before upload record; blob is orphaned");
                Err(fail(
                    FileStage::Persistence,
                    PERSISTENCE_FAILURE_MESSAGE.to_string(),
                ))
            }
            Err(e) => {
                tracing::error!(error = %e, file_path = %file_path, "Upload record failed; blob is orphaned");
                Err(fail(FileStage::Persistence, e.client_message()))
            }
        }
    }
}
