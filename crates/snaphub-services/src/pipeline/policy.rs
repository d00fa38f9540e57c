//! Batch-level file checks that run before anything is written

use bytes::Bytes;
use snaphub_core::{AppError, Config};

const OCTET_STREAM: &str = "application/octet-stream";

/// One file of a submitted batch
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl IncomingFile {
    pub fn new(name: impl Into<String>, content_type: Option<&str>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.map(String::from),
            data: data.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Content type without parameters, lowercased; `application/octet-stream` when absent
    pub fn mime_type(&self) -> String {
        let essence = self
            .content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_default();
        if essence.is_empty() {
            OCTET_STREAM.to_string()
        } else {
            essence
        }
    }
}

/// Limits applied to every batch
#[derive(Debug, Clone)]
pub struct FilePolicy {
    pub max_file_size_bytes: usize,
    pub max_files_per_batch: usize,
    /// Exact types or `type/*` patterns
    pub allowed_content_types: Vec<String>,
}

impl FilePolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_file_size_bytes: config.max_file_size_bytes(),
            max_files_per_batch: config.max_files_per_batch(),
            allowed_content_types: config.allowed_content_types().to_vec(),
        }
    }

    pub fn content_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_content_types.iter().any(|pattern| {
            if pattern == "*/*" {
                return true;
            }
            match pattern.strip_suffix("/*") {
                Some(top_level) => mime_type
                    .split_once('/')
                    .is_some_and(|(kind, _)| kind == top_level),
                None => pattern == mime_type,
            }
        })
    }

    /// Check a whole batch. The first violation is reported, naming the file.
    pub fn check_batch(&self, files: &[IncomingFile]) -> Result<(), AppError> {
        if files.is_empty() {
            return Err(AppError::Validation(
                "at least one file is required".to_string(),
            ));
        }
        if files.len() > self.max_files_per_batch {
            return Err(AppError::Validation(format!(
                "too many files: {} (at most {} per upload)",
                files.len(),
                self.max_files_per_batch
            )));
        }

        for file in files {
            if file.size() == 0 {
                return Err(AppError::Validation(format!("file '{}' is empty", file.name)));
            }
            if file.size() > self.max_file_size_bytes {
                return Err(AppError::Validation(format!(
                    "file '{}' exceeds the maximum size of {} MB",
                    file.name,
                    self.max_file_size_bytes / (1024 * 1024)
                )));
            }
            let mime_type = file.mime_type();
            if !self.content_type_allowed(&mime_type) {
                return Err(AppError::Validation(format!(
                    "file '{}' has unsupported content type '{}'",
                    file.name, mime_type
                )));
            }
        }

        Ok(())
    }
}
