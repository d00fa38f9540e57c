//! Storage key construction and validation shared by all backends.

use crate::traits::{StorageError, StorageResult};

const FALLBACK_NAME: &str = "file";

fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

/// Replace every character outside `[A-Za-z0-9_.-]` with `_`.
///
/// Names that end up empty or made only of dots become `file`, so a
/// sanitized name is never a `.` or `..` path segment. Idempotent.
pub fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if is_safe_char(c) { c } else { '_' })
        .collect();

    if sanitized.chars().all(|c| c == '.') {
        FALLBACK_NAME.to_string()
    } else {
        sanitized
    }
}

/// Key of the `index`-th file of a batch: `{process_number}/{timestamp_ms}_{index}_{name}`.
pub fn upload_key(process_number: i64, timestamp_ms: i64, index: usize, name: &str) -> String {
    format!(
        "{}/{}_{}_{}",
        process_number,
        timestamp_ms,
        index,
        sanitize_file_name(name)
    )
}

/// Reject keys that could escape the storage namespace.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if storage_key.starts_with('/') || storage_key.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    if storage_key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(StorageError::InvalidKey(
            "Storage key contains an empty or relative segment".to_string(),
        ));
    }
    Ok(())
}
