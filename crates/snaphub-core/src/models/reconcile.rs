use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Outcome of a storage/record reconciliation sweep
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct ReconcileReport {
    pub dry_run: bool,
    pub scanned_blobs: usize,
    pub scanned_records: usize,
    /// Blob keys without a record, older than the grace period
    pub orphaned_blobs: Vec<String>,
    pub removed: usize,
    pub failed_removals: usize,
    /// Upload records whose blob is missing
    pub dangling_records: Vec<Uuid>,
}
