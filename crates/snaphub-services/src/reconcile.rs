//! Reconciliation sweep between the blob store and the upload records.
//!
//! Blobs without a record (left behind by a failed record insert) are removed
//! once older than the grace period. Records without a blob are only reported.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use snaphub_core::models::ReconcileReport;
use snaphub_core::AppError;
use snaphub_db::UploadStore;
use snaphub_storage::Storage;
use tokio::time::interval;

pub struct ReconciliationService {
    uploads: Arc<dyn UploadStore>,
    storage: Arc<dyn Storage>,
    grace_period: chrono::Duration,
}

impl ReconciliationService {
    pub fn new(
        uploads: Arc<dyn UploadStore>,
        storage: Arc<dyn Storage>,
        grace_period: chrono::Duration,
    ) -> Self {
        Self {
            uploads,
            storage,
            grace_period,
        }
    }

    /// Run the sweep every `interval_secs` seconds.
    /// Returns a JoinHandle for graceful shutdown
    pub fn start(self: Arc<Self>, interval_secs: u64) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut sweep_interval = interval(Duration::from_secs(interval_secs.max(1)));

            loop {
                sweep_interval.tick().await;

                tracing::info!("Starting scheduled reconciliation sweep");

                if let Err(e) = self.sweep(false).await {
                    tracing::error!(error = %e, "Reconciliation sweep failed");
                }
            }
        })
    }

    /// Compare blobs with records. With `dry_run` nothing is removed.
    #[tracing::instrument(skip(self), fields(reconcile.operation = "sweep"))]
    pub async fn sweep(&self, dry_run: bool) -> Result<ReconcileReport, AppError> {
        let (blobs, records) = tokio::try_join!(
            async { self.storage.list(None).await.map_err(AppError::from) },
            self.uploads.list_uploads(),
        )?;

        let recorded: HashSet<&str> = records.iter().map(|u| u.file_path.as_str()).collect();
        let present: HashSet<&str> = blobs.iter().map(|b| b.key.as_str()).collect();
        let cutoff = Utc::now() - self.grace_period;

        let orphaned_blobs: Vec<String> = blobs
            .iter()
            .filter(|b| !recorded.contains(b.key.as_str()) && b.last_modified < cutoff)
            .map(|b| b.key.clone())
            .collect();

        let dangling_records = records
            .iter()
            .filter(|u| !present.contains(u.file_path.as_str()))
            .map(|u| u.id)
            .collect();

        let mut report = ReconcileReport {
            dry_run,
            scanned_blobs: blobs.len(),
            scanned_records: records.len(),
            orphaned_blobs,
            removed: 0,
            failed_removals: 0,
            dangling_records,
        };

        if !dry_run {
            for key in &report.orphaned_blobs {
                match self.storage.remove(key).await {
                    Ok(()) => report.removed += 1,
                    Err(e) => {
                        tracing::warn!(error = %e, key = %key, "Failed to remove orphaned blob");
                        report.failed_removals += 1;
                    }
                }
            }
        }

        tracing::info!(
            dry_run,
            scanned_blobs = report.scanned_blobs,
            scanned_records = report.scanned_records,
            orphaned = report.orphaned_blobs.len(),
            removed = report.removed,
            failed_removals = report.failed_removals,
            dangling = report.dangling_records.len(),
            "Reconciliation sweep finished"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{jpeg, Harness};

    fn two_hours_ago() -> chrono::DateTime<Utc> {
        Utc::now() - chrono::Duration::hours(2)
    }

    #[tokio::test]
    async fn old_orphans_are_removed_recent_ones_kept() {
        let h = Harness::new();
        let process = h.open_process("tok_abc123").await;
        h.pipeline
            .add_files(&process, vec![jpeg("a.jpg")])
            .await
            .unwrap();
        h.storage.insert_blob("9/1_0_old.jpg", b"x", two_hours_ago());
        h.storage.insert_blob("9/2_0_fresh.jpg", b"x", Utc::now());

        let report = h.reconcile.sweep(false).await.unwrap();

        assert_eq!(report.scanned_blobs, 3);
        assert_eq!(report.scanned_records, 1);
        assert_eq!(report.orphaned_blobs, vec!["9/1_0_old.jpg".to_string()]);
        assert_eq!(report.removed, 1);
        assert!(!h.storage.has_blob("9/1_0_old.jpg"));
        assert!(h.storage.has_blob("9/2_0_fresh.jpg"));
        assert!(report.dangling_records.is_empty());
    }

    #[tokio::test]
    async fn dry_run_only_reports() {
        let h = Harness::new();
        h.storage.insert_blob("9/1_0_old.jpg", b"x", two_hours_ago());

        let report = h.reconcile.sweep(true).await.unwrap();

        assert!(report.dry_run);
        assert_eq!(report.orphaned_blobs.len(), 1);
        assert_eq!(report.removed, 0);
        assert!(h.storage.has_blob("9/1_0_old.jpg"));
    }

    #[tokio::test]
    async fn records_without_blob_are_reported_not_deleted() {
        let h = Harness::new();
        let process = h.open_process("tok_abc123").await;
        let outcome = h
            .pipeline
            .add_files(&process, vec![jpeg("a.jpg")])
            .await
            .unwrap();
        let upload = outcome.uploaded().remove(0);
        h.storage.remove(&upload.file_path).await.unwrap();

        let report = h.reconcile.sweep(false).await.unwrap();

        assert_eq!(report.dangling_records, vec![upload.id]);
        assert_eq!(h.store.uploads_snapshot().len(), 1);
    }

    #[tokio::test]
    async fn removal_errors_are_counted_not_fatal() {
        let h = Harness::new();
        h.storage.insert_blob("9/1_0_stuck.jpg", b"x", two_hours_ago());
        h.storage.insert_blob("9/2_0_old.jpg", b"x", two_hours_ago());
        h.storage.fail_remove_containing("stuck");

        let report = h.reconcile.sweep(false).await.unwrap();

        assert_eq!(report.removed, 1);
        assert_eq!(report.failed_removals, 1);
        assert!(h.storage.has_blob("9/1_0_stuck.jpg"));
    }
}
