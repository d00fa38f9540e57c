//! Audit View Builder
//!
//! Builds the admin overview as an explicit pipeline:
//! fetch ([`AuditSnapshot::fetch`]) → index ([`AuditIndex::build`]) →
//! project → filter → sort. Only the fetch touches the stores.

pub mod stages;

pub use stages::AuditIndex;

use std::sync::Arc;

use snaphub_core::models::{
    AuditRow, Category, Department, OverviewFilter, OverviewSort, Process, ProcessDetail,
    ReferenceSnapshot, Token, TokenMembership, Upload, UploadView,
};
use snaphub_core::AppError;
use snaphub_db::Stores;
use snaphub_storage::Storage;
use uuid::Uuid;

/// Everything the overview reads, fetched together
#[derive(Debug, Clone, Default)]
pub struct AuditSnapshot {
    pub departments: Vec<Department>,
    pub tokens: Vec<Token>,
    pub memberships: Vec<TokenMembership>,
    pub categories: Vec<Category>,
    pub processes: Vec<Process>,
    pub uploads: Vec<Upload>,
}

impl AuditSnapshot {
    /// Read all six lists concurrently. Any failure fails the whole fetch.
    #[tracing::instrument(skip(stores))]
    pub async fn fetch(stores: &Stores) -> Result<Self, AppError> {
        let (departments, tokens, memberships, categories, processes, uploads) = tokio::try_join!(
            stores.departments.list_departments(),
            stores.tokens.list_tokens(),
            stores.tokens.list_memberships(),
            stores.categories.list_categories(),
            stores.processes.list_processes(),
            stores.uploads.list_uploads(),
        )?;

        Ok(AuditSnapshot {
            departments,
            tokens,
            memberships,
            categories,
            processes,
            uploads,
        })
    }

    pub fn reference(&self) -> ReferenceSnapshot {
        ReferenceSnapshot {
            departments: self.departments.clone(),
            categories: self.categories.clone(),
            tokens: self.tokens.clone(),
            memberships: self.memberships.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuditViewBuilder {
    stores: Stores,
    storage: Arc<dyn Storage>,
}

impl AuditViewBuilder {
    pub fn new(stores: Stores, storage: Arc<dyn Storage>) -> Self {
        Self { stores, storage }
    }

    /// Overview rows, one per process
    #[tracing::instrument(skip(self))]
    pub async fn build_overview(
        &self,
        filter: OverviewFilter,
        sort: OverviewSort,
    ) -> Result<Vec<AuditRow>, AppError> {
        let snapshot = AuditSnapshot::fetch(&self.stores).await?;
        let index = AuditIndex::build(&snapshot);
        let rows = stages::project(&snapshot, &index);
        let rows = stages::filter(rows, &filter, &snapshot.reference());
        let rows = stages::sort(rows, sort);

        tracing::debug!(
            processes = snapshot.processes.len(),
            rows = rows.len(),
            "Overview built"
        );
        Ok(rows)
    }

    /// One process row with its uploads and their public URLs
    #[tracing::instrument(skip(self))]
    pub async fn process_detail(&self, process_id: Uuid) -> Result<ProcessDetail, AppError> {
        let snapshot = AuditSnapshot::fetch(&self.stores).await?;
        let process = snapshot
            .processes
            .iter()
            .find(|p| p.id == process_id)
            .ok_or_else(|| AppError::NotFound(format!("process {} not found", process_id)))?;

        let index = AuditIndex::build(&snapshot);
        let row = stages::project_row(&index, process);
        let uploads = index
            .uploads_for(process_id)
            .iter()
            .map(|upload| {
                let url = self.storage.public_url(&upload.file_path);
                UploadView::new((*upload).clone(), url)
            })
            .collect();

        Ok(ProcessDetail { row, uploads })
    }

    /// Remove an upload's blob, then its record.
    ///
    /// A failed blob removal keeps the record. A failed record delete after the
    /// blob is gone leaves a dangling record for the reconciliation sweep.
    #[tracing::instrument(skip(self))]
    pub async fn delete_upload(&self, upload_id: Uuid) -> Result<(), AppError> {
        let upload = self
            .stores
            .uploads
            .get_upload(upload_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("upload {} not found", upload_id)))?;

        self.storage.remove(&upload.file_path).await.map_err(|e| {
            tracing::warn!(error = %e, file_path = %upload.file_path, "Blob removal failed; record kept");
            AppError::from(e)
        })?;

        if let Err(e) = self.stores.uploads.delete_upload(upload_id).await {
            tracing::error!(
                error = %e,
                upload_id = %upload_id,
                file_path = %upload.file_path,
                "Blob removed but record delete failed; record is dangling"
            );
            return Err(e);
        }

        tracing::info!(upload_id = %upload_id, file_path = %upload.file_path, "Upload deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{jpeg, Harness};
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn overview_has_one_row_per_process() {
        let h = Harness::new();
        let p1 = h.open_process("tok_abc123").await;
        let p2 = h.open_process("tok_abc123").await;
        h.pipeline
            .add_files(&p1, vec![jpeg("a.jpg"), jpeg("b.jpg")])
            .await
            .unwrap();

        let rows = h
            .audit
            .build_overview(OverviewFilter::default(), OverviewSort::default())
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].process_id, p2.id);
        assert_eq!(rows[1].upload_count, 2);
        assert_eq!(rows[0].upload_count, 0);
        assert_eq!(rows[0].last_edit, p2.created_at);
    }

    #[tokio::test]
    async fn last_edit_is_newest_upload() {
        let h = Harness::new();
        let process = h.open_process("tok_abc123").await;
        let outcome = h
            .pipeline
            .add_files(&process, vec![jpeg("a.jpg"), jpeg("b.jpg")])
            .await
            .unwrap();
        let uploads = outcome.uploaded();
        let newest = Utc::now() + Duration::hours(2);
        h.store.set_upload_created_at(uploads[0].id, newest);
        h.store
            .set_upload_created_at(uploads[1].id, newest - Duration::hours(1));

        let rows = h
            .audit
            .build_overview(OverviewFilter::default(), OverviewSort::LastEditDesc)
            .await
            .unwrap();
        assert_eq!(rows[0].last_edit, newest);
    }

    #[tokio::test]
    async fn read_failure_fails_the_whole_build() {
        let h = Harness::new();
        h.open_process("tok_abc123").await;
        h.store.fail_reads(true);

        let result = h
            .audit
            .build_overview(OverviewFilter::default(), OverviewSort::default())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn detail_lists_uploads_with_urls() {
        let h = Harness::new();
        let process = h.open_process("tok_abc123").await;
        h.pipeline
            .add_files(&process, vec![jpeg("a.jpg")])
            .await
            .unwrap();

        let detail = h.audit.process_detail(process.id).await.unwrap();
        assert_eq!(detail.row.process_id, process.id);
        assert_eq!(detail.uploads.len(), 1);
        assert!(detail.uploads[0]
            .public_url
            .starts_with("https://files.test/"));

        let missing = h.audit.process_detail(Uuid::new_v4()).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_removes_blob_then_record() {
        let h = Harness::new();
        let process = h.open_process("tok_abc123").await;
        let outcome = h
            .pipeline
            .add_files(&process, vec![jpeg("a.jpg")])
            .await
            .unwrap();
        let upload = outcome.uploaded().remove(0);

        h.audit.delete_upload(upload.id).await.unwrap();

        assert!(!h.storage.has_blob(&upload.file_path));
        assert!(h.store.uploads_snapshot().is_empty());
        let again = h.audit.delete_upload(upload.id).await;
        assert!(matches!(again, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn failed_blob_removal_keeps_the_record() {
        let h = Harness::new();
        let process = h.open_process("tok_abc123").await;
        let outcome = h
            .pipeline
            .add_files(&process, vec![jpeg("a.jpg")])
            .await
            .unwrap();
        let upload = outcome.uploaded().remove(0);
        h.storage.fail_remove_containing("a.jpg");

        let result = h.audit.delete_upload(upload.id).await;

        assert!(matches!(result, Err(AppError::Storage(_))));
        assert!(h.storage.has_blob(&upload.file_path));
        assert_eq!(h.store.uploads_snapshot().len(), 1);
    }

    #[tokio::test]
    async fn failed_record_delete_is_surfaced() {
        let h = Harness::new();
        let process = h.open_process("tok_abc123").await;
        let outcome = h
            .pipeline
            .add_files(&process, vec![jpeg("a.jpg")])
            .await
            .unwrap();
        let upload = outcome.uploaded().remove(0);
        h.store.fail_delete_upload(true);

        assert!(h.audit.delete_upload(upload.id).await.is_err());
        assert!(!h.storage.has_blob(&upload.file_path));
        assert_eq!(h.store.uploads_snapshot().len(), 1);
    }
}
