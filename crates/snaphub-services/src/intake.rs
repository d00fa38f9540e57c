//! Intake orchestration
//!
//! Wires token resolution, process creation, the upload pipeline and the
//! completion notification into the two submitter flows (new process and
//! append) plus the administrator's append.

use std::sync::Arc;

use snaphub_core::models::{
    BatchStatus, IntakeReport, NotifyOutcome, Process, Token, EMPTY_DISPLAY,
};
use snaphub_core::AppError;
use snaphub_db::CategoryStore;
use uuid::Uuid;

use crate::notify::NotificationDispatcher;
use crate::pipeline::{BatchOutcome, IncomingFile, UploadPipeline};
use crate::process::ProcessLifecycleManager;

/// A new-process submission as received from the intake form
#[derive(Debug, Clone)]
pub struct IntakeSubmission {
    pub token: String,
    pub category_id: Uuid,
    pub note: Option<String>,
    /// Submitter opted in to the completion email
    pub notify: bool,
    pub files: Vec<IncomingFile>,
}

#[derive(Debug, Clone, Copy)]
enum Flow {
    Created,
    Appended,
}

fn report_message(flow: Flow, process_number: i64, outcome: &BatchOutcome) -> String {
    match (outcome.failure(), flow) {
        (Some(failure), _) => format!(
            "Vorgang #{}: Datei '{}' ({} von {}) konnte nicht hochgeladen werden.",
            process_number,
            failure.name,
            failure.index + 1,
            outcome.total()
        ),
        (None, Flow::Created) => format!("Vorgang #{} wurde erstellt.", process_number),
        (None, Flow::Appended) => format!("Vorgang #{}: Uploads hinzugefügt.", process_number),
    }
}

fn build_report(
    flow: Flow,
    process: Process,
    outcome: BatchOutcome,
    notification: NotifyOutcome,
) -> IntakeReport {
    let message = report_message(flow, process.process_number, &outcome);
    let status = if outcome.is_complete() {
        BatchStatus::Complete
    } else {
        BatchStatus::Partial
    };
    IntakeReport {
        uploaded: outcome.uploaded(),
        failed: outcome.failure().cloned(),
        skipped: outcome.skipped,
        process,
        status,
        notification,
        message,
    }
}

#[derive(Clone)]
pub struct IntakeService {
    lifecycle: ProcessLifecycleManager,
    pipeline: UploadPipeline,
    dispatcher: NotificationDispatcher,
    categories: Arc<dyn CategoryStore>,
}

impl IntakeService {
    pub fn new(
        lifecycle: ProcessLifecycleManager,
        pipeline: UploadPipeline,
        dispatcher: NotificationDispatcher,
        categories: Arc<dyn CategoryStore>,
    ) -> Self {
        Self {
            lifecycle,
            pipeline,
            dispatcher,
            categories,
        }
    }

    /// Open a new process and store the submitted files in it.
    ///
    /// Policy, token, category and note are all checked before anything is
    /// written. Storage failures after that end the batch but not the call.
    #[tracing::instrument(skip(self, submission), fields(category_id = %submission.category_id, file_count = submission.files.len()))]
    pub async fn submit(&self, submission: IntakeSubmission) -> Result<IntakeReport, AppError> {
        self.pipeline.check(&submission.files)?;

        let opened = self
            .lifecycle
            .open(
                &submission.token,
                submission.category_id,
                submission.note.as_deref(),
            )
            .await?;

        let outcome = self
            .pipeline
            .add_files(&opened.process, submission.files)
            .await?;

        let notification = self
            .maybe_notify(
                submission.notify,
                &opened.token,
                &opened.process,
                &opened.category.name,
                &outcome,
            )
            .await;

        Ok(build_report(Flow::Created, opened.process, outcome, notification))
    }

    /// Add files to a process the token owns
    #[tracing::instrument(skip(self, secret, files), fields(process_id = %process_id, file_count = files.len()))]
    pub async fn append(
        &self,
        secret: &str,
        process_id: Uuid,
        files: Vec<IncomingFile>,
        notify: bool,
    ) -> Result<IntakeReport, AppError> {
        self.pipeline.check(&files)?;
        let (token, process) = self.lifecycle.authorize_process(secret, process_id).await?;

        let outcome = self.pipeline.add_files(&process, files).await?;

        let notification = if notify && outcome.stored_count() > 0 {
            let category = self.category_name(&process).await;
            self.maybe_notify(true, &token, &process, &category, &outcome)
                .await
        } else {
            NotifyOutcome::NotRequested
        };

        Ok(build_report(Flow::Appended, process, outcome, notification))
    }

    /// Add files to any process, without notification
    #[tracing::instrument(skip(self, files), fields(process_id = %process_id, file_count = files.len()))]
    pub async fn append_as_admin(
        &self,
        process_id: Uuid,
        files: Vec<IncomingFile>,
    ) -> Result<IntakeReport, AppError> {
        self.pipeline.check(&files)?;
        let process = self.lifecycle.get_process(process_id).await?;

        let outcome = self.pipeline.add_files(&process, files).await?;

        Ok(build_report(
            Flow::Appended,
            process,
            outcome,
            NotifyOutcome::NotRequested,
        ))
    }

    async fn category_name(&self, process: &Process) -> String {
        let Some(category_id) = process.category_id else {
            return EMPTY_DISPLAY.to_string();
        };
        match self.categories.get_category(category_id).await {
            Ok(Some(category)) => category.name,
            Ok(None) => EMPTY_DISPLAY.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Category lookup for notification failed");
                EMPTY_DISPLAY.to_string()
            }
        }
    }

    async fn maybe_notify(
        &self,
        requested: bool,
        token: &Token,
        process: &Process,
        category: &str,
        outcome: &BatchOutcome,
    ) -> NotifyOutcome {
        let stored = outcome.stored_count();
        if !requested || stored == 0 {
            return NotifyOutcome::NotRequested;
        }
        self.dispatcher
            .notify(
                token,
                process.process_number,
                category,
                stored,
                process.note.as_deref(),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{jpeg, Harness};
    use snaphub_core::models::FileStage;

    fn submission(category_id: Uuid, files: Vec<IncomingFile>, notify: bool) -> IntakeSubmission {
        IntakeSubmission {
            token: "tok_abc123".to_string(),
            category_id,
            note: None,
            notify,
            files,
        }
    }

    fn png(name: &str) -> IncomingFile {
        IncomingFile::new(name, Some("image/png"), b"\x89PNG".to_vec())
    }

    #[tokio::test]
    async fn two_files_create_process_42() {
        let h = Harness::new();
        h.store.set_next_process_number(42);
        h.store
            .seed_token("tok_abc123", Some("Lager"), Some("lager@example.com"));
        let category = h.store.seed_category("Schaden", false);

        let report = h
            .intake
            .submit(submission(
                category.id,
                vec![jpeg("a.jpg"), png("b png")],
                true,
            ))
            .await
            .unwrap();

        assert_eq!(report.process.process_number, 42);
        assert_eq!(report.status, BatchStatus::Complete);
        assert_eq!(report.uploaded.len(), 2);
        assert!(report.uploaded[0].file_path.starts_with("42/"));
        assert!(report.uploaded[0].file_path.ends_with("_0_a.jpg"));
        assert!(report.uploaded[1].file_path.ends_with("_1_b_png"));
        assert_eq!(report.message, "Vorgang #42 wurde erstellt.");
        assert_eq!(report.notification, NotifyOutcome::Sent);

        let sent = h.channel.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.html.contains("Anzahl Dateien"));
        assert!(sent[0].1.text.contains("Anzahl Dateien: 2"));
    }

    #[tokio::test]
    async fn failure_on_second_file_reports_partial() {
        let h = Harness::new();
        h.store.set_next_process_number(42);
        h.store
            .seed_token("tok_abc123", None, Some("lager@example.com"));
        let category = h.store.seed_category("Schaden", false);
        h.storage.fail_put_containing("_1_");

        let report = h
            .intake
            .submit(submission(
                category.id,
                vec![jpeg("a.jpg"), png("b png")],
                true,
            ))
            .await
            .unwrap();

        assert_eq!(report.status, BatchStatus::Partial);
        assert_eq!(report.uploaded.len(), 1);
        let failed = report.failed.as_ref().unwrap();
        assert_eq!(failed.name, "b png");
        assert_eq!(failed.stage, FileStage::Storage);
        assert_eq!(
            report.message,
            "Vorgang #42: Datei 'b png' (2 von 2) konnte nicht hochgeladen werden."
        );
        // the one stored file is still announced
        assert_eq!(report.notification, NotifyOutcome::Sent);
        assert!(h.channel.sent()[0].1.text.contains("Anzahl Dateien: 1"));
    }

    #[tokio::test]
    async fn notification_failure_keeps_the_batch_successful() {
        let h = Harness::new();
        h.store
            .seed_token("tok_abc123", None, Some("lager@example.com"));
        let category = h.store.seed_category("Schaden", false);
        h.channel.fail_with("smtp down");

        let report = h
            .intake
            .submit(submission(category.id, vec![jpeg("a.jpg")], true))
            .await
            .unwrap();

        assert_eq!(report.status, BatchStatus::Complete);
        assert_eq!(report.uploaded.len(), 1);
        assert!(matches!(report.notification, NotifyOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn nothing_stored_means_no_notification() {
        let h = Harness::new();
        h.store
            .seed_token("tok_abc123", None, Some("lager@example.com"));
        let category = h.store.seed_category("Schaden", false);
        h.storage.fail_put_containing("_0_");

        let report = h
            .intake
            .submit(submission(category.id, vec![jpeg("a.jpg")], true))
            .await
            .unwrap();

        assert_eq!(report.status, BatchStatus::Partial);
        assert_eq!(report.notification, NotifyOutcome::NotRequested);
        assert!(h.channel.sent().is_empty());
    }

    #[tokio::test]
    async fn opt_out_skips_notification() {
        let h = Harness::new();
        h.store
            .seed_token("tok_abc123", None, Some("lager@example.com"));
        let category = h.store.seed_category("Schaden", false);

        let report = h
            .intake
            .submit(submission(category.id, vec![jpeg("a.jpg")], false))
            .await
            .unwrap();

        assert_eq!(report.notification, NotifyOutcome::NotRequested);
        assert!(h.channel.sent().is_empty());
    }

    #[tokio::test]
    async fn rejected_submissions_create_no_process() {
        let h = Harness::new();
        h.store.seed_token("tok_abc123", None, None);
        let category = h.store.seed_category("Schaden", true);

        let no_files = h.intake.submit(submission(category.id, vec![], false)).await;
        assert!(matches!(no_files, Err(AppError::Validation(_))));

        let missing_note = h
            .intake
            .submit(submission(category.id, vec![jpeg("a.jpg")], false))
            .await;
        assert!(matches!(missing_note, Err(AppError::Validation(_))));

        let mut bad_token = submission(category.id, vec![jpeg("a.jpg")], false);
        bad_token.token = "tok_unknown".to_string();
        bad_token.note = Some("Delle".to_string());
        assert!(matches!(
            h.intake.submit(bad_token).await,
            Err(AppError::Authorization(_))
        ));

        assert_eq!(h.store.process_count(), 0);
        assert_eq!(h.storage.put_calls(), 0);
    }

    #[tokio::test]
    async fn append_requires_the_owning_token() {
        let h = Harness::new();
        let process = h.open_process("tok_abc123").await;
        h.store.seed_token("tok_other", None, None);

        let report = h
            .intake
            .append("tok_abc123", process.id, vec![jpeg("c.jpg")], false)
            .await
            .unwrap();
        assert_eq!(
            report.message,
            format!("Vorgang #{}: Uploads hinzugefügt.", process.process_number)
        );

        let foreign = h
            .intake
            .append("tok_other", process.id, vec![jpeg("d.jpg")], false)
            .await;
        assert!(matches!(foreign, Err(AppError::Authorization(_))));
        assert_eq!(h.store.uploads_snapshot().len(), 1);
    }

    #[tokio::test]
    async fn admin_append_never_notifies() {
        let h = Harness::new();
        let process = h.open_process("tok_abc123").await;

        let report = h
            .intake
            .append_as_admin(process.id, vec![jpeg("c.jpg")])
            .await
            .unwrap();
        assert_eq!(report.status, BatchStatus::Complete);
        assert_eq!(report.notification, NotifyOutcome::NotRequested);

        let missing = h
            .intake
            .append_as_admin(Uuid::new_v4(), vec![jpeg("c.jpg")])
            .await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }
}
