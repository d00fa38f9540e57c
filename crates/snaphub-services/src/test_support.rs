//! Shared fixtures for service tests: every service wired over one
//! in-memory store and one in-memory blob store.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use snaphub_core::models::Process;
use snaphub_core::AppError;
use snaphub_db::{MemoryStore, Stores, TokenStore};
use snaphub_storage::MemoryStorage;

use crate::audit::AuditViewBuilder;
use crate::intake::IntakeService;
use crate::notify::{NotificationChannel, NotificationDispatcher, NotificationMessage};
use crate::pipeline::{FilePolicy, IncomingFile, UploadPipeline};
use crate::process::ProcessLifecycleManager;
use crate::reconcile::ReconciliationService;
use crate::reference::ReferenceDataManager;
use crate::registry::TokenRegistry;

#[derive(Default)]
struct ChannelState {
    sent: Vec<(String, NotificationMessage)>,
    failure: Option<String>,
}

/// Channel that records messages instead of sending them
#[derive(Clone, Default)]
pub struct RecordingChannel {
    state: Arc<Mutex<ChannelState>>,
}

impl RecordingChannel {
    pub fn failing(reason: &str) -> Self {
        let channel = Self::default();
        channel.fail_with(reason);
        channel
    }

    fn state(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn fail_with(&self, reason: &str) {
        self.state().failure = Some(reason.to_string());
    }

    pub fn sent(&self) -> Vec<(String, NotificationMessage)> {
        self.state().sent.clone()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(&self, address: &str, message: &NotificationMessage) -> Result<(), AppError> {
        let mut state = self.state();
        if let Some(reason) = &state.failure {
            return Err(AppError::Notification(reason.clone()));
        }
        state.sent.push((address.to_string(), message.clone()));
        Ok(())
    }
}

pub fn test_policy() -> FilePolicy {
    FilePolicy {
        max_file_size_bytes: 1024 * 1024,
        max_files_per_batch: 10,
        allowed_content_types: vec!["image/*".to_string(), "application/pdf".to_string()],
    }
}

pub fn jpeg(name: &str) -> IncomingFile {
    IncomingFile::new(name, Some("image/jpeg"), b"\xff\xd8\xff\xe0jpeg".to_vec())
}

pub struct Harness {
    pub store: MemoryStore,
    pub storage: MemoryStorage,
    pub channel: RecordingChannel,
    pub lifecycle: ProcessLifecycleManager,
    pub pipeline: UploadPipeline,
    pub audit: AuditViewBuilder,
    pub reference: ReferenceDataManager,
    pub intake: IntakeService,
    pub reconcile: ReconciliationService,
}

impl Harness {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let storage = MemoryStorage::new();
        let channel = RecordingChannel::default();
        let stores = Stores::memory(store.clone());
        let blobs: Arc<dyn snaphub_storage::Storage> = Arc::new(storage.clone());

        let registry = TokenRegistry::new(stores.tokens.clone());
        let lifecycle = ProcessLifecycleManager::new(
            registry,
            stores.categories.clone(),
            stores.processes.clone(),
        );
        let pipeline = UploadPipeline::new(blobs.clone(), stores.uploads.clone(), test_policy());
        let dispatcher = NotificationDispatcher::new(
            Some(Arc::new(channel.clone())),
            chrono_tz::Europe::Berlin,
        );
        let intake = IntakeService::new(
            lifecycle.clone(),
            pipeline.clone(),
            dispatcher,
            stores.categories.clone(),
        );
        let reconcile = ReconciliationService::new(
            stores.uploads.clone(),
            blobs.clone(),
            chrono::Duration::hours(1),
        );

        Harness {
            audit: AuditViewBuilder::new(stores.clone(), blobs),
            reference: ReferenceDataManager::new(stores),
            store,
            storage,
            channel,
            lifecycle,
            pipeline,
            intake,
            reconcile,
        }
    }

    /// Open a process for `secret`, seeding the token and a fresh category
    pub async fn open_process(&self, secret: &str) -> Process {
        let existing = TokenStore::find_by_secret(&self.store, secret).await.unwrap();
        if existing.is_none() {
            self.store.seed_token(secret, None, None);
        }
        let category = self.store.seed_category("Schaden", false);
        self.lifecycle
            .start_process(secret, category.id, None)
            .await
            .unwrap()
    }
}
