//! Application state shared by every handler.

use snaphub_core::Config;
use snaphub_db::Stores;
use snaphub_services::{
    AuditViewBuilder, FilePolicy, IntakeService, NotificationChannel, NotificationDispatcher,
    ProcessLifecycleManager, ReconciliationService, ReferenceDataManager, Storage, TokenRegistry,
    UploadPipeline,
};
use std::sync::Arc;
use std::time::Duration;

const MAX_GRACE_PERIOD_DAYS: i64 = 365;

fn grace_period(config: &Config) -> chrono::Duration {
    let secs = Duration::from_secs(config.reconcile_grace_period_secs());
    chrono::Duration::from_std(secs)
        .unwrap_or_else(|_| chrono::Duration::days(MAX_GRACE_PERIOD_DAYS))
        .min(chrono::Duration::days(MAX_GRACE_PERIOD_DAYS))
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub stores: Stores,
    pub storage: Arc<dyn Storage>,
    pub intake: IntakeService,
    pub audit: AuditViewBuilder,
    pub reference: ReferenceDataManager,
    pub reconcile: Arc<ReconciliationService>,
}

impl AppState {
    /// Wire every service over the given stores, blob storage and channel
    pub fn new(
        config: Config,
        stores: Stores,
        storage: Arc<dyn Storage>,
        channel: Option<Arc<dyn NotificationChannel>>,
    ) -> Self {
        let registry = TokenRegistry::new(stores.tokens.clone());
        let lifecycle = ProcessLifecycleManager::new(
            registry,
            stores.categories.clone(),
            stores.processes.clone(),
        );
        let pipeline = UploadPipeline::new(
            storage.clone(),
            stores.uploads.clone(),
            FilePolicy::from_config(&config),
        );
        let dispatcher = NotificationDispatcher::new(channel, config.notification_timezone());
        let intake = IntakeService::new(
            lifecycle,
            pipeline,
            dispatcher,
            stores.categories.clone(),
        );
        let reconcile = Arc::new(ReconciliationService::new(
            stores.uploads.clone(),
            storage.clone(),
            grace_period(&config),
        ));

        AppState {
            audit: AuditViewBuilder::new(stores.clone(), storage.clone()),
            reference: ReferenceDataManager::new(stores.clone()),
            config,
            stores,
            storage,
            intake,
            reconcile,
        }
    }
}
