//! Test helpers: build the router over in-memory stores and blob storage.
//!
//! Run from workspace root: `cargo test -p snaphub-api`.

#![allow(dead_code)]

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use snaphub_api::constants;
use snaphub_api::setup::routes;
use snaphub_api::state::AppState;
use snaphub_core::{BaseConfig, Config, IntakeConfig, StorageBackend};
use snaphub_db::{MemoryStore, Stores};
use snaphub_storage::{LocalStorage, MemoryStorage, Storage};
use std::path::Path;
use std::sync::Arc;

pub const LOCAL_BASE_URL: &str = "http://localhost:4000/files";

pub const ADMIN_KEY: &str = "test-admin-key-0123456789abcdef-0123";

/// API path prefix for tests (e.g. `/api/v1`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

pub fn test_config() -> Config {
    Config(Box::new(IntakeConfig {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            db_max_connections: 1,
            db_timeout_seconds: 5,
            environment: "test".to_string(),
            http_concurrency_limit: 64,
            request_timeout_secs: 30,
            log_format: "compact".to_string(),
            trusted_proxy_count: 1,
        },
        database_url: "postgres://unused".to_string(),
        admin_api_key: ADMIN_KEY.to_string(),
        storage_backend: StorageBackend::Local,
        s3_bucket: None,
        s3_region: None,
        s3_endpoint: None,
        aws_region: None,
        local_storage_path: None,
        local_storage_base_url: None,
        max_file_size_bytes: 1024 * 1024,
        max_files_per_batch: 5,
        allowed_content_types: vec!["image/*".to_string(), "application/pdf".to_string()],
        notifications_enabled: false,
        smtp_host: None,
        smtp_port: 587,
        smtp_user: None,
        smtp_password: None,
        smtp_from: None,
        smtp_tls: true,
        notification_timezone: "Europe/Berlin".parse().expect("timezone"),
        reconcile_interval_secs: 0,
        reconcile_grace_period_secs: 3600,
    }))
}

/// Test application: server plus handles on its backing stores
pub struct TestApp {
    pub server: TestServer,
    pub store: MemoryStore,
    pub storage: MemoryStorage,
}

async fn build_server(config: Config, store: &MemoryStore, blobs: Arc<dyn Storage>) -> TestServer {
    let state = Arc::new(AppState::new(
        config.clone(),
        Stores::memory(store.clone()),
        blobs,
        None,
    ));
    let router = routes::setup_routes(&config, state)
        .await
        .expect("router");
    TestServer::new(router).expect("test server")
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    /// In-memory stores under a caller-adjusted configuration
    pub async fn with_config(config: Config) -> Self {
        let store = MemoryStore::new();
        let storage = MemoryStorage::new();
        let server = build_server(config, &store, Arc::new(storage.clone())).await;

        TestApp {
            server,
            store,
            storage,
        }
    }

    /// Blobs go to `dir` through the local backend, served under [`LOCAL_BASE_URL`].
    /// `storage` stays empty in this mode.
    pub async fn with_local_storage(dir: &Path) -> Self {
        let mut config = test_config();
        config.0.local_storage_path = Some(dir.display().to_string());
        config.0.local_storage_base_url = Some(LOCAL_BASE_URL.to_string());

        let store = MemoryStore::new();
        let local = LocalStorage::new(dir, LOCAL_BASE_URL.to_string())
            .await
            .expect("local storage");
        let server = build_server(config, &store, Arc::new(local)).await;

        TestApp {
            server,
            store,
            storage: MemoryStorage::new(),
        }
    }

    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub fn file_part(name: &str, mime: &str, data: &[u8]) -> Part {
    Part::bytes(data.to_vec())
        .file_name(name.to_string())
        .mime_type(mime.to_string())
}

/// Intake form with a token, a category and one JPEG per name
pub fn intake_form(token: &str, category_id: &str, names: &[&str]) -> MultipartForm {
    names.iter().fold(
        MultipartForm::new()
            .add_text("token", token.to_string())
            .add_text("category_id", category_id.to_string()),
        |form, name| form.add_part("files", file_part(name, "image/jpeg", b"\xff\xd8jpeg")),
    )
}
