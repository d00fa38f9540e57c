//! Configuration module
//!
//! Configuration is read from the environment (optionally seeded from a `.env`
//! file) once at startup and validated before anything else is initialized.

use std::env;

use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_FILE_SIZE_MB: usize = 20;
const MAX_FILES_PER_BATCH: usize = 50;
const SMTP_PORT: u16 = 587;
const RECONCILE_GRACE_PERIOD_SECS: u64 = 3600;
const HTTP_CONCURRENCY_LIMIT: usize = 1024;
const REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_TIMEZONE: &str = "Europe/Berlin";
const BYTES_PER_MB: usize = 1024 * 1024;

/// Server-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
    pub http_concurrency_limit: usize,
    pub request_timeout_secs: u64,
    pub log_format: String,
    /// Reverse proxies in front of the server; 0 ignores `X-Forwarded-For`
    pub trusted_proxy_count: usize,
}

/// Intake service configuration
#[derive(Clone, Debug)]
pub struct IntakeConfig {
    pub base: BaseConfig,
    pub database_url: String,
    pub admin_api_key: String,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Upload policy
    pub max_file_size_bytes: usize,
    pub max_files_per_batch: usize,
    pub allowed_content_types: Vec<String>,
    // Notifications
    pub notifications_enabled: bool,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    pub smtp_tls: bool,
    pub notification_timezone: chrono_tz::Tz,
    // Reconciliation sweep
    pub reconcile_interval_secs: u64,
    pub reconcile_grace_period_secs: u64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<IntakeConfig>);

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .to_lowercase()
        .parse()
        .unwrap_or(default)
}

fn env_list(key: &str, default: &str) -> Vec<String> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn megabytes_to_bytes(mb: usize) -> Result<usize, anyhow::Error> {
    mb.checked_mul(BYTES_PER_MB)
        .ok_or_else(|| anyhow::anyhow!("MAX_FILE_SIZE_MB is too large: {}", mb))
}

impl Config {
    fn as_intake(&self) -> &IntakeConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment().to_lowercase();
        env == "production" || env == "prod"
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, anyhow::Error> {
        IntakeConfig::from_env().map(|c| Config(Box::new(c)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_intake().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.as_intake().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_intake().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.as_intake().base.environment
    }

    pub fn db_max_connections(&self) -> u32 {
        self.as_intake().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.as_intake().base.db_timeout_seconds
    }

    pub fn http_concurrency_limit(&self) -> usize {
        self.as_intake().base.http_concurrency_limit
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.as_intake().base.request_timeout_secs
    }

    pub fn log_format(&self) -> &str {
        &self.as_intake().base.log_format
    }

    pub fn trusted_proxy_count(&self) -> usize {
        self.as_intake().base.trusted_proxy_count
    }

    pub fn database_url(&self) -> &str {
        &self.as_intake().database_url
    }

    pub fn admin_api_key(&self) -> &str {
        &self.as_intake().admin_api_key
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.as_intake().storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.as_intake().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.as_intake().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.as_intake().s3_endpoint.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.as_intake().aws_region.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.as_intake().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.as_intake().local_storage_base_url.as_deref()
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.as_intake().max_file_size_bytes
    }

    pub fn max_files_per_batch(&self) -> usize {
        self.as_intake().max_files_per_batch
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.as_intake().allowed_content_types
    }

    pub fn notifications_enabled(&self) -> bool {
        self.as_intake().notifications_enabled
    }

    pub fn smtp_host(&self) -> Option<&str> {
        self.as_intake().smtp_host.as_deref()
    }

    pub fn smtp_port(&self) -> u16 {
        self.as_intake().smtp_port
    }

    pub fn smtp_user(&self) -> Option<&str> {
        self.as_intake().smtp_user.as_deref()
    }

    pub fn smtp_password(&self) -> Option<&str> {
        self.as_intake().smtp_password.as_deref()
    }

    pub fn smtp_from(&self) -> Option<&str> {
        self.as_intake().smtp_from.as_deref()
    }

    pub fn smtp_tls(&self) -> bool {
        self.as_intake().smtp_tls
    }

    pub fn notification_timezone(&self) -> chrono_tz::Tz {
        self.as_intake().notification_timezone
    }

    pub fn reconcile_interval_secs(&self) -> u64 {
        self.as_intake().reconcile_interval_secs
    }

    pub fn reconcile_grace_period_secs(&self) -> u64 {
        self.as_intake().reconcile_grace_period_secs
    }
}

impl IntakeConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            environment,
            http_concurrency_limit: env::var("HTTP_CONCURRENCY_LIMIT")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(HTTP_CONCURRENCY_LIMIT)
                .max(1),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(REQUEST_TIMEOUT_SECS)
                .max(1),
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "compact".to_string())
                .to_lowercase(),
            trusted_proxy_count: env::var("TRUSTED_PROXY_COUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
        };

        let max_file_size_bytes = megabytes_to_bytes(
            env::var("MAX_FILE_SIZE_MB")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(MAX_FILE_SIZE_MB),
        )?;

        let storage_backend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .parse::<StorageBackend>()?;

        let timezone_name =
            env::var("NOTIFICATION_TIMEZONE").unwrap_or_else(|_| DEFAULT_TIMEZONE.to_string());
        let notification_timezone = timezone_name
            .parse::<chrono_tz::Tz>()
            .map_err(|e| anyhow::anyhow!("NOTIFICATION_TIMEZONE is invalid: {}", e))?;

        Ok(IntakeConfig {
            base,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            admin_api_key: env::var("ADMIN_API_KEY")
                .map_err(|_| anyhow::anyhow!("ADMIN_API_KEY must be set"))?,
            storage_backend,
            s3_bucket: env_non_empty("S3_BUCKET"),
            s3_region: env_non_empty("S3_REGION"),
            s3_endpoint: env_non_empty("S3_ENDPOINT"),
            aws_region: env_non_empty("AWS_REGION"),
            local_storage_path: Some(
                env::var("LOCAL_STORAGE_PATH").unwrap_or_else(|_| "./data/uploads".to_string()),
            ),
            local_storage_base_url: Some(
                env::var("LOCAL_STORAGE_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:4000/files".to_string()),
            ),
            max_file_size_bytes,
            max_files_per_batch: env::var("MAX_FILES_PER_BATCH")
                .unwrap_or_else(|_| MAX_FILES_PER_BATCH.to_string())
                .parse::<usize>()
                .unwrap_or(MAX_FILES_PER_BATCH)
                .max(1),
            allowed_content_types: env_list("ALLOWED_CONTENT_TYPES", "image/*,application/pdf"),
            notifications_enabled: env_bool("NOTIFICATIONS_ENABLED", false),
            smtp_host: env_non_empty("SMTP_HOST"),
            smtp_port: env::var("SMTP_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(SMTP_PORT),
            smtp_user: env_non_empty("SMTP_USER"),
            smtp_password: env_non_empty("SMTP_PASSWORD"),
            smtp_from: env_non_empty("SMTP_FROM"),
            smtp_tls: env_bool("SMTP_TLS", true),
            notification_timezone,
            reconcile_interval_secs: env::var("RECONCILE_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            reconcile_grace_period_secs: env::var("RECONCILE_GRACE_PERIOD_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(RECONCILE_GRACE_PERIOD_SECS),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.database_url.starts_with("postgresql://")
            || self.database_url.starts_with("postgres://"))
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.admin_api_key.len() < 32 {
            return Err(anyhow::anyhow!(
                "ADMIN_API_KEY must be at least 32 characters long"
            ));
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be at least 1"));
        }

        if self.allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!(
                "ALLOWED_CONTENT_TYPES must list at least one content type"
            ));
        }

        if self.notifications_enabled && (self.smtp_host.is_none() || self.smtp_from.is_none()) {
            return Err(anyhow::anyhow!(
                "NOTIFICATIONS_ENABLED=true requires SMTP_HOST and SMTP_FROM to be set"
            ));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IntakeConfig {
        IntakeConfig {
            base: BaseConfig {
                server_port: 4000,
                cors_origins: vec!["*".to_string()],
                db_max_connections: 5,
                db_timeout_seconds: 5,
                environment: "development".to_string(),
                http_concurrency_limit: 16,
                request_timeout_secs: 30,
                log_format: "compact".to_string(),
                trusted_proxy_count: 0,
            },
            database_url: "postgresql://localhost/snaphub".to_string(),
            admin_api_key: "a".repeat(32),
            storage_backend: StorageBackend::Local,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            aws_region: None,
            local_storage_path: Some("/tmp/snaphub".to_string()),
            local_storage_base_url: Some("http://localhost:4000/files".to_string()),
            max_file_size_bytes: 1024,
            max_files_per_batch: 10,
            allowed_content_types: vec!["image/*".to_string()],
            notifications_enabled: false,
            smtp_host: None,
            smtp_port: 587,
            smtp_user: None,
            smtp_password: None,
            smtp_from: None,
            smtp_tls: true,
            notification_timezone: chrono_tz::Europe::Berlin,
            reconcile_interval_secs: 0,
            reconcile_grace_period_secs: 3600,
        }
    }

    #[test]
    fn valid_local_config_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn short_admin_key_is_rejected() {
        let mut config = sample();
        config.admin_api_key = "short".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ADMIN_API_KEY"));
    }

    #[test]
    fn notifications_require_smtp_settings() {
        let mut config = sample();
        config.notifications_enabled = true;
        assert!(config.validate().is_err());

        config.smtp_host = Some("smtp.example.com".to_string());
        config.smtp_from = Some("Snap Manage Hub <noreply@example.com>".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn s3_backend_requires_bucket_and_region() {
        let mut config = sample();
        config.storage_backend = StorageBackend::S3;
        assert!(config.validate().is_err());

        config.s3_bucket = Some("uploads".to_string());
        assert!(config.validate().is_err());

        config.aws_region = Some("eu-central-1".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn non_postgres_url_is_rejected() {
        let mut config = sample();
        config.database_url = "mysql://localhost/db".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_file_limit_is_rejected_instead_of_overflowing() {
        assert_eq!(megabytes_to_bytes(20).unwrap(), 20 * 1024 * 1024);
        let err = megabytes_to_bytes(usize::MAX).unwrap_err();
        assert!(err.to_string().contains("MAX_FILE_SIZE_MB"));
    }

    #[test]
    fn zero_file_limit_is_rejected() {
        let mut config = sample();
        config.max_file_size_bytes = 0;
        assert!(config.validate().is_err());
    }
}
