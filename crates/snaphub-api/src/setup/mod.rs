//! Application setup and initialization
//!
//! Everything `main` needs to go from a loaded [`Config`] to a served router.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
pub use services::BackgroundTasks;
use snaphub_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(
    config: Config,
) -> Result<(Arc<AppState>, axum::Router, BackgroundTasks)> {
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.log_format())
        .context("Failed to initialize telemetry")?;

    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;
    let storage = storage::setup_storage(&config).await?;
    let (state, tasks) = services::initialize_services(&config, pool, storage)?;
    let router = routes::setup_routes(&config, state.clone()).await?;

    Ok((state, router, tasks))
}
