//! Health check handlers and response types.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);
const PROBE_KEY: &str = "health-check-non-existent-key";

/// Run an async check with timeout; returns status string "healthy", "timeout", or "{prefix}: {error}".
async fn run_check<F, E>(timeout: Duration, f: F, error_prefix: &str) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => format!("{}: {}", error_prefix, e),
        Err(_) => "timeout".to_string(),
    }
}

#[derive(serde::Serialize)]
pub(super) struct HealthCheckResponse {
    pub status: String,
    pub database: String,
    pub storage: String,
    pub notifications: &'static str,
}

/// Liveness probe - process is running.
pub async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}

/// Readiness probe - the database answers.
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = run_check(TIMEOUT, state.stores.health.ping(), "not_ready").await;
    if database == "healthy" {
        (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ready", "database": "ready" })),
        )
    } else {
        tracing::error!(database = %database, "Database readiness check failed");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "not_ready", "database": database })),
        )
    }
}

/// Full health check. Storage problems degrade, database problems fail.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let storage = state.storage.clone();
    let (database, storage) = tokio::join!(
        run_check(TIMEOUT, state.stores.health.ping(), "unhealthy"),
        run_check(
            TIMEOUT,
            async move { storage.exists(PROBE_KEY).await.map(drop) },
            "degraded",
        ),
    );

    let status = if database != "healthy" {
        "unhealthy"
    } else if storage != "healthy" {
        "degraded"
    } else {
        "healthy"
    };
    let response = HealthCheckResponse {
        status: status.to_string(),
        database,
        storage,
        notifications: if state.config.notifications_enabled() {
            "enabled"
        } else {
            "disabled"
        },
    };

    let code = if status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, Json(response))
}
