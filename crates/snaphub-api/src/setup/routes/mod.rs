//! Route configuration and setup.
//!
//! Health checks live in [health](health); everything else is nested under
//! [`API_PREFIX`]. With the local backend the blob directory is served
//! read-only under the path of `LOCAL_STORAGE_BASE_URL`.

mod health;

use crate::auth::{admin_auth_middleware, AdminAuthState, AuthFailureLimiter};
use crate::constants::API_PREFIX;
use crate::handlers::{categories, departments, intake, maintenance, overview, tokens};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, Uri},
    routing::{get, patch, post, put},
    Json, Router,
};
use snaphub_core::{Config, StorageBackend};
use std::sync::Arc;
use std::time::Duration;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

const LIMITER_CLEANUP_INTERVAL_SECS: u64 = 300;
/// Multipart framing on top of the raw file bytes
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Setup all application routes
pub async fn setup_routes(
    config: &Config,
    state: Arc<AppState>,
) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    let auth_state = setup_admin_auth(config)?;

    let admin_routes = admin_routes().layer(axum::middleware::from_fn_with_state(
        Arc::new(auth_state),
        admin_auth_middleware,
    ));
    let api_routes = intake_routes().merge(admin_routes);

    let http_concurrency_limit = config.http_concurrency_limit().max(1);
    let request_timeout_secs = config.request_timeout_secs().max(1);
    let body_limit = config
        .max_file_size_bytes()
        .saturating_mul(config.max_files_per_batch())
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    tracing::info!(
        http_concurrency_limit,
        request_timeout_secs,
        body_limit_bytes = body_limit,
        "HTTP limits configured"
    );

    let mut app = Router::new()
        .nest(API_PREFIX, api_routes)
        .merge(health_routes())
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
        .merge(utoipa_rapidoc::RapiDoc::new("/api/openapi.json").path("/docs"));

    if let Some((mount_path, root)) = local_files_mount(config)? {
        tracing::info!(mount_path = %mount_path, root = %root, "Serving local blobs");
        app = app.nest_service(&mount_path, ServeDir::new(root));
    }

    let app = app
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(DefaultBodyLimit::disable())
        .layer(TimeoutLayer::new(Duration::from_secs(request_timeout_secs)))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}

/// Mount path and directory for serving local blobs, if the backend is local
fn local_files_mount(config: &Config) -> Result<Option<(String, String)>, anyhow::Error> {
    if config.storage_backend() != StorageBackend::Local {
        return Ok(None);
    }
    let (Some(root), Some(base_url)) =
        (config.local_storage_path(), config.local_storage_base_url())
    else {
        return Ok(None);
    };

    let uri = base_url
        .parse::<Uri>()
        .map_err(|e| anyhow::anyhow!("Invalid LOCAL_STORAGE_BASE_URL: {}", e))?;
    let mount_path = uri.path().trim_end_matches('/');
    if mount_path.is_empty() || mount_path.starts_with(API_PREFIX) {
        return Err(anyhow::anyhow!(
            "LOCAL_STORAGE_BASE_URL needs a path outside {} (e.g. /files)",
            API_PREFIX
        ));
    }

    Ok(Some((mount_path.to_string(), root.to_string())))
}

fn setup_admin_auth(config: &Config) -> Result<AdminAuthState, anyhow::Error> {
    let admin_api_key = config.admin_api_key().to_string();
    if admin_api_key.len() < 32 {
        return Err(anyhow::anyhow!(
            "ADMIN_API_KEY must be at least 32 characters long"
        ));
    }

    let trusted_proxy_count = config.trusted_proxy_count();

    let limiter = AuthFailureLimiter::default();
    let limiter_for_cleanup = limiter.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(LIMITER_CLEANUP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            limiter_for_cleanup.cleanup_expired().await;
        }
    });

    Ok(AdminAuthState {
        admin_api_key,
        limiter,
        trusted_proxy_count,
    })
}

fn health_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/live", get(health::liveness_check))
        .route("/ready", get(health::readiness_check))
}

/// Public routes; the token secret in the form is the credential
fn intake_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/categories", get(categories::list_public_categories))
        .route("/intake", post(intake::submit_intake))
        .route("/intake/{process_id}/files", post(intake::append_files))
}

fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/admin/departments",
            get(departments::list_departments).post(departments::create_department),
        )
        .route(
            "/admin/departments/{id}",
            patch(departments::rename_department).delete(departments::delete_department),
        )
        .route(
            "/admin/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/admin/categories/{id}",
            patch(categories::update_category).delete(categories::delete_category),
        )
        .route(
            "/admin/tokens",
            get(tokens::list_tokens).post(tokens::create_token),
        )
        .route(
            "/admin/tokens/{id}",
            get(tokens::get_token).patch(tokens::update_token),
        )
        .route("/admin/tokens/{id}/active", put(tokens::set_token_active))
        .route(
            "/admin/tokens/{id}/departments",
            put(tokens::set_token_departments),
        )
        .route("/admin/reference", get(overview::reference_snapshot))
        .route("/admin/overview", get(overview::overview))
        .route("/admin/processes/{id}", get(overview::process_detail))
        .route("/admin/processes/{id}/files", post(overview::append_files))
        .route(
            "/admin/uploads/{id}",
            axum::routing::delete(overview::delete_upload),
        )
        .route("/admin/maintenance/reconcile", post(maintenance::reconcile))
}
