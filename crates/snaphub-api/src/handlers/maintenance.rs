use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use snaphub_core::models::ReconcileReport;
use utoipa::IntoParams;

use crate::auth::AdminSession;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReconcileQuery {
    /// Report orphans without removing them
    #[serde(default)]
    pub dry_run: bool,
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/maintenance/reconcile",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(ReconcileQuery),
    responses(
        (status = 200, description = "Sweep report", body = ReconcileReport),
        (status = 500, description = "Listing blobs or records failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, admin), fields(operation = "reconcile", client_ip = %admin.client_ip))]
pub async fn reconcile(
    admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReconcileQuery>,
) -> Result<Json<ReconcileReport>, HttpAppError> {
    Ok(Json(state.reconcile.sweep(query.dry_run).await?))
}
