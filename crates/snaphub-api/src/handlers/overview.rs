//! Audit views over processes and uploads

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use snaphub_core::models::{
    AuditRow, IntakeReport, OverviewFilter, OverviewSort, ProcessDetail, ReferenceSnapshot,
};
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::AdminSession;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::intake::report_response;
use crate::handlers::multipart::read_intake_form;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OverviewQuery {
    /// Only processes whose token belongs to this department
    pub department_id: Option<Uuid>,
    pub token_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    /// created_desc (default), created_asc, last_edit_desc, process_number_desc, process_number_asc
    #[serde(default)]
    #[param(value_type = Option<OverviewSort>)]
    pub sort: OverviewSort,
}

impl OverviewQuery {
    fn filter(&self) -> OverviewFilter {
        OverviewFilter {
            department_id: self.department_id,
            token_id: self.token_id,
            category_id: self.category_id,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/reference",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Departments, categories, tokens and memberships", body = ReferenceSnapshot),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, _admin), fields(operation = "reference_snapshot"))]
pub async fn reference_snapshot(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReferenceSnapshot>, HttpAppError> {
    Ok(Json(state.reference.snapshot().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/overview",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(OverviewQuery),
    responses(
        (status = 200, description = "One row per process", body = Vec<AuditRow>),
        (status = 400, description = "Invalid filter or sort", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, _admin), fields(operation = "overview"))]
pub async fn overview(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Query(query): Query<OverviewQuery>,
) -> Result<Json<Vec<AuditRow>>, HttpAppError> {
    let rows = state
        .audit
        .build_overview(query.filter(), query.sort)
        .await?;
    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/processes/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Process ID")),
    responses(
        (status = 200, description = "Process row with its uploads newest first", body = ProcessDetail),
        (status = 404, description = "Process not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, _admin), fields(operation = "process_detail", process_id = %id))]
pub async fn process_detail(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProcessDetail>, HttpAppError> {
    Ok(Json(state.audit.process_detail(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/processes/{id}/files",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Process ID")),
    request_body(
        content = inline(Object),
        description = "Field: files (repeated)",
        content_type = "multipart/form-data"
    ),
    responses(
        (status = 201, description = "Every file stored", body = IntakeReport),
        (status = 207, description = "Batch stopped at a failed file", body = IntakeReport),
        (status = 404, description = "Process not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, admin, multipart), fields(operation = "admin_append_files", process_id = %id, client_ip = %admin.client_ip))]
pub async fn append_files(
    admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let form = read_intake_form(multipart).await?;
    let report = state.intake.append_as_admin(id, form.files).await?;
    Ok(report_response(report))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/uploads/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Upload ID")),
    responses(
        (status = 204, description = "Blob and record deleted"),
        (status = 404, description = "Upload not found", body = ErrorResponse),
        (status = 502, description = "Blob removal failed; record kept", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, admin), fields(operation = "delete_upload", upload_id = %id, client_ip = %admin.client_ip))]
pub async fn delete_upload(
    admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    state.audit.delete_upload(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
