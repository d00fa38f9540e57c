use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use snaphub_core::models::{Department, DepartmentRequest};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminSession;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/admin/departments",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Departments by name", body = Vec<Department>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, _admin), fields(operation = "list_departments"))]
pub async fn list_departments(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Department>>, HttpAppError> {
    Ok(Json(state.reference.list_departments().await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/departments",
    tag = "admin",
    security(("bearer_auth" = [])),
    request_body = DepartmentRequest,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, _admin, request), fields(operation = "create_department"))]
pub async fn create_department(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<DepartmentRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;
    let department = state.reference.create_department(&request.name).await?;
    Ok((StatusCode::CREATED, Json(department)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/admin/departments/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Department ID")),
    request_body = DepartmentRequest,
    responses(
        (status = 200, description = "Department renamed", body = Department),
        (status = 404, description = "Department not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, _admin, request), fields(operation = "rename_department", department_id = %id))]
pub async fn rename_department(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<DepartmentRequest>,
) -> Result<Json<Department>, HttpAppError> {
    request.validate()?;
    Ok(Json(state.reference.rename_department(id, &request.name).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/departments/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Department ID")),
    responses(
        (status = 204, description = "Department and its memberships deleted"),
        (status = 404, description = "Department not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, _admin), fields(operation = "delete_department", department_id = %id))]
pub async fn delete_department(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    state.reference.delete_department(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
