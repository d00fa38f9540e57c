//! Category endpoints: the public list for the intake form and admin CRUD

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use snaphub_core::models::{Category, CategoryOption, CreateCategoryRequest, UpdateCategoryRequest};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminSession;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "intake",
    responses(
        (status = 200, description = "Categories offered on the intake form", body = Vec<CategoryOption>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "list_public_categories"))]
pub async fn list_public_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CategoryOption>>, HttpAppError> {
    Ok(Json(state.reference.category_options().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/categories",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All categories by name", body = Vec<Category>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, _admin), fields(operation = "list_categories"))]
pub async fn list_categories(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Category>>, HttpAppError> {
    Ok(Json(state.reference.list_categories().await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/categories",
    tag = "admin",
    security(("bearer_auth" = [])),
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, _admin, request), fields(operation = "create_category"))]
pub async fn create_category(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateCategoryRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;
    let category = state
        .reference
        .create_category(&request.name, request.notes_required)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/admin/categories/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = Category),
        (status = 404, description = "Category not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, _admin, request), fields(operation = "update_category", category_id = %id))]
pub async fn update_category(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateCategoryRequest>,
) -> Result<Json<Category>, HttpAppError> {
    request.validate()?;
    let category = state
        .reference
        .update_category(id, request.name.as_deref(), request.notes_required)
        .await?;
    Ok(Json(category))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/categories/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted; its processes keep existing without one"),
        (status = 404, description = "Category not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, _admin), fields(operation = "delete_category", category_id = %id))]
pub async fn delete_category(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    state.reference.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
