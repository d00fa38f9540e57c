use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use snaphub_core::models::{
    CreateTokenRequest, SetActiveRequest, SetDepartmentsRequest, TokenResponse, UpdateTokenRequest,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminSession;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/admin/tokens",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Tokens newest first", body = Vec<TokenResponse>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, _admin), fields(operation = "list_tokens"))]
pub async fn list_tokens(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TokenResponse>>, HttpAppError> {
    Ok(Json(state.reference.list_tokens().await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/tokens",
    tag = "admin",
    security(("bearer_auth" = [])),
    request_body = CreateTokenRequest,
    responses(
        (status = 201, description = "Token issued with a fresh secret", body = TokenResponse),
        (status = 400, description = "Invalid label, email or department", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, admin, request), fields(operation = "create_token", client_ip = %admin.client_ip))]
pub async fn create_token(
    admin: AdminSession,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateTokenRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;
    let token = state.reference.create_token(request).await?;
    Ok((StatusCode::CREATED, Json(token)))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/tokens/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Token ID")),
    responses(
        (status = 200, description = "Token with its departments", body = TokenResponse),
        (status = 404, description = "Token not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, _admin), fields(operation = "get_token", token_id = %id))]
pub async fn get_token(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TokenResponse>, HttpAppError> {
    Ok(Json(state.reference.get_token(id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/admin/tokens/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Token ID")),
    request_body = UpdateTokenRequest,
    responses(
        (status = 200, description = "Token updated; empty strings clear a field", body = TokenResponse),
        (status = 404, description = "Token not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, _admin, request), fields(operation = "update_token", token_id = %id))]
pub async fn update_token(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateTokenRequest>,
) -> Result<Json<TokenResponse>, HttpAppError> {
    request.validate()?;
    Ok(Json(state.reference.update_token(id, request).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/tokens/{id}/active",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Token ID")),
    request_body = SetActiveRequest,
    responses(
        (status = 200, description = "Activation changed", body = TokenResponse),
        (status = 404, description = "Token not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, admin, request), fields(operation = "set_token_active", token_id = %id, client_ip = %admin.client_ip))]
pub async fn set_token_active(
    admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<SetActiveRequest>,
) -> Result<Json<TokenResponse>, HttpAppError> {
    Ok(Json(state.reference.set_active(id, request.active).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/tokens/{id}/departments",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Token ID")),
    request_body = SetDepartmentsRequest,
    responses(
        (status = 200, description = "Memberships replaced", body = TokenResponse),
        (status = 400, description = "Unknown department", body = ErrorResponse),
        (status = 404, description = "Token not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, _admin, request), fields(operation = "set_token_departments", token_id = %id))]
pub async fn set_token_departments(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<SetDepartmentsRequest>,
) -> Result<Json<TokenResponse>, HttpAppError> {
    Ok(Json(
        state
            .reference
            .set_departments(id, &request.department_ids)
            .await?,
    ))
}
