//! Public intake endpoints, authenticated by the token secret in the form

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use snaphub_core::models::{BatchStatus, IntakeReport};
use snaphub_services::IntakeSubmission;
use uuid::Uuid;

use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::multipart::read_intake_form;
use crate::state::AppState;

/// 201 for a complete batch, 207 when a file failed after the process existed
pub(crate) fn report_response(report: IntakeReport) -> impl IntoResponse {
    let status = match report.status {
        BatchStatus::Complete => StatusCode::CREATED,
        BatchStatus::Partial => StatusCode::MULTI_STATUS,
    };
    (status, Json(report))
}

#[utoipa::path(
    post,
    path = "/api/v1/intake",
    tag = "intake",
    request_body(
        content = inline(Object),
        description = "Fields: token, category_id, note (optional), notify (optional), files (repeated)",
        content_type = "multipart/form-data"
    ),
    responses(
        (status = 201, description = "Process created and every file stored", body = IntakeReport),
        (status = 207, description = "Process created, batch stopped at a failed file", body = IntakeReport),
        (status = 400, description = "Invalid form, file type or size", body = ErrorResponse),
        (status = 401, description = "Unknown or inactive token", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "submit_intake"))]
pub async fn submit_intake(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let form = read_intake_form(multipart).await?;
    let category_id = form.category_id()?;

    let report = state
        .intake
        .submit(IntakeSubmission {
            token: form.token,
            category_id,
            note: form.note,
            notify: form.notify,
            files: form.files,
        })
        .await?;

    tracing::info!(
        process_number = report.process.process_number,
        uploaded = report.uploaded.len(),
        status = ?report.status,
        "Intake processed"
    );

    Ok(report_response(report))
}

#[utoipa::path(
    post,
    path = "/api/v1/intake/{process_id}/files",
    tag = "intake",
    params(("process_id" = Uuid, Path, description = "Process the files belong to")),
    request_body(
        content = inline(Object),
        description = "Fields: token, notify (optional), files (repeated)",
        content_type = "multipart/form-data"
    ),
    responses(
        (status = 201, description = "Every file stored", body = IntakeReport),
        (status = 207, description = "Batch stopped at a failed file", body = IntakeReport),
        (status = 400, description = "Invalid file type or size", body = ErrorResponse),
        (status = 401, description = "Token does not own the process", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "append_files", process_id = %process_id))]
pub async fn append_files(
    State(state): State<Arc<AppState>>,
    Path(process_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let form = read_intake_form(multipart).await?;
    let report = state
        .intake
        .append(&form.token, process_id, form.files, form.notify)
        .await?;

    Ok(report_response(report))
}
