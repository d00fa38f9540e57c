//! OpenAPI documentation.
//! Handler annotations carry the full `/api/v1` paths; keep them in step with
//! `crate::constants::API_PREFIX`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use snaphub_core::models;

/// Registers the admin bearer key referenced by `security(("bearer_auth" = []))`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .description(Some("Administrator API key"))
                    .build(),
            ),
        );
    }
}

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SnapHub API",
        version = "0.1.0",
        description = "Token-gated photo and document intake with an administrative audit view. All endpoints are versioned under /api/v1/."
    ),
    modifiers(&SecurityAddon),
    paths(
        // Intake
        handlers::categories::list_public_categories,
        handlers::intake::submit_intake,
        handlers::intake::append_files,
        // Reference data
        handlers::departments::list_departments,
        handlers::departments::create_department,
        handlers::departments::rename_department,
        handlers::departments::delete_department,
        handlers::categories::list_categories,
        handlers::categories::create_category,
        handlers::categories::update_category,
        handlers::categories::delete_category,
        handlers::tokens::list_tokens,
        handlers::tokens::create_token,
        handlers::tokens::get_token,
        handlers::tokens::update_token,
        handlers::tokens::set_token_active,
        handlers::tokens::set_token_departments,
        // Audit
        handlers::overview::reference_snapshot,
        handlers::overview::overview,
        handlers::overview::process_detail,
        handlers::overview::append_files,
        handlers::overview::delete_upload,
        handlers::maintenance::reconcile,
    ),
    components(
        schemas(
            models::Category,
            models::CategoryOption,
            models::CreateCategoryRequest,
            models::UpdateCategoryRequest,
            models::Department,
            models::DepartmentRequest,
            models::Token,
            models::TokenMembership,
            models::TokenResponse,
            models::CreateTokenRequest,
            models::UpdateTokenRequest,
            models::SetActiveRequest,
            models::SetDepartmentsRequest,
            models::Process,
            models::Upload,
            models::UploadView,
            models::FileStage,
            models::FileError,
            models::NotifyOutcome,
            models::BatchStatus,
            models::IntakeReport,
            models::AuditRow,
            models::OverviewSort,
            models::ReferenceSnapshot,
            models::ProcessDetail,
            models::ReconcileReport,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "intake", description = "Token-authenticated process creation and file upload"),
        (name = "admin", description = "Reference data, audit overview and maintenance"),
        (name = "health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;
