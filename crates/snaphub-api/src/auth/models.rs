use crate::error::ErrorResponse;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use axum::Json;

/// Proof that the request passed the admin bearer check.
///
/// Inserted into the request extensions by the admin middleware.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub client_ip: String,
}

impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AdminSession>().cloned().ok_or((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new(
                "Administrator authentication required",
                "AUTHORIZATION_ERROR",
            )),
        ))
    }
}
