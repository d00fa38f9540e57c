//! Multipart form parsing for the intake endpoints

use axum::extract::Multipart;
use snaphub_core::AppError;
use snaphub_services::IncomingFile;
use uuid::Uuid;

use crate::constants::{FIELD_CATEGORY, FIELD_FILES, FIELD_NOTE, FIELD_NOTIFY, FIELD_TOKEN};

/// Raw intake form; field-level validation happens in the services
#[derive(Debug, Default)]
pub struct IntakeForm {
    pub token: String,
    pub category_id: Option<String>,
    pub note: Option<String>,
    pub notify: bool,
    /// Files in the order their parts arrived
    pub files: Vec<IncomingFile>,
}

impl IntakeForm {
    pub fn category_id(&self) -> Result<Uuid, AppError> {
        let raw = self
            .category_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Validation("category is required".to_string()))?;
        Uuid::parse_str(raw)
            .map_err(|_| AppError::Validation(format!("invalid category id '{}'", raw)))
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "on" | "yes"
    )
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("Invalid multipart body: {}", e.body_text()))
}

/// Read every part of the form. Unknown fields are ignored.
pub async fn read_intake_form(mut multipart: Multipart) -> Result<IntakeForm, AppError> {
    let mut form = IntakeForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            FIELD_FILES => {
                let file_name = field.file_name().unwrap_or("file").to_string();
                let content_type = field.content_type().map(String::from);
                let data = field.bytes().await.map_err(multipart_error)?;
                form.files
                    .push(IncomingFile::new(file_name, content_type.as_deref(), data));
            }
            FIELD_TOKEN => form.token = field.text().await.map_err(multipart_error)?,
            FIELD_CATEGORY => {
                form.category_id = Some(field.text().await.map_err(multipart_error)?)
            }
            FIELD_NOTE => form.note = Some(field.text().await.map_err(multipart_error)?),
            FIELD_NOTIFY => form.notify = parse_flag(&field.text().await.map_err(multipart_error)?),
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_truthy_values() {
        for v in ["true", "1", "on", "YES", " true "] {
            assert!(parse_flag(v), "{v}");
        }
        for v in ["false", "0", "", "nope"] {
            assert!(!parse_flag(v), "{v}");
        }
    }

    #[test]
    fn category_id_must_be_present_and_valid() {
        let mut form = IntakeForm::default();
        assert!(matches!(form.category_id(), Err(AppError::Validation(_))));
        form.category_id = Some("not-a-uuid".to_string());
        assert!(matches!(form.category_id(), Err(AppError::Validation(_))));
        let id = Uuid::new_v4();
        form.category_id = Some(format!(" {} ", id));
        assert_eq!(form.category_id().unwrap(), id);
    }
}
