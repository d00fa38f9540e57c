//! Notification Dispatcher
//!
//! Sends the completion email after a batch. Every failure ends up in the
//! returned [`NotifyOutcome`] and the log, never in the caller's result.

mod smtp;
mod template;

pub use smtp::SmtpChannel;
pub use template::render;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use snaphub_core::models::{NotifyOutcome, Token};
use snaphub_core::AppError;

/// Rendered email with HTML and plain-text parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Values interpolated into the completion email
#[derive(Debug, Clone)]
pub struct UploadSummary<'a> {
    pub process_number: i64,
    pub category: &'a str,
    pub file_count: usize,
    pub note: Option<&'a str>,
    pub completed_at: DateTime<Utc>,
}

/// Outbound delivery of a rendered message
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, address: &str, message: &NotificationMessage) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    channel: Option<Arc<dyn NotificationChannel>>,
    timezone: Tz,
}

impl NotificationDispatcher {
    pub fn new(channel: Option<Arc<dyn NotificationChannel>>, timezone: Tz) -> Self {
        Self { channel, timezone }
    }

    /// Dispatcher that reports every notification as disabled
    pub fn disabled() -> Self {
        Self::new(None, chrono_tz::Europe::Berlin)
    }

    /// Notify the token's address that a batch finished.
    ///
    /// `file_count` is the number of files actually stored.
    #[tracing::instrument(skip(self, token, category, note), fields(token_id = %token.id))]
    pub async fn notify(
        &self,
        token: &Token,
        process_number: i64,
        category: &str,
        file_count: usize,
        note: Option<&str>,
    ) -> NotifyOutcome {
        let Some(channel) = self.channel.as_ref() else {
            tracing::debug!("Notifications disabled");
            return NotifyOutcome::Disabled;
        };

        let Some(address) = token
            .email
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
        else {
            tracing::debug!("Token has no notification address");
            return NotifyOutcome::SkippedNoAddress;
        };

        let message = render(
            &UploadSummary {
                process_number,
                category,
                file_count,
                note,
                completed_at: Utc::now(),
            },
            self.timezone,
        );

        match channel.send(address, &message).await {
            Ok(()) => {
                tracing::info!(process_number, file_count, "Completion notification sent");
                NotifyOutcome::Sent
            }
            Err(e) => {
                tracing::warn!(error = %e, process_number, "Completion notification failed");
                NotifyOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
