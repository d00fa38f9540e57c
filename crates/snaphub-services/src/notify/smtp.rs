//! SMTP delivery via lettre

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use snaphub_core::{AppError, Config};

use super::{NotificationChannel, NotificationMessage};

#[derive(Clone)]
pub struct SmtpChannel {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpChannel {
    /// Build the channel from config. `None` when notifications are disabled.
    pub fn from_config(config: &Config) -> Result<Option<Self>, AppError> {
        if !config.notifications_enabled() {
            tracing::debug!("Notifications disabled (NOTIFICATIONS_ENABLED=false)");
            return Ok(None);
        }
        let host = config
            .smtp_host()
            .ok_or_else(|| AppError::Internal("SMTP_HOST not configured".to_string()))?;
        let from: Mailbox = config
            .smtp_from()
            .ok_or_else(|| AppError::Internal("SMTP_FROM not configured".to_string()))?
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid SMTP_FROM: {}", e)))?;
        let port = config.smtp_port();
        let credentials = match (config.smtp_user(), config.smtp_password()) {
            (Some(user), Some(password)) => {
                Some(Credentials::new(user.to_string(), password.to_string()))
            }
            _ => None,
        };

        let builder = if config.smtp_tls() {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| AppError::Internal(format!("Invalid SMTP relay {}: {}", host, e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        }
        .port(port);

        let builder = match credentials {
            Some(credentials) => builder.credentials(credentials),
            None => builder,
        };

        tracing::info!(
            host = %host,
            port = port,
            tls = config.smtp_tls(),
            "Notification channel initialized (SMTP)"
        );

        Ok(Some(Self {
            mailer: builder.build(),
            from,
        }))
    }
}

#[async_trait]
impl NotificationChannel for SmtpChannel {
    async fn send(&self, address: &str, message: &NotificationMessage) -> Result<(), AppError> {
        let to: Mailbox = address
            .parse()
            .map_err(|e| AppError::Notification(format!("invalid address '{}': {}", address, e)))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.as_str())
            .multipart(MultiPart::alternative_plain_html(
                message.text.clone(),
                message.html.clone(),
            ))
            .map_err(|e| AppError::Notification(e.to_string()))?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| AppError::Notification(e.to_string()))?;

        Ok(())
    }
}
