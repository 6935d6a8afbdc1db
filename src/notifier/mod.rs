//! Notifier
//!
//! Best-effort outbound notifications. Delivery is fire-and-forget: a
//! failed notification is logged and never propagated to the caller of a
//! ledger operation, so it can never roll back a committed mutation.
//!
//! Uses `lettre` for SMTP transport.

use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::SmtpConfig;

/// Notifier errors.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Failed to send message: {0}")]
    Send(String),
}

/// Outbound notification channel.
#[derive(Debug, Clone)]
pub enum Notifier {
    /// Real SMTP delivery.
    Smtp(SmtpNotifier),
    /// Development fallback: notifications go to the log only.
    Log,
}

impl Notifier {
    pub fn from_config(smtp: Option<SmtpConfig>) -> Self {
        match smtp {
            Some(config) => Notifier::Smtp(SmtpNotifier::new(config)),
            None => Notifier::Log,
        }
    }

    /// Deliver one notification.
    pub async fn notify(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        match self {
            Notifier::Smtp(smtp) => smtp.send(to, subject, body).await,
            Notifier::Log => {
                tracing::info!(to = %to, subject = %subject, "Notification (log only)");
                Ok(())
            }
        }
    }
}

/// Spawn a notification without awaiting it. Failures are logged, never
/// surfaced: the financial mutation this notification describes has
/// already committed.
pub fn spawn_notify(notifier: Notifier, to: String, subject: String, body: String) {
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&to, &subject, &body).await {
            tracing::warn!(to = %to, subject = %subject, error = %e, "Notification delivery failed");
        }
    });
}

/// SMTP notifier.
#[derive(Debug, Clone)]
pub struct SmtpNotifier {
    config: SmtpConfig,
}

impl SmtpNotifier {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotifyError> {
        let creds = Credentials::new(
            self.config.username.clone(),
            self.config.password.clone(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.host)
            .map_err(|e| NotifyError::Send(e.to_string()))?
            .port(self.config.port)
            .credentials(creds)
            .build();

        Ok(transport)
    }

    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let message = Message::builder()
            .from(
                self.config
                    .from_address
                    .parse()
                    .map_err(|_| NotifyError::Build("invalid from address".to_string()))?,
            )
            .to(to
                .parse()
                .map_err(|_| NotifyError::Build(format!("invalid recipient: {}", to)))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| NotifyError::Build(e.to_string()))?;

        self.transport()?
            .send(message)
            .await
            .map_err(|e| NotifyError::Send(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        let notifier = Notifier::Log;
        let result = notifier
            .notify("user@example.com", "Funds received", "You got paid.")
            .await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_from_config_without_smtp_is_log() {
        let notifier = Notifier::from_config(None);
        assert!(matches!(notifier, Notifier::Log));
    }

    #[test]
    fn test_from_config_with_smtp() {
        let notifier = Notifier::from_config(Some(SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "mailer".to_string(),
            password: "secret".to_string(),
            from_address: "no-reply@example.com".to_string(),
        }));
        assert!(matches!(notifier, Notifier::Smtp(_)));
    }
}
