use async_trait::async_trait;
use common::env_config::SmtpConfig;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use thiserror::Error;

use crate::{Notification, Notifier, SendOutcome};

/// Port on which the relay expects implicit TLS instead of STARTTLS.
const SMTPS_PORT: u16 = 465;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());

        let builder = if config.port == SMTPS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        };
        let mailer = builder.port(config.port).credentials(credentials).build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    async fn send_text_email(
        &self,
        to: &str,
        subject: &str,
        body: String,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        self.mailer.send(email).await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, to: &str, notification: &Notification) -> SendOutcome {
        match self
            .send_text_email(to, notification.subject(), notification.body())
            .await
        {
            Ok(()) => SendOutcome::sent(),
            Err(e) => SendOutcome::failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(from_address: &str) -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "user".to_string(),
            password: "pass".to_string(),
            from_address: from_address.to_string(),
        }
    }

    #[tokio::test]
    async fn test_invalid_sender_is_reported_not_raised() {
        let notifier = SmtpNotifier::new(&config("not an address")).unwrap();
        let outcome = notifier
            .send("a@x.com", &Notification::PasswordResetSuccess)
            .await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("Invalid email address"));
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_reported_not_raised() {
        let notifier = SmtpNotifier::new(&config("noreply@example.com")).unwrap();
        let outcome = notifier
            .send("nobody", &Notification::PasswordResetSuccess)
            .await;
        assert!(!outcome.success);
    }
}
