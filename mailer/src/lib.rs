use std::sync::Arc;

use async_trait::async_trait;
use common::env_config::SmtpConfig;

pub mod smtp;

/// Transactional messages the backend sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    PremiumWelcome { plan: String },
    PasswordReset { reset_link: String },
    PasswordResetSuccess,
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::PremiumWelcome { .. } => "premium",
            Notification::PasswordReset { .. } => "passwordReset",
            Notification::PasswordResetSuccess => "passwordResetSuccess",
        }
    }

    pub fn subject(&self) -> &'static str {
        match self {
            Notification::PremiumWelcome { .. } => "Welcome to Premium",
            Notification::PasswordReset { .. } => "Password reset request",
            Notification::PasswordResetSuccess => "Your password has been changed",
        }
    }

    pub fn body(&self) -> String {
        match self {
            Notification::PremiumWelcome { plan } => format!(
                "Thank you for your purchase of the {plan}.\n\n\
                 Your premium access is now active. Sign in with the email \
                 address used at checkout to download the premium tools.\n"
            ),
            Notification::PasswordReset { reset_link } => format!(
                "A password reset was requested for your account.\n\n\
                 Open the link below within one hour to choose a new password:\n\
                 {reset_link}\n\n\
                 If you did not request this, you can ignore this email.\n"
            ),
            Notification::PasswordResetSuccess => "Your password was changed successfully.\n\n\
                 If you did not make this change, request a new password reset \
                 immediately and contact support.\n"
                .to_string(),
        }
    }
}

/// Result of one delivery attempt. Senders report failure here instead of erroring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl SendOutcome {
    pub fn sent() -> Self {
        SendOutcome {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        SendOutcome {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, notification: &Notification) -> SendOutcome;
}

/// Used when no mail relay is configured.
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send(&self, to: &str, notification: &Notification) -> SendOutcome {
        log::warn!(
            "Email service not configured, dropping {} email to {}",
            notification.kind(),
            to
        );
        SendOutcome::failed("Email service not configured")
    }
}

/// Builds the SMTP notifier, or the disabled one when credentials are missing
/// or the relay cannot be set up.
pub fn from_config(config: &SmtpConfig) -> Arc<dyn Notifier> {
    if !config.is_configured() {
        log::warn!("SMTP_USER or SMTP_PASS not set, emails will not be sent");
        return Arc::new(DisabledNotifier);
    }
    match smtp::SmtpNotifier::new(config) {
        Ok(notifier) => Arc::new(notifier),
        Err(e) => {
            log::error!("Failed to set up SMTP relay {}: {}", config.host, e);
            Arc::new(DisabledNotifier)
        }
    }
}

/// Sends in the background. The outcome is logged and never reaches the caller.
pub fn dispatch(notifier: &Arc<dyn Notifier>, to: &str, notification: Notification) {
    let notifier = Arc::clone(notifier);
    let to = to.to_string();
    tokio::spawn(async move {
        let outcome = notifier.send(&to, &notification).await;
        if outcome.success {
            log::info!("Sent {} email to {}", notification.kind(), to);
        } else {
            log::warn!(
                "Failed to send {} email to {}: {}",
                notification.kind(),
                to,
                outcome.error.unwrap_or_default()
            );
        }
    });
}
