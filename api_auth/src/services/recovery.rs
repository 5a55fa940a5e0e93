use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use common::{
    error::{AppError, Res},
    password, validate,
};
use db::store::CredentialStore;
use mailer::{Notification, Notifier};

pub const RESET_TOKEN_TTL_HOURS: i64 = 1;

const MAX_ATTEMPTS: usize = 5;

pub async fn request_reset(
    store: &dyn CredentialStore,
    notifier: &Arc<dyn Notifier>,
    email: &str,
    site_url: &str,
) -> Res<()> {
    request_reset_at(store, notifier, email, site_url, Utc::now()).await
}

/// Issues a fresh recovery token and mails the link. Any earlier token is
/// replaced. Returns `Ok` for unknown emails too, so callers cannot tell
/// whether an account exists.
pub async fn request_reset_at(
    store: &dyn CredentialStore,
    notifier: &Arc<dyn Notifier>,
    email: &str,
    site_url: &str,
    now: DateTime<Utc>,
) -> Res<()> {
    for _ in 0..MAX_ATTEMPTS {
        let Some(mut account) = store.find_by_email(email).await? else {
            log::info!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = password::generate_recovery_token();
        account.reset_token_hash = Some(password::digest_token(&token));
        account.reset_expires = Some(now + Duration::hours(RESET_TOKEN_TTL_HOURS));

        match store.save(&account).await {
            Ok(saved) => {
                log::info!("Issued password reset token for account {}", saved.id);
                mailer::dispatch(
                    notifier,
                    &saved.email,
                    Notification::PasswordReset {
                        reset_link: format!("{}/reset-password.html?token={}", site_url, token),
                    },
                );
                return Ok(());
            }
            Err(AppError::StaleRecord) => continue,
            Err(e) => return Err(e),
        }
    }
    Err(AppError::StaleRecord)
}

pub async fn perform_reset(
    store: &dyn CredentialStore,
    notifier: &Arc<dyn Notifier>,
    token: &str,
    new_password: &str,
) -> Res<()> {
    perform_reset_at(store, notifier, token, new_password, Utc::now()).await
}

/// Consumes a recovery token and sets the new password.
///
/// The token is cleared in the same versioned write that stores the new
/// hash, so of two concurrent uses only one can succeed. Expired tokens are
/// cleared as well before the request is refused.
pub async fn perform_reset_at(
    store: &dyn CredentialStore,
    notifier: &Arc<dyn Notifier>,
    token: &str,
    new_password: &str,
    now: DateTime<Utc>,
) -> Res<()> {
    validate::required(token, "token")?;
    validate::password(new_password)?;

    let token_hash = password::digest_token(token);
    let mut new_hash: Option<String> = None;

    for _ in 0..MAX_ATTEMPTS {
        let Some(mut account) = store.find_by_recovery_token(&token_hash).await? else {
            return Err(AppError::InvalidOrExpiredToken);
        };

        if account.reset_expires.is_none_or(|expires| expires <= now) {
            account.clear_recovery();
            match store.save(&account).await {
                Ok(_) | Err(AppError::StaleRecord) => {}
                Err(e) => {
                    log::warn!("Failed to clear expired reset token for {}: {}", account.id, e)
                }
            }
            return Err(AppError::InvalidOrExpiredToken);
        }

        account.password_hash = match &new_hash {
            Some(hash) => hash.clone(),
            None => new_hash.insert(password::hash_password(new_password)?).clone(),
        };
        account.clear_recovery();

        match store.save(&account).await {
            Ok(saved) => {
                log::info!("Password reset for account {}", saved.id);
                mailer::dispatch(notifier, &saved.email, Notification::PasswordResetSuccess);
                return Ok(());
            }
            // another request touched the account; re-read and check the token again
            Err(AppError::StaleRecord) => continue,
            Err(e) => return Err(e),
        }
    }
    Err(AppError::StaleRecord)
}
