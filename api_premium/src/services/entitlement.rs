use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use common::{
    error::{AppError, Res},
    password,
};
use db::{dtos::account::NewAccount, models::account::Account, store::CredentialStore};
use mailer::{Notification, Notifier};

/// Read-modify-write attempts before a contended reconciliation gives up.
const MAX_ATTEMPTS: usize = 5;

/// How long a welcome claim is kept. Provider webhook retries stop well before this.
pub const WELCOME_RETENTION_DAYS: i64 = 30;

/// A checkout session as reported by the payment provider.
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub session_id: String,
    pub email: String,
    pub paid: bool,
}

#[derive(Debug)]
pub enum Reconciliation {
    Created(Account),
    Upgraded(Account),
    /// Entitlement was already active; nothing was written.
    AlreadyEntitled(Account),
    /// Paid, but there is no account yet and no password to create one with.
    Unmaterialized { email: String },
}

impl Reconciliation {
    pub fn account(&self) -> Option<&Account> {
        match self {
            Reconciliation::Created(account)
            | Reconciliation::Upgraded(account)
            | Reconciliation::AlreadyEntitled(account) => Some(account),
            Reconciliation::Unmaterialized { .. } => None,
        }
    }
}

/// Attaches a confirmed payment to the account with the paying email.
///
/// Existing accounts keep their password. A missing account is created only
/// when `chosen_secret` is given. Replays are harmless: an active entitlement
/// is left as is, so the webhook and the registration paths merge instead of
/// overwriting each other's timestamps. The welcome email goes out once per
/// checkout session whichever path gets there first.
pub async fn reconcile_payment(
    store: &dyn CredentialStore,
    notifier: &Arc<dyn Notifier>,
    payment: &PaymentConfirmation,
    chosen_secret: Option<&str>,
    plan: &str,
) -> Res<Reconciliation> {
    if !payment.paid {
        return Err(AppError::PaymentNotConfirmed);
    }

    let reconciliation = grant_entitlement(store, &payment.email, chosen_secret, Utc::now()).await?;
    match &reconciliation {
        Reconciliation::Created(account) => {
            log::info!("Created premium account {} for {}", account.id, account.email)
        }
        Reconciliation::Upgraded(account) => {
            log::info!("Upgraded account {} to premium", account.id)
        }
        Reconciliation::AlreadyEntitled(account) => {
            log::info!("Account {} already premium, nothing to do", account.id)
        }
        Reconciliation::Unmaterialized { email } => log::warn!(
            "Payment for {} (session {}) has no account yet; \
             it stays unattached until registration is completed",
            email,
            payment.session_id
        ),
    }

    send_welcome(store, notifier, payment, plan).await;
    Ok(reconciliation)
}

async fn grant_entitlement(
    store: &dyn CredentialStore,
    email: &str,
    chosen_secret: Option<&str>,
    now: DateTime<Utc>,
) -> Res<Reconciliation> {
    let mut password_hash: Option<String> = None;

    for _ in 0..MAX_ATTEMPTS {
        match store.find_by_email(email).await? {
            Some(account) if account.has_active_entitlement(now) => {
                return Ok(Reconciliation::AlreadyEntitled(account));
            }
            Some(mut account) => {
                account.is_premium = true;
                account.subscription_date = Some(now);
                account.subscription_end_date = None;
                match store.save(&account).await {
                    Ok(saved) => return Ok(Reconciliation::Upgraded(saved)),
                    Err(AppError::StaleRecord) => continue,
                    Err(e) => return Err(e),
                }
            }
            None => {
                let Some(secret) = chosen_secret else {
                    return Ok(Reconciliation::Unmaterialized {
                        email: email.to_string(),
                    });
                };
                let hash = match &password_hash {
                    Some(hash) => hash.clone(),
                    None => password_hash.insert(password::hash_password(secret)?).clone(),
                };
                let data = NewAccount {
                    email: email.to_string(),
                    password_hash: hash,
                    premium_since: Some(now),
                };
                match store.create(data).await {
                    Ok(account) => return Ok(Reconciliation::Created(account)),
                    // lost the race to another path; the next pass upgrades the winner
                    Err(AppError::DuplicateIdentity) => continue,
                    Err(e) => return Err(e),
                }
            }
        }
    }

    log::error!("Gave up reconciling payment for {} after {} attempts", email, MAX_ATTEMPTS);
    Err(AppError::StaleRecord)
}

async fn send_welcome(
    store: &dyn CredentialStore,
    notifier: &Arc<dyn Notifier>,
    payment: &PaymentConfirmation,
    plan: &str,
) {
    let first_delivery = match store.claim_welcome(&payment.session_id).await {
        Ok(first) => first,
        Err(e) => {
            log::warn!(
                "Could not record welcome email for session {}: {}",
                payment.session_id,
                e
            );
            true
        }
    };

    if first_delivery {
        mailer::dispatch(
            notifier,
            &payment.email,
            Notification::PremiumWelcome {
                plan: plan.to_string(),
            },
        );
    } else {
        log::debug!("Welcome email for session {} already sent", payment.session_id);
    }
}

/// Drops welcome claims older than the retention window.
pub async fn prune_welcome_log(store: &dyn CredentialStore, now: DateTime<Utc>) -> Res<u64> {
    let removed = store
        .prune_welcomes(now - Duration::days(WELCOME_RETENTION_DAYS))
        .await?;
    if removed > 0 {
        log::info!("Pruned {} welcome records", removed);
    }
    Ok(removed)
}
