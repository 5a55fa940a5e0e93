use std::sync::LazyLock;

use chrono::Utc;
use common::{
    env_config::JwtConfig,
    error::{AppError, Res},
    jwt::{self, ClaimsSpec},
    password, validate,
};
use db::{dtos::account::NewAccount, models::account::Account, store::CredentialStore};
use uuid::Uuid;

/// Verified against when the email is unknown, so both login failures cost the same.
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| password::hash_password("timing-equaliser").unwrap_or_default());

/// Creates a regular (non-premium) account.
pub async fn signup(store: &dyn CredentialStore, email: &str, password: &str) -> Res<Account> {
    validate::email(email)?;
    validate::password(password)?;

    let account = store
        .create(NewAccount {
            email: email.to_string(),
            password_hash: password::hash_password(password)?,
            premium_since: None,
        })
        .await?;
    log::info!("Created account {} for {}", account.id, account.email);
    Ok(account)
}

/// Authenticates existing account.
/// Unknown email and wrong password both fail with `InvalidCredentials`.
pub async fn authenticate(
    store: &dyn CredentialStore,
    email: &str,
    password: &str,
) -> Res<Account> {
    match store.find_by_email(email).await? {
        Some(account) if password::verify_password(password, &account.password_hash) => Ok(account),
        Some(_) => Err(AppError::InvalidCredentials),
        None => {
            password::verify_password(password, &DUMMY_HASH);
            Err(AppError::InvalidCredentials)
        }
    }
}

/// Signs a session token holding the account's current entitlement.
pub fn issue_session(account: &Account, config: &JwtConfig) -> Res<String> {
    jwt::generate_jwt(
        ClaimsSpec {
            user_id: account.id,
            email: account.email.clone(),
            is_premium: account.has_active_entitlement(Utc::now()),
        },
        config,
    )
}

/// Entitlement as stored now, not as recorded in the caller's token.
pub async fn premium_status(store: &dyn CredentialStore, user_id: Uuid) -> Res<bool> {
    let account = store
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;
    Ok(account.has_active_entitlement(Utc::now()))
}
