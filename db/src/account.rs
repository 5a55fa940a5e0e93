use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{dtos::account::NewAccount, models::account::Account};

pub async fn get_account_by_email<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    email: &str,
) -> Res<Option<Account>> {
    sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = $1")
        .bind(email)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn get_account_by_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    account_id: Uuid,
) -> Res<Option<Account>> {
    sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
        .bind(account_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn get_account_by_reset_token<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    token_hash: &str,
) -> Res<Option<Account>> {
    sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE reset_token_hash = $1")
        .bind(token_hash)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn get_accounts<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
) -> Res<Vec<Account>> {
    sqlx::query_as::<_, Account>("SELECT * FROM accounts ORDER BY created_at")
        .fetch_all(executor)
        .await
        .map_err(AppError::from)
}

/// Inserts unless the email is taken, in which case `DuplicateIdentity` is returned.
pub async fn insert_account<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: NewAccount,
) -> Res<Account> {
    sqlx::query_as::<_, Account>(
        r#"
        INSERT INTO accounts (id, email, password_hash, is_premium, subscription_date)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&data.email)
    .bind(&data.password_hash)
    .bind(data.premium_since.is_some())
    .bind(data.premium_since)
    .fetch_optional(executor)
    .await?
    .ok_or(AppError::DuplicateIdentity)
}

/// Conditional update on `(id, version)`. Returns `StaleRecord` if another writer won.
pub async fn update_account<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    account: &Account,
) -> Res<Account> {
    sqlx::query_as::<_, Account>(
        r#"
        UPDATE accounts
        SET password_hash = $3,
            is_premium = $4,
            subscription_date = $5,
            subscription_end_date = $6,
            reset_token_hash = $7,
            reset_expires = $8,
            version = version + 1
        WHERE id = $1 AND version = $2
        RETURNING *
        "#,
    )
    .bind(account.id)
    .bind(account.version)
    .bind(&account.password_hash)
    .bind(account.is_premium)
    .bind(account.subscription_date)
    .bind(account.subscription_end_date)
    .bind(&account.reset_token_hash)
    .bind(account.reset_expires)
    .fetch_optional(executor)
    .await?
    .ok_or(AppError::StaleRecord)
}

/// Records a welcome notification for a checkout session. `false` if one was already recorded.
pub async fn insert_welcome<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    session_id: &str,
    now: DateTime<Utc>,
) -> Res<bool> {
    let result = sqlx::query(
        "INSERT INTO welcome_notifications (session_id, sent_at) VALUES ($1, $2) \
         ON CONFLICT DO NOTHING",
    )
    .bind(session_id)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn delete_welcomes_before<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    sent_before: DateTime<Utc>,
) -> Res<u64> {
    let result = sqlx::query("DELETE FROM welcome_notifications WHERE sent_at < $1")
        .bind(sent_before)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
