use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::Res;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{account, dtos::account::NewAccount, models::account::Account};

/// Durable account storage shared by every component.
///
/// Implementations guarantee two atomic operations: `create` never admits a
/// second account for one email, and `save` only applies when the stored
/// version still matches the caller's copy. Callers that read-modify-write
/// retry on `StaleRecord`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Res<Option<Account>>;

    async fn find_by_id(&self, id: Uuid) -> Res<Option<Account>>;

    /// Lookup by recovery-token digest. Expiry is not checked here.
    async fn find_by_recovery_token(&self, token_hash: &str) -> Res<Option<Account>>;

    /// Fails with `DuplicateIdentity` if the email is taken.
    async fn create(&self, data: NewAccount) -> Res<Account>;

    /// Persists mutable fields and returns the stored copy with its new version.
    /// Fails with `StaleRecord` if the account changed since it was read.
    async fn save(&self, account: &Account) -> Res<Account>;

    async fn list_accounts(&self) -> Res<Vec<Account>>;

    /// `true` the first time it is called for a checkout session, `false` after.
    async fn claim_welcome(&self, session_id: &str) -> Res<bool>;

    /// Forgets welcome claims recorded before `sent_before`. Returns how many were removed.
    async fn prune_welcomes(&self, sent_before: DateTime<Utc>) -> Res<u64>;
}

pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        PgStore { pool }
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Res<Option<Account>> {
        account::get_account_by_email(&*self.pool, email).await
    }

    async fn find_by_id(&self, id: Uuid) -> Res<Option<Account>> {
        account::get_account_by_id(&*self.pool, id).await
    }

    async fn find_by_recovery_token(&self, token_hash: &str) -> Res<Option<Account>> {
        account::get_account_by_reset_token(&*self.pool, token_hash).await
    }

    async fn create(&self, data: NewAccount) -> Res<Account> {
        account::insert_account(&*self.pool, data).await
    }

    async fn save(&self, account: &Account) -> Res<Account> {
        account::update_account(&*self.pool, account).await
    }

    async fn list_accounts(&self) -> Res<Vec<Account>> {
        account::get_accounts(&*self.pool).await
    }

    async fn claim_welcome(&self, session_id: &str) -> Res<bool> {
        account::insert_welcome(&*self.pool, session_id, Utc::now()).await
    }

    async fn prune_welcomes(&self, sent_before: DateTime<Utc>) -> Res<u64> {
        account::delete_welcomes_before(&*self.pool, sent_before).await
    }
}
