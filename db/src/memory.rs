use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use dashmap::{DashMap, mapref::entry::Entry};
use uuid::Uuid;

use crate::{dtos::account::NewAccount, models::account::Account, store::CredentialStore};

/// Process-local store for development without Postgres, and for tests.
/// Uniqueness and versioned saves hold under the same guarantees as `PgStore`.
#[derive(Default)]
pub struct MemoryStore {
    accounts: DashMap<Uuid, Account>,
    emails: DashMap<String, Uuid>,
    welcomed: DashMap<String, DateTime<Utc>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Res<Option<Account>> {
        let id = match self.emails.get(email) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.accounts.get(&id).map(|account| account.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Res<Option<Account>> {
        Ok(self.accounts.get(&id).map(|account| account.clone()))
    }

    async fn find_by_recovery_token(&self, token_hash: &str) -> Res<Option<Account>> {
        Ok(self
            .accounts
            .iter()
            .find(|account| account.reset_token_hash.as_deref() == Some(token_hash))
            .map(|account| account.clone()))
    }

    async fn create(&self, data: NewAccount) -> Res<Account> {
        match self.emails.entry(data.email.clone()) {
            Entry::Occupied(_) => Err(AppError::DuplicateIdentity),
            Entry::Vacant(slot) => {
                let account = Account {
                    id: Uuid::new_v4(),
                    email: data.email,
                    password_hash: data.password_hash,
                    is_premium: data.premium_since.is_some(),
                    subscription_date: data.premium_since,
                    subscription_end_date: None,
                    reset_token_hash: None,
                    reset_expires: None,
                    version: 0,
                    created_at: Utc::now(),
                };
                // the account must be readable before its email resolves to it
                self.accounts.insert(account.id, account.clone());
                slot.insert(account.id);
                Ok(account)
            }
        }
    }

    async fn save(&self, account: &Account) -> Res<Account> {
        let mut stored = self
            .accounts
            .get_mut(&account.id)
            .ok_or(AppError::StaleRecord)?;
        if stored.version != account.version {
            return Err(AppError::StaleRecord);
        }

        let updated = Account {
            email: stored.email.clone(),
            created_at: stored.created_at,
            version: stored.version + 1,
            ..account.clone()
        };
        *stored = updated.clone();
        Ok(updated)
    }

    async fn list_accounts(&self) -> Res<Vec<Account>> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .map(|account| account.clone())
            .collect();
        accounts.sort_by_key(|account| account.created_at);
        Ok(accounts)
    }

    async fn claim_welcome(&self, session_id: &str) -> Res<bool> {
        match self.welcomed.entry(session_id.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(Utc::now());
                Ok(true)
            }
        }
    }

    async fn prune_welcomes(&self, sent_before: DateTime<Utc>) -> Res<u64> {
        let mut removed = 0;
        self.welcomed.retain(|_, sent_at| {
            let keep = *sent_at >= sent_before;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}
