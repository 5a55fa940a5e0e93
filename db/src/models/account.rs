use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Stored account. Never serialized outward; use [`AccountView`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub is_premium: bool,
    pub subscription_date: Option<DateTime<Utc>>,
    pub subscription_end_date: Option<DateTime<Utc>>,
    /// SHA-256 digest of the outstanding recovery token.
    pub reset_token_hash: Option<String>,
    pub reset_expires: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Premium and inside the entitlement window. An absent end date is unbounded.
    pub fn has_active_entitlement(&self, now: DateTime<Utc>) -> bool {
        self.is_premium
            && self.subscription_date.is_some()
            && self.subscription_end_date.is_none_or(|end| end > now)
    }

    pub fn clear_recovery(&mut self) {
        self.reset_token_hash = None;
        self.reset_expires = None;
    }

    /// Outward view; `is_premium` reports the entitlement as of `now`, not the raw flag.
    pub fn view(&self, now: DateTime<Utc>) -> AccountView {
        AccountView {
            email: self.email.clone(),
            is_premium: self.has_active_entitlement(now),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub email: String,
    pub is_premium: bool,
}
