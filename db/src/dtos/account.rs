use chrono::{DateTime, Utc};

pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    /// Entitlement start for accounts created from a confirmed payment.
    pub premium_since: Option<DateTime<Utc>>,
}
