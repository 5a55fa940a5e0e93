use actix_web::{Responder, get, web};
use chrono::Utc;
use common::{error::Res, http::Success};
use db::{models::account::AccountView, store::CredentialStore};

/// Lists every account with its current premium status. Mounted behind the
/// api key middleware.
///
/// # Output
/// - Success: `[{ "email": "user@example.com", "isPremium": true }]`
/// - Error: 401 Unauthorized without a valid `X-API-Key`
#[get("")]
pub async fn get_accounts(store: web::Data<dyn CredentialStore>) -> Res<impl Responder> {
    let now = Utc::now();
    let accounts = store.list_accounts().await?;
    let views: Vec<AccountView> = accounts.iter().map(|account| account.view(now)).collect();
    Success::ok(views)
}
