use std::sync::Arc;

use actix_web::{Responder, get, post, web};
use common::{env_config::Config, error::Res, http::Success, jwt::SessionClaims};
use db::store::CredentialStore;

use crate::dtos::auth::{AuthResponse, CredentialsRequest, PremiumStatusResponse};
use crate::services;

/// Registers a new (non-premium) account with email and password.
///
/// # Input
/// - `req`: JSON payload with `email` and `password` (at least 8 characters)
///
/// # Output
/// - Success: 201 Created with `{ "token": "...", "isPremium": false }`
/// - Error: 400 for a malformed email or short password, 409 if the email is taken
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/auth/signup', {
///   method: 'POST',
///   headers: { 'Content-Type': 'application/json' },
///   body: JSON.stringify({ email: 'user@example.com', password: 'securepassword' })
/// });
/// if (response.status === 201) {
///   const { token } = await response.json();
///   localStorage.setItem('authToken', token);
/// }
/// ```
#[post("/signup")]
pub async fn post_signup(
    req: web::Json<CredentialsRequest>,
    store: web::Data<dyn CredentialStore>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let account = services::auth::signup(&**store, &req.email, &req.password).await?;
    let token = services::auth::issue_session(&account, &config.jwt_config)?;
    Success::created(AuthResponse {
        token,
        is_premium: false,
    })
}

/// Authenticates a user with email and password.
///
/// # Input
/// - `req`: JSON payload containing email and password
///
/// # Output
/// - Success: `{ "token": "...", "isPremium": true }`. `isPremium` is the
///   entitlement at login time and is embedded in the token as well
/// - Error: 401 Unauthorized for invalid credentials
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/auth/login', {
///   method: 'POST',
///   headers: { 'Content-Type': 'application/json' },
///   body: JSON.stringify({ email: 'user@example.com', password: 'securepassword' })
/// });
/// if (response.ok) {
///   const { token, isPremium } = await response.json();
///   localStorage.setItem('authToken', token);
/// }
/// ```
#[post("/login")]
pub async fn post_login(
    req: web::Json<CredentialsRequest>,
    store: web::Data<dyn CredentialStore>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let account = services::auth::authenticate(&**store, &req.email, &req.password).await?;
    let token = services::auth::issue_session(&account, &config.jwt_config)?;
    log::info!("Account {} logged in", account.id);
    Success::ok(AuthResponse {
        token,
        is_premium: account.has_active_entitlement(chrono::Utc::now()),
    })
}

/// Reports whether the caller is premium right now.
///
/// The answer comes from the stored account, so an upgrade or an expiry
/// after login is visible without a new token.
///
/// # Output
/// - Success: `{ "isPremium": true }`
/// - Error: 401 for a missing or invalid token, 404 if the account is gone
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/auth/verify-premium', {
///   headers: { 'Authorization': `Bearer ${localStorage.getItem('authToken')}` }
/// });
/// const { isPremium } = await response.json();
/// ```
#[get("/verify-premium", wrap = "crate::auth_middleware()")]
pub async fn get_verify_premium(
    claims: web::ReqData<SessionClaims>,
    store: web::Data<dyn CredentialStore>,
) -> Res<impl Responder> {
    let is_premium = services::auth::premium_status(&**store, claims.user_id).await?;
    Success::ok(PremiumStatusResponse { is_premium })
}
