use std::sync::Arc;

use actix_web::{Responder, post, web};
use api_premium::services::{
    checkout,
    entitlement::{self, Reconciliation},
};
use common::{
    env_config::Config,
    error::{AppError, Res},
    http::{MessageResponse, Success},
    stripe::PaymentProvider,
    validate,
};
use db::store::CredentialStore;
use mailer::Notifier;

use crate::dtos::auth::CompleteRegistrationRequest;

/// Finishes a purchase from the checkout success page.
///
/// The paying email comes from the checkout session, never from the client.
/// Without an account for it, one is created with the chosen password; an
/// existing account keeps its password and is upgraded. No session token is
/// returned, the user logs in afterwards.
///
/// # Input
/// - `req`: JSON payload with `sessionId` and `password`
///
/// # Output
/// - Success: `{ "message": "..." }`
/// - Error: 400 while the session is unpaid or the password is too short,
///   404 for an unknown session, 503 when payments are not configured
///
/// # Frontend Example
/// ```javascript
/// const sessionId = new URLSearchParams(window.location.search).get('session_id');
/// const response = await fetch('/api/auth/complete-premium-registration', {
///   method: 'POST',
///   headers: { 'Content-Type': 'application/json' },
///   body: JSON.stringify({ sessionId, password: 'securepassword' })
/// });
/// if (response.ok) {
///   window.location.href = '/login.html';
/// }
/// ```
#[post("/complete-premium-registration")]
pub async fn post_complete_registration(
    req: web::Json<CompleteRegistrationRequest>,
    payments: web::Data<PaymentProvider>,
    store: web::Data<dyn CredentialStore>,
    notifier: web::Data<dyn Notifier>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    validate::required(&req.session_id, "sessionId")?;
    validate::password(&req.password)?;

    let gateway = payments.gateway()?;
    let payment = checkout::confirm_payment(gateway, &req.session_id).await?;
    let reconciliation = entitlement::reconcile_payment(
        &**store,
        &notifier.into_inner(),
        &payment,
        Some(req.password.as_str()),
        &config.premium_product.name,
    )
    .await?;

    let message = match reconciliation {
        Reconciliation::Created(_) => "Premium account created successfully.",
        Reconciliation::Upgraded(_) | Reconciliation::AlreadyEntitled(_) => {
            "Your account has been upgraded to premium."
        }
        Reconciliation::Unmaterialized { email } => {
            return Err(AppError::Internal(format!(
                "No account materialized for {} despite a chosen password",
                email
            )));
        }
    };
    Success::ok(MessageResponse::new(message))
}
