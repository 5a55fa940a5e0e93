use std::sync::Arc;

use actix_web::{Responder, post, web};
use common::{
    env_config::Config,
    error::Res,
    http::{MessageResponse, Success},
};
use db::store::CredentialStore;
use mailer::Notifier;

use crate::dtos::auth::{PasswordResetRequest, ResetPasswordRequest};
use crate::services;

const RESET_REQUESTED: &str =
    "If an account exists for this email, a password reset link has been sent.";

/// Starts password recovery by mailing a one-hour reset link.
///
/// The response is the same whether or not the email belongs to an account.
///
/// # Input
/// - `req`: JSON payload with `email`
///
/// # Output
/// - Success: `{ "message": "..." }`
///
/// # Frontend Example
/// ```javascript
/// await fetch('/api/auth/request-password-reset', {
///   method: 'POST',
///   headers: { 'Content-Type': 'application/json' },
///   body: JSON.stringify({ email: 'user@example.com' })
/// });
/// ```
#[post("/request-password-reset")]
pub async fn post_request_password_reset(
    req: web::Json<PasswordResetRequest>,
    store: web::Data<dyn CredentialStore>,
    notifier: web::Data<dyn Notifier>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    services::recovery::request_reset(
        &**store,
        &notifier.into_inner(),
        req.email.trim(),
        &config.site_url,
    )
    .await?;
    Success::ok(MessageResponse::new(RESET_REQUESTED))
}

/// Sets a new password with the token from a reset link.
///
/// # Input
/// - `req`: JSON payload with `token` and the new `password`
///
/// # Output
/// - Success: `{ "message": "..." }`
/// - Error: 400 for an unknown, used or expired token, or a short password
///
/// # Frontend Example
/// ```javascript
/// const token = new URLSearchParams(window.location.search).get('token');
/// const response = await fetch('/api/auth/reset-password', {
///   method: 'POST',
///   headers: { 'Content-Type': 'application/json' },
///   body: JSON.stringify({ token, password: 'newsecurepassword' })
/// });
/// ```
#[post("/reset-password")]
pub async fn post_reset_password(
    req: web::Json<ResetPasswordRequest>,
    store: web::Data<dyn CredentialStore>,
    notifier: web::Data<dyn Notifier>,
) -> Res<impl Responder> {
    services::recovery::perform_reset(&**store, &notifier.into_inner(), &req.token, &req.password)
        .await?;
    Success::ok(MessageResponse::new("Password has been reset successfully."))
}

#[cfg(test)]
mod tests {
    use actix_web::{App, dev::ServiceResponse, http::StatusCode, test};
    use api_premium::test_support::{Recorder, settle};
    use db::memory::MemoryStore;
    use mailer::Notification;
    use serde_json::{Value, json};

    use super::*;
    use crate::{mount_auth, services::auth};

    async fn post(
        store: &Arc<MemoryStore>,
        notifier: &Arc<dyn Notifier>,
        uri: &str,
        body: Value,
    ) -> ServiceResponse {
        let store: Arc<dyn CredentialStore> = store.clone();
        let config = Arc::new(Config {
            site_url: "https://example.com".to_string(),
            ..Default::default()
        });
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config))
                .app_data(web::Data::from(store))
                .app_data(web::Data::from(notifier.clone()))
                .service(web::scope("/api").service(mount_auth())),
        )
        .await;
        let req = test::TestRequest::post().uri(uri).set_json(body).to_request();
        test::call_service(&app, req).await
    }

    #[actix_web::test]
    async fn test_request_response_does_not_reveal_accounts() {
        let store = Arc::new(MemoryStore::new());
        let (recorder, notifier) = Recorder::new();
        auth::signup(&*store, "a@x.com", "old-password").await.unwrap();

        let known = post(
            &store,
            &notifier,
            "/api/auth/request-password-reset",
            json!({ "email": "a@x.com" }),
        )
        .await;
        assert_eq!(known.status(), StatusCode::OK);
        let known: Value = test::read_body_json(known).await;

        let unknown = post(
            &store,
            &notifier,
            "/api/auth/request-password-reset",
            json!({ "email": "nobody@x.com" }),
        )
        .await;
        assert_eq!(unknown.status(), StatusCode::OK);
        let unknown: Value = test::read_body_json(unknown).await;
        assert_eq!(known, unknown);

        settle().await;
        assert_eq!(recorder.sent().len(), 1);
    }

    #[actix_web::test]
    async fn test_reset_with_emailed_link() {
        let store = Arc::new(MemoryStore::new());
        let (recorder, notifier) = Recorder::new();
        auth::signup(&*store, "a@x.com", "old-password").await.unwrap();

        post(
            &store,
            &notifier,
            "/api/auth/request-password-reset",
            json!({ "email": "a@x.com" }),
        )
        .await;
        settle().await;
        let token = match recorder.sent().last() {
            Some((_, Notification::PasswordReset { reset_link })) => {
                reset_link.split("token=").nth(1).unwrap().to_string()
            }
            other => panic!("expected a reset email, got {other:?}"),
        };

        let res = post(
            &store,
            &notifier,
            "/api/auth/reset-password",
            json!({ "token": token, "password": "new-password" }),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(auth::authenticate(&*store, "a@x.com", "new-password").await.is_ok());

        let res = post(
            &store,
            &notifier,
            "/api/auth/reset-password",
            json!({ "token": token, "password": "third-password" }),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_reset_with_unknown_token() {
        let store = Arc::new(MemoryStore::new());
        let (_, notifier) = Recorder::new();
        let res = post(
            &store,
            &notifier,
            "/api/auth/reset-password",
            json!({ "token": "not-a-token", "password": "new-password" }),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
