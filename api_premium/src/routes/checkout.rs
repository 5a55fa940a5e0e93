use std::sync::Arc;

use actix_web::{HttpRequest, Responder, get, post, web};
use common::{
    env_config::Config,
    error::{AppError, Res},
    http::Success,
    stripe::PaymentProvider,
};
use db::store::CredentialStore;
use mailer::Notifier;

use crate::dtos::checkout::{
    CheckoutRequest, CheckoutResponse, SessionStatusQuery, SessionStatusResponse, WebhookAck,
};
use crate::services;

/// Creates a hosted checkout session for the premium package.
///
/// # Input
/// - `req`: optional JSON payload with the `email` to prefill on the payment page
/// - `payments`: configured payment provider
///
/// # Output
/// - Success: `{ "id": "cs_..." }`, the session to redirect the browser to
/// - Error: 400 for a malformed email, 503 when payments are not configured
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/stripe/create-checkout-session', {
///   method: 'POST',
///   headers: { 'Content-Type': 'application/json' },
///   body: JSON.stringify({ email: 'user@example.com' }) // optional
/// });
/// const { id } = await response.json();
/// await stripe.redirectToCheckout({ sessionId: id });
/// ```
#[post("/create-checkout-session")]
pub async fn post_create_checkout_session(
    req: Option<web::Json<CheckoutRequest>>,
    payments: web::Data<PaymentProvider>,
) -> Res<impl Responder> {
    let gateway = payments.gateway()?;
    let req = req.map(web::Json::into_inner).unwrap_or_default();
    let id = services::checkout::start_checkout(gateway, req.email.as_deref()).await?;
    Success::ok(CheckoutResponse { id })
}

/// Reports a checkout session once it is paid.
///
/// # Input
/// - `query`: `session_id` from the success page URL
///
/// # Output
/// - Success: `{ "status": "complete", "paymentStatus": "paid", "customerEmail": "..." }`
/// - Error: 400 while the session is unpaid, 404 for an unknown session,
///   503 when payments are not configured
///
/// # Frontend Example
/// ```javascript
/// const sessionId = new URLSearchParams(window.location.search).get('session_id');
/// const response = await fetch(`/api/stripe/session-status?session_id=${sessionId}`);
/// if (response.ok) {
///   const { customerEmail } = await response.json();
///   emailInput.value = customerEmail;
/// }
/// ```
#[get("/session-status")]
pub async fn get_session_status(
    query: web::Query<SessionStatusQuery>,
    payments: web::Data<PaymentProvider>,
) -> Res<impl Responder> {
    let gateway = payments.gateway()?;
    let session = services::checkout::get_status(gateway, &query.session_id).await?;
    Success::ok(SessionStatusResponse {
        status: session.status,
        payment_status: session.payment_status,
        customer_email: session.customer_email,
    })
}

/// Handles Stripe webhook events for checkout completion.
///
/// # Input
/// - `payload`: Raw string containing the webhook event data
/// - `req`: HTTP request containing Stripe signature in headers
///
/// # Output
/// - Success: `{ "received": true }`, also for event types that are ignored
/// - Error: 400 Bad Request for a missing or invalid signature
///
/// # Note
/// This endpoint is called by Stripe's servers, not by the frontend.
/// Register https://yourapp.com/api/stripe/webhook in the Stripe Dashboard
/// and set its signing secret as STRIPE_WEBHOOK_SECRET.
///
/// # Event Types Handled
/// - checkout.session.completed: grants premium to the paying email and sends the welcome email
/// - payment_intent.succeeded / payment_intent.payment_failed: logged
#[post("/webhook")]
pub async fn post_webhook(
    payload: String,
    req: HttpRequest,
    payments: web::Data<PaymentProvider>,
    store: web::Data<dyn CredentialStore>,
    notifier: web::Data<dyn Notifier>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let gateway = payments.gateway()?;
    let signature = req
        .headers()
        .get("stripe-signature")
        .and_then(|signature| signature.to_str().ok())
        .ok_or(AppError::InvalidSignature)?;

    services::checkout::handle_notification(
        gateway,
        &**store,
        &notifier.into_inner(),
        &config.premium_product.name,
        &payload,
        signature,
    )
    .await?;

    Success::ok(WebhookAck { received: true })
}

#[cfg(test)]
mod tests {
    use actix_web::{App, dev::ServiceResponse, http::StatusCode, test};
    use common::stripe::PaymentGateway;
    use db::memory::MemoryStore;
    use serde_json::{Value, json};

    use super::*;
    use crate::{
        mount_checkout,
        test_support::{FakeGateway, Recorder},
    };

    struct Fixture {
        gateway: Option<Arc<FakeGateway>>,
        store: Arc<MemoryStore>,
        notifier: Arc<dyn Notifier>,
    }

    impl Fixture {
        fn new() -> Self {
            let (_, notifier) = Recorder::new();
            Fixture {
                gateway: Some(Arc::new(FakeGateway::new())),
                store: Arc::new(MemoryStore::new()),
                notifier,
            }
        }

        async fn call(&self, req: test::TestRequest) -> ServiceResponse {
            let store: Arc<dyn CredentialStore> = self.store.clone();
            let payments = PaymentProvider::new(
                self.gateway
                    .clone()
                    .map(|gateway| gateway as Arc<dyn PaymentGateway>),
            );
            let app = test::init_service(
                App::new()
                    .app_data(web::Data::new(Arc::new(Config::default())))
                    .app_data(web::Data::new(payments))
                    .app_data(web::Data::from(store))
                    .app_data(web::Data::from(self.notifier.clone()))
                    .service(web::scope("/api").service(mount_checkout())),
            )
            .await;
            test::call_service(&app, req.to_request()).await
        }
    }

    fn webhook(payload: String, signature: Option<&str>) -> test::TestRequest {
        let mut req = test::TestRequest::post()
            .uri("/api/stripe/webhook")
            .set_payload(payload);
        if let Some(signature) = signature {
            req = req.insert_header(("stripe-signature", signature));
        }
        req
    }

    #[actix_web::test]
    async fn test_checkout_then_status() {
        let fixture = Fixture::new();
        let res = fixture
            .call(
                test::TestRequest::post()
                    .uri("/api/stripe/create-checkout-session")
                    .set_json(json!({ "email": "a@x.com" })),
            )
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = test::read_body_json(res).await;
        let id = body["id"].as_str().unwrap().to_string();

        let status_uri = format!("/api/stripe/session-status?session_id={}", id);
        let res = fixture.call(test::TestRequest::get().uri(&status_uri)).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        fixture.gateway.as_ref().unwrap().pay(&id, "a@x.com");
        let res = fixture.call(test::TestRequest::get().uri(&status_uri)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["paymentStatus"], "paid");
        assert_eq!(body["customerEmail"], "a@x.com");
    }

    #[actix_web::test]
    async fn test_checkout_without_body() {
        let fixture = Fixture::new();
        let res = fixture
            .call(test::TestRequest::post().uri("/api/stripe/create-checkout-session"))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_unconfigured_provider_unavailable() {
        let fixture = Fixture {
            gateway: None,
            ..Fixture::new()
        };
        let res = fixture
            .call(test::TestRequest::post().uri("/api/stripe/create-checkout-session"))
            .await;
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn test_webhook_signature_required() {
        let fixture = Fixture::new();
        let payload = FakeGateway::completed_payload("cs_1", "a@x.com", true);

        let res = fixture.call(webhook(payload.clone(), None)).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let res = fixture.call(webhook(payload, Some("forged"))).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_webhook_upgrades_account() {
        let fixture = Fixture::new();
        fixture
            .store
            .create(db::dtos::account::NewAccount {
                email: "a@x.com".to_string(),
                password_hash: "hash".to_string(),
                premium_since: None,
            })
            .await
            .unwrap();
        let payload = FakeGateway::completed_payload("cs_1", "a@x.com", true);

        let res = fixture
            .call(webhook(payload, Some(FakeGateway::SIGNATURE)))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["received"], true);
        assert!(
            fixture
                .store
                .find_by_email("a@x.com")
                .await
                .unwrap()
                .unwrap()
                .is_premium
        );
    }
}
