use std::sync::Arc;

use common::{
    error::{AppError, Res},
    stripe::{CheckoutSessionInfo, PaymentEvent, PaymentGateway},
    validate,
};
use db::store::CredentialStore;
use mailer::Notifier;

use crate::services::entitlement::{self, PaymentConfirmation};

/// Starts a hosted checkout, prefilling the customer's email when given.
pub async fn start_checkout(gateway: &dyn PaymentGateway, email: Option<&str>) -> Res<String> {
    let email = email.map(str::trim).filter(|email| !email.is_empty());
    if let Some(email) = email {
        validate::email(email)?;
    }
    let session_id = gateway.create_checkout_session(email).await?;
    log::info!("Created checkout session {}", session_id);
    Ok(session_id)
}

/// Session details, only once the session is paid.
pub async fn get_status(
    gateway: &dyn PaymentGateway,
    session_id: &str,
) -> Res<CheckoutSessionInfo> {
    let session = gateway.retrieve_checkout_session(session_id).await?;
    if !session.paid {
        return Err(AppError::PaymentNotConfirmed);
    }
    Ok(session)
}

/// Reads a paid session back from the provider as a payment confirmation.
/// Unpaid sessions fail with `PaymentNotConfirmed` whether or not an email was collected.
pub async fn confirm_payment(
    gateway: &dyn PaymentGateway,
    session_id: &str,
) -> Res<PaymentConfirmation> {
    let session = gateway.retrieve_checkout_session(session_id).await?;
    if !session.paid {
        return Err(AppError::PaymentNotConfirmed);
    }
    let email = session.customer_email.ok_or_else(|| {
        log::error!("Checkout session {} has no customer email", session.id);
        AppError::BadRequest("Checkout session has no customer email".to_string())
    })?;
    Ok(PaymentConfirmation {
        session_id: session.id,
        email,
        paid: session.paid,
    })
}

/// Verifies and applies a provider notification.
/// Unknown event types are acknowledged without doing anything.
pub async fn handle_notification(
    gateway: &dyn PaymentGateway,
    store: &dyn CredentialStore,
    notifier: &Arc<dyn Notifier>,
    plan: &str,
    payload: &str,
    signature: &str,
) -> Res<()> {
    let event = gateway.parse_notification(payload, signature)?;

    match event {
        PaymentEvent::CheckoutCompleted {
            event_id,
            session_id,
            customer_email: Some(email),
            paid,
        } => {
            log::info!("Checkout session completed: {} (event {})", session_id, event_id);
            let payment = PaymentConfirmation {
                session_id,
                email,
                paid,
            };
            match entitlement::reconcile_payment(store, notifier, &payment, None, plan).await {
                Ok(_) => {}
                Err(AppError::PaymentNotConfirmed) => log::warn!(
                    "Checkout session {} completed without a confirmed payment",
                    payment.session_id
                ),
                Err(e) => return Err(e),
            }
        }
        PaymentEvent::CheckoutCompleted {
            event_id,
            session_id,
            customer_email: None,
            ..
        } => {
            log::warn!(
                "Checkout session {} completed without a customer email (event {})",
                session_id,
                event_id
            );
        }
        PaymentEvent::PaymentSucceeded { payment_intent_id } => {
            log::info!("PaymentIntent was successful: {}", payment_intent_id);
        }
        PaymentEvent::PaymentFailed { payment_intent_id } => {
            log::warn!("PaymentIntent failed: {}", payment_intent_id);
        }
        PaymentEvent::Other { event_type } => {
            log::info!("Unhandled event type: {}", event_type);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use db::memory::MemoryStore;

    use super::*;
    use crate::test_support::{FakeGateway, Recorder, settle};

    #[tokio::test]
    async fn test_status_before_payment_is_not_confirmed() {
        let gateway = FakeGateway::new();
        let session_id = start_checkout(&gateway, None).await.unwrap();

        assert!(matches!(
            get_status(&gateway, &session_id).await,
            Err(AppError::PaymentNotConfirmed)
        ));

        gateway.pay(&session_id, "a@x.com");
        let status = get_status(&gateway, &session_id).await.unwrap();
        assert_eq!(status.customer_email.as_deref(), Some("a@x.com"));
    }

    #[tokio::test]
    async fn test_confirm_unpaid_session_without_email() {
        let gateway = FakeGateway::new();
        let session_id = start_checkout(&gateway, None).await.unwrap();

        assert!(matches!(
            confirm_payment(&gateway, &session_id).await,
            Err(AppError::PaymentNotConfirmed)
        ));

        gateway.pay(&session_id, "a@x.com");
        let payment = confirm_payment(&gateway, &session_id).await.unwrap();
        assert_eq!(payment.email, "a@x.com");
        assert!(payment.paid);
    }

    #[tokio::test]
    async fn test_unknown_session_not_found() {
        let gateway = FakeGateway::new();
        assert!(matches!(
            get_status(&gateway, "cs_missing").await,
            Err(AppError::SessionNotFound)
        ));
    }

    #[tokio::test]
    async fn test_checkout_prefills_email() {
        let gateway = FakeGateway::new();
        let session_id = start_checkout(&gateway, Some(" a@x.com ")).await.unwrap();
        let session = gateway.retrieve_checkout_session(&session_id).await.unwrap();
        assert_eq!(session.customer_email.as_deref(), Some("a@x.com"));

        assert!(matches!(
            start_checkout(&gateway, Some("nonsense")).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_bad_signature_writes_nothing() {
        let gateway = FakeGateway::new();
        let store = MemoryStore::new();
        let (recorder, notifier) = Recorder::new();
        let payload = FakeGateway::completed_payload("cs_1", "a@x.com", true);

        assert!(matches!(
            handle_notification(&gateway, &store, &notifier, "Premium", &payload, "forged").await,
            Err(AppError::InvalidSignature)
        ));
        settle().await;
        assert!(recorder.sent().is_empty());
        assert!(store.list_accounts().await.unwrap().is_empty());
        // nothing claimed the session either
        assert!(store.claim_welcome("cs_1").await.unwrap());
    }

    #[tokio::test]
    async fn test_completed_event_upgrades_existing_account() {
        let gateway = FakeGateway::new();
        let store = MemoryStore::new();
        let (recorder, notifier) = Recorder::new();
        store
            .create(db::dtos::account::NewAccount {
                email: "a@x.com".to_string(),
                password_hash: "hash".to_string(),
                premium_since: None,
            })
            .await
            .unwrap();
        let payload = FakeGateway::completed_payload("cs_1", "a@x.com", true);

        for _ in 0..2 {
            handle_notification(
                &gateway,
                &store,
                &notifier,
                "Premium",
                &payload,
                FakeGateway::SIGNATURE,
            )
            .await
            .unwrap();
        }

        let account = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert!(account.is_premium);
        assert_eq!(store.list_accounts().await.unwrap().len(), 1);
        settle().await;
        assert_eq!(recorder.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_unpaid_completion_is_acknowledged() {
        let gateway = FakeGateway::new();
        let store = MemoryStore::new();
        let (_, notifier) = Recorder::new();
        let payload = FakeGateway::completed_payload("cs_1", "a@x.com", false);

        handle_notification(
            &gateway,
            &store,
            &notifier,
            "Premium",
            &payload,
            FakeGateway::SIGNATURE,
        )
        .await
        .unwrap();
        assert!(store.list_accounts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unrecognized_event_is_acknowledged() {
        let gateway = FakeGateway::new();
        let store = MemoryStore::new();
        let (recorder, notifier) = Recorder::new();
        let payload = r#"{"type":"customer.created"}"#;

        handle_notification(&gateway, &store, &notifier, "Premium", payload, FakeGateway::SIGNATURE)
            .await
            .unwrap();
        settle().await;
        assert!(recorder.sent().is_empty());
    }
}
