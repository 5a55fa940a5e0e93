use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use common::{
    error::{AppError, Res},
    stripe::{CheckoutSessionInfo, PaymentEvent, PaymentGateway},
};
use mailer::{Notification, Notifier, SendOutcome};

/// Lets detached notification tasks run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[derive(Default)]
pub struct Recorder {
    sent: Mutex<Vec<(String, Notification)>>,
}

impl Recorder {
    pub fn new() -> (Arc<Recorder>, Arc<dyn Notifier>) {
        let recorder = Arc::new(Recorder::default());
        let notifier: Arc<dyn Notifier> = recorder.clone();
        (recorder, notifier)
    }

    pub fn sent(&self) -> Vec<(String, Notification)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for Recorder {
    async fn send(&self, to: &str, notification: &Notification) -> SendOutcome {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), notification.clone()));
        SendOutcome::sent()
    }
}

/// In-memory payment provider. Notifications are JSON objects with a `type`
/// field and are only accepted with [`FakeGateway::SIGNATURE`].
#[derive(Default)]
pub struct FakeGateway {
    sessions: Mutex<HashMap<String, CheckoutSessionInfo>>,
    created: AtomicUsize,
}

impl FakeGateway {
    pub const SIGNATURE: &'static str = "t=1,v1=valid";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn pay(&self, session_id: &str, email: &str) {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| CheckoutSessionInfo {
                id: session_id.to_string(),
                status: None,
                payment_status: "unpaid".to_string(),
                paid: false,
                customer_email: None,
            });
        session.status = Some("complete".to_string());
        session.payment_status = "paid".to_string();
        session.paid = true;
        session.customer_email = Some(email.to_string());
    }

    pub fn completed_payload(session_id: &str, email: &str, paid: bool) -> String {
        serde_json::json!({
            "type": "checkout.session.completed",
            "session_id": session_id,
            "email": email,
            "paid": paid,
        })
        .to_string()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_checkout_session(&self, customer_email: Option<&str>) -> Res<String> {
        let id = format!("cs_test_{}", self.created.fetch_add(1, Ordering::SeqCst));
        self.sessions.lock().unwrap().insert(
            id.clone(),
            CheckoutSessionInfo {
                id: id.clone(),
                status: Some("open".to_string()),
                payment_status: "unpaid".to_string(),
                paid: false,
                customer_email: customer_email.map(str::to_string),
            },
        );
        Ok(id)
    }

    async fn retrieve_checkout_session(&self, session_id: &str) -> Res<CheckoutSessionInfo> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or(AppError::SessionNotFound)
    }

    fn parse_notification(&self, payload: &str, signature: &str) -> Res<PaymentEvent> {
        if signature != Self::SIGNATURE {
            return Err(AppError::InvalidSignature);
        }
        let event: serde_json::Value =
            serde_json::from_str(payload).map_err(|_| AppError::InvalidSignature)?;
        let event_type = event["type"].as_str().unwrap_or_default().to_string();
        Ok(match event_type.as_str() {
            "checkout.session.completed" => PaymentEvent::CheckoutCompleted {
                event_id: "evt_test".to_string(),
                session_id: event["session_id"].as_str().unwrap_or_default().to_string(),
                customer_email: event["email"].as_str().map(str::to_string),
                paid: event["paid"].as_bool().unwrap_or(false),
            },
            _ => PaymentEvent::Other { event_type },
        })
    }
}
