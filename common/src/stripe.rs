use std::sync::Arc;

use async_trait::async_trait;
use stripe::{
    CheckoutSession, CheckoutSessionId, CheckoutSessionMode, CheckoutSessionPaymentStatus, Client,
    CreateCheckoutSession, CreateCheckoutSessionLineItems, CreateCheckoutSessionLineItemsPriceData,
    CreateCheckoutSessionLineItemsPriceDataProductData, CreateCheckoutSessionPaymentMethodTypes,
    Currency, EventObject, EventType, StripeError, Webhook,
};

use crate::{
    env_config::{Config, PremiumProduct},
    error::{AppError, Res},
};

/// Provider-side view of a checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSessionInfo {
    pub id: String,
    pub status: Option<String>,
    pub payment_status: String,
    pub paid: bool,
    pub customer_email: Option<String>,
}

/// Verified webhook notification, reduced to what the backend acts on.
#[derive(Debug, Clone)]
pub enum PaymentEvent {
    CheckoutCompleted {
        event_id: String,
        session_id: String,
        customer_email: Option<String>,
        paid: bool,
    },
    PaymentSucceeded {
        payment_intent_id: String,
    },
    PaymentFailed {
        payment_intent_id: String,
    },
    Other {
        event_type: String,
    },
}

/// Hosted checkout collaborator.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a single-item checkout for the premium product and returns its session id.
    async fn create_checkout_session(&self, customer_email: Option<&str>) -> Res<String>;

    /// Fails with `SessionNotFound` for ids the provider does not know.
    async fn retrieve_checkout_session(&self, session_id: &str) -> Res<CheckoutSessionInfo>;

    /// Verifies the signature before anything in the payload is trusted.
    fn parse_notification(&self, payload: &str, signature: &str) -> Res<PaymentEvent>;
}

/// The gateway as registered in app data. `None` when the provider is not configured.
#[derive(Clone)]
pub struct PaymentProvider(Option<Arc<dyn PaymentGateway>>);

impl PaymentProvider {
    pub fn new(gateway: Option<Arc<dyn PaymentGateway>>) -> Self {
        PaymentProvider(gateway)
    }

    pub fn from_config(config: &Config) -> Self {
        let gateway = StripeGateway::from_config(config)
            .map(|gateway| Arc::new(gateway) as Arc<dyn PaymentGateway>);
        if gateway.is_none() {
            log::warn!("STRIPE_SECRET_KEY is not set, checkout is disabled");
        } else if config.stripe_webhook_secret.is_empty() {
            log::warn!("STRIPE_WEBHOOK_SECRET is not set, every webhook will be rejected");
        }
        PaymentProvider(gateway)
    }

    pub fn gateway(&self) -> Res<&dyn PaymentGateway> {
        self.0
            .as_deref()
            .ok_or(AppError::PaymentProviderUnavailable)
    }
}

pub fn create_client(secret_key: &str) -> Client {
    Client::new(secret_key)
}

pub struct StripeGateway {
    client: Client,
    webhook_secret: String,
    product: PremiumProduct,
    success_url: String,
    cancel_url: String,
}

impl StripeGateway {
    pub fn from_config(config: &Config) -> Option<Self> {
        if config.stripe_secret_key.is_empty() {
            return None;
        }
        Some(StripeGateway {
            client: create_client(&config.stripe_secret_key),
            webhook_secret: config.stripe_webhook_secret.clone(),
            product: config.premium_product.clone(),
            success_url: format!(
                "{}/complete-registration.html?session_id={{CHECKOUT_SESSION_ID}}",
                config.site_url
            ),
            cancel_url: format!("{}/cancel.html", config.site_url),
        })
    }
}

fn session_info(session: CheckoutSession) -> CheckoutSessionInfo {
    let customer_email = session
        .customer_details
        .and_then(|details| details.email)
        .or(session.customer_email);

    CheckoutSessionInfo {
        id: session.id.to_string(),
        status: session.status.map(|status| status.to_string()),
        payment_status: session.payment_status.to_string(),
        paid: session.payment_status == CheckoutSessionPaymentStatus::Paid,
        customer_email,
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(&self, customer_email: Option<&str>) -> Res<String> {
        let params = CreateCheckoutSession {
            payment_method_types: Some(vec![CreateCheckoutSessionPaymentMethodTypes::Card]),
            line_items: Some(vec![CreateCheckoutSessionLineItems {
                price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                    currency: Currency::USD,
                    product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                        name: self.product.name.clone(),
                        description: Some(self.product.description.clone()),
                        ..Default::default()
                    }),
                    unit_amount: Some(self.product.unit_amount),
                    ..Default::default()
                }),
                quantity: Some(1),
                ..Default::default()
            }]),
            mode: Some(CheckoutSessionMode::Payment),
            success_url: Some(self.success_url.as_str()),
            cancel_url: Some(self.cancel_url.as_str()),
            customer_email,
            ..Default::default()
        };

        let session = CheckoutSession::create(&self.client, params).await?;
        Ok(session.id.to_string())
    }

    async fn retrieve_checkout_session(&self, session_id: &str) -> Res<CheckoutSessionInfo> {
        let id = session_id
            .parse::<CheckoutSessionId>()
            .map_err(|_| AppError::SessionNotFound)?;

        match CheckoutSession::retrieve(&self.client, &id, &[]).await {
            Ok(session) => Ok(session_info(session)),
            Err(StripeError::Stripe(e)) if e.http_status == 400 || e.http_status == 404 => {
                log::warn!("Stripe rejected checkout session {}: {:?}", session_id, e.message);
                Err(AppError::SessionNotFound)
            }
            Err(e) => Err(AppError::from(e)),
        }
    }

    fn parse_notification(&self, payload: &str, signature: &str) -> Res<PaymentEvent> {
        let event = Webhook::construct_event(payload, signature, &self.webhook_secret)
            .map_err(|e| {
                log::error!("Error constructing webhook event: {}", e);
                AppError::InvalidSignature
            })?;

        let event_id = event.id.to_string();
        let parsed = match (event.type_, event.data.object) {
            (EventType::CheckoutSessionCompleted, EventObject::CheckoutSession(session)) => {
                let info = session_info(session);
                PaymentEvent::CheckoutCompleted {
                    event_id,
                    session_id: info.id,
                    customer_email: info.customer_email,
                    paid: info.paid,
                }
            }
            (EventType::PaymentIntentSucceeded, EventObject::PaymentIntent(intent)) => {
                PaymentEvent::PaymentSucceeded {
                    payment_intent_id: intent.id.to_string(),
                }
            }
            (EventType::PaymentIntentPaymentFailed, EventObject::PaymentIntent(intent)) => {
                PaymentEvent::PaymentFailed {
                    payment_intent_id: intent.id.to_string(),
                }
            }
            (event_type, _) => PaymentEvent::Other {
                event_type: event_type.to_string(),
            },
        };
        Ok(parsed)
    }
}
