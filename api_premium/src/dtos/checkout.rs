use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Default)]
pub struct CheckoutRequest {
    pub email: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct CheckoutResponse {
    pub id: String,
}

#[derive(Deserialize, Debug)]
pub struct SessionStatusQuery {
    pub session_id: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub status: Option<String>,
    pub payment_status: String,
    pub customer_email: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct WebhookAck {
    pub received: bool,
}
