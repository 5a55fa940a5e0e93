use actix_web::HttpResponse;
use thiserror::Error;

pub type Res<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    // === CONVERSION ERRORS ===
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("JWT error: {0}")]
    JWT(#[from] jsonwebtoken::errors::Error),

    #[error("Stripe error: {0}")]
    Stripe(#[from] stripe::StripeError),

    #[error("Hashing error: {0}")]
    Hashing(String),

    // === DOMAIN ERRORS ===
    #[error("An account with this email already exists")]
    DuplicateIdentity,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Password reset token is invalid or has expired.")]
    InvalidOrExpiredToken,

    #[error("Payment for this session was not successful.")]
    PaymentNotConfirmed,

    #[error("Invalid session ID.")]
    SessionNotFound,

    #[error("Payment system not configured. Please contact support.")]
    PaymentProviderUnavailable,

    #[error("Webhook signature verification failed")]
    InvalidSignature,

    #[error("Database not available. Please try again later.")]
    StoreUnavailable(String),

    #[error("The record was modified concurrently, please retry")]
    StaleRecord,

    // === APPLICATION ERRORS ===
    #[error("Authorization error: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::StoreUnavailable(error.to_string())
            }
            other => AppError::Database(other),
        }
    }
}

impl AppError {
    pub fn to_http_response(&self) -> HttpResponse {
        let internal_json = serde_json::json!({ "error": "Internal server error" });
        let message_json = serde_json::json!({ "error": self.to_string() });

        match self {
            // === CONVERSION ERRORS ===
            AppError::Database(error) => {
                log::error!("Database error: {}", error);
                HttpResponse::InternalServerError().json(internal_json)
            }
            AppError::JWT(error) => {
                log::error!("JWT error: {}", error);
                HttpResponse::InternalServerError().json(internal_json)
            }
            AppError::Stripe(error) => {
                log::error!("Stripe error: {}", error);
                HttpResponse::InternalServerError().json(internal_json)
            }
            AppError::Hashing(error) => {
                log::error!("Hashing error: {}", error);
                HttpResponse::InternalServerError().json(internal_json)
            }

            // === DOMAIN ERRORS ===
            AppError::DuplicateIdentity | AppError::StaleRecord => {
                HttpResponse::Conflict().json(message_json)
            }
            AppError::InvalidCredentials | AppError::InvalidToken => {
                HttpResponse::Unauthorized().json(message_json)
            }
            AppError::InvalidOrExpiredToken
            | AppError::PaymentNotConfirmed
            | AppError::InvalidSignature => HttpResponse::BadRequest().json(message_json),
            AppError::SessionNotFound => HttpResponse::NotFound().json(message_json),
            AppError::PaymentProviderUnavailable => {
                HttpResponse::ServiceUnavailable().json(message_json)
            }
            AppError::StoreUnavailable(error) => {
                log::error!("Store unavailable: {}", error);
                HttpResponse::ServiceUnavailable().json(message_json)
            }

            // === APPLICATION ERRORS ===
            AppError::Unauthorized(_) => HttpResponse::Unauthorized().json(message_json),
            AppError::Forbidden(_) => HttpResponse::Forbidden().json(message_json),
            AppError::NotFound(_) => HttpResponse::NotFound().json(message_json),
            AppError::BadRequest(_) => HttpResponse::BadRequest().json(message_json),

            AppError::Internal(error) => {
                log::error!("Internal error: {}", error);
                HttpResponse::InternalServerError().json(internal_json)
            }
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        self.to_http_response()
    }
}
