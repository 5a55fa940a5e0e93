use actix_web::web;
use middleware::{api_key::ValidateApiKeyMiddleware, auth::AuthMiddleware};

pub mod middleware {
    pub mod api_key;
    pub mod auth;
}

pub mod routes {
    pub mod admin;
    pub mod auth;
    pub mod recovery;
    pub mod registration;
}

pub mod services {
    pub mod auth;
    pub mod recovery;
}

mod dtos {
    pub(crate) mod auth;
}

pub fn mount_auth() -> actix_web::Scope {
    web::scope("/auth")
        .service(routes::auth::post_signup)
        .service(routes::auth::post_login)
        .service(routes::auth::get_verify_premium)
        .service(routes::registration::post_complete_registration)
        .service(routes::recovery::post_request_password_reset)
        .service(routes::recovery::post_reset_password)
}

pub fn mount_accounts() -> actix_web::Scope {
    web::scope("/accounts").service(routes::admin::get_accounts)
}

// Auth middleware
pub fn auth_middleware() -> AuthMiddleware {
    AuthMiddleware::new()
}

// Admin api key middleware
pub fn api_key_middleware(keys: Vec<String>) -> ValidateApiKeyMiddleware {
    ValidateApiKeyMiddleware::new(keys)
}
