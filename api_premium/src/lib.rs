use actix_web::web::{self};

pub mod routes {
    pub mod checkout;
    pub mod download;
}

pub mod services {
    pub mod checkout;
    pub mod entitlement;
}

mod dtos {
    pub(crate) mod checkout;
}

/// Payment and notification doubles shared with other crates' tests.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub fn mount_checkout() -> actix_web::Scope {
    web::scope("/stripe")
        .service(routes::checkout::post_create_checkout_session)
        .service(routes::checkout::get_session_status)
        .service(routes::checkout::post_webhook)
}
pub fn mount_download() -> actix_web::Scope {
    web::scope("/download").service(routes::download::get_download)
}
