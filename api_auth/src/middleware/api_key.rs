use std::{future::Future, pin::Pin, rc::Rc, sync::Arc};

use actix_web::{
    Error,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use common::error::AppError;
use futures::future::{Ready, ok};

/// Guards admin routes with the `X-API-Key` header.
pub struct ValidateApiKeyMiddleware {
    admin_api_keys: Rc<Vec<String>>,
}

impl ValidateApiKeyMiddleware {
    pub fn new(keys: Vec<String>) -> Self {
        ValidateApiKeyMiddleware {
            admin_api_keys: Rc::new(keys),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ValidateApiKeyMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = ValidateApiKeyMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ValidateApiKeyMiddlewareService {
            service: Arc::new(service),
            admin_api_keys: self.admin_api_keys.clone(),
        })
    }
}

pub struct ValidateApiKeyMiddlewareService<S> {
    service: Arc<S>,
    admin_api_keys: Rc<Vec<String>>,
}

impl<S, B> Service<ServiceRequest> for ValidateApiKeyMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let header_key = req.headers().get("X-API-Key").and_then(|v| v.to_str().ok());
        let path = req.path().to_owned();

        if let Some(key) = header_key {
            if self.admin_api_keys.iter().any(|valid| valid == key) {
                let fut = self.service.call(req);
                return Box::pin(async move { fut.await.map(|res| res.map_into_boxed_body()) });
            }
        }

        let error_message = if header_key.is_some() {
            "Invalid api key"
        } else {
            "No api key provided"
        };
        log::warn!("{} for path {}", error_message, path);

        let response = AppError::Unauthorized(error_message.to_string())
            .to_http_response()
            .map_into_boxed_body();
        Box::pin(async move { Ok(req.into_response(response)) })
    }
}
