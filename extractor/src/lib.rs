use middleware::extractor::ExtractionMiddleware;

pub mod middleware {
    pub mod extractor;
}

/// Parses `Authorization: Bearer` into `Res<SessionClaims>` request extensions.
/// Requests without the header are passed through untouched.
pub fn middleware() -> ExtractionMiddleware {
    ExtractionMiddleware::new()
}
