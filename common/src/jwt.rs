use actix_web::{HttpMessage, HttpRequest, HttpResponse, dev::ServiceRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    env_config::JwtConfig,
    error::{AppError, Res},
};

/// Session token payload. `is_premium` is a snapshot taken at issuance and is
/// never refreshed; consumers that gate paid content must re-read the account.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    pub user_id: Uuid,
    pub email: String,
    pub is_premium: bool,
    pub iat: usize,
    pub exp: usize,
}

pub struct ClaimsSpec {
    pub user_id: Uuid,
    pub email: String,
    pub is_premium: bool,
}

/// Generates JWT token based on account snapshot and JWT configuration options
pub fn generate_jwt(spec: ClaimsSpec, config: &JwtConfig) -> Res<String> {
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(Duration::hours(config.expiration_hours))
        .ok_or_else(|| AppError::Internal("JWT expiration overflow".to_string()))?
        .timestamp()
        .max(0);

    let claims = SessionClaims {
        user_id: spec.user_id,
        email: spec.email,
        is_premium: spec.is_premium,
        iat: now.timestamp() as usize,
        exp: expiration as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(AppError::from)
}

/// Extracts claims object from JWT token.
/// Requires JWT secret. Bad signatures, malformed payloads and expired
/// tokens all surface as `InvalidToken`.
pub fn validate_jwt(token: &str, secret: &str) -> Res<SessionClaims> {
    let mut validation = Validation::default();
    validation.leeway = 0;

    jsonwebtoken::decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|token_data| token_data.claims)
    .map_err(|e| {
        log::debug!("Rejected session token: {}", e);
        AppError::InvalidToken
    })
}

pub fn get_jwt_claims_or_error(req: &ServiceRequest) -> Result<SessionClaims, HttpResponse> {
    if let Some(jwt_claims_res) = req.extensions().get::<Res<SessionClaims>>() {
        match jwt_claims_res {
            Ok(claims) => Ok(claims.clone()),
            Err(app_error) => Err(app_error.to_http_response()),
        }
    } else {
        Err(
            AppError::Unauthorized("No authorization token provided".to_string())
                .to_http_response(),
        )
    }
}

/// Same lookup as [`get_jwt_claims_or_error`] for handlers that authorize
/// inline instead of behind the auth middleware.
pub fn claims_from_request(req: &HttpRequest) -> Res<SessionClaims> {
    match req.extensions().get::<Res<SessionClaims>>() {
        Some(Ok(claims)) => Ok(claims.clone()),
        Some(Err(_)) => Err(AppError::InvalidToken),
        None => Err(AppError::Unauthorized(
            "No authorization token provided".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(hours: i64) -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            expiration_hours: hours,
        }
    }

    fn spec() -> ClaimsSpec {
        ClaimsSpec {
            user_id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            is_premium: true,
        }
    }

    #[test]
    fn test_issued_token_carries_entitlement_snapshot() {
        let spec = spec();
        let user_id = spec.user_id;
        let token = generate_jwt(spec, &config(24)).unwrap();

        let claims = validate_jwt(&token, "test-secret").unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.email, "a@x.com");
        assert!(claims.is_premium);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_wrong_secret_is_invalid_token() {
        let token = generate_jwt(spec(), &config(24)).unwrap();
        assert!(matches!(
            validate_jwt(&token, "other-secret"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_is_invalid_token() {
        let token = generate_jwt(spec(), &config(-1)).unwrap();
        assert!(matches!(
            validate_jwt(&token, "test-secret"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_malformed_token_is_invalid_token() {
        assert!(matches!(
            validate_jwt("not.a.jwt", "test-secret"),
            Err(AppError::InvalidToken)
        ));
    }
}
