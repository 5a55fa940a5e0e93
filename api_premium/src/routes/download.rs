use std::sync::Arc;

use actix_web::{
    HttpRequest, HttpResponse, get,
    http::header::{ContentDisposition, ContentType, DispositionParam, DispositionType},
    web,
};
use chrono::Utc;
use common::{
    env_config::Config,
    error::{AppError, Res},
    jwt, validate,
};
use db::store::CredentialStore;

/// Serves a premium file as an attachment.
///
/// The filename is checked before anything else, so traversal attempts are
/// rejected with 400 whatever the token. The entitlement is read from the
/// stored account, not from the token, which only carries a snapshot.
///
/// # Output
/// - Success: the file bytes
/// - Error: 400 bad filename, 401 missing or invalid token,
///   403 account missing or not premium, 404 no such file
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/download/tool.zip', {
///   headers: { 'Authorization': `Bearer ${localStorage.getItem('authToken')}` }
/// });
/// const blob = await response.blob();
/// ```
#[get("/{filename:.*}")]
pub async fn get_download(
    req: HttpRequest,
    path: web::Path<String>,
    store: web::Data<dyn CredentialStore>,
    config: web::Data<Arc<Config>>,
) -> Res<HttpResponse> {
    let filename = path.into_inner();
    validate::filename(&filename)?;

    let claims = jwt::claims_from_request(&req)?;
    let entitled = store
        .find_by_id(claims.user_id)
        .await?
        .is_some_and(|account| account.has_active_entitlement(Utc::now()));
    if !entitled {
        return Err(AppError::Forbidden("Premium account required".to_string()));
    }

    let file_path = config.downloads_dir.join(&filename);
    let is_file = tokio::fs::metadata(&file_path)
        .await
        .map(|metadata| metadata.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(AppError::NotFound("File not found".to_string()));
    }
    let bytes = tokio::fs::read(&file_path)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to read {}: {}", file_path.display(), e)))?;

    log::info!("User {} downloaded {}", claims.user_id, filename);
    Ok(HttpResponse::Ok()
        .content_type(ContentType::octet_stream())
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename)],
        })
        .body(bytes))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use actix_web::{App, http::StatusCode, test};
    use common::{
        env_config::JwtConfig,
        jwt::{ClaimsSpec, generate_jwt},
    };
    use db::{dtos::account::NewAccount, memory::MemoryStore, models::account::Account};
    use uuid::Uuid;

    use super::*;
    use crate::mount_download;

    struct Fixture {
        config: Arc<Config>,
        store: Arc<dyn CredentialStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let downloads_dir = std::env::temp_dir().join(format!("downloads-{}", Uuid::new_v4()));
            std::fs::create_dir_all(&downloads_dir).unwrap();
            std::fs::write(downloads_dir.join("tool.zip"), b"premium bytes").unwrap();

            Fixture {
                config: Arc::new(Config {
                    jwt_config: JwtConfig {
                        secret: "test-secret".to_string(),
                        expiration_hours: 24,
                    },
                    downloads_dir,
                    ..Default::default()
                }),
                store: Arc::new(MemoryStore::new()),
            }
        }

        fn dir(&self) -> PathBuf {
            self.config.downloads_dir.clone()
        }

        async fn account(&self, premium: bool) -> Account {
            self.store
                .create(NewAccount {
                    email: format!("{}@x.com", Uuid::new_v4()),
                    password_hash: "hash".to_string(),
                    premium_since: premium.then(Utc::now),
                })
                .await
                .unwrap()
        }

        fn token(&self, account: &Account) -> String {
            generate_jwt(
                ClaimsSpec {
                    user_id: account.id,
                    email: account.email.clone(),
                    is_premium: account.has_active_entitlement(Utc::now()),
                },
                &self.config.jwt_config,
            )
            .unwrap()
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.config.downloads_dir);
        }
    }

    macro_rules! call {
        ($fixture:expr, $uri:expr, $token:expr) => {{
            let app = test::init_service(
                App::new()
                    .app_data(web::Data::new($fixture.config.clone()))
                    .app_data(web::Data::from($fixture.store.clone()))
                    .wrap(extractor::middleware())
                    .service(web::scope("/api").service(mount_download())),
            )
            .await;
            let mut req = test::TestRequest::get().uri($uri);
            if let Some(token) = $token {
                req = req.insert_header(("Authorization", format!("Bearer {}", token)));
            }
            test::call_service(&app, req.to_request()).await
        }};
    }

    #[actix_web::test]
    async fn test_premium_account_downloads_file() {
        let fixture = Fixture::new();
        let account = fixture.account(true).await;
        let token = fixture.token(&account);

        let res = call!(fixture, "/api/download/tool.zip", Some(token));
        assert_eq!(res.status(), StatusCode::OK);
        assert!(
            res.headers()
                .get("content-disposition")
                .unwrap()
                .to_str()
                .unwrap()
                .contains("tool.zip")
        );
        let body = test::read_body(res).await;
        assert_eq!(&body[..], b"premium bytes");
    }

    #[actix_web::test]
    async fn test_traversal_rejected_regardless_of_token() {
        let fixture = Fixture::new();
        let account = fixture.account(true).await;
        let token = fixture.token(&account);

        let res = call!(fixture, "/api/download/../../etc/passwd", None::<String>);
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let res = call!(fixture, "/api/download/../../etc/passwd", Some(token));
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let res = call!(fixture, "/api/download/../../etc/passwd", Some("garbage".to_string()));
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_missing_or_invalid_token_unauthorized() {
        let fixture = Fixture::new();

        let res = call!(fixture, "/api/download/tool.zip", None::<String>);
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let res = call!(fixture, "/api/download/tool.zip", Some("garbage".to_string()));
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_non_premium_account_forbidden() {
        let fixture = Fixture::new();
        let account = fixture.account(false).await;
        let token = fixture.token(&account);

        let res = call!(fixture, "/api/download/tool.zip", Some(token));
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_unknown_account_forbidden() {
        let fixture = Fixture::new();
        let token = generate_jwt(
            ClaimsSpec {
                user_id: Uuid::new_v4(),
                email: "ghost@x.com".to_string(),
                is_premium: true,
            },
            &fixture.config.jwt_config,
        )
        .unwrap();

        let res = call!(fixture, "/api/download/tool.zip", Some(token));
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_missing_file_not_found() {
        let fixture = Fixture::new();
        let account = fixture.account(true).await;
        let token = fixture.token(&account);

        let res = call!(fixture, "/api/download/other.zip", Some(token));
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(fixture.dir().join("tool.zip").exists());
    }

    #[::std::prelude::v1::test]
    fn test_downloads_dir_removed_with_fixture() {
        let dir = {
            let fixture = Fixture::new();
            assert!(fixture.dir().join("tool.zip").exists());
            fixture.dir()
        };
        assert!(!dir.exists());
    }

    #[actix_web::test]
    async fn test_entitlement_read_from_store_not_token() {
        let fixture = Fixture::new();
        let mut account = fixture.account(false).await;
        let stale_token = fixture.token(&account);

        account.is_premium = true;
        account.subscription_date = Some(Utc::now());
        fixture.store.save(&account).await.unwrap();

        let claims = jwt::validate_jwt(&stale_token, "test-secret").unwrap();
        assert!(!claims.is_premium);
        let res = call!(fixture, "/api/download/tool.zip", Some(stale_token));
        assert_eq!(res.status(), StatusCode::OK);
    }
}
