mod cors;

use std::{sync::Arc, time::Duration};

use actix_web::{
    App, HttpServer,
    web::{self},
};
use chrono::Utc;
use common::{env_config::Config, stripe::PaymentProvider};
use db::{memory::MemoryStore, store::CredentialStore};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env();
    let config_data = config.clone();

    // get info
    let is_production = config.is_production();
    let origin = config.cors_allowed_origin.clone();
    let admin_api_keys = config.admin_api_keys.clone();

    // init logger
    if config.console_logging_enabled {
        logger::setup(&config.log_file).expect("Failed to set up logger");
    }

    // init account store
    let store: Arc<dyn CredentialStore> = match &config.database_url {
        Some(database_url) => {
            let store = db::setup(database_url, is_production)
                .await
                .expect("Failed to set up database");
            Arc::new(store)
        }
        None => {
            log::warn!("DATABASE_URL is not set, accounts are kept in memory and lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    // forget old welcome claims once a day
    let prune_store = store.clone();
    actix_web::rt::spawn(async move {
        let mut ticker = actix_web::rt::time::interval(Duration::from_secs(24 * 60 * 60));
        loop {
            ticker.tick().await;
            if let Err(e) =
                api_premium::services::entitlement::prune_welcome_log(&*prune_store, Utc::now())
                    .await
            {
                log::warn!("Failed to prune welcome records: {}", e);
            }
        }
    });

    // payment provider and mail relay, both optional
    let payments = web::Data::new(PaymentProvider::from_config(&config));
    let notifier = mailer::from_config(&config.smtp);

    if admin_api_keys.is_empty() {
        log::warn!("ADMIN_API_KEYS is not set, admin endpoints reject every request");
    }
    log::info!(
        "Listening on {}:{} ({})",
        config.server_host,
        config.server_port,
        config.environment
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(config_data.clone()))
            .app_data(web::Data::from(store.clone()))
            .app_data(web::Data::from(notifier.clone()))
            .app_data(payments.clone())
            .wrap(logger::middleware()) // 3rd
            .wrap(extractor::middleware()) // 2nd
            .wrap(cors::middleware(&origin)) // 1st
            .service(
                web::scope("/api")
                    .service(api_auth::mount_auth())
                    .service(api_premium::mount_checkout())
                    .service(api_premium::mount_download())
                    .service(
                        web::scope("/admin")
                            .wrap(api_auth::api_key_middleware(admin_api_keys.clone()))
                            .service(api_auth::mount_accounts()),
                    ),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
