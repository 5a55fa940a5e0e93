use std::{str::FromStr, sync::Arc};

use common::error::{AppError, Res};
use sqlx::{
    PgPool,
    postgres::{PgConnectOptions, PgSslMode},
};
use store::PgStore;

pub mod account;
pub mod memory;
pub mod store;

pub mod models {
    pub mod account;
}

pub mod dtos {
    pub mod account;
}

/// Connects to Postgres and runs the embedded migrations. A missing
/// database is created first through the `postgres` maintenance database.
pub async fn setup(database_url: &str, require_ssl: bool) -> Res<PgStore> {
    let url = url::Url::parse(database_url)
        .map_err(|e| AppError::Internal(format!("Invalid DATABASE_URL: {}", e)))?;
    let db_name = url.path().trim_start_matches('/').to_string();

    let mut admin_url = url;
    admin_url.set_path("/postgres");
    let admin_pool = PgPool::connect_with(connect_options(admin_url.as_str(), require_ssl)?).await?;
    ensure_database(&admin_pool, &db_name).await?;
    admin_pool.close().await;

    let pool = PgPool::connect_with(connect_options(database_url, require_ssl)?).await?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;
    log::info!("Connected to database {}", db_name);

    Ok(PgStore::new(Arc::new(pool)))
}

fn connect_options(url: &str, require_ssl: bool) -> Res<PgConnectOptions> {
    let options = PgConnectOptions::from_str(url)?;
    Ok(if require_ssl {
        options.ssl_mode(PgSslMode::Require)
    } else {
        options
    })
}

async fn ensure_database(admin_pool: &PgPool, db_name: &str) -> Res<()> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(admin_pool)
            .await?;

    if !exists {
        log::info!("Creating database {}", db_name);
        sqlx::query(&format!("CREATE DATABASE \"{}\"", db_name.replace('"', "\"\"")))
            .execute(admin_pool)
            .await?;
    }
    Ok(())
}
