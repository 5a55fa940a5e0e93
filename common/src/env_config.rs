use std::{env, path::PathBuf, sync::Arc};

#[derive(Clone, Debug)]
/// Configuration struct for the server.
///
/// This struct holds all the necessary configuration parameters
/// required to initialize and run the server.
/// It includes database connection details, JWT configuration,
/// server host and port, number of worker threads, CORS settings,
/// logging preferences, payment provider and mail relay settings.
pub struct Config {
    // environment
    pub environment: String, // development or production
    /// The URL of the database to connect to. When absent outside production
    /// the server falls back to the in-memory account store.
    pub database_url: Option<String>,
    /// Configuration for JWT (JSON Web Token) authentication.
    pub jwt_config: JwtConfig,
    /// The hostname or IP address the server will bind to.
    pub server_host: String,
    /// The port number the server will listen on.
    pub server_port: u16,
    /// The number of worker threads to spawn for handling requests.
    pub num_workers: usize,
    /// The allowed origin for CORS (Cross-Origin Resource Sharing).
    pub cors_allowed_origin: String,
    /// A boolean indicating whether console logging is enabled.
    pub console_logging_enabled: bool,
    /// File the logger mirrors console output into.
    pub log_file: String,
    /// Public URL of the website, used for checkout return pages and reset links.
    pub site_url: String,
    /// Directory premium downloads are served from.
    pub downloads_dir: PathBuf,
    /// Keys accepted by the admin endpoints.
    pub admin_api_keys: Vec<String>,
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook secret
    pub stripe_webhook_secret: String,
    /// The one-off product sold through checkout.
    pub premium_product: PremiumProduct,
    /// Outgoing mail relay.
    pub smtp: SmtpConfig,
}

#[derive(Clone, Debug)]
/// Configuration for JSON Web Token (JWT) authentication.
///
/// This struct contains the secret key used to sign JWTs and
/// the expiration time in hours for issued tokens.
pub struct JwtConfig {
    /// The secret key used to sign and verify JWTs.
    pub secret: String,
    /// The expiration time for JWTs in hours.
    pub expiration_hours: i64,
}

#[derive(Clone, Debug)]
pub struct PremiumProduct {
    pub name: String,
    pub description: String,
    /// Price in the smallest currency unit (USD cents).
    pub unit_amount: i64,
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

impl SmtpConfig {
    pub fn is_configured(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl JwtConfig {
    /// Creates a new `JwtConfig` instance from environment variables.
    ///
    /// Reads the JWT configuration from environment variables:
    /// - `JWT_SECRET`: Required. The secret key for JWT signing.
    /// - `JWT_EXPIRATION_HOURS`: Optional. Defaults to 24 hours if not provided.
    ///
    /// # Panics
    ///
    /// This function will panic if:
    /// - `JWT_SECRET` environment variable is not set
    /// - `JWT_EXPIRATION_HOURS` is set but cannot be parsed as a valid number
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        JwtConfig {
            secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a valid number"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            environment: "development".to_string(),
            database_url: None,
            jwt_config: JwtConfig {
                secret: String::new(),
                expiration_hours: 24,
            },
            server_host: "127.0.0.1".to_string(),
            server_port: 8080,
            num_workers: 4,
            cors_allowed_origin: "http://localhost:3000".to_string(),
            console_logging_enabled: true,
            log_file: "server.log".to_string(),
            site_url: "http://localhost:3000".to_string(),
            downloads_dir: PathBuf::from("assets/Tools"),
            admin_api_keys: Vec::new(),
            stripe_secret_key: String::new(),
            stripe_webhook_secret: String::new(),
            premium_product: PremiumProduct {
                name: "Premium Package".to_string(),
                description: "One-off payment for premium access.".to_string(),
                unit_amount: 999,
            },
            smtp: SmtpConfig {
                host: "smtp.ionos.fr".to_string(),
                port: 465,
                username: String::new(),
                password: String::new(),
                from_address: String::new(),
            },
        }
    }
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    ///
    /// Loads all configuration values from environment variables with sensible defaults
    /// for most optional settings.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `JWT_SECRET`: Secret key for JWT signing (via `JwtConfig::from_env()`)
    /// - `DATABASE_URL`: only when `ENVIRONMENT=production`
    ///
    /// Optional (with defaults):
    /// - `ENVIRONMENT`: "development" or "production" (default: "development")
    /// - `IP`: Server host (default: "127.0.0.1")
    /// - `PORT`: Server port (default: 8080)
    /// - `WORKERS`: Number of worker threads (default: 4)
    /// - `CORS_ALLOWED_ORIGIN`: Allowed CORS origin (default: "http://localhost:3000")
    /// - `ENABLE_CONSOLE_LOGGING`: Whether to enable console logging (default: true)
    /// - `LOG_FILE`: Log file path (default: "server.log")
    /// - `SITE_URL`: Public site URL (default: "http://localhost:3000")
    /// - `DOWNLOADS_DIR`: Premium downloads directory (default: "assets/Tools")
    /// - `ADMIN_API_KEYS`: Comma separated admin keys (default: none)
    /// - `STRIPE_SECRET_KEY`, `STRIPE_WEBHOOK_SECRET`: empty disables checkout
    /// - `PREMIUM_PRODUCT_NAME`, `PREMIUM_PRODUCT_DESCRIPTION`, `PREMIUM_PRICE_CENTS`
    /// - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USER`, `SMTP_PASS`, `FROM_EMAIL`
    ///
    /// # Panics
    ///
    /// This function will panic if required environment variables are missing or if
    /// numeric values cannot be parsed correctly.
    pub fn from_env() -> Arc<Self> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();
        let environment = env::var("ENVIRONMENT").unwrap_or(defaults.environment);
        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());
        if environment == "production" && database_url.is_none() {
            panic!("DATABASE_URL must be set in production");
        }

        let smtp_username = env::var("SMTP_USER").unwrap_or_default();

        Arc::new(Config {
            environment,
            database_url,
            jwt_config: JwtConfig::from_env(),
            server_host: env::var("IP").unwrap_or(defaults.server_host),
            server_port: env::var("PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(defaults.server_port),
            num_workers: env::var("WORKERS")
                .ok()
                .and_then(|workers| workers.parse().ok())
                .unwrap_or(defaults.num_workers),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or(defaults.cors_allowed_origin),
            console_logging_enabled: env::var("ENABLE_CONSOLE_LOGGING")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                == "true",
            log_file: env::var("LOG_FILE").unwrap_or(defaults.log_file),
            site_url: env::var("SITE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.site_url),
            downloads_dir: env::var("DOWNLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.downloads_dir),
            admin_api_keys: env::var("ADMIN_API_KEYS")
                .unwrap_or_default()
                .split(',')
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty())
                .collect(),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            premium_product: PremiumProduct {
                name: env::var("PREMIUM_PRODUCT_NAME").unwrap_or(defaults.premium_product.name),
                description: env::var("PREMIUM_PRODUCT_DESCRIPTION")
                    .unwrap_or(defaults.premium_product.description),
                unit_amount: env::var("PREMIUM_PRICE_CENTS")
                    .map(|cents| cents.parse().expect("PREMIUM_PRICE_CENTS must be a valid number"))
                    .unwrap_or(defaults.premium_product.unit_amount),
            },
            smtp: SmtpConfig {
                host: env::var("SMTP_HOST").unwrap_or(defaults.smtp.host),
                port: env::var("SMTP_PORT")
                    .ok()
                    .and_then(|port| port.parse().ok())
                    .unwrap_or(defaults.smtp.port),
                from_address: env::var("FROM_EMAIL").unwrap_or_else(|_| smtp_username.clone()),
                username: smtp_username,
                password: env::var("SMTP_PASS").unwrap_or_default(),
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
