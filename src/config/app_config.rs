use crate::db::repo::memory_repository::InMemoryAccountRepository;
use crate::db::repo::users_repository::PgAccountRepository;
use crate::db::repo::AccountRepository;
use crate::service::email::{LogNotifier, Notifier};
use crate::util::clock::{Clock, SystemClock};
use crate::util::crypto_helper::{Argon2Encoder, PasswordEncoder};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};

/// Settings of the account module. Passed explicitly, never looked up.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    /// Lifetime of RENEW_PASSWORD tokens, in seconds.
    pub token_security_ttl: i64,
    /// Lifetime of REOPEN_ACCOUNT tokens, in seconds.
    pub token_reopen_ttl: i64,
    /// Lifetime of ACCOUNT_CONFIRMATION tokens, in seconds.
    pub token_confirmation_ttl: i64,
    /// A token younger than this blocks issuing another one of the same purpose.
    pub recent_token_window: i64,
    pub users_per_page: i64,
    pub base_url: String,
    pub routes: RouteConfig,
}

#[derive(Debug, Clone)]
pub struct RouteConfig {
    pub login: String,
    pub confirm_account: String,
    pub reopen_account: String,
    pub reset_password: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            login: "/auth/login".to_string(),
            confirm_account: "/auth/confirm-account".to_string(),
            reopen_account: "/auth/reopen-account".to_string(),
            reset_password: "/auth/reset-password".to_string(),
        }
    }
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            token_security_ttl: 86_400,
            token_reopen_ttl: 86_400,
            token_confirmation_ttl: 31_536_000,
            recent_token_window: 120,
            users_per_page: 20,
            base_url: "http://localhost:3000".to_string(),
            routes: RouteConfig::default(),
        }
    }
}

/// Longest accepted token lifetime or recent-token window: 100 years.
pub const MAX_TTL_SECONDS: i64 = 100 * 365 * 86_400;

impl AccountConfig {
    /// Reads overrides from the environment, keeping defaults for anything
    /// missing, unparsable or out of range.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            token_security_ttl: seconds_or("TOKEN_SECURITY_TTL", defaults.token_security_ttl),
            token_reopen_ttl: seconds_or("TOKEN_REOPEN_TTL", defaults.token_reopen_ttl),
            token_confirmation_ttl: seconds_or(
                "TOKEN_CONFIRMATION_TTL",
                defaults.token_confirmation_ttl,
            ),
            recent_token_window: seconds_or("RECENT_TOKEN_WINDOW", defaults.recent_token_window),
            base_url: env::var("APP_BASE_URL").unwrap_or(defaults.base_url),
            ..defaults
        }
    }

    /// Absolute link carrying a token hash, for the notifier.
    pub fn token_url(&self, route: &str, hash: &str) -> String {
        format!(
            "{}{}?token={}",
            self.base_url.trim_end_matches('/'),
            route,
            hash
        )
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            error!("Ignoring unparsable value for {}", key);
            default
        }),
        Err(_) => default,
    }
}

fn seconds_or(key: &str, default: i64) -> i64 {
    checked_seconds(key, env_or(key, default), default)
}

/// Keeps `value` when it lies in `1..=MAX_TTL_SECONDS`, else logs and
/// falls back to `default`.
fn checked_seconds(key: &str, value: i64, default: i64) -> i64 {
    if (1..=MAX_TTL_SECONDS).contains(&value) {
        value
    } else {
        error!(
            "Ignoring {}={}: expected 1 to {} seconds",
            key, value, MAX_TTL_SECONDS
        );
        default
    }
}

/// Collaborators shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn AccountRepository>,
    pub encoder: Arc<dyn PasswordEncoder>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub config: AccountConfig,
}

/// Initializes the application state against PostgreSQL.
///
/// # Panics
/// This function will panic if `DATABASE_URL` is not set, if the connection
/// pool cannot be created, if migrations fail or if the Argon2 pepper is
/// rejected.
pub async fn initialize_app_state() -> Arc<AppState> {
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    // Setup connection pool.
    let pg_pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect(&database_url)
        .await
        .unwrap_or_else(|e| panic!("Failed to create database connection pool: {}", e));

    let repository = PgAccountRepository::new(pg_pool);
    repository
        .migrate()
        .await
        .unwrap_or_else(|e| panic!("Failed to run database migrations: {}", e));
    info!("Database ready");

    assemble(Arc::new(repository))
}

/// Application state over process local storage. Nothing survives a restart.
///
/// # Panics
/// This function will panic if the Argon2 pepper is rejected.
pub fn initialize_in_memory_app_state() -> Arc<AppState> {
    info!("Using in-memory account storage");
    assemble(Arc::new(InMemoryAccountRepository::new()))
}

fn assemble(repository: Arc<dyn AccountRepository>) -> Arc<AppState> {
    let argon_pepper = env::var("ARGON_PEPPER").unwrap_or_default();
    let config = AccountConfig::from_env();
    let encoder = Argon2Encoder::new(SecretString::from(argon_pepper))
        .unwrap_or_else(|e| panic!("Failed to set up password encoder: {}", e));

    Arc::new(AppState {
        repository,
        encoder: Arc::new(encoder),
        notifier: Arc::new(LogNotifier::new(config.clone())),
        clock: Arc::new(SystemClock),
        config,
    })
}

/// Retrieves the server address from the environment variables.
///
/// # Panics
/// This function will panic if the `SERVER_HOST` or `SERVER_PORT` environment variables are not set.
pub fn get_server_address() -> String {
    let server_host = env::var("SERVER_HOST").expect("Error getting server host");
    let server_port = env::var("SERVER_PORT").expect("Error getting server port");
    server_host + ":" + &*server_port
}
