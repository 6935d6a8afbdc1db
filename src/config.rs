//! Configuration module
//!
//! Loads configuration from environment variables. Components receive their
//! settings explicitly through constructors; nothing reads the environment
//! after startup.

use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Rate limit: requests per minute per authenticated user
    pub rate_limit_per_minute: i32,

    /// Base URL of the exchange-rate quote source
    pub rate_provider_url: String,

    /// Timeout for quote requests, in milliseconds
    pub rate_provider_timeout_ms: u64,

    /// How long a ledger operation may wait on a contended row lock
    /// before failing with Busy, in milliseconds
    pub lock_timeout_ms: u64,

    /// Session lifetime, in hours
    pub session_ttl_hours: i64,

    /// SMTP settings for the notifier; absent means notifications are
    /// logged instead of sent
    pub smtp: Option<SmtpConfig>,
}

/// SMTP transport settings for outbound notifications.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let rate_limit_per_minute = env::var("RATE_LIMIT_PER_MINUTE")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("RATE_LIMIT_PER_MINUTE"))?;

        let rate_provider_url = env::var("RATE_PROVIDER_URL")
            .map_err(|_| ConfigError::MissingEnv("RATE_PROVIDER_URL"))?;

        let rate_provider_timeout_ms = env::var("RATE_PROVIDER_TIMEOUT_MS")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("RATE_PROVIDER_TIMEOUT_MS"))?;

        let lock_timeout_ms = env::var("LOCK_TIMEOUT_MS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("LOCK_TIMEOUT_MS"))?;

        let session_ttl_hours = env::var("SESSION_TTL_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("SESSION_TTL_HOURS"))?;

        let smtp = match env::var("SMTP_HOST") {
            Ok(smtp_host) => Some(SmtpConfig {
                host: smtp_host,
                port: env::var("SMTP_PORT")
                    .unwrap_or_else(|_| "587".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("SMTP_PORT"))?,
                username: env::var("SMTP_USERNAME")
                    .map_err(|_| ConfigError::MissingEnv("SMTP_USERNAME"))?,
                password: env::var("SMTP_PASSWORD")
                    .map_err(|_| ConfigError::MissingEnv("SMTP_PASSWORD"))?,
                from_address: env::var("SMTP_FROM")
                    .unwrap_or_else(|_| "no-reply@cambio.local".to_string()),
            }),
            Err(_) => None,
        };

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            rate_limit_per_minute,
            rate_provider_url,
            rate_provider_timeout_ms,
            lock_timeout_ms,
            session_ttl_hours,
            smtp,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
