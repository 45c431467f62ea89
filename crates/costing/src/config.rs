//! Costing configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `COSTING_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `COSTING_DB_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `COSTING_DB_MIN_CONNECTIONS` - Idle connections kept open (default: 2)
//! - `COSTING_DB_ACQUIRE_TIMEOUT_SECS` - Pool acquire timeout (default: 10)
//! - `COSTING_LOCK_TIMEOUT_MS` - Row lock wait inside a confirmation (default: 5000, min 1)
//! - `COSTING_CONFIRM_MAX_ATTEMPTS` - Attempts per confirmation under contention (default: 3, max 10)
//! - `COSTING_CONFIRM_RETRY_BACKOFF_MS` - Linear backoff step between attempts (default: 50)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Sentry error sample rate (default: 1.0)

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 2;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_CONFIRM_MAX_ATTEMPTS: u32 = 3;
const MAX_CONFIRM_ATTEMPTS: u32 = 10;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 50;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Costing subsystem configuration.
#[derive(Debug, Clone)]
pub struct CostingConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Connection pool settings
    pub pool: PoolConfig,
    /// Confirmation concurrency settings
    pub confirmation: ConfirmationConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
}

/// Connection pool settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        }
    }
}

/// How a confirmation behaves under lock contention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationConfig {
    /// `lock_timeout` applied to the confirmation transaction.
    pub lock_timeout: Duration,
    /// Total attempts (first try included) before giving up on contention.
    pub max_attempts: u32,
    /// Backoff step; attempt `n` waits `n × retry_backoff` before retrying.
    pub retry_backoff: Duration,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS),
            max_attempts: DEFAULT_CONFIRM_MAX_ATTEMPTS,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }
}

impl CostingConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the database URL is missing or a numeric
    /// setting cannot be parsed or is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("COSTING_DATABASE_URL")?;
        let pool = PoolConfig::from_env()?;
        let confirmation = ConfirmationConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            pool,
            confirmation,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
        })
    }

    /// Build a configuration for an explicit database URL with default tuning.
    #[must_use]
    pub fn with_database_url(database_url: SecretString) -> Self {
        Self {
            database_url,
            pool: PoolConfig::default(),
            confirmation: ConfirmationConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
        }
    }
}

impl PoolConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let max_connections = parse_env_or("COSTING_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
        let min_connections = parse_env_or("COSTING_DB_MIN_CONNECTIONS", DEFAULT_MIN_CONNECTIONS)?;
        let acquire_timeout_secs =
            parse_env_or("COSTING_DB_ACQUIRE_TIMEOUT_SECS", DEFAULT_ACQUIRE_TIMEOUT_SECS)?;

        if max_connections == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "COSTING_DB_MAX_CONNECTIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        if min_connections > max_connections {
            return Err(ConfigError::InvalidEnvVar(
                "COSTING_DB_MIN_CONNECTIONS".to_string(),
                format!("must not exceed COSTING_DB_MAX_CONNECTIONS ({max_connections})"),
            ));
        }

        Ok(Self {
            max_connections,
            min_connections,
            acquire_timeout: Duration::from_secs(acquire_timeout_secs),
        })
    }
}

impl ConfirmationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let lock_timeout_ms = parse_env_or("COSTING_LOCK_TIMEOUT_MS", DEFAULT_LOCK_TIMEOUT_MS)?;
        let max_attempts =
            parse_env_or("COSTING_CONFIRM_MAX_ATTEMPTS", DEFAULT_CONFIRM_MAX_ATTEMPTS)?;
        let backoff_ms =
            parse_env_or("COSTING_CONFIRM_RETRY_BACKOFF_MS", DEFAULT_RETRY_BACKOFF_MS)?;

        validate_lock_timeout(lock_timeout_ms)?;
        validate_attempts(max_attempts)?;

        Ok(Self {
            lock_timeout: Duration::from_millis(lock_timeout_ms),
            max_attempts,
            retry_backoff: Duration::from_millis(backoff_ms),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Parse an optional environment variable, falling back to `default` when unset.
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| parse_value(key, &raw))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// `PostgreSQL` reads `lock_timeout = 0` as "wait forever".
fn validate_lock_timeout(lock_timeout_ms: u64) -> Result<(), ConfigError> {
    if lock_timeout_ms == 0 {
        return Err(ConfigError::InvalidEnvVar(
            "COSTING_LOCK_TIMEOUT_MS".to_string(),
            "must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_attempts(max_attempts: u32) -> Result<(), ConfigError> {
    if max_attempts == 0 || max_attempts > MAX_CONFIRM_ATTEMPTS {
        return Err(ConfigError::InvalidEnvVar(
            "COSTING_CONFIRM_MAX_ATTEMPTS".to_string(),
            format!("must be between 1 and {MAX_CONFIRM_ATTEMPTS} (got {max_attempts})"),
        ));
    }
    Ok(())
}
