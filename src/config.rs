//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

/// HTTP header name for API key authentication.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Development default values - NEVER use in production.
pub mod defaults {
    pub const DEV_DB_HOST: &str = "localhost";
    pub const DEV_DB_PORT: u16 = 5432;
    pub const DEV_DB_USER: &str = "trd";
    pub const DEV_DB_PASSWORD: &str = "trd";
    pub const DEV_DB_NAME: &str = "trd";
    pub const DEV_API_KEY: &str = "dev-api-key-do-not-use-in-production";
    pub const DEV_HOST: &str = "127.0.0.1";
    pub const DEV_PORT: u16 = 8080;
    pub const DB_MAX_CONNECTIONS: u32 = 10;
    pub const DB_MIN_CONNECTIONS: u32 = 1;
    pub const DB_CONNECT_TIMEOUT_SECS: u64 = 10;
    pub const LOCK_TIMEOUT_MS: u64 = 10_000;
    pub const MERGE_TIMEOUT_MS: u64 = 15_000;

    /// Connection URL assembled from the development defaults.
    pub fn dev_database_url() -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            DEV_DB_USER, DEV_DB_PASSWORD, DEV_DB_HOST, DEV_DB_PORT, DEV_DB_NAME
        )
    }
}

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse environment from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Database connection settings.
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    /// Full connection URL
    pub url: String,
    /// Upper bound of pooled connections
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    /// Seconds to wait for a connection before failing
    pub connect_timeout_secs: u64,
}

impl DatabaseSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Bounds applied to result ingestion.
#[derive(Debug, Clone, Copy)]
pub struct IngestLimits {
    /// Longest a merge may wait for the per-spec lock
    pub lock_timeout: Duration,
    /// Longest the storage transaction of a single merge may run
    pub merge_timeout: Duration,
}

impl Default for IngestLimits {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(defaults::LOCK_TIMEOUT_MS),
            merge_timeout: Duration::from_millis(defaults::MERGE_TIMEOUT_MS),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Runtime environment
    pub environment: Environment,
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database settings
    pub database: DatabaseSettings,
    /// Key expected in the `X-API-Key` header of ingestion calls
    pub api_key: String,
    /// Lock and transaction bounds for result merges
    pub ingest: IngestLimits,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In development mode (RUST_ENV=development) every variable has a default.
    /// In production mode (RUST_ENV=production) the server refuses to start
    /// with development defaults for the database or the API key.
    ///
    /// Environment variables:
    /// - `RUST_ENV`: Environment (development/production) - REQUIRED
    /// - `TRD_HOST`: Server host (default: 127.0.0.1)
    /// - `TRD_PORT`: Server port (default: 8080)
    /// - `TRD_DB_URL`: Full database URL, overrides the individual DB vars
    /// - `TRD_DB_HOST`, `TRD_DB_PORT`, `TRD_DB_USER`, `TRD_DB_PASSWORD`, `TRD_DB_NAME`
    /// - `TRD_DB_MAX_CONNECTIONS`: Pool size (default: 10)
    /// - `TRD_DB_MIN_CONNECTIONS`: Idle pool size (default: 1)
    /// - `TRD_DB_CONNECT_TIMEOUT_SECS`: Connect timeout (default: 10)
    /// - `TRD_API_KEY`: Ingestion API key (required in production)
    /// - `TRD_LOCK_TIMEOUT_MS`: Per-spec lock wait bound (default: 10000)
    /// - `TRD_MERGE_TIMEOUT_MS`: Merge transaction bound (default: 15000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_str = env::var("RUST_ENV").map_err(|_| ConfigError::MissingEnvVar("RUST_ENV"))?;

        let environment = Environment::parse(&env_str).ok_or(ConfigError::InvalidValue(
            "RUST_ENV must be 'development' or 'production'",
        ))?;

        let host = env::var("TRD_HOST").unwrap_or_else(|_| defaults::DEV_HOST.to_string());

        let port = parse_var("TRD_PORT", defaults::DEV_PORT, "TRD_PORT must be a valid port number")?;

        let database = DatabaseSettings {
            url: database_url_from_env()?,
            max_connections: parse_var(
                "TRD_DB_MAX_CONNECTIONS",
                defaults::DB_MAX_CONNECTIONS,
                "TRD_DB_MAX_CONNECTIONS must be a valid number",
            )?,
            min_connections: parse_var(
                "TRD_DB_MIN_CONNECTIONS",
                defaults::DB_MIN_CONNECTIONS,
                "TRD_DB_MIN_CONNECTIONS must be a valid number",
            )?,
            connect_timeout_secs: parse_var(
                "TRD_DB_CONNECT_TIMEOUT_SECS",
                defaults::DB_CONNECT_TIMEOUT_SECS,
                "TRD_DB_CONNECT_TIMEOUT_SECS must be a valid number",
            )?,
        };

        let api_key = match env::var("TRD_API_KEY") {
            Ok(key) => key,
            Err(_) if environment.is_development() => defaults::DEV_API_KEY.to_string(),
            Err(_) => return Err(ConfigError::MissingEnvVar("TRD_API_KEY")),
        };

        let ingest = IngestLimits {
            lock_timeout: Duration::from_millis(parse_var(
                "TRD_LOCK_TIMEOUT_MS",
                defaults::LOCK_TIMEOUT_MS,
                "TRD_LOCK_TIMEOUT_MS must be a valid number",
            )?),
            merge_timeout: Duration::from_millis(parse_var(
                "TRD_MERGE_TIMEOUT_MS",
                defaults::MERGE_TIMEOUT_MS,
                "TRD_MERGE_TIMEOUT_MS must be a valid number",
            )?),
        };

        let config = Config {
            environment,
            host,
            port,
            database,
            api_key,
            ingest,
        };

        if environment.is_production() {
            config.validate_production()?;
        }

        Ok(config)
    }

    /// Validate that production configuration does not use development defaults.
    fn validate_production(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.database.url == defaults::dev_database_url() {
            errors.push(
                "Database is using development defaults. Set TRD_DB_URL or the TRD_DB_* variables."
                    .to_string(),
            );
        }

        if self.api_key == defaults::DEV_API_KEY {
            errors.push("TRD_API_KEY is using development default. Set a secure key.".to_string());
        }

        if self.api_key.trim().is_empty() {
            errors.push("TRD_API_KEY must not be empty.".to_string());
        }

        if self.ingest.lock_timeout.is_zero() || self.ingest.merge_timeout.is_zero() {
            errors.push("TRD_LOCK_TIMEOUT_MS and TRD_MERGE_TIMEOUT_MS must be non-zero.".to_string());
        }

        if !errors.is_empty() {
            return Err(ConfigError::ProductionValidation(errors));
        }

        Ok(())
    }

    /// Get the server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_development(&self) -> bool {
        self.environment.is_development()
    }
}

fn parse_var<T: std::str::FromStr>(
    name: &str,
    default: T,
    message: &'static str,
) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse::<T>().map_err(|_| ConfigError::InvalidValue(message)),
        Err(_) => Ok(default),
    }
}

fn database_url_from_env() -> Result<String, ConfigError> {
    if let Ok(url) = env::var("TRD_DB_URL") {
        return Ok(url);
    }

    let host = env::var("TRD_DB_HOST").unwrap_or_else(|_| defaults::DEV_DB_HOST.to_string());
    let port: u16 = parse_var(
        "TRD_DB_PORT",
        defaults::DEV_DB_PORT,
        "TRD_DB_PORT must be a valid port number",
    )?;
    let user = env::var("TRD_DB_USER").unwrap_or_else(|_| defaults::DEV_DB_USER.to_string());
    let password =
        env::var("TRD_DB_PASSWORD").unwrap_or_else(|_| defaults::DEV_DB_PASSWORD.to_string());
    let name = env::var("TRD_DB_NAME").unwrap_or_else(|_| defaults::DEV_DB_NAME.to_string());

    Ok(format!(
        "postgres://{}:{}@{}:{}/{}",
        user, password, host, port, name
    ))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(&'static str),

    #[error("Production configuration validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    ProductionValidation(Vec<String>),
}
