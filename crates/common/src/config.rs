//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Environment variable prefix for configuration overrides.
const ENV_PREFIX: &str = "OPENDRAFT";

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Rate limiting configuration.
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    /// Scheduled publishing configuration.
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    /// CORS configuration.
    #[serde(default)]
    pub cors: CorsConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    #[serde(default = "default_url")]
    pub url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Rate limiting configuration for the `/api` surface.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    /// Whether rate limiting is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum requests per window per client.
    #[serde(default = "default_rate_limit_max")]
    pub max_requests: u32,
    /// Window length in seconds.
    #[serde(default = "default_rate_limit_window")]
    pub window_secs: u64,
}

/// Scheduled publishing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSettings {
    /// Whether the publish sweep runs in this process.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between sweeps.
    #[serde(default = "default_scheduler_interval")]
    pub interval_secs: u64,
}

/// CORS configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins. Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
    /// Default `EnvFilter` directive, used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    5000
}

fn default_url() -> String {
    "http://localhost:5000".to_string()
}

const fn default_request_timeout() -> u64 {
    30
}

const fn default_body_limit() -> usize {
    10 * 1024 * 1024
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

const fn default_true() -> bool {
    true
}

const fn default_rate_limit_max() -> u32 {
    100
}

const fn default_rate_limit_window() -> u64 {
    15 * 60
}

const fn default_scheduler_interval() -> u64 {
    60
}

fn default_log_filter() -> String {
    "opendraft=debug,tower_http=debug".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            url: default_url(),
            request_timeout_secs: default_request_timeout(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_rate_limit_max(),
            window_secs: default_rate_limit_window(),
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_scheduler_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present, exported into the process environment)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `OPENDRAFT_ENV`)
    /// 4. Environment variables such as `OPENDRAFT__DATABASE__URL`
    pub fn load() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();
        let env = std::env::var("OPENDRAFT_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Configuration pointing at `database_url` with every other section
    /// at its default.
    #[must_use]
    pub fn with_database_url(database_url: impl Into<String>) -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: database_url.into(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
            },
            rate_limit: RateLimitSettings::default(),
            scheduler: SchedulerSettings::default(),
            cors: CorsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_file_uses_defaults() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                "[database]\nurl = \"postgres://localhost/opendraft\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window_secs, 900);
        assert_eq!(config.scheduler.interval_secs, 60);
        assert!(config.scheduler.enabled);
        assert!(config.cors.allowed_origins.is_empty());
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_overrides() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                port = 8080
                [database]
                url = "postgres://db/opendraft"
                max_connections = 5
                [scheduler]
                enabled = false
                interval_secs = 5
                [logging]
                format = "json"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.max_connections, 5);
        assert!(!config.scheduler.enabled);
        assert_eq!(config.scheduler.interval_secs, 5);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_with_database_url() {
        let config = Config::with_database_url("postgres://localhost/test");
        assert_eq!(config.database.url, "postgres://localhost/test");
        assert_eq!(config.server.request_timeout_secs, 30);
    }
}
