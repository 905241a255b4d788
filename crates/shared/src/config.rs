//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Exchange-rate oracle configuration.
    pub exchange: ExchangeConfig,
    /// Receipt upload configuration.
    #[serde(default)]
    pub uploads: UploadConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-request deadline in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for validating tokens.
    pub secret: String,
}

/// Exchange-rate oracle configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    /// Base URL of the oracle; the source currency code is appended.
    #[serde(default = "default_exchange_url")]
    pub base_url: String,
    /// Upper bound on a single oracle call, in seconds.
    #[serde(default = "default_exchange_timeout")]
    pub timeout_secs: u64,
}

fn default_exchange_url() -> String {
    "https://api.exchangerate-api.com/v4/latest".to_string()
}

fn default_exchange_timeout() -> u64 {
    5
}

/// Receipt upload configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Directory receipts are written to.
    #[serde(default = "default_upload_dir")]
    pub dir: String,
    /// Maximum receipt size in bytes.
    #[serde(default = "default_max_receipt_bytes")]
    pub max_receipt_bytes: u64,
}

fn default_upload_dir() -> String {
    "./uploads".to_string()
}

fn default_max_receipt_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
            max_receipt_bytes: default_max_receipt_bytes(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("CLAIMFLOW").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
