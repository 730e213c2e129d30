use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use tracing::info;
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_PAYOS_API_BASE: &str = "https://api-merchant.payos.vn";

/// PayOS hosted-checkout credentials and endpoints.
///
/// Injected explicitly into the gateway client so tests can construct
/// one with fake values instead of reading ambient state.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct PayOsConfig {
    pub client_id: String,
    pub api_key: String,
    /// HMAC-SHA256 key used for request and webhook signatures.
    pub checksum_key: String,
    #[serde(default = "default_payos_api_base")]
    pub api_base_url: String,
}

fn default_payos_api_base() -> String {
    DEFAULT_PAYOS_API_BASE.to_string()
}

/// Application configuration with validation.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment name: development, test, production
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON
    #[serde(default)]
    pub log_json: bool,

    /// Run schema migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Storefront base URL used for PayOS return/cancel callbacks
    #[validate(url)]
    pub frontend_url: String,

    /// Default shipping fee applied when the client omits one (VND)
    #[serde(default)]
    pub default_shipping_fee: u64,

    pub payos: PayOsConfig,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl AppConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Loads configuration from `config/default.toml`, an optional
/// environment-specific file (`config/{APP_ENV}.toml`) and `APP_*`
/// environment variables, in increasing precedence.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let run_env = env::var("APP_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let mut builder = Config::builder()
        .add_source(File::from(Path::new(CONFIG_DIR).join("default.toml")).required(false));

    let env_file = Path::new(CONFIG_DIR).join(format!("{run_env}.toml"));
    builder = builder.add_source(File::from(env_file).required(false));

    builder = builder.add_source(Environment::with_prefix("APP").separator("__"));

    let config: AppConfig = builder.build()?.try_deserialize()?;

    config
        .validate()
        .map_err(|e| ConfigError::Message(format!("invalid configuration: {e}")))?;

    info!(environment = %config.environment, "Configuration loaded");
    Ok(config)
}

/// Initializes the global tracing subscriber.
pub fn init_tracing(log_level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}
