//! Configuration management for the Phoenix cache tools
//!
//! Sources, lowest precedence first: the configuration file, `PHOENIX_*`
//! environment variables (`PHOENIX_STORE__URL`, `PHOENIX_LOCK__TIMEOUT_MS`, ...)
//! and command line overrides.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use phoenix_lock::LockConfig;
use serde::Deserialize;

use crate::cli::Cli;

/// Read when no `--config` is given, if it exists
pub const DEFAULT_CONFIG_FILE: &str = "conf/phoenix";

pub const DEFAULT_STORE_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_POOL_SIZE: u32 = 4;
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub lock: LockConfig,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_store_url() -> String {
    DEFAULT_STORE_URL.to_string()
}

fn default_pool_size() -> u32 {
    DEFAULT_POOL_SIZE
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Load configuration for `cli`. An explicit `--config` file must exist.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => File::from(path.as_path()).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        Self::build(Config::builder().add_source(file), cli)
    }

    fn build(builder: ConfigBuilder<DefaultState>, cli: &Cli) -> Result<Self, ConfigError> {
        let lock_timeout_ms = cli
            .lock_timeout_ms
            .map(|ms| i64::try_from(ms).unwrap_or(i64::MAX));

        builder
            .add_source(
                Environment::with_prefix("PHOENIX")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("store.url", cli.redis_url.clone())?
            .set_override_option("lock.timeout_ms", lock_timeout_ms)?
            .build()?
            .try_deserialize()
    }
}
