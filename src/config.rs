use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use tracing::info;
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

/// Mass-balance tolerance in kilograms. A production result whose input and
/// summed output differ by this much or more cannot be approved.
fn default_weight_tolerance() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Application configuration, layered from defaults, an optional
/// `config/{environment}.toml` file, and `ROLLFLOW__`-prefixed environment
/// variables (e.g. `ROLLFLOW__DATABASE_URL`).
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL.
    #[validate(length(min = 1))]
    pub database_url: String,

    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_weight_tolerance")]
    pub weight_tolerance: Decimal,

    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub db_min_connections: u32,

    /// Whether to run database migrations on startup.
    #[serde(default)]
    pub auto_migrate: bool,
}

impl AppConfig {
    /// Loads configuration for the environment named by `APP_ENV`
    /// (default "development").
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("APP_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_file = format!("{}/{}.toml", CONFIG_DIR, environment);

        let mut builder = Config::builder()
            .set_default("environment", environment.clone())?
            .set_default("log_level", DEFAULT_LOG_LEVEL)?;

        if Path::new(&config_file).exists() {
            builder = builder.add_source(File::with_name(&config_file));
        }

        let settings = builder
            .add_source(Environment::with_prefix("ROLLFLOW").separator("__"))
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;

        info!(environment = %config.environment, "Configuration loaded");
        Ok(config)
    }

    /// Minimal configuration for tests and embedded use.
    pub fn new(database_url: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            environment: environment.into(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            weight_tolerance: default_weight_tolerance(),
            db_max_connections: default_max_connections(),
            db_min_connections: default_min_connections(),
            auto_migrate: false,
        }
    }
}

/// Installs the global tracing subscriber. Safe to call more than once; later
/// calls are ignored.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_config_defaults() {
        let cfg = AppConfig::new("sqlite::memory:", "test");
        assert_eq!(cfg.weight_tolerance, dec!(0.01));
        assert_eq!(cfg.log_level, "info");
        assert!(!cfg.auto_migrate);
    }

    #[test]
    fn test_empty_database_url_fails_validation() {
        let cfg = AppConfig::new("", "test");
        assert!(cfg.validate().is_err());
    }
}
