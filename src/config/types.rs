use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::{LoggingConfig, LOG_LEVELS};
use crate::probes::ProbeConfig;

pub const CONFIG_PATH_ENV: &str = "SYSMOND_CONFIG";
pub const ENV_PREFIX: &str = "SYSMOND_";

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0: listen address, poll cadence, logging and the probe set.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Shared cadence of every poll unit.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Window for throttling repeated update-failure warnings of one probe.
    #[serde(default = "default_error_log_interval_secs")]
    pub error_log_interval_secs: u64,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "ProbeConfig::default_set")]
    pub probes: Vec<ProbeConfig>,
}

impl Default for ConfigV1 {
    fn default() -> Self {
        ConfigV1 {
            bind_address: default_bind_address(),
            poll_interval_ms: default_poll_interval_ms(),
            error_log_interval_secs: default_error_log_interval_secs(),
            logging: LoggingConfig::default(),
            probes: ProbeConfig::default_set(),
        }
    }
}

impl ConfigV1 {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn error_log_interval(&self) -> Duration {
        Duration::from_secs(self.error_log_interval_secs)
    }

    fn validate(&self) -> Result<(), String> {
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than zero".to_string());
        }
        let level = self.logging.level.trim().to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(format!(
                "Invalid logging.level '{}'. Valid values: {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            ));
        }
        Ok(())
    }
}

fn default_bind_address() -> String {
    "0.0.0.0:8747".to_string()
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_error_log_interval_secs() -> u64 {
    60
}

/// Figment with the implicit version applied; sources are merged on top.
pub fn base_figment() -> Figment {
    Figment::new().merge(Serialized::default("version", "1.0.0"))
}

/// The YAML file named by `SYSMOND_CONFIG` (default `./config.yaml`), then
/// `SYSMOND_*` environment overrides. A missing file leaves the defaults.
pub fn config_figment() -> Figment {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "./config.yaml".to_string());
    base_figment()
        .merge(Yaml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]).split("__"))
}

pub fn extract_config(figment: &Figment) -> Result<ConfigV1, figment::Error> {
    let config = match figment.extract::<Config>()? {
        Config::ConfigV1(c) => c,
    };
    config.validate()?;
    Ok(config)
}

/// Load the configuration, exiting the process if it is invalid.
pub fn load_config() -> ConfigV1 {
    match extract_config(&config_figment()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() -> Result<(), serde_json::Error> {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
