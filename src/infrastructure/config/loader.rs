use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("target.url must be set")]
    EmptyTargetUrl,

    #[error("download.root_dir cannot be empty")]
    EmptyDownloadRoot,

    #[error("download.tag cannot be empty")]
    EmptyTag,

    #[error("download.marker_suffix cannot be empty")]
    EmptyMarkerSuffix,

    #[error("download.timeout_ms must be positive")]
    ZeroDownloadTimeout,

    #[error("workflow.cycle_interval_ms must be positive")]
    ZeroCycleInterval,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. YAML file (`path`, or `reportd.yaml` in the working directory)
    /// 3. Environment variables (`REPORTD_` prefix, highest priority)
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let file = path.unwrap_or_else(|| Path::new("reportd.yaml"));
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(file))
            .merge(Env::prefixed("REPORTD_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.target.url.is_empty() {
            return Err(ConfigError::EmptyTargetUrl);
        }

        if config.download.root_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDownloadRoot);
        }

        if config.download.tag.is_empty() {
            return Err(ConfigError::EmptyTag);
        }

        if config.download.marker_suffix.is_empty() {
            return Err(ConfigError::EmptyMarkerSuffix);
        }

        if config.download.timeout_ms == 0 {
            return Err(ConfigError::ZeroDownloadTimeout);
        }

        if config.workflow.cycle_interval_ms == 0 {
            return Err(ConfigError::ZeroCycleInterval);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}
