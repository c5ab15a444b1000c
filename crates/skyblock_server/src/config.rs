//! Configuration management for the skyblock server.
//!
//! This module handles loading and validation of the server configuration
//! from TOML files. The `[grid]` and `[coop]` sections deserialize straight
//! into the core crate's settings types.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use skyblock_grid::{CoopSettings, GridSettings};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_autosave_interval() -> u64 {
    300
}

fn default_tick_interval() -> u64 {
    50 // 20 ticks per second
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Application configuration loaded from TOML file.
///
/// Every section is optional in the file; missing sections take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Island grid layout and flag defaults
    #[serde(default)]
    pub grid: GridSettings,
    /// Coop behaviour
    #[serde(default)]
    pub coop: CoopSettings,
    /// Where and how often state is saved
    #[serde(default)]
    pub storage: StorageSettings,
    /// Main loop timing
    #[serde(default)]
    pub runtime: RuntimeSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Persistence settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory holding the island and coop documents
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Seconds between background saves (0 to disable)
    #[serde(default = "default_autosave_interval")]
    pub autosave_interval_secs: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            autosave_interval_secs: default_autosave_interval(),
        }
    }
}

/// Main loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeSettings {
    /// Tick interval in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
        }
    }
}

/// Logging system configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, a default configuration file is written at
    /// the path and the defaults are returned.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The loaded or default configuration, or an error if reading, parsing or
    /// writing the file failed.
    pub async fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config: AppConfig = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)
                .context("Failed to serialize default config")?;
            tokio::fs::write(path, toml_content)
                .await
                .with_context(|| format!("Failed to write config file {}", path.display()))?;
            info!("📝 Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.runtime.tick_interval_ms)
    }

    /// `None` when autosave is disabled.
    pub fn autosave_interval(&self) -> Option<Duration> {
        (self.storage.autosave_interval_secs > 0)
            .then(|| Duration::from_secs(self.storage.autosave_interval_secs))
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        self.grid.validate()?;

        if self.storage.data_dir.as_os_str().is_empty() {
            return Err("Data directory cannot be empty".to_string());
        }

        if self.runtime.tick_interval_ms == 0 {
            return Err("Tick interval must be at least 1 ms".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}
