//! Console configuration.
//!
//! Loaded from a TOML file and overridden by command-line arguments.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cli::CliArgs;

fn default_max_connections() -> u32 {
    4
}

/// Console configuration loaded from a TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Database settings
    pub database: DatabaseSettings,
    /// Plugin settings
    pub plugin: PluginSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite URL, created if missing
    pub url: String,
    /// Pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSettings {
    /// Path of the plugin's JSON configuration
    pub config_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter
    pub level: String,
    /// JSON formatting
    #[serde(default)]
    pub json_format: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            database: DatabaseSettings {
                url: "sqlite://tshock.sqlite".to_string(),
                max_connections: default_max_connections(),
            },
            plugin: PluginSettings {
                config_path: PathBuf::from(user_overrides::config::DEFAULT_CONFIG_FILE),
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}

impl ConsoleConfig {
    /// Loads the configuration, creating a default file when none exists.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: ConsoleConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = ConsoleConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Applies command-line overrides.
    pub fn apply_cli(&mut self, args: &CliArgs) {
        if let Some(url) = &args.database_url {
            self.database.url = url.clone();
        }
        if let Some(path) = &args.plugin_config {
            self.plugin.config_path = path.clone();
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.database.url.starts_with("sqlite:") {
            return Err(format!("Unsupported database URL: {}", self.database.url));
        }
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be at least 1".to_string());
        }
        if self.plugin.config_path.as_os_str().is_empty() {
            return Err("Plugin config path cannot be empty".to_string());
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
