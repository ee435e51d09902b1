//! Plugin configuration.
//!
//! Stored as JSON next to the host's other plugin configs. Field names are
//! PascalCase so files written by earlier releases keep loading.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{error, info};

use crate::error::ConfigError;

/// Default file name of the plugin configuration.
pub const DEFAULT_CONFIG_FILE: &str = "userspecificfunctions.json";

fn default_maximum_length() -> usize {
    10
}

fn default_prohibited_words() -> Vec<String> {
    vec!["Shit".to_string(), "Fuck".to_string()]
}

/// Limits applied to chat customisation commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OverridesConfig {
    /// Longest prefix a user may set, in characters
    #[serde(default = "default_maximum_length")]
    pub maximum_prefix_length: usize,
    /// Longest suffix a user may set, in characters
    #[serde(default = "default_maximum_length")]
    pub maximum_suffix_length: usize,
    /// Words no prefix or suffix may contain, matched case-insensitively
    #[serde(default = "default_prohibited_words")]
    pub prohibited_words: Vec<String>,
}

impl Default for OverridesConfig {
    fn default() -> Self {
        Self {
            maximum_prefix_length: default_maximum_length(),
            maximum_suffix_length: default_maximum_length(),
            prohibited_words: default_prohibited_words(),
        }
    }
}

impl OverridesConfig {
    /// Reads the config at `path`, writing the defaults there if it is missing.
    ///
    /// A file that exists but cannot be parsed or fails validation is left
    /// alone and the defaults are used instead.
    pub async fn read_or_create(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            config.write(path).await?;
            info!("Created default configuration file: {}", path.display());
            return Ok(config);
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;

        let config = match serde_json::from_str::<Self>(&content) {
            Ok(config) => config,
            Err(e) => {
                error!("❌ {}; using default configuration", ConfigError::Parse(path.to_path_buf(), e));
                return Ok(Self::default());
            }
        };

        if let Err(reason) = config.validate() {
            error!("❌ {}; using default configuration", ConfigError::Invalid(reason));
            return Ok(Self::default());
        }

        Ok(config)
    }

    pub async fn write(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| ConfigError::Write(path.to_path_buf(), e))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.maximum_prefix_length == 0 {
            return Err("MaximumPrefixLength must be greater than zero".to_string());
        }
        if self.maximum_suffix_length == 0 {
            return Err("MaximumSuffixLength must be greater than zero".to_string());
        }
        if self.prohibited_words.iter().any(|word| word.trim().is_empty()) {
            return Err("ProhibitedWords cannot contain blank entries".to_string());
        }
        Ok(())
    }

    /// The prohibited words found in `text`, in config order.
    pub fn prohibited_words_in(&self, text: &str) -> Vec<&str> {
        let text = text.to_lowercase();
        self.prohibited_words
            .iter()
            .filter(|word| text.contains(&word.to_lowercase()))
            .map(String::as_str)
            .collect()
    }
}
