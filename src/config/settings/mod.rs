#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::highlight::HighlightMode;
use crate::similarity::MAX_SIMILAR_WORDS;

const CONFIG_DIR_NAME: &str = "wordlens";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub highlight: HighlightConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Connection settings for the analysis service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub include_embeddings: bool,
    pub timeout_seconds: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 5000,
            include_embeddings: true,
            timeout_seconds: 60,
        }
    }
}

/// Hover highlighting behavior
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HighlightConfig {
    /// Delay before a pointer leave clears the highlight
    pub leave_debounce_ms: u64,
    /// Number of similar words highlighted in similarity mode
    pub similar_words: usize,
    pub default_mode: HighlightMode,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            leave_debounce_ms: 100,
            similar_words: MAX_SIMILAR_WORDS,
            default_mode: HighlightMode::CoOccurrence,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid request timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid leave debounce: {0}ms (must be between 10 and 2000)")]
    InvalidLeaveDebounce(u64),
    #[error("Invalid similar word count: {0} (must be between 1 and 5)")]
    InvalidSimilarWords(usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Platform configuration directory for wordlens
    #[inline]
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load from the platform configuration directory
    #[inline]
    pub fn load_default() -> Result<Self> {
        let config_dir = Self::default_dir().context("Failed to locate config directory")?;
        Self::load(config_dir)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join(CONFIG_FILE_NAME)
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.service.validate()?;
        self.highlight.validate()?;
        Ok(())
    }

    #[inline]
    pub fn service_url(&self) -> Result<Url, ConfigError> {
        self.service.service_url()
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        self.service_url()?;

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if !(1..=600).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        Ok(())
    }

    pub fn service_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn set_protocol(&mut self, protocol: String) -> Result<(), ConfigError> {
        if protocol != "http" && protocol != "https" {
            return Err(ConfigError::InvalidProtocol(protocol));
        }
        self.protocol = protocol;
        Ok(())
    }

    pub fn set_host(&mut self, host: String) -> Result<(), ConfigError> {
        let temp_config = ServiceConfig {
            host: host.clone(),
            ..self.clone()
        };
        temp_config.service_url()?;
        self.host = host;
        Ok(())
    }

    pub fn set_port(&mut self, port: u16) -> Result<(), ConfigError> {
        if port == 0 {
            return Err(ConfigError::InvalidPort(port));
        }
        self.port = port;
        Ok(())
    }

    pub fn set_timeout_seconds(&mut self, timeout_seconds: u64) -> Result<(), ConfigError> {
        if !(1..=600).contains(&timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(timeout_seconds));
        }
        self.timeout_seconds = timeout_seconds;
        Ok(())
    }
}

impl HighlightConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(10..=2000).contains(&self.leave_debounce_ms) {
            return Err(ConfigError::InvalidLeaveDebounce(self.leave_debounce_ms));
        }

        if !(1..=MAX_SIMILAR_WORDS).contains(&self.similar_words) {
            return Err(ConfigError::InvalidSimilarWords(self.similar_words));
        }

        Ok(())
    }

    pub const fn leave_debounce(&self) -> Duration {
        Duration::from_millis(self.leave_debounce_ms)
    }

    pub fn set_leave_debounce_ms(&mut self, millis: u64) -> Result<(), ConfigError> {
        if !(10..=2000).contains(&millis) {
            return Err(ConfigError::InvalidLeaveDebounce(millis));
        }
        self.leave_debounce_ms = millis;
        Ok(())
    }

    pub fn set_similar_words(&mut self, count: usize) -> Result<(), ConfigError> {
        if !(1..=MAX_SIMILAR_WORDS).contains(&count) {
            return Err(ConfigError::InvalidSimilarWords(count));
        }
        self.similar_words = count;
        Ok(())
    }
}
