//! Configuration management for the client.

use crate::{CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default data service URL (can be overridden at compile time via DATA_SERVICE_URL).
pub const DEFAULT_DATA_SERVICE_URL: &str = match option_env!("DATA_SERVICE_URL") {
    Some(url) => url,
    None => "https://cs-demo-api.herokuapp.com",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default vault auto-lock delay in milliseconds.
pub const DEFAULT_LOCK_AFTER_MS: u64 = 5000;

/// Main client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Base URL of the data service (profile, login, logout, catalog).
    #[serde(default = "default_data_service_url")]
    pub data_service_url: String,
    /// How long the vault stays unlocked while idle, in milliseconds.
    #[serde(default = "default_lock_after_ms")]
    pub lock_after_ms: u64,
}

fn default_data_service_url() -> String {
    DEFAULT_DATA_SERVICE_URL.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_lock_after_ms() -> u64 {
    DEFAULT_LOCK_AFTER_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            data_service_url: DEFAULT_DATA_SERVICE_URL.to_string(),
            lock_after_ms: DEFAULT_LOCK_AFTER_MS,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load config from the standard config file if present, then apply
    /// environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let mut config = if paths.config_file().is_file() {
            Self::from_file(&paths.config_file())?
        } else {
            Self::default()
        };
        config.load_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Read config from a JSON file.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Apply environment variable overrides.
    pub fn load_from_env(&mut self) {
        if let Some(level) = non_empty_env("TASTER_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(url) = non_empty_env("TASTER_DATA_SERVICE_URL") {
            self.data_service_url = url;
        }
        if let Some(ms) = non_empty_env("TASTER_LOCK_AFTER_MS").and_then(|v| v.parse().ok()) {
            self.lock_after_ms = ms;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> CoreResult<()> {
        Url::parse(&self.data_service_url)?;
        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    let raw = std::env::var(name).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
