//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/pagepulse/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/pagepulse/` (~/.config/pagepulse/)
//! - Data: `$XDG_DATA_HOME/pagepulse/` (~/.local/share/pagepulse/)
//! - State/Logs: `$XDG_STATE_HOME/pagepulse/` (~/.local/state/pagepulse/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Telemetry pipeline configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Runtime mode for the pipeline.
///
/// Development mode disables every outbound network call while leaving
/// in-memory capture (and therefore aggregate stats) active.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    #[default]
    Production,
}

impl Mode {
    /// True when outbound network calls are suppressed.
    pub fn is_development(&self) -> bool {
        matches!(self, Mode::Development)
    }
}

/// Telemetry pipeline configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    /// Runtime mode (development suppresses all network traffic)
    #[serde(default)]
    pub mode: Mode,

    /// Analytics backend base URL (e.g. `https://analytics.example.com`)
    pub base_url: Option<String>,

    /// API key sent as a bearer token (optional)
    pub api_key: Option<String>,

    /// Offline queue capacity; oldest events are evicted beyond this
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// In-memory event log capacity; oldest events are evicted beyond this
    #[serde(default = "default_max_log_events")]
    pub max_log_events: usize,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Install a process panic hook that reports panics as error records
    #[serde(default = "default_capture_panics")]
    pub capture_panics: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            base_url: None,
            api_key: None,
            queue_capacity: default_queue_capacity(),
            max_log_events: default_max_log_events(),
            timeout_secs: default_timeout(),
            capture_panics: default_capture_panics(),
        }
    }
}

impl TelemetryConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if !self.mode.is_development() && self.base_url.is_none() {
            return Err(Error::Config(
                "telemetry.base_url is required outside development mode".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(Error::Config(
                "telemetry.queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_log_events == 0 {
            return Err(Error::Config(
                "telemetry.max_log_events must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_queue_capacity() -> usize {
    100
}

fn default_max_log_events() -> usize {
    10_000
}

fn default_timeout() -> u64 {
    10
}

fn default_capture_panics() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/pagepulse/config.toml` (~/.config/pagepulse/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("pagepulse").join("config.toml")
    }

    /// Returns the data directory path (for the durable offline store)
    ///
    /// `$XDG_DATA_HOME/pagepulse/` (~/.local/share/pagepulse/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("pagepulse")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/pagepulse/` (~/.local/state/pagepulse/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("pagepulse")
    }

    /// Returns the offline store file path
    ///
    /// `$XDG_DATA_HOME/pagepulse/offline.db` (~/.local/share/pagepulse/offline.db)
    pub fn store_path() -> PathBuf {
        Self::data_dir().join("offline.db")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/pagepulse/pagepulse.log` (~/.local/state/pagepulse/pagepulse.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("pagepulse.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.telemetry.mode, Mode::Production);
        assert_eq!(config.telemetry.queue_capacity, 100);
        assert_eq!(config.telemetry.max_log_events, 10_000);
        assert_eq!(config.telemetry.timeout_secs, 10);
        assert!(config.telemetry.capture_panics);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[telemetry]
mode = "development"
base_url = "https://analytics.example.com"
queue_capacity = 50

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.telemetry.mode, Mode::Development);
        assert_eq!(
            config.telemetry.base_url.as_deref(),
            Some("https://analytics.example.com")
        );
        assert_eq!(config.telemetry.queue_capacity, 50);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validate_requires_base_url_in_production() {
        let config = TelemetryConfig::default();
        assert!(config.validate().is_err());

        let config = TelemetryConfig {
            base_url: Some("https://analytics.example.com".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        // Development mode never needs a backend
        let config = TelemetryConfig {
            mode: Mode::Development,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_capacities() {
        let config = TelemetryConfig {
            mode: Mode::Development,
            queue_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = TelemetryConfig {
            mode: Mode::Development,
            max_log_events: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
