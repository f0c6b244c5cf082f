//! webstep Configuration Module
//!
//! Config is stored in `~/.config/webstep/config.toml`.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`WEBSTEP_WAIT_TIMEOUT_SECS`, `WEBSTEP_SCREENSHOTS`)
//! 2. Config file (`~/.config/webstep/config.toml`)
//! 3. Defaults
//!
//! ```toml
//! [wait]
//! timeout_secs = 10
//! poll_interval_ms = 200
//!
//! [screenshots]
//! enabled = true
//!
//! [settings]
//! "base.url" = "https://example.org"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WebStepError};

/// Default wait timeout in seconds
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 10;

/// Default poll interval for wait conditions in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WebConfig {
    /// Wait coordinator defaults
    #[serde(default)]
    pub wait: WaitConfig,

    /// Screenshot capture after element actions
    #[serde(default)]
    pub screenshots: ScreenshotConfig,

    /// Process-wide settings, consulted last during resolution
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

/// Wait configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaitConfig {
    /// Default timeout for waits (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// How often a wait condition is re-checked (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_WAIT_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_WAIT_TIMEOUT_SECS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

/// Screenshot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScreenshotConfig {
    #[serde(default)]
    pub enabled: bool,
}

impl WebConfig {
    /// Get the config directory path
    ///
    /// Returns `~/.config/webstep/` on Unix, `%APPDATA%/webstep/` on Windows
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("webstep")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from the default path
    ///
    /// Returns default config if file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path
    ///
    /// Returns default config if file doesn't exist.
    /// Returns error if file exists but is malformed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| WebStepError::ConfigError {
            reason: format!("Failed to read config file: {}", e),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| WebStepError::ConfigError {
            reason: format!("Failed to parse config file: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Merge with environment variables
    ///
    /// Environment variables take precedence over config file values.
    /// Unparseable values are ignored.
    pub fn with_env(mut self) -> Self {
        if let Ok(secs) = std::env::var("WEBSTEP_WAIT_TIMEOUT_SECS") {
            if let Ok(secs) = secs.trim().parse::<u64>() {
                if secs > 0 {
                    self.wait.timeout_secs = secs;
                }
            }
        }

        if let Ok(flag) = std::env::var("WEBSTEP_SCREENSHOTS") {
            match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.screenshots.enabled = true,
                "0" | "false" | "no" | "off" => self.screenshots.enabled = false,
                _ => {}
            }
        }

        self
    }

    fn validate(&self) -> Result<()> {
        if self.wait.timeout_secs == 0 {
            return Err(WebStepError::ConfigError {
                reason: "wait.timeout_secs must be greater than zero".to_string(),
            });
        }
        if self.wait.poll_interval_ms == 0 {
            return Err(WebStepError::ConfigError {
                reason: "wait.poll_interval_ms must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Default wait timeout
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait.timeout_secs)
    }

    /// Poll interval for wait conditions
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.wait.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path_contains_webstep() {
        let path = WebConfig::config_path();
        assert!(path.to_string_lossy().contains("webstep"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn test_defaults() {
        let config = WebConfig::default();
        assert_eq!(config.wait_timeout(), Duration::from_secs(10));
        assert_eq!(config.poll_interval(), Duration::from_millis(200));
        assert!(!config.screenshots.enabled);
        assert!(config.settings.is_empty());
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = WebConfig::load_from(&temp_dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, WebConfig::default());
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[screenshots]
enabled = true

[settings]
"base.url" = "https://example.org"
"#,
        )
        .unwrap();

        let config = WebConfig::load_from(&path).unwrap();
        assert!(config.screenshots.enabled);
        assert_eq!(config.wait.timeout_secs, DEFAULT_WAIT_TIMEOUT_SECS);
        assert_eq!(
            config.settings.get("base.url").map(String::as_str),
            Some("https://example.org")
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[wait]\ntimeout_secs = 0\n").unwrap();

        let err = WebConfig::load_from(&path).unwrap_err();
        assert_eq!(err.code(), "WEB-050");
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[wait\n").unwrap();

        assert!(matches!(
            WebConfig::load_from(&path),
            Err(WebStepError::ConfigError { .. })
        ));
    }

    #[test]
    #[serial]
    fn test_env_overrides_config() {
        env::set_var("WEBSTEP_WAIT_TIMEOUT_SECS", "3");
        env::set_var("WEBSTEP_SCREENSHOTS", "on");

        let config = WebConfig::default().with_env();
        assert_eq!(config.wait.timeout_secs, 3);
        assert!(config.screenshots.enabled);

        env::remove_var("WEBSTEP_WAIT_TIMEOUT_SECS");
        env::remove_var("WEBSTEP_SCREENSHOTS");
    }

    #[test]
    #[serial]
    fn test_env_ignores_garbage() {
        env::set_var("WEBSTEP_WAIT_TIMEOUT_SECS", "soon");

        let config = WebConfig::default().with_env();
        assert_eq!(config.wait.timeout_secs, DEFAULT_WAIT_TIMEOUT_SECS);

        env::remove_var("WEBSTEP_WAIT_TIMEOUT_SECS");
    }

    #[test]
    fn test_toml_format() {
        let mut config = WebConfig::default();
        config.settings.insert("env".into(), "staging".into());

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[wait]"));
        assert!(toml_str.contains("timeout_secs = 10"));
        assert!(toml_str.contains("[settings]"));
    }
}
