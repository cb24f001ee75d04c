//! Optional TOML configuration file
//!
//! The file is only ever read. Every field has a default, so an empty or
//! partial file is valid.

use crate::startup::DEFAULT_THRESHOLD_MINUTES;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// File name looked up next to the executable
pub const CONFIG_FILE_NAME: &str = "speaker-sleep-guard.toml";

/// Configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Minutes after boot within which a launch counts as automatic
    pub threshold_minutes: u32,

    /// How long the launch notification stays visible
    pub notification_timeout_ms: u64,

    /// Start playing as soon as the application launches
    pub play_on_launch: bool,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log file path (empty = no file logging)
    pub log_file: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            threshold_minutes: DEFAULT_THRESHOLD_MINUTES,
            notification_timeout_ms: crate::NOTIFICATION_TIMEOUT_MS,
            play_on_launch: true,
            log_level: "info".to_string(),
            log_file: String::new(),
        }
    }
}

impl GuardConfig {
    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: "<inline>".to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e,
        })?;
        config.validate()?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load configuration from `explicit` or the default locations.
    ///
    /// Searches in order:
    /// 1. `explicit`, which must exist when given
    /// 2. Same directory as executable: speaker-sleep-guard.toml
    /// 3. User config directory: speaker-sleep-guard\config.toml
    ///
    /// Falls back to defaults when no file is found.
    pub fn load_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        for path in Self::search_paths() {
            if path.exists() {
                return Self::load(&path);
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Candidate configuration file locations, most specific first
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                paths.push(exe_dir.join(CONFIG_FILE_NAME));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join(crate::PACKAGE_DIR).join("config.toml"));
        }

        paths
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.notification_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "notification_timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn notification_timeout(&self) -> Duration {
        Duration::from_millis(self.notification_timeout_ms)
    }

    /// Log file path, if one is configured
    pub fn log_file(&self) -> Option<PathBuf> {
        if self.log_file.is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.log_file))
        }
    }
}

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Error parsing TOML
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    /// Value out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GuardConfig::default();
        assert_eq!(config.threshold_minutes, 5);
        assert_eq!(config.notification_timeout(), Duration::from_millis(5000));
        assert!(config.play_on_launch);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_file(), None);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(GuardConfig::from_toml("").unwrap(), GuardConfig::default());
    }

    #[test]
    fn test_partial_file() {
        let config = GuardConfig::from_toml(
            r#"
threshold_minutes = 10
log_file = "guard.log"
"#,
        )
        .unwrap();
        assert_eq!(config.threshold_minutes, 10);
        assert_eq!(config.log_file(), Some(PathBuf::from("guard.log")));
        assert_eq!(config.notification_timeout_ms, 5000);
        assert!(config.play_on_launch);
    }

    #[test]
    fn test_malformed_file() {
        let err = GuardConfig::from_toml("threshold_minutes = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = GuardConfig::from_toml("notification_timeout_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_explicit_file() {
        let path = std::env::temp_dir().join("speaker-sleep-guard-missing-config.toml");
        let err = GuardConfig::load_default(Some(path.as_path())).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "speaker-sleep-guard-test-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "play_on_launch = false\n").unwrap();

        let config = GuardConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(!config.play_on_launch);
        assert_eq!(config.threshold_minutes, 5);
    }
}
