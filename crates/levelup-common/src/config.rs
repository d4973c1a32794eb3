//! Progression configuration.
//!
//! Controls storage key layout, event queue sizing, and model export format.
//! Configuration can be loaded from and saved to a TOML file.

use crate::error::{LevelUpError, LevelUpResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "levelup.toml";

/// Default prefix for key-value storage keys.
pub const DEFAULT_KEY_PREFIX: &str = "levelup";

/// Progression configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelUpConfig {
    /// Prefix prepended to every key-value storage key
    pub key_prefix: String,
    /// Capacity of the progress event queue
    pub event_capacity: usize,
    /// Pretty-print exported model JSON
    pub pretty_json: bool,
}

impl Default for LevelUpConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            event_capacity: 256,
            pretty_json: false,
        }
    }
}

impl LevelUpConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", path.display());
                    config
                },
                Err(e) => {
                    warn!("Failed to parse config file: {e}");
                    Self::default()
                },
            },
            Err(e) => {
                warn!("Failed to read config file: {e}");
                Self::default()
            },
        }
    }

    /// Parse configuration from TOML text. The result is validated.
    pub fn from_toml_str(contents: &str) -> LevelUpResult<Self> {
        let mut config: Self =
            toml::from_str(contents).map_err(|e| LevelUpError::Config(e.to_string()))?;
        config.validate();
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> LevelUpResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| LevelUpError::Config(e.to_string()))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.event_capacity = self.event_capacity.clamp(16, 65_536);

        let trimmed = self.key_prefix.trim().trim_end_matches('.');
        self.key_prefix = if trimmed.is_empty() {
            DEFAULT_KEY_PREFIX.to_string()
        } else {
            trimmed.to_string()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = LevelUpConfig::default();
        assert_eq!(config.key_prefix, "levelup");
        assert_eq!(config.event_capacity, 256);
        assert!(!config.pretty_json);
    }

    #[test]
    fn test_config_validation() {
        let mut config = LevelUpConfig {
            key_prefix: "  ".to_string(),
            event_capacity: 1,
            pretty_json: true,
        };

        config.validate();

        assert_eq!(config.key_prefix, DEFAULT_KEY_PREFIX);
        assert_eq!(config.event_capacity, 16);
    }

    #[test]
    fn test_config_trailing_dot_prefix() {
        let config =
            LevelUpConfig::from_toml_str("key_prefix = \"game.lu.\"").expect("valid toml");
        assert_eq!(config.key_prefix, "game.lu");
        assert_eq!(config.event_capacity, 256);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join(CONFIG_FILE);

        let config = LevelUpConfig {
            key_prefix: "mygame.levelup".to_string(),
            event_capacity: 64,
            pretty_json: true,
        };
        config.save_to(&config_path).expect("Failed to save config");

        let loaded = LevelUpConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = LevelUpConfig::load_from("/nonexistent/path/levelup.toml");
        assert_eq!(config, LevelUpConfig::default());
    }

    #[test]
    fn test_config_load_invalid_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "event_capacity = \"lots\"").expect("write");

        let config = LevelUpConfig::load_from(&config_path);
        assert_eq!(config, LevelUpConfig::default());
    }

    #[test]
    fn test_from_toml_str_error() {
        let err = LevelUpConfig::from_toml_str("key_prefix = [").expect_err("invalid toml");
        assert!(matches!(err, LevelUpError::Config(_)));
    }
}
