//! Global Configuration (`<config dir>/pyrite/config.toml`)
//!
//! Handles user-level configuration shared by every workspace.

use crate::settings::ConfigLayer;
use crate::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};

/// Global user configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalConfig {
    pub layer: ConfigLayer,
    /// File the layer was read from, if any
    pub path: Option<PathBuf>,
}

impl GlobalConfig {
    /// Load global configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let layer = ConfigLayer::from_toml(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;
        Ok(Self {
            layer,
            path: Some(path.to_path_buf()),
        })
    }

    /// Load from `path` if it exists; a missing file is an empty config
    pub fn load_optional(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    /// Get the global config file path
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let dir = dirs::config_dir().ok_or(ConfigError::ConfigDirNotFound)?;
        Ok(dir.join("pyrite").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_global_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[completion]\nranking = \"alphabetical\"\n").unwrap();

        let config = GlobalConfig::load_from_file(&path).unwrap();
        assert_eq!(config.path.as_deref(), Some(path.as_path()));
        assert!(config.layer.completion.is_some());
    }

    #[test]
    fn test_missing_global_config_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let config = GlobalConfig::load_optional(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, GlobalConfig::default());
    }

    #[test]
    fn test_invalid_global_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[server\n").unwrap();
        assert!(matches!(
            GlobalConfig::load_from_file(&path),
            Err(ConfigError::TomlParseError { .. })
        ));
    }

    #[test]
    fn test_global_config_path_ends_with_pyrite() {
        if let Ok(path) = GlobalConfig::global_config_path() {
            assert!(path.ends_with("pyrite/config.toml"));
        }
    }
}
