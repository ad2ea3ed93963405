//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::global::GlobalConfig;
use crate::settings::{ConfigLayer, Settings};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Project configuration file name
pub const PROJECT_CONFIG_FILE: &str = "pyrite.toml";

/// Environment variable overriding `server.workers`
pub const ENV_WORKERS: &str = "PYRITE_WORKERS";
/// Environment variable overriding `python.interpreter`
pub const ENV_PYTHON: &str = "PYRITE_PYTHON";
/// Environment variable overriding `server.log_level`
pub const ENV_LOG: &str = "PYRITE_LOG";

/// Where a piece of the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Global(PathBuf),
    Project(PathBuf),
    /// `[tool.pyrite]` in a pyproject.toml
    Pyproject(PathBuf),
    Environment(&'static str),
    InitializationOptions,
}

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config - lowest priority
/// 2. Project config (pyrite.toml, else `[tool.pyrite]`) - overrides global
/// 3. Environment variables (PYRITE_*) - overrides project
/// 4. initializationOptions - highest priority (applied via [`Config::apply_init_options`])
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    /// Global config file; the platform default when unset
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub settings: Settings,

    /// Directory the project config was found in
    pub project_root: Option<PathBuf>,

    /// Sources applied, lowest precedence first
    pub sources: Vec<ConfigSource>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the global layer from `path` instead of the platform location
    pub fn with_global_config(path: impl Into<PathBuf>) -> Self {
        Self {
            global_config_path: Some(path.into()),
        }
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find a project config, then merges the
    /// global config under it and environment overrides over it.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<Config> {
        let mut settings = Settings::default();
        let mut sources = Vec::new();

        let global = self.load_global_config()?;
        if let Some(path) = global.path {
            settings.apply(&global.layer);
            sources.push(ConfigSource::Global(path));
        }

        let project_root = match find_project_config(start_dir)? {
            Some((root, source, layer)) => {
                settings.apply(&layer);
                sources.push(source);
                Some(root)
            }
            None => None,
        };

        apply_env_overrides(&mut settings, &mut sources)?;
        settings.validate()?;

        debug!(?project_root, sources = sources.len(), "configuration loaded");
        Ok(Config {
            settings,
            project_root,
            sources,
        })
    }

    fn load_global_config(&self) -> ConfigResult<GlobalConfig> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => match GlobalConfig::global_config_path() {
                Ok(path) => path,
                // no config dir on this platform, nothing to load
                Err(ConfigError::ConfigDirNotFound) => return Ok(GlobalConfig::default()),
                Err(e) => return Err(e),
            },
        };
        GlobalConfig::load_optional(&path)
    }
}

impl Config {
    /// Apply client `initializationOptions` on top of everything else.
    ///
    /// On error the configuration is left unchanged.
    pub fn apply_init_options(&mut self, options: &serde_json::Value) -> ConfigResult<()> {
        let layer = ConfigLayer::from_json(options)?;
        if layer.is_empty() {
            return Ok(());
        }

        let mut settings = self.settings.clone();
        settings.apply(&layer);
        settings.validate()?;

        self.settings = settings;
        self.sources.push(ConfigSource::InitializationOptions);
        Ok(())
    }

    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if a project config was found
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }
}

/// Find the nearest project config walking up from `start_dir`.
///
/// In each directory `pyrite.toml` wins over pyproject.toml; a pyproject.toml
/// without a `[tool.pyrite]` table does not count.
fn find_project_config(
    start_dir: &Path,
) -> ConfigResult<Option<(PathBuf, ConfigSource, ConfigLayer)>> {
    let mut current = Some(start_dir);

    while let Some(dir) = current {
        let config_path = dir.join(PROJECT_CONFIG_FILE);
        if config_path.is_file() {
            let layer = read_layer(&config_path)?;
            return Ok(Some((dir.to_path_buf(), ConfigSource::Project(config_path), layer)));
        }

        let pyproject = dir.join("pyproject.toml");
        if pyproject.is_file() {
            if let Some(layer) = read_pyproject(&pyproject)? {
                return Ok(Some((dir.to_path_buf(), ConfigSource::Pyproject(pyproject), layer)));
            }
        }

        current = dir.parent();
    }

    Ok(None)
}

fn read_layer(path: &Path) -> ConfigResult<ConfigLayer> {
    let content = std::fs::read_to_string(path)?;
    ConfigLayer::from_toml(&content).map_err(|e| ConfigError::TomlParseError {
        file: path.to_path_buf(),
        error: e,
    })
}

fn read_pyproject(path: &Path) -> ConfigResult<Option<ConfigLayer>> {
    let content = std::fs::read_to_string(path)?;
    let parse_error = |e| ConfigError::TomlParseError {
        file: path.to_path_buf(),
        error: e,
    };

    let document: toml::Table = toml::from_str(&content).map_err(parse_error)?;
    let section = document
        .get("tool")
        .and_then(|tool| tool.get("pyrite"))
        .cloned();

    match section {
        Some(value) => Ok(Some(value.try_into().map_err(parse_error)?)),
        None => Ok(None),
    }
}

/// Apply PYRITE_* environment variable overrides
fn apply_env_overrides(
    settings: &mut Settings,
    sources: &mut Vec<ConfigSource>,
) -> ConfigResult<()> {
    if let Ok(workers) = env::var(ENV_WORKERS) {
        settings.server.workers = workers.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            var: ENV_WORKERS.to_string(),
            reason: format!("expected a positive integer, got '{}'", workers),
        })?;
        sources.push(ConfigSource::Environment(ENV_WORKERS));
    }

    if let Ok(python) = env::var(ENV_PYTHON) {
        if !python.is_empty() {
            settings.python.interpreter = Some(PathBuf::from(python));
            sources.push(ConfigSource::Environment(ENV_PYTHON));
        }
    }

    if let Ok(log) = env::var(ENV_LOG) {
        if !log.is_empty() {
            settings.server.log_level = log;
            sources.push(ConfigSource::Environment(ENV_LOG));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Ranking;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn loader_without_global(dir: &TempDir) -> ConfigLoader {
        ConfigLoader::with_global_config(dir.path().join("no-global.toml"))
    }

    #[test]
    #[serial]
    fn test_load_project_config() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(PROJECT_CONFIG_FILE), "[server]\nworkers = 3\n").unwrap();

        let config = loader_without_global(&temp_dir)
            .load_from_directory(temp_dir.path())
            .unwrap();

        assert_eq!(config.settings.server.workers, 3);
        assert!(config.is_project());
    }

    #[test]
    #[serial]
    fn test_pyproject_tool_section() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("pyproject.toml"),
            "[project]\nname = \"demo\"\n\n[tool.pyrite.completion]\nranking = \"alphabetical\"\n",
        )
        .unwrap();

        let config = loader_without_global(&temp_dir)
            .load_from_directory(temp_dir.path())
            .unwrap();

        assert_eq!(config.settings.completion.ranking, Ranking::Alphabetical);
        assert!(matches!(config.sources.last(), Some(ConfigSource::Pyproject(_))));
    }

    #[test]
    #[serial]
    fn test_pyproject_without_section_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("pyproject.toml"), "[project]\nname = \"demo\"\n").unwrap();

        let config = loader_without_global(&temp_dir)
            .load_from_directory(temp_dir.path())
            .unwrap();

        assert!(!config.is_project());
    }

    #[test]
    #[serial]
    fn test_env_override_workers() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(PROJECT_CONFIG_FILE), "[server]\nworkers = 3\n").unwrap();

        env::set_var(ENV_WORKERS, "9");
        let config = loader_without_global(&temp_dir).load_from_directory(temp_dir.path());
        env::remove_var(ENV_WORKERS);

        assert_eq!(config.unwrap().settings.server.workers, 9);
    }

    #[test]
    #[serial]
    fn test_env_override_invalid_workers() {
        let temp_dir = TempDir::new().unwrap();

        env::set_var(ENV_WORKERS, "many");
        let result = loader_without_global(&temp_dir).load_from_directory(temp_dir.path());
        env::remove_var(ENV_WORKERS);

        assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })));
    }

    #[test]
    #[serial]
    fn test_init_options_apply_last() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(PROJECT_CONFIG_FILE),
            "[completion]\nmax_items = 20\n",
        )
        .unwrap();

        let mut config = loader_without_global(&temp_dir)
            .load_from_directory(temp_dir.path())
            .unwrap();
        config
            .apply_init_options(&serde_json::json!({"completion": {"max_items": 5}}))
            .unwrap();

        assert_eq!(config.settings.completion.max_items, 5);
        assert_eq!(config.sources.last(), Some(&ConfigSource::InitializationOptions));
    }

    #[test]
    #[serial]
    fn test_invalid_init_options_leave_config_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = loader_without_global(&temp_dir)
            .load_from_directory(temp_dir.path())
            .unwrap();
        let before = config.clone();

        assert!(config
            .apply_init_options(&serde_json::json!({"server": {"workers": 0}}))
            .is_err());
        assert_eq!(config, before);
    }
}
