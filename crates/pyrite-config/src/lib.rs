//! Pyrite Configuration System
//!
//! Provides configuration management for the Pyrite language server:
//! - Project configuration (pyrite.toml or `[tool.pyrite]` in pyproject.toml)
//! - Global user configuration (`<config dir>/pyrite/config.toml`)
//! - Environment overrides
//! - Client `initializationOptions`
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Global config
//! 3. Project config
//! 4. Environment variables (PYRITE_WORKERS, PYRITE_PYTHON, PYRITE_LOG)
//! 5. initializationOptions sent by the client
//!
//! # Example
//!
//! ```no_run
//! use pyrite_config::ConfigLoader;
//! use std::path::Path;
//!
//! let loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("{} workers", config.settings.server.workers);
//! ```

pub mod global;
pub mod loader;
pub mod settings;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid initialization options: {0}")]
    InitOptions(#[from] serde_json::Error),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid environment variable {var}: {reason}")]
    InvalidEnv { var: String, reason: String },

    #[error("Configuration directory not found")]
    ConfigDirNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use global::GlobalConfig;
pub use loader::{Config, ConfigLoader, ConfigSource};
pub use settings::{
    AnalysisSettings, CompletionSettings, ConfigLayer, DiagnosticLevel, PythonSettings, Ranking,
    ServerSettings, Settings, StarImports,
};
