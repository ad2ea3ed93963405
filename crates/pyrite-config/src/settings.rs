//! Configuration layers and resolved settings
//!
//! Every source (global file, project file, initializationOptions) parses into
//! a [`ConfigLayer`] whose fields are all optional. Layers are applied in
//! precedence order onto [`Settings::default`] to produce the effective
//! configuration.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Upper bound for `server.workers`
pub const MAX_WORKERS: usize = 256;

/// Severity names accepted in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Error,
    Warning,
    Information,
    Hint,
}

/// Treatment of unresolved names in modules with `from m import *`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StarImports {
    #[default]
    Suppress,
    Report,
}

/// Completion ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ranking {
    /// Nearest scope first, then builtins, then keywords
    #[default]
    Scope,
    Alphabetical,
}

// ============================================================================
// Layers
// ============================================================================

/// One configuration source; absent fields leave lower layers untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<CompletionConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub python: Option<PythonConfig>,
}

/// `[analysis]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unresolved_severity: Option<DiagnosticLevel>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub star_imports: Option<StarImports>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_builtins: Option<Vec<String>>,
}

/// `[completion]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompletionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking: Option<Ranking>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_keywords: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
}

/// `[server]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Concurrent analysis jobs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    /// `tracing` filter directive, e.g. `info` or `pyrite_lsp=debug`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Also write JSON logs to this file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

/// `[python]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PythonConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<PathBuf>,
}

impl ConfigLayer {
    /// Parse a layer from TOML text
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Parse a layer from client `initializationOptions`
    pub fn from_json(value: &serde_json::Value) -> ConfigResult<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// ============================================================================
// Resolved settings
// ============================================================================

/// Effective configuration after all layers are applied
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Settings {
    pub analysis: AnalysisSettings,
    pub completion: CompletionSettings,
    pub server: ServerSettings,
    pub python: PythonSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    pub unresolved_severity: DiagnosticLevel,
    pub star_imports: StarImports,
    pub extra_builtins: Vec<String>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            unresolved_severity: DiagnosticLevel::Hint,
            star_imports: StarImports::Suppress,
            extra_builtins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSettings {
    pub ranking: Ranking,
    pub include_keywords: bool,
    pub max_items: usize,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            ranking: Ranking::Scope,
            include_keywords: true,
            max_items: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub workers: usize,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PythonSettings {
    pub interpreter: Option<PathBuf>,
}

impl Settings {
    /// Overlay `layer`; its present fields win
    pub fn apply(&mut self, layer: &ConfigLayer) {
        if let Some(analysis) = &layer.analysis {
            if let Some(severity) = analysis.unresolved_severity {
                self.analysis.unresolved_severity = severity;
            }
            if let Some(star_imports) = analysis.star_imports {
                self.analysis.star_imports = star_imports;
            }
            if let Some(builtins) = &analysis.extra_builtins {
                self.analysis.extra_builtins = builtins.clone();
            }
        }

        if let Some(completion) = &layer.completion {
            if let Some(ranking) = completion.ranking {
                self.completion.ranking = ranking;
            }
            if let Some(include_keywords) = completion.include_keywords {
                self.completion.include_keywords = include_keywords;
            }
            if let Some(max_items) = completion.max_items {
                self.completion.max_items = max_items;
            }
        }

        if let Some(server) = &layer.server {
            if let Some(workers) = server.workers {
                self.server.workers = workers;
            }
            if let Some(log_level) = &server.log_level {
                self.server.log_level = log_level.clone();
            }
            if let Some(log_file) = &server.log_file {
                self.server.log_file = Some(log_file.clone());
            }
        }

        if let Some(python) = &layer.python {
            if let Some(interpreter) = &python.interpreter {
                self.python.interpreter = Some(interpreter.clone());
            }
        }
    }

    /// Validate the effective configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.workers == 0 || self.server.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidValue {
                field: "server.workers".to_string(),
                reason: format!(
                    "must be between 1 and {}, got {}",
                    MAX_WORKERS, self.server.workers
                ),
            });
        }

        if self.server.log_level.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "server.log_level".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        if self.completion.max_items == 0 {
            return Err(ConfigError::InvalidValue {
                field: "completion.max_items".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        for name in &self.analysis.extra_builtins {
            if !is_identifier(name) {
                return Err(ConfigError::InvalidValue {
                    field: "analysis.extra_builtins".to_string(),
                    reason: format!("'{}' is not a Python identifier", name),
                });
            }
        }

        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_alphabetic() => {
            chars.all(|c| c == '_' || c.is_alphanumeric())
        }
        _ => false,
    }
}
