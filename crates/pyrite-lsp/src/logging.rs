//! Tracing setup
//!
//! stdout carries the protocol, so human-readable logs go to stderr. When
//! `server.log_file` is set, JSON lines are also appended to that file
//! through a non-blocking writer.

use anyhow::Context;
use pyrite_config::loader::ENV_LOG;
use pyrite_config::ServerSettings;
use std::env;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::JsonFields;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global subscriber.
///
/// The returned guard flushes the log file on drop; keep it alive for the
/// life of the process.
pub fn init(settings: &ServerSettings) -> anyhow::Result<Option<WorkerGuard>> {
    let directive = filter_directive(
        env::var(ENV_LOG).ok(),
        env::var(EnvFilter::DEFAULT_ENV).ok(),
        &settings.log_level,
    );
    let env_filter =
        EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false);

    let (file_layer, guard) = match &settings.log_file {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            }
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .fmt_fields(JsonFields::default());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    Ok(guard)
}

/// First non-empty of `PYRITE_LOG`, `RUST_LOG`, then the configured level
fn filter_directive(
    pyrite_log: Option<String>,
    rust_log: Option<String>,
    configured: &str,
) -> String {
    [pyrite_log, rust_log, Some(configured.to_string())]
        .into_iter()
        .flatten()
        .map(|directive| directive.trim().to_string())
        .find(|directive| !directive.is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_string())
}
