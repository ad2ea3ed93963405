//! Configuration loading and precedence tests

use pretty_assertions::assert_eq;
use pyrite_config::{ConfigError, ConfigLoader, ConfigSource, DiagnosticLevel, StarImports};
use rstest::rstest;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

// ============================================================================
// Discovery
// ============================================================================

#[test]
#[serial]
fn test_finds_config_in_ancestor() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "pyrite.toml", "[analysis]\nstar_imports = \"report\"\n");

    let nested = temp_dir.path().join("src").join("pkg");
    fs::create_dir_all(&nested).unwrap();

    let loader = ConfigLoader::with_global_config(temp_dir.path().join("none.toml"));
    let config = loader.load_from_directory(&nested).unwrap();

    assert_eq!(config.project_root(), Some(temp_dir.path()));
    assert_eq!(config.settings.analysis.star_imports, StarImports::Report);
}

#[test]
#[serial]
fn test_pyrite_toml_wins_over_pyproject() {
    let temp_dir = TempDir::new().unwrap();
    let pyrite = write(temp_dir.path(), "pyrite.toml", "[server]\nworkers = 2\n");
    write(temp_dir.path(), "pyproject.toml", "[tool.pyrite.server]\nworkers = 7\n");

    let loader = ConfigLoader::with_global_config(temp_dir.path().join("none.toml"));
    let config = loader.load_from_directory(temp_dir.path()).unwrap();

    assert_eq!(config.settings.server.workers, 2);
    assert_eq!(config.sources, vec![ConfigSource::Project(pyrite)]);
}

#[test]
#[serial]
fn test_no_config_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_global_config(temp_dir.path().join("none.toml"));
    let config = loader.load_from_directory(temp_dir.path()).unwrap();

    assert!(!config.is_project());
    assert_eq!(config.settings.analysis.unresolved_severity, DiagnosticLevel::Hint);
    assert_eq!(config.settings.server.workers, 4);
}

// ============================================================================
// Precedence
// ============================================================================

#[test]
#[serial]
fn test_project_overrides_global() {
    let temp_dir = TempDir::new().unwrap();
    let global = write(
        temp_dir.path(),
        "global.toml",
        "[server]\nworkers = 6\nlog_level = \"debug\"\n",
    );
    let project_dir = temp_dir.path().join("project");
    fs::create_dir(&project_dir).unwrap();
    write(&project_dir, "pyrite.toml", "[server]\nworkers = 1\n");

    let config = ConfigLoader::with_global_config(&global)
        .load_from_directory(&project_dir)
        .unwrap();

    assert_eq!(config.settings.server.workers, 1);
    assert_eq!(config.settings.server.log_level, "debug");
    assert_eq!(config.sources[0], ConfigSource::Global(global));
}

#[test]
#[serial]
fn test_full_precedence_chain() {
    let temp_dir = TempDir::new().unwrap();
    let global = write(
        temp_dir.path(),
        "global.toml",
        "[python]\ninterpreter = \"/global/python\"\n",
    );
    write(temp_dir.path(), "pyrite.toml", "[python]\ninterpreter = \"/project/python\"\n");

    env::set_var("PYRITE_PYTHON", "/env/python");
    env::set_var("PYRITE_LOG", "trace");
    let result = ConfigLoader::with_global_config(&global).load_from_directory(temp_dir.path());
    env::remove_var("PYRITE_PYTHON");
    env::remove_var("PYRITE_LOG");

    let mut config = result.unwrap();
    assert_eq!(config.settings.python.interpreter, Some(PathBuf::from("/env/python")));
    assert_eq!(config.settings.server.log_level, "trace");

    config
        .apply_init_options(&serde_json::json!({"python": {"interpreter": "/client/python"}}))
        .unwrap();
    assert_eq!(config.settings.python.interpreter, Some(PathBuf::from("/client/python")));
}

// ============================================================================
// Errors
// ============================================================================

#[rstest]
#[case("[server]\nworkers = 0\n")]
#[case("[server]\nworkers = 1000\n")]
#[case("[completion]\nmax_items = 0\n")]
#[case("[analysis]\nextra_builtins = [\"1bad\"]\n")]
#[serial]
fn test_invalid_values_rejected(#[case] content: &str) {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "pyrite.toml", content);

    let result = ConfigLoader::with_global_config(temp_dir.path().join("none.toml"))
        .load_from_directory(temp_dir.path());

    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })), "{:?}", result);
}

#[rstest]
#[case("[server]\nworker = 2\n")]
#[case("[analysis]\nunresolved_severity = \"fatal\"\n")]
#[case("not toml at all [")]
#[serial]
fn test_malformed_files_rejected(#[case] content: &str) {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "pyrite.toml", content);

    let result = ConfigLoader::with_global_config(temp_dir.path().join("none.toml"))
        .load_from_directory(temp_dir.path());

    assert!(matches!(result, Err(ConfigError::TomlParseError { .. })), "{:?}", result);
}
