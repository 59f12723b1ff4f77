//! Configuration resolution and graceful degradation tests
//!
//! Tests that manipulate MFD_ROOT_FOLDER or MFD_ROOT are marked with
//! #[serial] so they run sequentially, not in parallel.

use mfd_common::config::{
    CompiledDefaults, LoggingConfig, RootFolderInitializer, RootFolderResolver, TomlConfig,
    ENV_ROOT, ENV_ROOT_FOLDER,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert_eq!(defaults.log_level, "info");
    assert!(defaults.log_file.is_none());
    assert_eq!(defaults.port, 5790);
}

#[test]
#[serial]
fn test_resolver_env_var_root_folder() {
    env::remove_var(ENV_ROOT);
    env::set_var(ENV_ROOT_FOLDER, "/tmp/mfd-test-env-folder");

    let root_folder = RootFolderResolver::new("test-module").resolve();
    assert_eq!(root_folder, PathBuf::from("/tmp/mfd-test-env-folder"));

    env::remove_var(ENV_ROOT_FOLDER);
}

#[test]
#[serial]
fn test_resolver_env_var_root() {
    env::remove_var(ENV_ROOT_FOLDER);
    env::set_var(ENV_ROOT, "/tmp/mfd-test-env-root");

    let root_folder = RootFolderResolver::new("test-module").resolve();
    assert_eq!(root_folder, PathBuf::from("/tmp/mfd-test-env-root"));

    env::remove_var(ENV_ROOT);
}

#[test]
#[serial]
fn test_resolver_root_folder_takes_precedence() {
    env::set_var(ENV_ROOT_FOLDER, "/tmp/mfd-priority-1");
    env::set_var(ENV_ROOT, "/tmp/mfd-priority-2");

    let root_folder = RootFolderResolver::new("test-module").resolve();
    assert_eq!(root_folder, PathBuf::from("/tmp/mfd-priority-1"));

    env::remove_var(ENV_ROOT_FOLDER);
    env::remove_var(ENV_ROOT);
}

#[test]
#[serial]
fn test_resolver_missing_config_file_does_not_error() {
    env::remove_var(ENV_ROOT_FOLDER);
    env::remove_var(ENV_ROOT);

    // A module name that definitely won't have a config file
    let root_folder = RootFolderResolver::new("nonexistent-test-module-12345").resolve();

    assert_eq!(root_folder, CompiledDefaults::for_current_platform().root_folder);
}

#[test]
fn test_initializer_creates_nested_directories() {
    let base = tempfile::tempdir().unwrap();
    let root = base.path().join("level1").join("level2");

    let initializer = RootFolderInitializer::new(root.clone());
    initializer.ensure_directory_exists().unwrap();
    // Safe to call twice
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert!(initializer.objects_path().is_dir());
    assert!(!initializer.database_exists());
}

#[test]
fn test_toml_roundtrip() {
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/data/mfd")),
        port: Some(6001),
        storage_url: Some("https://storage.example.org/bucket".to_string()),
        logging: LoggingConfig::default(),
        heatmap: Default::default(),
    };

    let toml_str = toml::to_string(&config).unwrap();
    let parsed: TomlConfig = toml::from_str(&toml_str).unwrap();

    assert_eq!(parsed.root_folder, Some(PathBuf::from("/data/mfd")));
    assert_eq!(parsed.port, Some(6001));
    assert_eq!(parsed.storage_url.as_deref(), Some("https://storage.example.org/bucket"));
    assert_eq!(parsed.heatmap.max_days, 150);
}

#[test]
fn test_invalid_toml_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "port = \"not a number").unwrap();

    assert!(TomlConfig::load(&path).is_err());

    let config = TomlConfig::load_or_default(&path);
    assert!(config.port.is_none());
    assert_eq!(config.logging.level, "info");
}
