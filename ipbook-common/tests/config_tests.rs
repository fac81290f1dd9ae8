//! Unit tests for configuration resolution and graceful degradation
//!
//! Tests that manipulate IPBOOK_ROOT_FOLDER or IPBOOK_BIND are marked with
//! #[serial] so they run sequentially, not in parallel.

use ipbook_common::config::{
    CompiledDefaults, RootFolderResolver, ServiceConfig, TomlConfig, BIND_ENV, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[test]
fn test_compiled_defaults() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert_eq!(defaults.bind_addr, "127.0.0.1:7777");
    assert_eq!(defaults.data_file, "ipbook-data.json");
    assert_eq!(defaults.filter_sample_file, "filterSample.json");
    assert_eq!(defaults.upload_limit_bytes, 50 * 1024 * 1024);
    assert_eq!(defaults.log_level, "info");
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolver = RootFolderResolver::new(None, TomlConfig::default());
    let root_folder = resolver.resolve();

    assert_eq!(root_folder, CompiledDefaults::for_current_platform().root_folder);
}

#[test]
#[serial]
fn test_resolver_cli_beats_env() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/ipbook-env");

    let resolver = RootFolderResolver::new(Some(PathBuf::from("/tmp/ipbook-cli")), TomlConfig::default());
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/ipbook-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/ipbook-env");

    let toml = TomlConfig {
        root_folder: Some("/tmp/ipbook-toml".to_string()),
        ..Default::default()
    };
    let resolver = RootFolderResolver::new(None, toml);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/ipbook-env"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_toml_used_without_env() {
    env::remove_var(ROOT_FOLDER_ENV);

    let toml = TomlConfig {
        root_folder: Some("/tmp/ipbook-toml".to_string()),
        ..Default::default()
    };
    let resolver = RootFolderResolver::new(None, toml);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/ipbook-toml"));
}

#[test]
fn test_toml_config_parsing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
root_folder = "/srv/ipbook"
bind_addr = "0.0.0.0:8080"
data_file = "rows.json"
upload_limit_bytes = 1024

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = TomlConfig::load(&path).unwrap();
    assert_eq!(config.root_folder.as_deref(), Some("/srv/ipbook"));
    assert_eq!(config.bind_addr.as_deref(), Some("0.0.0.0:8080"));
    assert_eq!(config.data_file.as_deref(), Some("rows.json"));
    assert!(config.filter_sample_file.is_none());
    assert_eq!(config.upload_limit_bytes, Some(1024));
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_toml_config_missing_logging_section_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "bind_addr = \"127.0.0.1:9000\"\n").unwrap();

    let config = TomlConfig::load(&path).unwrap();
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_toml_config_invalid_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "bind_addr = [unterminated").unwrap();

    let err = TomlConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("Parse TOML failed"));
}

#[test]
#[serial]
fn test_service_config_paths_and_bind() {
    env::remove_var(BIND_ENV);
    env::remove_var(ROOT_FOLDER_ENV);

    let toml = TomlConfig {
        data_file: Some("rows.json".to_string()),
        bind_addr: Some("0.0.0.0:9999".to_string()),
        ..Default::default()
    };
    let config = ServiceConfig::resolve(Some(PathBuf::from("/tmp/ipbook-root")), None, toml);

    assert_eq!(config.data_path, PathBuf::from("/tmp/ipbook-root/rows.json"));
    assert_eq!(
        config.filter_sample_path,
        PathBuf::from("/tmp/ipbook-root/filterSample.json")
    );
    assert_eq!(config.bind_addr, "0.0.0.0:9999");
}

#[test]
#[serial]
fn test_service_config_cli_bind_wins() {
    env::set_var(BIND_ENV, "127.0.0.1:1111");

    let config = ServiceConfig::resolve(None, Some("127.0.0.1:2222".to_string()), TomlConfig::default());
    assert_eq!(config.bind_addr, "127.0.0.1:2222");

    env::remove_var(BIND_ENV);
}

#[test]
fn test_ensure_root_folder_creates_directory() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("nested").join("ipbook");

    let config = ServiceConfig::resolve(Some(root.clone()), None, TomlConfig::default());
    config.ensure_root_folder().unwrap();

    assert!(root.is_dir());
}
