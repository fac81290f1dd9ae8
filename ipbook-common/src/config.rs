//! Configuration loading and root folder resolution
//!
//! Resolution priority for every setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable TOML file is never fatal: the binary logs a warning
//! and falls back to compiled defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "IPBOOK_ROOT_FOLDER";

/// Environment variable overriding the bind address
pub const BIND_ENV: &str = "IPBOOK_BIND";

/// Compiled-in defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub bind_addr: String,
    pub data_file: String,
    pub filter_sample_file: String,
    pub upload_limit_bytes: usize,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = dirs::data_local_dir()
            .map(|d| d.join("ipbook"))
            .unwrap_or_else(|| PathBuf::from("./ipbook_data"));

        Self {
            root_folder,
            bind_addr: "127.0.0.1:7777".to_string(),
            data_file: "ipbook-data.json".to_string(),
            filter_sample_file: "filterSample.json".to_string(),
            upload_limit_bytes: 50 * 1024 * 1024,
            log_level: "info".to_string(),
        }
    }
}

/// `[logging]` section of the TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<String>,
    pub bind_addr: Option<String>,
    pub data_file: Option<String>,
    pub filter_sample_file: Option<String>,
    pub upload_limit_bytes: Option<usize>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }
}

/// Locate the config file: `~/.config/ipbook/config.toml`, then
/// `/etc/ipbook/config.toml` on Linux.
pub fn config_file_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("ipbook").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/ipbook/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Resolves the folder holding the backing file and the static org snapshot
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml: TomlConfig,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, toml: TomlConfig) -> Self {
        Self { cli_arg, toml }
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml.root_folder {
            return PathBuf::from(path);
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Fully resolved settings for the service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub bind_addr: String,
    pub data_path: PathBuf,
    pub filter_sample_path: PathBuf,
    pub upload_limit_bytes: usize,
    pub log_level: String,
}

impl ServiceConfig {
    /// Merge CLI arguments, environment, TOML and compiled defaults
    pub fn resolve(cli_root: Option<PathBuf>, cli_bind: Option<String>, toml: TomlConfig) -> Self {
        let defaults = CompiledDefaults::for_current_platform();
        let root_folder = RootFolderResolver::new(cli_root, toml.clone()).resolve();

        let bind_addr = cli_bind
            .or_else(|| std::env::var(BIND_ENV).ok().filter(|v| !v.trim().is_empty()))
            .or_else(|| toml.bind_addr.clone())
            .unwrap_or(defaults.bind_addr);

        let data_file = toml.data_file.clone().unwrap_or(defaults.data_file);
        let filter_sample_file = toml
            .filter_sample_file
            .clone()
            .unwrap_or(defaults.filter_sample_file);

        Self {
            data_path: root_folder.join(data_file),
            filter_sample_path: root_folder.join(filter_sample_file),
            root_folder,
            bind_addr,
            upload_limit_bytes: toml.upload_limit_bytes.unwrap_or(defaults.upload_limit_bytes),
            log_level: toml.logging.level,
        }
    }

    /// Create the root folder if missing
    pub fn ensure_root_folder(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
        }
        Ok(())
    }
}
