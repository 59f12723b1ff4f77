//! Configuration loading and root folder resolution
//!
//! Root folder resolution priority order:
//! 1. Command-line argument (handled by the caller, highest priority)
//! 2. Environment variable (`MFD_ROOT_FOLDER`, then `MFD_ROOT`)
//! 3. TOML config file (`<config_dir>/mfd/<module>.toml`)
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file never stops startup: a warning is
//! logged and compiled defaults are used instead.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Primary root folder environment variable
pub const ENV_ROOT_FOLDER: &str = "MFD_ROOT_FOLDER";

/// Alternative root folder environment variable
pub const ENV_ROOT: &str = "MFD_ROOT";

/// Default HTTP port for the data visualization service
pub const DEFAULT_PORT: u16 = 5790;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TomlConfig {
    /// Root folder holding the metadata database and local objects
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Base URL of a remote object store (uses the local object folder when absent)
    #[serde(default)]
    pub storage_url: Option<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Heatmap aggregation settings
    #[serde(default)]
    pub heatmap: HeatmapConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Heatmap aggregation settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HeatmapConfig {
    /// Maximum number of calendar days on the rendered day axis
    #[serde(default = "default_max_days")]
    pub max_days: usize,

    /// Colour scale ceiling used when no custom maximum is supplied
    #[serde(default = "default_max_value")]
    pub default_max_value: f64,

    /// Lowest permitted colour scale floor
    #[serde(default = "default_min_floor")]
    pub min_floor: f64,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            max_days: default_max_days(),
            default_max_value: default_max_value(),
            min_floor: default_min_floor(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_days() -> usize {
    150
}

fn default_max_value() -> f64 {
    10.0
}

fn default_min_floor() -> f64 {
    0.001
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
    }

    /// Parse a TOML config file, falling back to defaults when it is missing or invalid
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "No TOML config file, using defaults");
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }
}

/// Compiled-in defaults for the current platform
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub port: u16,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was compiled for
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: default_log_level(),
            log_file: None,
            port: DEFAULT_PORT,
        }
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/mfd (or /var/lib/mfd for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("mfd"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/mfd"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("mfd"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/mfd"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("mfd"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\mfd"))
    } else {
        PathBuf::from("./mfd_data")
    }
}

/// Resolves the root folder for one service module
pub struct RootFolderResolver {
    module_name: String,
}

impl RootFolderResolver {
    /// Create a resolver; `module_name` selects `<config_dir>/mfd/<module_name>.toml`
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
        }
    }

    /// Path of this module's TOML config file, if the platform has a config dir
    pub fn config_file_path(&self) -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("mfd").join(format!("{}.toml", self.module_name)))
    }

    /// Resolve root folder from environment, TOML file, then compiled default
    pub fn resolve(&self) -> PathBuf {
        if let Ok(path) = std::env::var(ENV_ROOT_FOLDER) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Ok(path) = std::env::var(ENV_ROOT) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(config_path) = self.config_file_path() {
            if let Some(root) = TomlConfig::load_or_default(&config_path).root_folder {
                return root;
            }
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder layout and derives the paths inside it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Metadata database path (`<root>/mfd.db`)
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join("mfd.db")
    }

    /// Local object store directory (`<root>/objects`)
    pub fn objects_path(&self) -> PathBuf {
        self.root_folder.join("objects")
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    /// Create the root folder and the object directory (idempotent)
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        std::fs::create_dir_all(self.objects_path())?;
        Ok(())
    }
}
