// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::RouterError;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub router: RouterConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
}

/// Host server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Core router configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RouterConfig {
    /// Root under which controller units are looked up
    pub controllers_location: String,
    /// Extension of the script marker, `index.<ext>/controller/method`
    pub script_extension: String,
    /// Folder the process was launched from
    pub launcher_folder_path: String,
    pub pretty_print: bool,
    /// Skips filter validation and development diagnostics
    pub production: bool,
    pub suppress_nulls: bool,
    pub show_stack_trace: bool,
    pub show_header_banner: bool,
    pub db_connection_auto: bool,
    pub force_auto_db_init: bool,
    /// Ordered filter identities to enable from the host's catalog
    #[serde(default)]
    pub filters: Vec<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            controllers_location: "controllers".to_string(),
            script_extension: "php".to_string(),
            launcher_folder_path: String::new(),
            pretty_print: true,
            production: false,
            suppress_nulls: true,
            show_stack_trace: true,
            show_header_banner: true,
            db_connection_auto: false,
            force_auto_db_init: false,
            filters: Vec::new(),
        }
    }
}

impl RouterConfig {
    /// Default configuration rooted at a launcher folder
    pub fn for_launcher_folder(path: impl AsRef<Path>) -> Result<Self, RouterError> {
        let config = Self {
            launcher_folder_path: path.as_ref().to_string_lossy().into_owned(),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the parameters the runtime cannot start without
    pub fn validate(&self) -> Result<(), RouterError> {
        if self.launcher_folder_path.trim().is_empty() {
            return Err(RouterError::Configuration(
                "launcher folder path must be set".to_string(),
            ));
        }
        let folder = Path::new(&self.launcher_folder_path);
        if !folder.is_dir() {
            return Err(RouterError::Configuration(format!(
                "launcher folder path '{}' does not exist or is not a directory",
                self.launcher_folder_path
            )));
        }
        if self.script_extension.trim().is_empty() {
            return Err(RouterError::Configuration(
                "script extension must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Marker preceding the routed path, e.g. `.php/`
    pub fn script_marker(&self) -> String {
        format!(".{}/", self.script_extension.trim_start_matches('.'))
    }

    /// Absolute location of the controllers root
    pub fn controllers_root(&self) -> PathBuf {
        Path::new(&self.launcher_folder_path).join(&self.controllers_location)
    }

    /// Whether the database hook may run for this deployment mode
    pub const fn db_init_allowed(&self) -> bool {
        !self.production || self.force_auto_db_init
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    /// Content type for raw passthrough results
    pub default_content_type: String,
    pub server_name: String,
    pub max_body_size: u64,
}
