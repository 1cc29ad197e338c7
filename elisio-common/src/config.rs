//! Configuration loading for the Elisio client
//!
//! Bootstrap settings come from a TOML file; the server URL can be overridden
//! from the command line or environment. Priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable config file is not an error: a warning is logged
//! and compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Compiled default server location (Django development server)
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000/";

/// Environment variable overriding the server URL
pub const SERVER_URL_ENV: &str = "ELISIO_SERVER_URL";

/// Environment variable pointing at an explicit config file
pub const CONFIG_PATH_ENV: &str = "ELISIO_CONFIG";

const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Base URL of the Elisio server
    #[serde(default)]
    pub server_url: Option<String>,

    /// Session cookie value of an already authenticated browser session
    #[serde(default)]
    pub session_id: Option<String>,

    /// Anti-forgery token, if the session's `csrftoken` cookie is known up front
    #[serde(default)]
    pub csrf_token: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// UI event bus capacity
    #[serde(default)]
    pub event_capacity: Option<usize>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), file: None }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Fully resolved client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub server_url: String,
    pub session_id: Option<String>,
    pub csrf_token: Option<String>,
    pub request_timeout: Duration,
    pub event_capacity: usize,
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default())
    }
}

impl ClientConfig {
    fn from_toml(toml: TomlConfig) -> Self {
        Self {
            server_url: toml.server_url.unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            session_id: toml.session_id,
            csrf_token: toml.csrf_token,
            request_timeout: Duration::from_secs(
                toml.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            event_capacity: toml.event_capacity.unwrap_or(DEFAULT_EVENT_CAPACITY),
            logging: toml.logging,
        }
    }
}

/// Resolves `ClientConfig` from CLI arguments, environment and TOML file
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    cli_server_url: Option<String>,
    cli_config_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Server URL given on the command line
    pub fn with_server_url(mut self, url: Option<String>) -> Self {
        self.cli_server_url = url;
        self
    }

    /// Config file given on the command line
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.cli_config_path = path;
        self
    }

    /// Config file to read, if any: CLI → `ELISIO_CONFIG` → platform locations
    pub fn config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.cli_config_path {
            return Some(path.clone());
        }
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }
        default_config_locations().into_iter().find(|p| p.exists())
    }

    pub fn resolve(&self) -> ClientConfig {
        let toml = match self.config_path() {
            Some(path) => match load_toml_config(&path) {
                Ok(config) => {
                    info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Could not load config {}: {} (using defaults)", path.display(), e);
                    TomlConfig::default()
                }
            },
            None => {
                debug!("No config file found, using compiled defaults");
                TomlConfig::default()
            }
        };

        let mut config = ClientConfig::from_toml(toml);

        // Priority 2: Environment variable
        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            if !url.trim().is_empty() {
                config.server_url = url;
            }
        }

        // Priority 1: Command-line argument
        if let Some(url) = &self.cli_server_url {
            config.server_url = url.clone();
        }

        config
    }
}

/// Platform config file locations, most specific first
pub fn default_config_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join("elisio").join("config.toml"));
    }
    if cfg!(target_os = "linux") {
        locations.push(PathBuf::from("/etc/elisio/config.toml"));
    }
    locations
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    Ok(config)
}

/// Write a TOML config file atomically (temp file + rename)
///
/// On Unix the file is created with 0600 permissions since it may hold a
/// session cookie.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp, path)?;
    Ok(())
}
