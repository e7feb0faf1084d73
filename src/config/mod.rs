//! Configuration management.
//!
//! Settings come from an optional TOML file layered under `ARC_GRANTS_*`
//! environment variables; command-line flags override both.
//!
//! ```toml
//! [api]
//! base_url = "https://dataportal.arc.gov.au/NCGP/API/grants"
//! timeout_secs = 30
//! user_agent = "arc-grants/0.1.0"
//!
//! [output]
//! directory = "results"
//!
//! [search]
//! page_size = 100
//! ```
//!
//! Environment overrides use a double underscore between section and key,
//! e.g. `ARC_GRANTS_API__TIMEOUT_SECS=60`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::ARC_GRANTS_API_URL;
use crate::models::DEFAULT_PAGE_SIZE;
use crate::utils::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};

/// File name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "arc-grants.toml";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Upstream API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Export settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Search defaults
    #[serde(default)]
    pub search: SearchConfig,
}

/// Upstream API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Grants search endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Whole-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent sent with each request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    ARC_GRANTS_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for timestamped default output files
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

/// Search defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Page size used when `--page-size` is not given
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE as i64
}

/// Load configuration from a file, with environment overrides
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(env_source())
        .build()?
        .try_deserialize()
}

/// Defaults plus environment overrides, for runs without a config file
pub fn get_config() -> Result<Config, config::ConfigError> {
    config::Config::builder()
        .add_source(env_source())
        .build()?
        .try_deserialize()
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix("ARC_GRANTS")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// First existing config file: `./arc-grants.toml`, then `<config dir>/arc-grants/config.toml`
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("arc-grants").join("config.toml"))
        .filter(|path| path.is_file())
}
