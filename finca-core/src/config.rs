use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::kv::BackendType;

/// API used for login unless configured otherwise
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Login request timeout unless configured otherwise
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Application settings, stored as YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the login API
    pub api_base_url: String,

    /// Timeout for API requests, in seconds
    pub request_timeout_secs: u64,

    /// Where the key-value store lives (a directory, or a `.db` file)
    pub data_path: PathBuf,

    /// Backend to use; inferred from `data_path` when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendType>,

    /// Rewrite plot and crop farm references when a farm is renamed
    pub cascade_renames: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            data_path: default_data_path(),
            backend: None,
            cascade_renames: false,
        }
    }
}

impl AppConfig {
    /// Loads the configuration from the provided path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))
    }

    /// Loads the configuration if the file exists, defaults otherwise,
    /// then applies environment overrides
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = if path.as_ref().exists() {
            Self::load(&path)?
        } else {
            Self::default()
        };
        Ok(config.with_overrides(|name| std::env::var(name).ok()))
    }

    /// Applies `FINCA_API_URL` and `FINCA_DATA_PATH` as looked up by `lookup`
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("FINCA_API_URL").filter(|u| !u.is_empty()) {
            self.api_base_url = url;
        }
        if let Some(path) = lookup("FINCA_DATA_PATH").filter(|p| !p.is_empty()) {
            self.data_path = PathBuf::from(path);
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Save the configuration to the specified path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(&self)?;

        // Ensure parent directories exist
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Creates a default config file if it doesn't exist
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<()> {
        if path.as_ref().exists() {
            return Ok(());
        }
        Self::default().save(path)
    }
}

/// Gets the directory holding the config file
pub fn get_config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .or_else(dirs::home_dir)
        .context("Failed to determine config directory")?;
    Ok(base.join("finca"))
}

/// Gets the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    // Check if FINCA_CONFIG_PATH environment variable is set
    if let Ok(path) = std::env::var("FINCA_CONFIG_PATH") {
        return Ok(PathBuf::from(path));
    }

    Ok(get_config_dir()?.join("config.yaml"))
}

fn default_data_path() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("finca")
        .join("store")
}
