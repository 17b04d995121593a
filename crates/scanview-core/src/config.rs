//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/scanview/config.toml)
//! 3. Environment variables (SCANVIEW_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix
const ENV_PREFIX: &str = "SCANVIEW";

/// Name of the backing file for the document collection
pub const DOCUMENTS_FILE: &str = "documents.json";

/// Subdirectory for filter and manipulation outputs
pub const FILTERED_DIR: &str = "filtered";

/// Path of the OCR function below `ocr_url`
const OCR_FUNCTION_PATH: &str = "functions/v1/ocr-processor";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for document storage (documents.json, filtered images)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Base URL of the OCR backend (optional)
    #[serde(default)]
    pub ocr_url: Option<String>,

    /// Bearer token for the OCR backend (optional)
    #[serde(default)]
    pub ocr_api_key: Option<String>,

    /// OCR request timeout in seconds
    #[serde(default = "default_ocr_timeout")]
    pub ocr_timeout_secs: u64,

    /// Log level for the scanview crates
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            ocr_url: None,
            ocr_api_key: None,
            ocr_timeout_secs: default_ocr_timeout(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (SCANVIEW_DATA_DIR, SCANVIEW_OCR_URL, ...)
    /// 2. Config file (~/.config/scanview/config.toml or SCANVIEW_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Configuration rooted at a specific data directory, everything else default
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // SCANVIEW_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // SCANVIEW_OCR_URL
        if let Ok(val) = std::env::var(format!("{}_OCR_URL", ENV_PREFIX)) {
            self.ocr_url = if val.is_empty() { None } else { Some(val) };
        }

        // SCANVIEW_OCR_API_KEY
        if let Ok(val) = std::env::var(format!("{}_OCR_API_KEY", ENV_PREFIX)) {
            self.ocr_api_key = if val.is_empty() { None } else { Some(val) };
        }

        // SCANVIEW_LOG_LEVEL
        if let Ok(val) = std::env::var(format!("{}_LOG_LEVEL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.log_level = val;
            }
        }
    }

    /// Set a configuration value by key
    ///
    /// Empty values clear optional settings.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let optional = |v: &str| {
            if v.is_empty() {
                None
            } else {
                Some(v.to_string())
            }
        };

        match key {
            "data_dir" => self.data_dir = PathBuf::from(value),
            "ocr_url" => self.ocr_url = optional(value),
            "ocr_api_key" => self.ocr_api_key = optional(value),
            "ocr_timeout_secs" => {
                self.ocr_timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid timeout: {}", value))?
            }
            "log_level" => self.log_level = value.to_string(),
            _ => anyhow::bail!(
                "Unknown configuration key: {}. Valid keys: data_dir, ocr_url, ocr_api_key, ocr_timeout_secs, log_level",
                key
            ),
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with SCANVIEW_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scanview")
            .join("config.toml")
    }

    /// Get the path to the backing documents file
    pub fn documents_path(&self) -> PathBuf {
        self.data_dir.join(DOCUMENTS_FILE)
    }

    /// Get the directory for filter and manipulation outputs
    pub fn filtered_dir(&self) -> PathBuf {
        self.data_dir.join(FILTERED_DIR)
    }

    /// Full OCR endpoint URL, if a backend is configured
    pub fn ocr_endpoint(&self) -> Option<String> {
        self.ocr_url
            .as_deref()
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), OCR_FUNCTION_PATH))
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scanview")
}

fn default_ocr_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}
