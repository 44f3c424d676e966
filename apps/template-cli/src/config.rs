//! TOML configuration for `tmplctl`
//!
//! Every section is optional; a missing file section falls back to the
//! defaults below.

use anyhow::Context;
use content_codec::CodecOptions;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    /// Limits applied when values are saved
    #[serde(default)]
    pub codec: CodecOptions,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML for
    /// this configuration.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    ///
    /// # Errors
    ///
    /// Returns an error if `s` is not valid TOML or a value has the wrong type.
    ///
    /// # Example
    ///
    /// ```
    /// use template_cli::AppConfig;
    ///
    /// let config = AppConfig::from_str("[codec]\nmax_array_items = 5\n").unwrap();
    /// assert_eq!(config.codec.max_array_items, 5);
    /// assert!(AppConfig::from_str("[codec]\nmax_array_items = \"many\"\n").is_err());
    /// ```
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("Failed to parse TOML configuration")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    File,
    Memory,
}

/// Where schemas are kept
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: BackendKind,
    /// Directory for the file backend
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./schemas")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive, overridden by `RUST_LOG`
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}
