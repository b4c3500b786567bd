//! Configuration loading and management.
//!
//! Loader defaults can be loaded from TOML, YAML or JSON files, or discovered as
//! `vellum.toml` in the current directory hierarchy.

use crate::error::DEFAULT_LOAD_ERROR_MESSAGE;
use crate::types::{CharacterMap, HttpHeaders};
use crate::{Result, VellumError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name searched for by [`LoaderConfig::discover`].
pub const CONFIG_FILE_NAME: &str = "vellum.toml";

/// Loader configuration.
///
/// # Example
///
/// ```rust
/// use vellum::core::config::LoaderConfig;
///
/// let config = LoaderConfig::default();
/// assert_eq!(config.theme_prefix, "rpv");
///
/// // let config = LoaderConfig::from_toml_file("vellum.toml")?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Send cookies/credentials with remote document requests
    #[serde(default)]
    pub with_credentials: bool,

    /// Extra headers for remote document requests
    #[serde(default)]
    pub http_headers: HttpHeaders,

    /// Character map location (None = engine default)
    #[serde(default)]
    pub character_map: Option<CharacterMap>,

    /// CSS class prefix for the default views
    #[serde(default = "default_theme_prefix")]
    pub theme_prefix: String,

    /// Message shown when the engine rejects without one
    #[serde(default = "default_error_message")]
    pub default_error_message: String,

    /// Prefix of engine worker names
    #[serde(default = "default_worker_name_prefix")]
    pub worker_name_prefix: String,

    /// Bytes read per progress tick for local files
    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: usize,
}

fn default_theme_prefix() -> String {
    "rpv".to_string()
}

fn default_error_message() -> String {
    DEFAULT_LOAD_ERROR_MESSAGE.to_string()
}

fn default_worker_name_prefix() -> String {
    "PDFWorker".to_string()
}

fn default_read_chunk_size() -> usize {
    64 * 1024
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            with_credentials: false,
            http_headers: HttpHeaders::new(),
            character_map: None,
            theme_prefix: default_theme_prefix(),
            default_error_message: default_error_message(),
            worker_name_prefix: default_worker_name_prefix(),
            read_chunk_size: default_read_chunk_size(),
        }
    }
}

impl LoaderConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `VellumError::Validation` if the file cannot be read, is invalid
    /// TOML, or fails [`validate`](Self::validate).
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = read_config(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| VellumError::validation(format!("Invalid TOML in {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = read_config(path)?;
        let config: Self = serde_yaml_ng::from_str(&content)
            .map_err(|e| VellumError::validation(format!("Invalid YAML in {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = read_config(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| VellumError::validation(format!("Invalid JSON in {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration choosing the format from the file extension.
    ///
    /// `.yaml`/`.yml` and `.json` are recognised; everything else is read as TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("yaml") | Some("yml") => Self::from_yaml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// Discover configuration file in parent directories.
    ///
    /// Searches for `vellum.toml` in current directory and parent directories.
    ///
    /// # Returns
    ///
    /// - `Some(config)` if found
    /// - `None` if no config file found
    pub fn discover() -> Result<Option<Self>> {
        let mut current = std::env::current_dir().map_err(VellumError::Io)?;

        loop {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                tracing::debug!("Using configuration from {}", candidate.display());
                return Ok(Some(Self::from_toml_file(candidate)?));
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(None)
    }

    /// Check values that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.read_chunk_size == 0 {
            return Err(VellumError::validation("read_chunk_size must be greater than zero"));
        }
        if self.theme_prefix.trim().is_empty() {
            return Err(VellumError::validation("theme_prefix must not be empty"));
        }
        if let Some(cmap) = &self.character_map
            && cmap.url.trim().is_empty()
        {
            return Err(VellumError::validation("character_map.url must not be empty"));
        }
        Ok(())
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| VellumError::validation(format!("Failed to read config file {}: {}", path.display(), e)))
}
