//! Application settings loading from config.toml
//!
//! Every setting has a default, so a missing file is not an error. The file
//! location can be overridden with the `CUOTA_CONFIG` environment variable.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Default location of the settings file
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

fn default_log_level() -> String {
    "info".to_string()
}

/// Settings read from config.toml
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Fallback tracing filter when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Database URL, overridden by `DATABASE_URL`
    #[serde(default)]
    pub database_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            database_url: None,
        }
    }
}

/// Parses settings from TOML text.
///
/// # Errors
/// Returns `Error::Config` if the TOML is invalid or a value has the wrong type.
pub fn parse_settings(contents: &str) -> Result<Settings> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse settings: {e}"),
    })
}

/// Loads settings from a TOML file, falling back to defaults when it is absent.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    if !path.exists() {
        debug!("No settings file at {:?}, using defaults", path);
        return Ok(Settings::default());
    }
    let contents = std::fs::read_to_string(path)?;
    parse_settings(&contents)
}

/// Loads settings from `CUOTA_CONFIG` or ./config.toml
pub fn load_default_settings() -> Result<Settings> {
    let path = std::env::var("CUOTA_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_settings(path)
}
