//! TOML configuration file parsing.
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::error::ConfigError;

/// Load a TOML file into `T`.
///
/// A missing file deserializes as empty TOML, so types whose fields all
/// carry `#[serde(default)]` load as their defaults.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file exists but cannot be read, or
/// [`ConfigError::Parse`] if it is not valid TOML for `T`.
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return parse_str("", path);
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    parse_str(&content, path)
}

/// Parse TOML text, attributing errors to `origin`.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if `content` is not valid TOML for `T`.
pub fn parse_str<T: DeserializeOwned>(content: &str, origin: &Path) -> Result<T, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Parse {
        path: origin.display().to_string(),
        message: e.to_string().trim().to_string(),
    })
}
