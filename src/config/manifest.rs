//! Latest known versions (`manifest.toml`), the reference for Outdated vs
//! UpToDate classification.
use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::toml_loader;
use crate::catalog::SoftwareId;
use crate::error::ConfigError;

/// Map of catalog id to the newest version known to exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LatestVersions {
    #[serde(default)]
    latest: HashMap<SoftwareId, String>,
}

impl LatestVersions {
    /// Latest version known for `id`.
    #[must_use]
    pub fn get(&self, id: &SoftwareId) -> Option<&str> {
        self.latest.get(id).map(String::as_str)
    }

    /// Record a latest version.
    #[must_use]
    pub fn with(mut self, id: &str, version: &str) -> Self {
        self.latest.insert(SoftwareId::from(id), version.to_string());
        self
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.latest.len()
    }

    /// Return `true` if no versions are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}

/// Load the manifest; a missing file yields an empty manifest.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load(path: &Path) -> Result<LatestVersions, ConfigError> {
    toml_loader::load_config(path)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_manifest_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load(&tmp.path().join("manifest.toml")).unwrap().is_empty());
    }

    #[test]
    fn reads_latest_table() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("manifest.toml");
        std::fs::write(&path, "[latest]\ngo = \"1.23.2\"\n").unwrap();
        let manifest = load(&path).unwrap();
        assert_eq!(manifest.get(&SoftwareId::from("go")), Some("1.23.2"));
        assert_eq!(manifest.get(&SoftwareId::from("bun")), None);
    }

    #[test]
    fn shipped_manifest_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("conf/manifest.toml");
        load(&path).unwrap();
    }
}
