//! Run settings (`settings.toml`): parallelism caps and timeouts.
use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use super::toml_loader;
use crate::catalog::InstallerKind;
use crate::error::ConfigError;

/// Parsed `settings.toml`. Every field is optional; unset fields keep the
/// built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Global cap on concurrently running tasks.
    #[serde(default)]
    pub max_parallel: Option<usize>,
    /// Per-installer-kind caps.
    #[serde(default)]
    pub parallel: BTreeMap<InstallerKind, usize>,
    /// Timeouts in seconds.
    #[serde(default)]
    pub timeouts: TimeoutSettings,
}

/// The `[timeouts]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutSettings {
    /// Install timeout.
    pub install: Option<u64>,
    /// Update timeout.
    pub update: Option<u64>,
    /// Uninstall timeout.
    pub uninstall: Option<u64>,
    /// Time a cancelled command gets before it is killed.
    pub grace: Option<u64>,
}

/// Load settings; a missing file yields defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load(path: &Path) -> Result<Settings, ConfigError> {
    toml_loader::load_config(path)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_caps_and_timeouts() {
        let settings: Settings = toml_loader::parse_str(
            "max_parallel = 6\n[parallel]\nnpm = 3\nsystem-cask = 1\n[timeouts]\ninstall = 60\n",
            Path::new("settings.toml"),
        )
        .unwrap();
        assert_eq!(settings.max_parallel, Some(6));
        assert_eq!(settings.parallel.get(&InstallerKind::Npm), Some(&3));
        assert_eq!(settings.parallel.get(&InstallerKind::SystemCask), Some(&1));
        assert_eq!(settings.timeouts.install, Some(60));
        assert_eq!(settings.timeouts.grace, None);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = toml_loader::parse_str::<Settings>(
            "[parallel]\npip = 2\n",
            Path::new("settings.toml"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn shipped_settings_parse() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("conf/settings.toml");
        let settings = load(&path).unwrap();
        assert_eq!(settings.parallel.get(&InstallerKind::SystemPackage), Some(&1));
    }
}
