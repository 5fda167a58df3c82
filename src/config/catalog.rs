//! Catalog source: the embedded default catalog or a `catalog.toml` override.
use std::path::Path;

use serde::Deserialize;

use super::toml_loader;
use crate::catalog::{Catalog, Software};
use crate::error::ConfigError;

/// The catalog shipped with the binary.
const BUILTIN: &str = include_str!("../../conf/catalog.toml");

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    software: Vec<Software>,
}

/// Parse the embedded catalog.
///
/// # Errors
///
/// Returns an error only if the embedded file is malformed.
pub fn builtin() -> Result<Catalog, ConfigError> {
    parse(BUILTIN, Path::new("<builtin catalog.toml>"))
}

/// Load a catalog file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid TOML, or
/// contains duplicate ids or invalid probe patterns.
pub fn load(path: &Path) -> Result<Catalog, ConfigError> {
    let file: CatalogFile = toml_loader::load_config(path)?;
    Catalog::from_entries(file.software)
}

/// Parse catalog TOML text.
///
/// # Errors
///
/// Same as [`load`].
pub fn parse(content: &str, origin: &Path) -> Result<Catalog, ConfigError> {
    let file: CatalogFile = toml_loader::parse_str(content, origin)?;
    Catalog::from_entries(file.software)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::catalog::{CommandRecipe, InstallerKind, SoftwareId, VersionProbe};

    #[test]
    fn builtin_catalog_parses() {
        let catalog = builtin().expect("embedded catalog must parse");
        assert_eq!(catalog.len(), 40);
    }

    #[test]
    fn builtin_dependencies_exist() {
        let catalog = builtin().unwrap();
        for software in catalog.iter() {
            for dep in &software.dependencies {
                assert!(
                    catalog.contains(dep),
                    "{} depends on unknown {dep}",
                    software.id
                );
            }
        }
    }

    #[test]
    fn cask_entries_only_run_cask_commands() {
        let catalog = builtin().unwrap();
        for software in catalog.iter().filter(|s| s.installer == InstallerKind::SystemCask) {
            for recipe in [&software.install, &software.update, &software.uninstall] {
                if let CommandRecipe::Shell(cmd) = recipe {
                    assert!(
                        cmd.starts_with("brew ") && cmd.contains("--cask"),
                        "{}: {cmd}",
                        software.id
                    );
                }
            }
        }
    }

    #[test]
    fn parses_every_probe_shape() {
        let toml = r#"
[[software]]
id = "brave"
name = "Brave Browser"
category = "Browsers"
installer = "system-cask"
probe = { kind = "bundle", path = "/Applications/Brave Browser.app" }
dependencies = ["homebrew"]
install = { shell = "brew install --cask brave-browser" }
update = { shell = "brew upgrade --cask brave-browser" }
uninstall = { shell = "brew uninstall --cask brave-browser" }

[[software]]
id = "homebrew"
name = "Homebrew"
category = "System"
installer = "direct-download"
probe = { kind = "command", program = "brew", args = ["--version"], pattern = 'Homebrew (\S+)' }
install = { shell = "curl | bash" }
update = { shell = "brew update" }
uninstall = { manual = "run the uninstall script" }

[[software]]
id = "go"
name = "Go"
category = "Languages"
installer = "system-package"
probe = { kind = "package", manager = "brew", package = "go" }
install = { shell = "brew install go" }
update = { shell = "brew upgrade go" }
uninstall = { shell = "brew uninstall go" }

[[software]]
id = "nvm"
name = "nvm"
category = "Languages"
installer = "direct-download"
probe = { kind = "manual", note = "source ~/.nvm/nvm.sh" }
install = { shell = "curl | bash" }
update = { shell = "curl | bash" }
uninstall = { manual = "rm -rf ~/.nvm" }
"#;
        let catalog = parse(toml, Path::new("test.toml")).unwrap();
        assert_eq!(catalog.len(), 4);
        let brave = catalog.get(&SoftwareId::from("brave")).unwrap();
        assert!(matches!(brave.probe, VersionProbe::Bundle { path: Some(_), name: None }));
        let brew = catalog.get(&SoftwareId::from("homebrew")).unwrap();
        assert!(matches!(brew.uninstall, CommandRecipe::Manual(_)));
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        let err = parse("[extra]\nkey = 1\n", Path::new("x.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
