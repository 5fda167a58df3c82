//! Software catalog: identifiers, installer kinds, probes and recipes.
//!
//! A [`Catalog`] is loaded once per invocation (see
//! [`config::catalog`](crate::config::catalog)) and shared read-only between
//! every worker afterwards.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Stable lowercase key naming one catalog entry (e.g. `rust_stable`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoftwareId(String);

impl SoftwareId {
    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SoftwareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SoftwareId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SoftwareId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The external installer family an entry is managed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallerKind {
    /// Homebrew formula.
    SystemPackage,
    /// Homebrew cask (GUI application bundle).
    SystemCask,
    /// `cargo install`.
    Cargo,
    /// Global npm package.
    Npm,
    /// Rust toolchain managed by rustup.
    Rustup,
    /// Installer script fetched over the network.
    DirectDownload,
    /// Local shell command.
    Script,
}

impl InstallerKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::SystemPackage,
        Self::SystemCask,
        Self::Cargo,
        Self::Npm,
        Self::Rustup,
        Self::DirectDownload,
        Self::Script,
    ];
}

impl fmt::Display for InstallerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SystemPackage => "system-package",
            Self::SystemCask => "system-cask",
            Self::Cargo => "cargo",
            Self::Npm => "npm",
            Self::Rustup => "rustup",
            Self::DirectDownload => "direct-download",
            Self::Script => "script",
        };
        f.write_str(s)
    }
}

/// Package managers that can answer "which version of X is installed?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageManager {
    /// `brew list --versions`.
    Brew,
    /// `brew list --cask --versions`.
    BrewCask,
    /// `cargo install --list`.
    Cargo,
    /// `npm ls -g`.
    Npm,
}

/// How the installed version of an entry is detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum VersionProbe {
    /// An application bundle. Without a `path`, the bundle is searched for
    /// by `name` (`<name>.app`).
    Bundle {
        /// Canonical bundle location.
        #[serde(default)]
        path: Option<String>,
        /// Bundle name without the `.app` suffix.
        #[serde(default)]
        name: Option<String>,
    },
    /// Run a command and parse its first output line.
    Command {
        /// Program to run.
        program: String,
        /// Arguments, usually a version flag.
        #[serde(default)]
        args: Vec<String>,
        /// Regex extracting the version (capture group 1, or the whole match).
        #[serde(default)]
        pattern: Option<String>,
    },
    /// Ask a package manager.
    Package {
        /// Manager to query.
        manager: PackageManager,
        /// Package name as the manager knows it.
        package: String,
    },
    /// Cannot be probed automatically.
    Manual {
        /// What the user should check.
        note: String,
    },
}

impl VersionProbe {
    /// Human-readable description of how the probe runs, for `show`.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Bundle {
                path: Some(path), ..
            } => format!("mdls -name kMDItemVersion {path}"),
            Self::Bundle {
                path: None,
                name: Some(name),
            } => format!("mdfind \"kMDItemFSName == '{name}.app'\""),
            Self::Bundle {
                path: None,
                name: None,
            } => "application bundle (no location)".to_string(),
            Self::Command { program, args, .. } => {
                std::iter::once(program.as_str())
                    .chain(args.iter().map(String::as_str))
                    .collect::<Vec<_>>()
                    .join(" ")
            }
            Self::Package { manager, package } => match manager {
                PackageManager::Brew => format!("brew list --versions {package}"),
                PackageManager::BrewCask => format!("brew list --cask --versions {package}"),
                PackageManager::Cargo => format!("cargo install --list ({package})"),
                PackageManager::Npm => format!("npm ls -g --depth=0 ({package})"),
            },
            Self::Manual { note } => format!("Manual check: {note}"),
        }
    }
}

/// One action's command: a shell script, or a manual instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandRecipe {
    /// Run through `sh -c`.
    Shell(String),
    /// A step the user has to perform by hand.
    Manual(String),
}

/// The operation a task performs on one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// Install the software.
    Install,
    /// Update to the latest version.
    Update,
    /// Remove the software.
    Uninstall,
    /// Read-only detection.
    StatusCheck,
}

impl Action {
    /// Return `true` for actions that change the machine.
    #[must_use]
    pub const fn is_mutating(self) -> bool {
        !matches!(self, Self::StatusCheck)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Install => "install",
            Self::Update => "update",
            Self::Uninstall => "uninstall",
            Self::StatusCheck => "status",
        };
        f.write_str(s)
    }
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Software {
    /// Unique key.
    pub id: SoftwareId,
    /// Display name.
    pub name: String,
    /// Grouping shown by `list`.
    pub category: String,
    /// One-line description.
    #[serde(default)]
    pub summary: String,
    /// Installer family.
    pub installer: InstallerKind,
    /// Version detection strategy.
    pub probe: VersionProbe,
    /// Ids that must be installed first.
    #[serde(default)]
    pub dependencies: Vec<SoftwareId>,
    /// Install recipe.
    pub install: CommandRecipe,
    /// Update recipe.
    pub update: CommandRecipe,
    /// Uninstall recipe.
    pub uninstall: CommandRecipe,
}

impl Software {
    /// Recipe for a mutating action; `None` for [`Action::StatusCheck`].
    #[must_use]
    pub const fn recipe(&self, action: Action) -> Option<&CommandRecipe> {
        match action {
            Action::Install => Some(&self.install),
            Action::Update => Some(&self.update),
            Action::Uninstall => Some(&self.uninstall),
            Action::StatusCheck => None,
        }
    }
}

/// Immutable registry of known software.
///
/// Keeps declaration order for listing and a sorted index for lookups.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<Software>,
    index: BTreeMap<SoftwareId, usize>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate ids.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateSoftware`] if two entries share an id,
    /// or [`ConfigError::InvalidPattern`] if a probe pattern does not compile.
    pub fn from_entries(entries: Vec<Software>) -> Result<Self, ConfigError> {
        let mut index = BTreeMap::new();
        for (pos, entry) in entries.iter().enumerate() {
            if index.insert(entry.id.clone(), pos).is_some() {
                return Err(ConfigError::DuplicateSoftware(entry.id.to_string()));
            }
            if let VersionProbe::Command {
                pattern: Some(pattern),
                ..
            } = &entry.probe
            {
                regex::Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                    id: entry.id.to_string(),
                    message: e.to_string(),
                })?;
            }
        }
        Ok(Self { entries, index })
    }

    /// Look up an entry.
    #[must_use]
    pub fn get(&self, id: &SoftwareId) -> Option<&Software> {
        self.index.get(id).and_then(|&pos| self.entries.get(pos))
    }

    /// Return `true` if `id` names an entry.
    #[must_use]
    pub fn contains(&self, id: &SoftwareId) -> bool {
        self.index.contains_key(id)
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Software> {
        self.entries.iter()
    }

    /// Ids in declaration order.
    #[must_use]
    pub fn ids(&self) -> Vec<SoftwareId> {
        self.entries.iter().map(|s| s.id.clone()).collect()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` if the catalog has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
pub(crate) mod test_helpers {
    use super::*;

    /// A shell-recipe entry with the given kind, probe and dependencies.
    pub(crate) fn entry(
        id: &str,
        installer: InstallerKind,
        probe: VersionProbe,
        deps: &[&str],
    ) -> Software {
        Software {
            id: SoftwareId::from(id),
            name: id.to_string(),
            category: "Test".to_string(),
            summary: String::new(),
            installer,
            probe,
            dependencies: deps.iter().map(|d| SoftwareId::from(*d)).collect(),
            install: CommandRecipe::Shell(format!("install-{id}")),
            update: CommandRecipe::Shell(format!("update-{id}")),
            uninstall: CommandRecipe::Shell(format!("uninstall-{id}")),
        }
    }

    /// A script entry probed with `<id> --version`.
    pub(crate) fn simple(id: &str, deps: &[&str]) -> Software {
        entry(
            id,
            InstallerKind::Script,
            VersionProbe::Command {
                program: id.to_string(),
                args: vec!["--version".to_string()],
                pattern: None,
            },
            deps,
        )
    }

    /// Catalog of `(id, "dep dep ...")` pairs built with [`simple`].
    pub(crate) fn catalog(spec: &[(&str, &str)]) -> Catalog {
        Catalog::from_entries(
            spec.iter()
                .map(|(id, deps)| simple(id, &deps.split_whitespace().collect::<Vec<_>>()))
                .collect(),
        )
        .expect("valid test catalog")
    }
}
