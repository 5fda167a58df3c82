//! Installed-state detection.
//!
//! Every catalog entry carries a [`VersionProbe`]; the detector dispatches
//! on it and classifies the result against the latest known version.
//! Detection never fails: anything that goes wrong degrades to
//! [`StatusState::Unknown`] with a warning.

mod bundle;
mod command;
mod package;
pub mod version;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::catalog::{Software, VersionProbe};
use crate::config::manifest::LatestVersions;
use crate::exec::Executor;

/// Classification of an entry's installed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusState {
    /// Not present on the machine.
    NotInstalled,
    /// Present, older than the latest known version.
    Outdated,
    /// Present, and current as far as is known.
    UpToDate,
    /// Could not be determined.
    Unknown,
}

impl fmt::Display for StatusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotInstalled => "not installed",
            Self::Outdated => "outdated",
            Self::UpToDate => "up to date",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Result of one detection. Computed fresh on every query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    /// Whether the software is present.
    pub installed: bool,
    /// Detected version, if one could be read.
    pub version: Option<String>,
    /// Classification.
    pub state: StatusState,
}

impl Status {
    /// Absent software.
    #[must_use]
    pub const fn not_installed() -> Self {
        Self {
            installed: false,
            version: None,
            state: StatusState::NotInstalled,
        }
    }

    /// Undeterminable state.
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            installed: false,
            version: None,
            state: StatusState::Unknown,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.version, self.state) {
            (Some(v), StatusState::Outdated) => write!(f, "{v} (outdated)"),
            (Some(v), _) => write!(f, "{v}"),
            (None, StatusState::Unknown) if self.installed => f.write_str("installed (version unknown)"),
            (None, state) => write!(f, "{state}"),
        }
    }
}

/// Raw outcome of a probe strategy, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Probe {
    /// Definitely not installed.
    Absent,
    /// Installed, with the version if it could be parsed.
    Present(Option<String>),
    /// The strategy could not tell.
    Indeterminate,
}

/// Detects installed state through the executor.
#[derive(Debug, Clone)]
pub struct StatusDetector {
    executor: Arc<dyn Executor>,
    latest: Arc<LatestVersions>,
    app_dirs: Vec<PathBuf>,
}

impl StatusDetector {
    /// Create a detector that searches the standard application folders.
    #[must_use]
    pub fn new(executor: Arc<dyn Executor>, latest: Arc<LatestVersions>) -> Self {
        let mut app_dirs = vec![PathBuf::from("/Applications")];
        if let Some(home) = std::env::var_os("HOME") {
            app_dirs.push(PathBuf::from(home).join("Applications"));
        }
        Self {
            executor,
            latest,
            app_dirs,
        }
    }

    /// Replace the folders scanned when a bundle has no known path.
    #[must_use]
    pub fn with_app_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.app_dirs = dirs;
        self
    }

    /// Latest known versions used for classification.
    #[must_use]
    pub fn latest(&self) -> &LatestVersions {
        &self.latest
    }

    /// Detect the current state of `software`.
    #[must_use]
    pub fn detect(&self, software: &Software) -> Status {
        let exec = self.executor.as_ref();
        let probe = match &software.probe {
            VersionProbe::Bundle { path, name } => {
                bundle::probe(exec, &self.app_dirs, path.as_deref(), name.as_deref())
            }
            VersionProbe::Command {
                program,
                args,
                pattern,
            } => command::probe(exec, program, args, pattern.as_deref()),
            VersionProbe::Package { manager, package } => package::probe(exec, *manager, package),
            VersionProbe::Manual { .. } => Probe::Indeterminate,
        };
        let status = classify(probe, self.latest.get(&software.id));
        tracing::debug!(
            id = %software.id,
            state = %status.state,
            version = status.version.as_deref().unwrap_or("-"),
            "detected"
        );
        status
    }

    /// Detect many entries in parallel, preserving input order.
    #[must_use]
    pub fn detect_all(&self, entries: &[&Software]) -> Vec<Status> {
        use rayon::prelude::*;
        entries.par_iter().map(|s| self.detect(s)).collect()
    }
}

/// Turn a probe result into a [`Status`].
///
/// A readable version is `Outdated` only when a latest version is known and
/// strictly newer; with no latest known it counts as up to date.
pub(crate) fn classify(probe: Probe, latest: Option<&str>) -> Status {
    match probe {
        Probe::Absent => Status::not_installed(),
        Probe::Indeterminate => Status::unknown(),
        Probe::Present(None) => Status {
            installed: true,
            version: None,
            state: StatusState::Unknown,
        },
        Probe::Present(Some(v)) => {
            let state = match latest {
                Some(latest) if version::is_older(&v, latest) => StatusState::Outdated,
                _ => StatusState::UpToDate,
            };
            Status {
                installed: true,
                version: Some(v),
                state,
            }
        }
    }
}

/// First non-empty line of stdout, falling back to stderr.
pub(crate) fn first_line(result: &crate::exec::ExecResult) -> Option<&str> {
    fn pick(s: &str) -> Option<&str> {
        s.lines().map(str::trim).find(|l| !l.is_empty())
    }
    pick(&result.stdout).or_else(|| pick(&result.stderr))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::catalog::test_helpers::{entry, simple};
    use crate::catalog::InstallerKind;
    use crate::test_helpers::MockExecutor;

    fn detector(exec: MockExecutor, latest: LatestVersions) -> StatusDetector {
        StatusDetector::new(Arc::new(exec), Arc::new(latest)).with_app_dirs(Vec::new())
    }

    // ------------------------------------------------------------------
    // classify
    // ------------------------------------------------------------------

    #[test]
    fn classify_absent() {
        assert_eq!(classify(Probe::Absent, Some("1.0")), Status::not_installed());
    }

    #[test]
    fn classify_outdated_against_latest() {
        let s = classify(Probe::Present(Some("1.0.0".into())), Some("1.2.0"));
        assert_eq!(s.state, StatusState::Outdated);
        assert!(s.installed);
    }

    #[test]
    fn classify_up_to_date_without_latest() {
        let s = classify(Probe::Present(Some("0.0.1".into())), None);
        assert_eq!(s.state, StatusState::UpToDate);
    }

    #[test]
    fn classify_newer_than_latest_is_up_to_date() {
        let s = classify(Probe::Present(Some("3.0".into())), Some("2.9"));
        assert_eq!(s.state, StatusState::UpToDate);
    }

    #[test]
    fn classify_unparsable_version() {
        let s = classify(Probe::Present(None), Some("1.0"));
        assert!(s.installed);
        assert_eq!(s.version, None);
        assert_eq!(s.state, StatusState::Unknown);
    }

    // ------------------------------------------------------------------
    // detect
    // ------------------------------------------------------------------

    #[test]
    fn detect_command_probe_with_latest() {
        let exec = MockExecutor::new()
            .with_program("bun")
            .respond("bun --version", true, "1.1.8\n");
        let latest = LatestVersions::default().with("bun", "1.2.0");
        let status = detector(exec, latest).detect(&simple("bun", &[]));
        assert_eq!(status.version.as_deref(), Some("1.1.8"));
        assert_eq!(status.state, StatusState::Outdated);
    }

    #[test]
    fn detect_manual_probe_is_unknown() {
        let nvm = entry(
            "nvm",
            InstallerKind::DirectDownload,
            VersionProbe::Manual {
                note: "source your profile".into(),
            },
            &[],
        );
        let exec = MockExecutor::new();
        let status = detector(exec, LatestVersions::default()).detect(&nvm);
        assert_eq!(status, Status::unknown());
    }

    #[test]
    fn detect_all_preserves_order() {
        let exec = MockExecutor::new()
            .with_program("a")
            .respond("a --version", true, "1.0\n");
        let a = simple("a", &[]);
        let b = simple("b", &[]);
        let statuses = detector(exec, LatestVersions::default()).detect_all(&[&a, &b]);
        assert!(statuses[0].installed);
        assert_eq!(statuses[1].state, StatusState::NotInstalled);
    }

    #[test]
    fn status_display() {
        let s = Status {
            installed: true,
            version: Some("1.0".into()),
            state: StatusState::Outdated,
        };
        assert_eq!(s.to_string(), "1.0 (outdated)");
        assert_eq!(Status::not_installed().to_string(), "not installed");
        let bare = classify(Probe::Present(None), None);
        assert_eq!(bare.to_string(), "installed (version unknown)");
    }
}
