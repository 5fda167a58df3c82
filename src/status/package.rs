//! Package-manager probes: ask brew, cargo or npm for an installed version.
use serde::Deserialize;
use std::collections::HashMap;

use super::Probe;
use crate::catalog::PackageManager;
use crate::exec::Executor;

/// Shape of `npm ls -g --depth=0 --json` that matters here.
#[derive(Debug, Default, Deserialize)]
struct NpmListing {
    #[serde(default)]
    dependencies: HashMap<String, NpmPackage>,
}

#[derive(Debug, Deserialize)]
struct NpmPackage {
    version: Option<String>,
}

/// Probe `package` through `manager`. A missing manager means not installed.
pub(super) fn probe(executor: &dyn Executor, manager: PackageManager, package: &str) -> Probe {
    let program = match manager {
        PackageManager::Brew | PackageManager::BrewCask => "brew",
        PackageManager::Cargo => "cargo",
        PackageManager::Npm => "npm",
    };
    if !executor.which(program) {
        return Probe::Absent;
    }
    let result = match manager {
        PackageManager::Brew => executor.run_unchecked("brew", &["list", "--versions", package]),
        PackageManager::BrewCask => {
            executor.run_unchecked("brew", &["list", "--cask", "--versions", package])
        }
        PackageManager::Cargo => executor.run_unchecked("cargo", &["install", "--list"]),
        PackageManager::Npm => executor.run_unchecked("npm", &["ls", "-g", "--depth=0", "--json"]),
    };
    let result = match result {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(program, package, "package probe failed: {e:#}");
            return Probe::Indeterminate;
        }
    };

    match manager {
        PackageManager::Brew | PackageManager::BrewCask => {
            if result.success {
                parse_brew(&result.stdout)
            } else {
                Probe::Absent
            }
        }
        PackageManager::Cargo => {
            if result.success {
                parse_cargo_list(&result.stdout, package)
            } else {
                Probe::Indeterminate
            }
        }
        // npm exits non-zero on extraneous or invalid trees but still prints
        // the listing, so the exit status is not consulted.
        PackageManager::Npm => parse_npm(&result.stdout, package),
    }
}

/// `brew list --versions go` prints `go 1.22.1 1.23.0`; the last one wins.
fn parse_brew(stdout: &str) -> Probe {
    let Some(line) = stdout.lines().find(|l| !l.trim().is_empty()) else {
        return Probe::Absent;
    };
    Probe::Present(line.split_whitespace().skip(1).last().map(ToString::to_string))
}

/// Find `<package> v<version>:` among the crate headers of `cargo install --list`.
fn parse_cargo_list(stdout: &str, package: &str) -> Probe {
    stdout
        .lines()
        .filter(|l| !l.starts_with(char::is_whitespace))
        .find_map(|l| {
            let mut parts = l.split_whitespace();
            (parts.next() == Some(package)).then(|| {
                parts
                    .next()
                    .map(|v| v.trim_end_matches(':').trim_start_matches('v').to_string())
            })
        })
        .map_or(Probe::Absent, Probe::Present)
}

fn parse_npm(stdout: &str, package: &str) -> Probe {
    match serde_json::from_str::<NpmListing>(stdout) {
        Ok(listing) => listing
            .dependencies
            .get(package)
            .map_or(Probe::Absent, |p| Probe::Present(p.version.clone())),
        Err(e) => {
            tracing::warn!(package, "unreadable npm listing: {e}");
            Probe::Indeterminate
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_helpers::MockExecutor;

    const CARGO_LIST: &str = "\
cargo-leptos v0.2.17:
    cargo-leptos
dioxus-cli v0.5.4:
    dx
trunk v0.20.2:
    trunk
";

    const NPM_LIST: &str = r#"{
  "name": "lib",
  "dependencies": {
    "@electron-forge/cli": { "version": "7.4.0", "overridden": false },
    "npm": { "version": "10.5.0" }
  }
}"#;

    #[test]
    fn manager_not_on_path_is_absent() {
        let exec = MockExecutor::new();
        assert_eq!(probe(&exec, PackageManager::Brew, "go"), Probe::Absent);
    }

    #[test]
    fn brew_formula_version() {
        let exec = MockExecutor::new()
            .with_program("brew")
            .respond("brew list --versions go", true, "go 1.22.1 1.23.2\n");
        assert_eq!(
            probe(&exec, PackageManager::Brew, "go"),
            Probe::Present(Some("1.23.2".to_string()))
        );
    }

    #[test]
    fn brew_cask_missing_is_absent() {
        let exec = MockExecutor::new().with_program("brew").respond(
            "brew list --cask --versions flutter",
            false,
            "",
        );
        assert_eq!(probe(&exec, PackageManager::BrewCask, "flutter"), Probe::Absent);
    }

    #[test]
    fn cargo_list_lookup() {
        let exec = MockExecutor::new()
            .with_program("cargo")
            .respond("cargo install --list", true, CARGO_LIST);
        assert_eq!(
            probe(&exec, PackageManager::Cargo, "dioxus-cli"),
            Probe::Present(Some("0.5.4".to_string()))
        );
        assert_eq!(probe(&exec, PackageManager::Cargo, "dx"), Probe::Absent);
    }

    #[test]
    fn npm_listing_lookup() {
        let exec = MockExecutor::new()
            .with_program("npm")
            .respond("npm ls -g --depth=0 --json", false, NPM_LIST);
        assert_eq!(
            probe(&exec, PackageManager::Npm, "@electron-forge/cli"),
            Probe::Present(Some("7.4.0".to_string()))
        );
        assert_eq!(
            probe(&exec, PackageManager::Npm, "react-native-cli"),
            Probe::Absent
        );
    }

    #[test]
    fn npm_garbage_is_indeterminate() {
        assert_eq!(parse_npm("npm ERR!", "x"), Probe::Indeterminate);
    }
}
