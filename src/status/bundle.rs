//! Application bundle probe (`.app` directories).
//!
//! The version comes from Spotlight metadata when `mdls` is available and
//! from the bundle's `Info.plist` otherwise. Bundles without a fixed
//! location are searched for with `mdfind`, or by scanning the
//! application folders when Spotlight is unavailable.
use std::path::{Path, PathBuf};

use super::Probe;
use crate::exec::Executor;

/// Probe a bundle at `path`, or search for `<name>.app`.
pub(super) fn probe(
    executor: &dyn Executor,
    app_dirs: &[PathBuf],
    path: Option<&str>,
    name: Option<&str>,
) -> Probe {
    let location = match (path, name) {
        (Some(p), _) => PathBuf::from(p),
        (None, Some(n)) => match locate(executor, app_dirs, n) {
            Some(found) => found,
            None => return Probe::Absent,
        },
        (None, None) => return Probe::Indeterminate,
    };
    if !location.exists() {
        return Probe::Absent;
    }
    Probe::Present(bundle_version(executor, &location))
}

fn bundle_version(executor: &dyn Executor, bundle: &Path) -> Option<String> {
    if executor.which("mdls") {
        let path = bundle.to_string_lossy();
        match executor.run_unchecked("mdls", &["-name", "kMDItemVersion", &path]) {
            Ok(r) if r.success => {
                if let Some(v) = parse_mdls(&r.stdout) {
                    return Some(v);
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(bundle = %bundle.display(), "mdls failed: {e:#}"),
        }
    }
    plist_version(bundle)
}

/// Parse `kMDItemVersion = "1.2.3"`; `(null)` means no version.
fn parse_mdls(stdout: &str) -> Option<String> {
    let (_, value) = stdout.lines().find_map(|l| l.split_once('='))?;
    let cleaned = value.trim().trim_matches('"');
    (!cleaned.is_empty() && cleaned != "(null)").then(|| cleaned.to_string())
}

/// Read `CFBundleShortVersionString` (or `CFBundleVersion`) from the bundle.
fn plist_version(bundle: &Path) -> Option<String> {
    let info = plist::Value::from_file(bundle.join("Contents").join("Info.plist")).ok()?;
    let dict = info.as_dictionary()?;
    ["CFBundleShortVersionString", "CFBundleVersion"]
        .iter()
        .find_map(|key| dict.get(key).and_then(plist::Value::as_string))
        .map(ToString::to_string)
}

/// Find `<name>.app` via Spotlight, else by scanning `app_dirs`.
fn locate(executor: &dyn Executor, app_dirs: &[PathBuf], name: &str) -> Option<PathBuf> {
    if executor.which("mdfind") {
        let query = format!("kMDItemFSName == '{name}.app'");
        match executor.run_unchecked("mdfind", &[&query]) {
            Ok(r) if r.success => {
                return r
                    .stdout
                    .lines()
                    .map(str::trim)
                    .find(|l| !l.is_empty())
                    .map(PathBuf::from);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(name, "mdfind failed: {e:#}"),
        }
    }
    let file_name = format!("{name}.app");
    app_dirs
        .iter()
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.is_dir())
}
