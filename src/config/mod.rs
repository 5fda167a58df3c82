//! Configuration: catalog source, templates, version manifest and run
//! settings, all read from one conf directory.
pub mod catalog;
pub mod manifest;
pub mod settings;
pub mod templates;
pub mod toml_loader;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::catalog::{Action, Catalog};
use crate::error::ConfigError;
use crate::orchestrator::ConcurrencyLimits;

use manifest::LatestVersions;
use settings::Settings;

/// Everything loaded from the conf directory.
#[derive(Debug)]
pub struct Config {
    /// Directory the files were read from, if any.
    pub conf_dir: Option<PathBuf>,
    /// Software catalog (the embedded one unless overridden).
    pub catalog: Catalog,
    /// Latest known versions.
    pub latest: LatestVersions,
    /// Run settings.
    pub settings: Settings,
}

impl Config {
    /// Load configuration from `conf_dir`.
    ///
    /// Without a directory, or when it has no `catalog.toml`, the embedded
    /// catalog is used. Missing manifest and settings files load as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if any present file fails to read or parse.
    pub fn load(conf_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(dir) = conf_dir else {
            return Ok(Self {
                conf_dir: None,
                catalog: catalog::builtin()?,
                latest: LatestVersions::default(),
                settings: Settings::default(),
            });
        };

        let catalog_path = dir.join("catalog.toml");
        let catalog = if catalog_path.exists() {
            catalog::load(&catalog_path)?
        } else {
            catalog::builtin()?
        };

        Ok(Self {
            conf_dir: Some(dir.to_path_buf()),
            catalog,
            latest: manifest::load(&dir.join("manifest.toml"))?,
            settings: settings::load(&dir.join("settings.toml"))?,
        })
    }

    /// Directory holding the template files.
    #[must_use]
    pub fn templates_dir(&self) -> PathBuf {
        self.conf_dir
            .as_ref()
            .map_or_else(|| PathBuf::from("conf/templates"), |d| d.join("templates"))
    }
}

/// Locate the conf directory.
///
/// Checked in order: the explicit path, `MAZIQ_CONF_DIR`,
/// `$XDG_CONFIG_HOME/maziq` (default `~/.config/maziq`), then `./conf`.
/// Candidates after the explicit path are used only if they exist.
#[must_use]
pub fn resolve_conf_dir(explicit: Option<&Path>) -> Option<PathBuf> {
    let config_home = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")));
    resolve_conf_dir_from(
        explicit,
        std::env::var_os("MAZIQ_CONF_DIR").map(PathBuf::from),
        config_home,
        std::env::current_dir().ok(),
    )
}

fn resolve_conf_dir_from(
    explicit: Option<&Path>,
    env_dir: Option<PathBuf>,
    config_home: Option<PathBuf>,
    cwd: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(dir) = explicit {
        return Some(dir.to_path_buf());
    }
    if let Some(dir) = env_dir {
        return Some(dir);
    }
    [
        config_home.map(|h| h.join("maziq")),
        cwd.map(|c| c.join("conf")),
    ]
    .into_iter()
    .flatten()
    .find(|candidate| candidate.is_dir())
}

/// Per-action time limits for external commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Install limit.
    pub install: Duration,
    /// Update limit.
    pub update: Duration,
    /// Uninstall limit.
    pub uninstall: Duration,
    /// How long a terminated command may take to exit before it is killed.
    pub grace: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            install: Duration::from_secs(30 * 60),
            update: Duration::from_secs(30 * 60),
            uninstall: Duration::from_secs(10 * 60),
            grace: Duration::from_secs(10),
        }
    }
}

impl Timeouts {
    /// Limit for `action`. Status checks borrow the uninstall limit.
    #[must_use]
    pub const fn for_action(&self, action: Action) -> Duration {
        match action {
            Action::Install => self.install,
            Action::Update => self.update,
            Action::Uninstall | Action::StatusCheck => self.uninstall,
        }
    }

    /// Apply one limit to every action.
    #[must_use]
    pub const fn uniform(mut self, limit: Duration) -> Self {
        self.install = limit;
        self.update = limit;
        self.uninstall = limit;
        self
    }
}

/// Options for one run, passed explicitly to the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConfig {
    /// Report would-run commands without spawning anything.
    pub dry_run: bool,
    /// Re-run install/update even when already satisfied.
    pub force: bool,
    /// Concurrency caps.
    pub limits: ConcurrencyLimits,
    /// Command time limits.
    pub timeouts: Timeouts,
}

impl RunConfig {
    /// Build a run configuration from settings, on top of the defaults.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let mut limits = ConcurrencyLimits::default();
        if let Some(n) = settings.max_parallel {
            limits = limits.with_global(n);
        }
        for (&kind, &cap) in &settings.parallel {
            limits = limits.with_kind(kind, cap);
        }

        let mut timeouts = Timeouts::default();
        let t = &settings.timeouts;
        if let Some(s) = t.install {
            timeouts.install = Duration::from_secs(s);
        }
        if let Some(s) = t.update {
            timeouts.update = Duration::from_secs(s);
        }
        if let Some(s) = t.uninstall {
            timeouts.uninstall = Duration::from_secs(s);
        }
        if let Some(s) = t.grace {
            timeouts.grace = Duration::from_secs(s);
        }

        Self {
            dry_run: false,
            force: false,
            limits,
            timeouts,
        }
    }
}
