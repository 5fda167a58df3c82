//! Per-installer-kind command preparation.
//!
//! Every recipe runs through `sh -c`; the adapter decides the environment,
//! any shell prelude, and whether the recipe is acceptable at all.

use crate::catalog::InstallerKind;
use crate::error::ExecutionError;

/// Command separators checked by the cask guard.
const SEPARATORS: [&str; 5] = ["&&", "||", ";", "|", "\n"];

/// Installer adapter, one per [`InstallerKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adapter {
    /// Homebrew formulae.
    Homebrew,
    /// Homebrew casks.
    HomebrewCask,
    /// `cargo install`.
    Cargo,
    /// rustup toolchains.
    Rustup,
    /// Global npm packages under nvm.
    Npm,
    /// Installer scripts fetched with curl.
    Download,
    /// Plain local shell.
    Script,
}

/// A recipe ready to hand to the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCommand {
    /// Program to spawn.
    pub program: String,
    /// Its arguments.
    pub args: Vec<String>,
    /// Extra environment.
    pub env: Vec<(String, String)>,
}

impl Adapter {
    /// The adapter for `kind`.
    #[must_use]
    pub const fn for_kind(kind: InstallerKind) -> Self {
        match kind {
            InstallerKind::SystemPackage => Self::Homebrew,
            InstallerKind::SystemCask => Self::HomebrewCask,
            InstallerKind::Cargo => Self::Cargo,
            InstallerKind::Rustup => Self::Rustup,
            InstallerKind::Npm => Self::Npm,
            InstallerKind::DirectDownload => Self::Download,
            InstallerKind::Script => Self::Script,
        }
    }

    /// Label recorded as the source of a history record.
    #[must_use]
    pub const fn source_label(self) -> &'static str {
        match self {
            Self::Homebrew => "homebrew formula",
            Self::HomebrewCask => "homebrew cask",
            Self::Cargo => "cargo install",
            Self::Rustup => "rustup",
            Self::Npm => "npm global",
            Self::Download => "curl script",
            Self::Script => "shell",
        }
    }

    /// Wrap `script` for execution, using the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Refused`] if the recipe breaks the adapter's rules.
    pub fn prepare(self, script: &str) -> Result<PreparedCommand, ExecutionError> {
        let home = std::env::var("HOME").ok();
        let path = std::env::var("PATH").ok();
        self.prepare_with(script, home.as_deref(), path.as_deref())
    }

    /// [`prepare`](Self::prepare) with an explicit `HOME` and `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Refused`] if the recipe breaks the adapter's rules.
    pub fn prepare_with(
        self,
        script: &str,
        home: Option<&str>,
        path: Option<&str>,
    ) -> Result<PreparedCommand, ExecutionError> {
        if self == Self::HomebrewCask {
            check_cask_only(script)?;
        }
        let body = match self {
            Self::Npm => format!(
                "export NVM_DIR=\"${{NVM_DIR:-$HOME/.nvm}}\"; \
                 [ -s \"$NVM_DIR/nvm.sh\" ] && . \"$NVM_DIR/nvm.sh\"; {script}"
            ),
            _ => script.to_string(),
        };
        Ok(PreparedCommand {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), body],
            env: self.env(home, path),
        })
    }

    fn env(self, home: Option<&str>, path: Option<&str>) -> Vec<(String, String)> {
        let pair = |k: &str, v: &str| (k.to_string(), v.to_string());
        match self {
            Self::Homebrew | Self::HomebrewCask => vec![pair("HOMEBREW_NO_AUTO_UPDATE", "1")],
            Self::Cargo | Self::Rustup => home.map_or_else(Vec::new, |home| {
                let cargo_bin = format!("{home}/.cargo/bin");
                let joined = match path {
                    Some(p) if !p.is_empty() => format!("{cargo_bin}:{p}"),
                    _ => cargo_bin,
                };
                vec![pair("PATH", &joined)]
            }),
            Self::Npm => Vec::new(),
            Self::Download | Self::Script => vec![pair("NONINTERACTIVE", "1")],
        }
    }
}

/// Every command in a cask recipe must be a `brew … --cask` invocation.
fn check_cask_only(script: &str) -> Result<(), ExecutionError> {
    let mut segments: Vec<&str> = vec![script];
    for sep in SEPARATORS {
        segments = segments.into_iter().flat_map(|s| s.split(sep)).collect();
    }
    let offending = segments
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .find(|s| {
            let mut words = s.split_whitespace();
            words.next() != Some("brew") || !words.any(|w| w == "--cask")
        });
    match offending {
        Some(cmd) => Err(ExecutionError::Refused {
            command: cmd.to_string(),
            reason: "cask entries may only run brew --cask commands".to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn env_value<'a>(cmd: &'a PreparedCommand, key: &str) -> Option<&'a str> {
        cmd.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn every_kind_has_an_adapter_and_label() {
        for kind in InstallerKind::ALL {
            assert!(!Adapter::for_kind(kind).source_label().is_empty());
        }
    }

    #[test]
    fn recipes_run_through_sh() {
        let cmd = Adapter::Script.prepare_with("echo hi", None, None).unwrap();
        assert_eq!(cmd.program, "sh");
        assert_eq!(cmd.args, ["-c", "echo hi"]);
        assert_eq!(env_value(&cmd, "NONINTERACTIVE"), Some("1"));
    }

    #[test]
    fn homebrew_disables_auto_update() {
        let cmd = Adapter::Homebrew
            .prepare_with("brew install go", None, None)
            .unwrap();
        assert_eq!(env_value(&cmd, "HOMEBREW_NO_AUTO_UPDATE"), Some("1"));
    }

    #[test]
    fn cask_accepts_brew_cask_commands() {
        Adapter::HomebrewCask
            .prepare_with("brew install --cask zed", None, None)
            .unwrap();
        Adapter::HomebrewCask
            .prepare_with("brew uninstall --cask zed && brew install --cask zed@preview", None, None)
            .unwrap();
    }

    #[test]
    fn cask_refuses_anything_else() {
        let err = Adapter::HomebrewCask
            .prepare_with("brew install --cask zed; rm -rf ~/Library", None, None)
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Refused { ref command, .. } if command == "rm -rf ~/Library"));
        assert!(
            Adapter::HomebrewCask
                .prepare_with("brew install zed", None, None)
                .is_err()
        );
    }

    #[test]
    fn cargo_prepends_cargo_bin() {
        let cmd = Adapter::Cargo
            .prepare_with("cargo install just", Some("/Users/dev"), Some("/usr/bin:/bin"))
            .unwrap();
        assert_eq!(
            env_value(&cmd, "PATH"),
            Some("/Users/dev/.cargo/bin:/usr/bin:/bin")
        );
        let bare = Adapter::Rustup.prepare_with("rustup update", None, None).unwrap();
        assert!(bare.env.is_empty());
    }

    #[test]
    fn npm_sources_nvm_first() {
        let cmd = Adapter::Npm
            .prepare_with("npm install -g @google/gemini-cli", None, None)
            .unwrap();
        let body = &cmd.args[1];
        assert!(body.contains("nvm.sh"));
        assert!(body.ends_with("npm install -g @google/gemini-cli"));
    }
}
