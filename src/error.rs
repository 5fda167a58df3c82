//! Domain-specific error types for the provisioning engine.
//!
//! Internal modules return typed errors (e.g., [`ConfigError`],
//! [`ResolutionError`]) while command handlers at the CLI boundary convert
//! them to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! MaziqError
//! ├── Config(ConfigError)          — catalog, template and settings loading
//! ├── Resolution(ResolutionError)  — unknown ids, missing dependencies, cycles
//! └── Execution(ExecutionError)    — a single task's external command
//! ```
//!
//! Configuration and resolution errors stop a run before any task starts.
//! Execution errors stay local to their task and surface as a `Failed`
//! outcome; status detection never produces an error at all.

use std::time::Duration;

use thiserror::Error;

use crate::catalog::SoftwareId;

/// Top-level error type for the engine.
#[derive(Error, Debug)]
pub enum MaziqError {
    /// Configuration-related error (catalog, templates, settings).
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The requested set could not be turned into an execution order.
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// An external installer command failed.
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),
}

/// Errors that arise while loading the catalog, templates or settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A template references an id that is not in the catalog.
    #[error("Template '{template}' references unknown software '{id}'")]
    UnknownSoftware {
        /// Template name.
        template: String,
        /// Offending identifier.
        id: String,
    },

    /// No template matched the requested name.
    #[error("Template '{name}' not found in {dir}")]
    TemplateNotFound {
        /// Requested template name.
        name: String,
        /// Directory that was searched.
        dir: String,
    },

    /// Two catalog entries share the same id.
    #[error("Duplicate catalog entry '{0}'")]
    DuplicateSoftware(String),

    /// A probe pattern is not a valid regular expression.
    #[error("Invalid version pattern for '{id}': {message}")]
    InvalidPattern {
        /// Catalog entry carrying the pattern.
        id: String,
        /// Regex compiler message.
        message: String,
    },

    /// The file is not valid TOML for the expected shape.
    #[error("Invalid TOML in {path}: {message}")]
    Parse {
        /// File that failed to parse.
        path: String,
        /// Parser message.
        message: String,
    },

    /// An I/O error occurred while reading a config file.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors produced by the dependency resolver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// An id, requested directly or declared as a dependency, does not
    /// exist in the catalog.
    #[error("{}", render_missing(.id, .required_by.as_ref()))]
    MissingDependency {
        /// The missing id.
        id: SoftwareId,
        /// The entry that declared it; `None` when it was requested directly.
        required_by: Option<SoftwareId>,
    },

    /// The dependency relation contains a cycle; members listed in cycle order.
    #[error("Dependency cycle detected: {}", render_cycle(.0))]
    DependencyCycle(Vec<SoftwareId>),
}

impl ResolutionError {
    /// A directly requested id that the catalog does not know.
    #[must_use]
    pub const fn unknown(id: SoftwareId) -> Self {
        Self::MissingDependency {
            id,
            required_by: None,
        }
    }
}

fn render_missing(id: &SoftwareId, required_by: Option<&SoftwareId>) -> String {
    match required_by {
        Some(parent) => format!("'{parent}' depends on '{id}', which is not in the catalog"),
        None => format!("Unknown software '{id}'"),
    }
}

fn render_cycle(members: &[SoftwareId]) -> String {
    let mut parts: Vec<&str> = members.iter().map(SoftwareId::as_str).collect();
    if let Some(first) = parts.first().copied() {
        parts.push(first);
    }
    parts.join(" → ")
}

/// Errors that arise while running a single installer command.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The command exited with a non-zero status.
    #[error("command exited with code {code}")]
    NonZeroExit {
        /// Exit code reported by the process.
        code: i32,
    },

    /// The command ran longer than its allotted time.
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The command did not stop after cancellation within the grace period.
    #[error("did not exit within {}s of cancellation", .0.as_secs())]
    Unresponsive(Duration),

    /// The process could not be started.
    #[error("failed to spawn '{command}': {reason}")]
    SpawnFailure {
        /// Command that could not be started.
        command: String,
        /// Operating-system reason.
        reason: String,
    },

    /// The adapter refused to run the recipe.
    #[error("refusing to run '{command}': {reason}")]
    Refused {
        /// The rejected command.
        command: String,
        /// Why the adapter rejected it.
        reason: String,
    },
}
