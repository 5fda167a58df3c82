//! Append-only record of completed mutations.
//!
//! One JSON object per line in `$XDG_STATE_HOME/maziq/history.jsonl`.
//! Records are never rewritten; a failed append is logged and otherwise
//! ignored.

use std::fs;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{Action, SoftwareId};

/// One completed install, update or uninstall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Catalog id.
    pub software_id: SoftwareId,
    /// What was done.
    pub action: Action,
    /// Version detected afterwards.
    pub version: Option<String>,
    /// Installer source label, or the no-op reason.
    pub source: String,
    /// When the task finished.
    pub timestamp: DateTime<Utc>,
}

/// Destination for history records.
#[cfg_attr(test, mockall::automock)]
pub trait HistorySink: Send + Sync {
    /// Append one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be stored.
    fn append(&self, record: &HistoryRecord) -> Result<()>;
}

/// [`HistorySink`] writing JSON lines to a file.
#[derive(Debug)]
pub struct JsonlHistory {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlHistory {
    /// Write to `path`, creating it and its parent on first append.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// `$XDG_STATE_HOME/maziq/history.jsonl`, defaulting the state home to
    /// `~/.local/state`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        let state_home = std::env::var_os("XDG_STATE_HOME")
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local").join("state"))
            })?;
        Some(state_home.join("maziq").join("history.jsonl"))
    }
}

impl HistorySink for JsonlHistory {
    fn append(&self, record: &HistoryRecord) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut line = serde_json::to_string(record).context("serializing history record")?;
        line.push('\n');
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}
