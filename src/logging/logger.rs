//! Console and file logger with run summaries.
use std::path::PathBuf;

use super::subscriber::{DRY_RUN, STAGE};
use super::utils::{log_file_path, terminal_columns, truncate};
use crate::engine::{SkipReason, TaskOutcome};
use crate::orchestrator::{RunReport, Task};

/// Front end over [`tracing`] for everything the commands print.
///
/// Every message also lands in `$XDG_CACHE_HOME/maziq/<command>.log`
/// through the file layer installed by
/// [`init_subscriber`](super::subscriber::init_subscriber).
#[derive(Debug)]
pub struct Logger {
    log_file: Option<PathBuf>,
}

#[allow(clippy::unused_self)]
impl Logger {
    /// Create a logger for `command`.
    ///
    /// Only remembers the log file path for the summary; the file itself is
    /// written by the subscriber.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            log_file: log_file_path(command),
        }
    }

    /// Path of the log file, if the cache directory is usable.
    #[must_use]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header.
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (console only with `-v`, always in the file).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log what a dry run would have done.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN, "{msg}");
    }

    /// Print one line per task, the totals, and failure diagnostics.
    pub fn print_summary(&self, report: &RunReport) {
        if report.tasks.is_empty() {
            return;
        }
        self.stage("Summary");

        let width = terminal_columns().saturating_sub(8);
        for task in &report.tasks {
            let (icon, color, detail) = summary_line(task);
            let suffix = if detail.is_empty() {
                String::new()
            } else {
                format!(" ({})", truncate(&detail, width))
            };
            self.info(&format!("{color}{icon} {}{suffix}\x1b[0m", task.software_id));
        }

        let c = report.counts();
        let total = report.tasks.len();
        self.info(&format!(
            "{total} tasks: \x1b[32m{} ok\x1b[0m, \x1b[2m{} unchanged\x1b[0m, \x1b[33m{} skipped\x1b[0m, \x1b[31m{} failed\x1b[0m, {} cancelled",
            c.succeeded, c.unchanged, c.skipped, c.failed, c.cancelled
        ));

        for (task, diagnostic) in report.failures() {
            self.error(&format!("{} {} failed", task.action, task.software_id));
            for line in diagnostic.lines() {
                self.info(&format!("\x1b[2m│ {line}\x1b[0m"));
            }
        }

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

/// Icon, color and detail text for one task in the summary.
fn summary_line(task: &Task) -> (&'static str, &'static str, String) {
    match &task.outcome {
        Some(TaskOutcome::Succeeded {
            noop: Some(noop), ..
        }) => ("·", "\x1b[2m", noop.label().to_string()),
        Some(TaskOutcome::Succeeded { version, noop: None }) => {
            ("✓", "\x1b[32m", version.clone().unwrap_or_default())
        }
        Some(TaskOutcome::Checked(status)) => ("✓", "\x1b[32m", status.to_string()),
        Some(TaskOutcome::Failed { diagnostic, .. }) => (
            "✗",
            "\x1b[31m",
            diagnostic.lines().next().unwrap_or_default().to_string(),
        ),
        Some(TaskOutcome::Skipped(SkipReason::DryRun)) => ("~", "\x1b[37m", "dry run".to_string()),
        Some(TaskOutcome::Skipped(reason)) => ("○", "\x1b[33m", reason.to_string()),
        Some(TaskOutcome::Cancelled) | None => ("⊘", "\x1b[33m", "cancelled".to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::catalog::{Action, InstallerKind, SoftwareId};
    use crate::engine::Noop;
    use crate::logging::isolated_logger;
    use crate::orchestrator::{TaskId, TaskState};
    use std::fs;

    fn task(id: &str, state: TaskState, outcome: TaskOutcome) -> Task {
        let mut t = Task::new(TaskId(0), SoftwareId::from(id), InstallerKind::Script, Action::Install);
        t.state = state;
        t.outcome = Some(outcome);
        t
    }

    fn contents(log: &Logger) -> String {
        fs::read_to_string(log.log_path().expect("log path")).unwrap()
    }

    // ---- plain messages ----

    #[test]
    fn levels_are_tagged_in_the_file() {
        let (log, _tmp, _guard) = isolated_logger();
        log.warn("warn-marker");
        log.error("error-marker");
        log.debug("debug-marker");
        let text = contents(&log);
        assert!(text.contains("[warn] warn-marker"));
        assert!(text.contains("[error] error-marker"));
        assert!(text.contains("[debug] debug-marker"));
    }

    #[test]
    fn stage_and_dry_run_use_their_markers() {
        let (log, _tmp, _guard) = isolated_logger();
        log.stage("Installing");
        log.dry_run("brew install go");
        let text = contents(&log);
        assert!(text.contains("==> Installing"));
        assert!(text.contains("[dry run] brew install go"));
    }

    // ---- summary ----

    #[test]
    fn summary_lists_every_task() {
        let (log, _tmp, _guard) = isolated_logger();
        let report = RunReport {
            action: Action::Install,
            dry_run: false,
            tasks: vec![
                task(
                    "go",
                    TaskState::Succeeded,
                    TaskOutcome::Succeeded {
                        version: Some("1.22.1".into()),
                        noop: None,
                    },
                ),
                task(
                    "bun",
                    TaskState::Succeeded,
                    TaskOutcome::Succeeded {
                        version: None,
                        noop: Some(Noop::AlreadyInstalled),
                    },
                ),
                task(
                    "just",
                    TaskState::Failed,
                    TaskOutcome::Failed {
                        exit_code: Some(1),
                        diagnostic: "command exited with code 1\nerror: no network".into(),
                    },
                ),
                task(
                    "cargo-nextest",
                    TaskState::Skipped,
                    TaskOutcome::Skipped(SkipReason::DependencyFailed(SoftwareId::from("just"))),
                ),
            ],
        };
        log.print_summary(&report);
        let text = contents(&log);
        assert!(text.contains("==> Summary"));
        assert!(text.contains("✓ go (1.22.1)"));
        assert!(text.contains("· bun (already-installed)"));
        assert!(text.contains("✗ just (command exited with code 1)"));
        assert!(text.contains("○ cargo-nextest (dependency failed (just))"));
        assert!(text.contains("4 tasks: 2 ok, 1 unchanged, 1 skipped, 1 failed, 0 cancelled"));
        assert!(text.contains("install just failed"));
        assert!(text.contains("│ error: no network"));
    }

    #[test]
    fn empty_report_prints_nothing() {
        let (log, _tmp, _guard) = isolated_logger();
        log.print_summary(&RunReport {
            action: Action::Install,
            dry_run: true,
            tasks: Vec::new(),
        });
        assert!(!contents(&log).contains("Summary"));
    }
}
