//! Execution of one action on one catalog entry.
//!
//! [`ExecutionEngine::execute`] never returns an error: every way a task can
//! end is a [`TaskOutcome`]. The orchestrator maps outcomes onto task states.

pub mod adapter;

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::catalog::{Action, CommandRecipe, Software, SoftwareId};
use crate::config::Timeouts;
use crate::error::ExecutionError;
use crate::exec::{Executor, StreamExit, StreamRequest};
use crate::status::{Status, StatusDetector, StatusState};

use adapter::Adapter;

/// Output lines kept for a failure diagnostic.
const DIAGNOSTIC_LINES: usize = 20;

/// Why a successful task did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Noop {
    /// Install requested, already present.
    AlreadyInstalled,
    /// Uninstall requested, already absent.
    AlreadyAbsent,
    /// Update requested, already at the latest known version.
    UpToDate,
}

impl Noop {
    /// Label recorded as a history source.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AlreadyInstalled => "already-installed",
            Self::AlreadyAbsent => "already-absent",
            Self::UpToDate => "up-to-date",
        }
    }
}

/// Why a task did not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Dry run: the command was only reported.
    DryRun,
    /// A gating task did not succeed.
    DependencyFailed(SoftwareId),
    /// The recipe is a manual instruction.
    Manual(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DryRun => f.write_str("dry-run"),
            Self::DependencyFailed(dep) => write!(f, "dependency failed ({dep})"),
            Self::Manual(note) => write!(f, "manual step: {note}"),
        }
    }
}

/// How a task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The action completed, or there was nothing to do.
    Succeeded {
        /// Version detected afterwards, if any.
        version: Option<String>,
        /// Set when no command was run.
        noop: Option<Noop>,
    },
    /// The command failed.
    Failed {
        /// Exit code, when the process exited on its own.
        exit_code: Option<i32>,
        /// Error message followed by the tail of the output.
        diagnostic: String,
    },
    /// The task did not run.
    Skipped(SkipReason),
    /// The run was cancelled before or while the task ran.
    Cancelled,
    /// Result of a status check.
    Checked(Status),
}

/// Per-run inputs to [`ExecutionEngine::execute`].
#[derive(Debug, Clone, Copy)]
pub struct ExecContext<'a> {
    /// Report commands instead of running them.
    pub dry_run: bool,
    /// Run install/update even when already satisfied.
    pub force: bool,
    /// Command time limits.
    pub timeouts: Timeouts,
    /// Run-wide cancellation.
    pub cancel: &'a CancelToken,
}

/// Runs recipes through their adapters and classifies the result.
#[derive(Debug, Clone)]
pub struct ExecutionEngine {
    executor: Arc<dyn Executor>,
    detector: StatusDetector,
}

impl ExecutionEngine {
    /// Create an engine over `executor`, detecting state with `detector`.
    #[must_use]
    pub const fn new(executor: Arc<dyn Executor>, detector: StatusDetector) -> Self {
        Self { executor, detector }
    }

    /// The status detector.
    #[must_use]
    pub const fn detector(&self) -> &StatusDetector {
        &self.detector
    }

    /// Perform `action` on `software`, passing output lines to `on_line`.
    pub fn execute(
        &self,
        software: &Software,
        action: Action,
        ctx: &ExecContext<'_>,
        on_line: &mut dyn FnMut(String),
    ) -> TaskOutcome {
        let script = match software.recipe(action) {
            None => return TaskOutcome::Checked(self.detector.detect(software)),
            Some(CommandRecipe::Manual(note)) => {
                return self.manual(software, action, note, ctx, on_line);
            }
            Some(CommandRecipe::Shell(script)) => script,
        };

        let adapter = Adapter::for_kind(software.installer);
        let prepared = match adapter.prepare(script) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(id = %software.id, "{e}");
                return TaskOutcome::Failed {
                    exit_code: None,
                    diagnostic: e.to_string(),
                };
            }
        };

        if ctx.dry_run {
            on_line(script.clone());
            return TaskOutcome::Skipped(SkipReason::DryRun);
        }
        if ctx.cancel.is_cancelled() {
            return TaskOutcome::Cancelled;
        }
        if let Some((noop, status)) = self.precheck(software, action, ctx.force) {
            tracing::debug!(id = %software.id, %action, noop = noop.label(), "nothing to do");
            return TaskOutcome::Succeeded {
                version: status.version,
                noop: Some(noop),
            };
        }

        let timeout = ctx.timeouts.for_action(action);
        let request = StreamRequest {
            program: &prepared.program,
            args: &prepared.args,
            env: &prepared.env,
            timeout,
            grace: ctx.timeouts.grace,
            cancel: ctx.cancel,
        };
        let mut tail: VecDeque<String> = VecDeque::with_capacity(DIAGNOSTIC_LINES);
        tracing::debug!(id = %software.id, %action, source = adapter.source_label(), "running: {script}");
        let exit = self.executor.stream(&request, &mut |line| {
            if tail.len() == DIAGNOSTIC_LINES {
                tail.pop_front();
            }
            tail.push_back(line.text.clone());
            on_line(line.text);
        });

        match exit {
            Ok(StreamExit::Exited(Some(0))) => {
                let version = match action {
                    Action::Install | Action::Update => self.detector.detect(software).version,
                    Action::Uninstall | Action::StatusCheck => None,
                };
                TaskOutcome::Succeeded {
                    version,
                    noop: None,
                }
            }
            Ok(StreamExit::Exited(code)) => TaskOutcome::Failed {
                exit_code: code,
                diagnostic: diagnostic(
                    &code.map_or_else(
                        || "command was terminated by a signal".to_string(),
                        |code| ExecutionError::NonZeroExit { code }.to_string(),
                    ),
                    &tail,
                ),
            },
            Ok(StreamExit::TimedOut) => TaskOutcome::Failed {
                exit_code: None,
                diagnostic: diagnostic(&ExecutionError::Timeout(timeout).to_string(), &tail),
            },
            Ok(StreamExit::Cancelled) => TaskOutcome::Cancelled,
            Ok(StreamExit::Unresponsive) => TaskOutcome::Failed {
                exit_code: None,
                diagnostic: ExecutionError::Unresponsive(ctx.timeouts.grace).to_string(),
            },
            Err(e) => TaskOutcome::Failed {
                exit_code: None,
                diagnostic: ExecutionError::SpawnFailure {
                    command: script.clone(),
                    reason: format!("{e:#}"),
                }
                .to_string(),
            },
        }
    }

    /// A manual recipe has nothing to run, unless the action is already
    /// satisfied on this machine.
    fn manual(
        &self,
        software: &Software,
        action: Action,
        note: &str,
        ctx: &ExecContext<'_>,
        on_line: &mut dyn FnMut(String),
    ) -> TaskOutcome {
        if !ctx.dry_run
            && let Some((noop, status)) = self.precheck(software, action, ctx.force)
        {
            tracing::debug!(id = %software.id, %action, noop = noop.label(), "manual step not needed");
            return TaskOutcome::Succeeded {
                version: status.version,
                noop: Some(noop),
            };
        }
        on_line(format!("manual step: {note}"));
        TaskOutcome::Skipped(SkipReason::Manual(note.to_string()))
    }

    /// Detect whether `action` is already satisfied.
    fn precheck(&self, software: &Software, action: Action, force: bool) -> Option<(Noop, Status)> {
        match action {
            Action::Uninstall => {
                let status = self.detector.detect(software);
                (status.state == StatusState::NotInstalled).then_some((Noop::AlreadyAbsent, status))
            }
            Action::Install if !force => {
                let status = self.detector.detect(software);
                status.installed.then_some((Noop::AlreadyInstalled, status))
            }
            Action::Update if !force => {
                let status = self.detector.detect(software);
                let latest_known = self.detector.latest().get(&software.id).is_some();
                (latest_known && status.state == StatusState::UpToDate)
                    .then_some((Noop::UpToDate, status))
            }
            _ => None,
        }
    }
}

fn diagnostic(message: &str, tail: &VecDeque<String>) -> String {
    if tail.is_empty() {
        return message.to_string();
    }
    let lines: Vec<&str> = tail.iter().map(String::as_str).collect();
    format!("{message}\n{}", lines.join("\n"))
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::catalog::test_helpers::{entry, simple};
    use crate::catalog::{InstallerKind, VersionProbe};
    use crate::config::manifest::LatestVersions;
    use crate::test_helpers::{MockExecutor, ScriptedRun};
    use std::time::Duration;

    fn engine(exec: &Arc<MockExecutor>, latest: LatestVersions) -> ExecutionEngine {
        let executor: Arc<dyn Executor> = Arc::clone(exec) as Arc<dyn Executor>;
        let detector = StatusDetector::new(Arc::clone(&executor), Arc::new(latest))
            .with_app_dirs(Vec::new());
        ExecutionEngine::new(executor, detector)
    }

    fn run(
        engine: &ExecutionEngine,
        software: &Software,
        action: Action,
        dry_run: bool,
        force: bool,
        cancel: &CancelToken,
    ) -> (TaskOutcome, Vec<String>) {
        let ctx = ExecContext {
            dry_run,
            force,
            timeouts: Timeouts::default().uniform(Duration::from_secs(5)),
            cancel,
        };
        let mut lines = Vec::new();
        let outcome = engine.execute(software, action, &ctx, &mut |l| lines.push(l));
        (outcome, lines)
    }

    fn live(engine: &ExecutionEngine, software: &Software, action: Action) -> (TaskOutcome, Vec<String>) {
        run(engine, software, action, false, false, &CancelToken::new())
    }

    // ---- status check ----

    #[test]
    fn status_check_returns_detection() {
        let exec = Arc::new(MockExecutor::new());
        let (outcome, _) = live(&engine(&exec, LatestVersions::default()), &simple("bun", &[]), Action::StatusCheck);
        assert_eq!(outcome, TaskOutcome::Checked(Status::not_installed()));
        assert!(exec.streamed().is_empty());
    }

    // ---- dry run ----

    #[test]
    fn dry_run_reports_command_without_executing() {
        let exec = Arc::new(MockExecutor::new());
        let (outcome, lines) = run(
            &engine(&exec, LatestVersions::default()),
            &simple("rust", &[]),
            Action::Install,
            true,
            false,
            &CancelToken::new(),
        );
        assert_eq!(outcome, TaskOutcome::Skipped(SkipReason::DryRun));
        assert_eq!(lines, ["install-rust"]);
        assert!(exec.streamed().is_empty());
        assert!(exec.calls().is_empty(), "dry run must not probe either");
    }

    // ---- manual recipes ----

    #[test]
    fn manual_recipe_is_skipped_with_note() {
        let mut nvm = simple("nvm", &[]);
        nvm.uninstall = CommandRecipe::Manual("Remove ~/.nvm".to_string());
        let exec = Arc::new(
            MockExecutor::new()
                .with_program("nvm")
                .respond("nvm --version", true, "0.39.7"),
        );
        let (outcome, lines) = live(&engine(&exec, LatestVersions::default()), &nvm, Action::Uninstall);
        assert_eq!(
            outcome,
            TaskOutcome::Skipped(SkipReason::Manual("Remove ~/.nvm".to_string()))
        );
        assert_eq!(lines, ["manual step: Remove ~/.nvm"]);
    }

    #[test]
    fn manual_uninstall_of_absent_software_is_noop() {
        let mut bun = simple("bun", &[]);
        bun.uninstall = CommandRecipe::Manual("Remove ~/.bun".to_string());
        let exec = Arc::new(MockExecutor::new());
        let (outcome, lines) = live(&engine(&exec, LatestVersions::default()), &bun, Action::Uninstall);
        assert_eq!(
            outcome,
            TaskOutcome::Succeeded {
                version: None,
                noop: Some(Noop::AlreadyAbsent),
            }
        );
        assert!(lines.is_empty());
    }

    #[test]
    fn manual_install_of_installed_software_is_noop() {
        let mut brew = simple("brew", &[]);
        brew.install = CommandRecipe::Manual("Run the installer".to_string());
        let exec = Arc::new(
            MockExecutor::new()
                .with_program("brew")
                .respond("brew --version", true, "Homebrew 4.3.1"),
        );
        let (outcome, _) = live(&engine(&exec, LatestVersions::default()), &brew, Action::Install);
        assert!(matches!(
            outcome,
            TaskOutcome::Succeeded { noop: Some(Noop::AlreadyInstalled), .. }
        ));
    }

    #[test]
    fn manual_recipe_in_dry_run_does_not_probe() {
        let mut bun = simple("bun", &[]);
        bun.uninstall = CommandRecipe::Manual("Remove ~/.bun".to_string());
        let exec = Arc::new(MockExecutor::new());
        let (outcome, lines) = run(
            &engine(&exec, LatestVersions::default()),
            &bun,
            Action::Uninstall,
            true,
            false,
            &CancelToken::new(),
        );
        assert_eq!(outcome, TaskOutcome::Skipped(SkipReason::Manual("Remove ~/.bun".to_string())));
        assert_eq!(lines, ["manual step: Remove ~/.bun"]);
        assert!(exec.calls().is_empty());
    }

    // ---- idempotency ----

    #[test]
    fn install_of_installed_software_is_noop() {
        let exec = Arc::new(
            MockExecutor::new()
                .with_program("just")
                .respond("just --version", true, "just 1.25.2"),
        );
        let (outcome, _) = live(&engine(&exec, LatestVersions::default()), &simple("just", &[]), Action::Install);
        assert_eq!(
            outcome,
            TaskOutcome::Succeeded {
                version: Some("1.25.2".to_string()),
                noop: Some(Noop::AlreadyInstalled),
            }
        );
        assert!(exec.streamed().is_empty());
    }

    #[test]
    fn force_reinstalls() {
        let exec = Arc::new(
            MockExecutor::new()
                .with_program("just")
                .respond("just --version", true, "just 1.25.2"),
        );
        let (outcome, _) = run(
            &engine(&exec, LatestVersions::default()),
            &simple("just", &[]),
            Action::Install,
            false,
            true,
            &CancelToken::new(),
        );
        assert!(matches!(outcome, TaskOutcome::Succeeded { noop: None, .. }));
        assert_eq!(exec.streamed().len(), 1);
    }

    #[test]
    fn uninstall_of_absent_software_is_noop() {
        let exec = Arc::new(MockExecutor::new());
        let (outcome, _) = live(&engine(&exec, LatestVersions::default()), &simple("bun", &[]), Action::Uninstall);
        assert_eq!(
            outcome,
            TaskOutcome::Succeeded {
                version: None,
                noop: Some(Noop::AlreadyAbsent),
            }
        );
    }

    #[test]
    fn update_noop_needs_a_known_latest_version() {
        let software = simple("go", &[]);
        let make = || {
            Arc::new(
                MockExecutor::new()
                    .with_program("go")
                    .respond("go --version", true, "go version go1.23.2"),
            )
        };

        let exec = make();
        let (outcome, _) = live(&engine(&exec, LatestVersions::default().with("go", "1.23.2")), &software, Action::Update);
        assert!(matches!(outcome, TaskOutcome::Succeeded { noop: Some(Noop::UpToDate), .. }));

        let exec = make();
        let (outcome, _) = live(&engine(&exec, LatestVersions::default()), &software, Action::Update);
        assert!(matches!(outcome, TaskOutcome::Succeeded { noop: None, .. }));
        assert_eq!(exec.streamed().len(), 1);
    }

    // ---- live runs ----

    #[test]
    fn success_redetects_version() {
        let exec = Arc::new(
            MockExecutor::new()
                .with_program("bun")
                .respond("bun --version", false, "")
                .respond("bun --version", true, "1.1.8")
                .script("install-bun", ScriptedRun::ok().with_lines(&["installing"])),
        );
        let (outcome, lines) = live(&engine(&exec, LatestVersions::default()), &simple("bun", &[]), Action::Install);
        assert_eq!(
            outcome,
            TaskOutcome::Succeeded {
                version: Some("1.1.8".to_string()),
                noop: None,
            }
        );
        assert_eq!(lines, ["installing"]);
    }

    #[test]
    fn failure_keeps_last_lines() {
        let output: Vec<String> = (1..=25).map(|i| format!("line {i}")).collect();
        let refs: Vec<&str> = output.iter().map(String::as_str).collect();
        let exec = Arc::new(MockExecutor::new().script("install-x", ScriptedRun::exit(1).with_lines(&refs)));
        let (outcome, lines) = live(&engine(&exec, LatestVersions::default()), &simple("x", &[]), Action::Install);
        assert_eq!(lines.len(), 25);
        match outcome {
            TaskOutcome::Failed {
                exit_code,
                diagnostic,
            } => {
                assert_eq!(exit_code, Some(1));
                let diag: Vec<&str> = diagnostic.lines().collect();
                assert_eq!(diag[0], "command exited with code 1");
                assert_eq!(diag.len(), 1 + DIAGNOSTIC_LINES);
                assert_eq!(diag[1], "line 6");
                assert_eq!(diag[DIAGNOSTIC_LINES], "line 25");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn timeout_is_a_failure() {
        let exec = Arc::new(MockExecutor::new().script("install-x", ScriptedRun::ending(StreamExit::TimedOut)));
        let (outcome, _) = live(&engine(&exec, LatestVersions::default()), &simple("x", &[]), Action::Install);
        assert!(matches!(
            outcome,
            TaskOutcome::Failed { exit_code: None, ref diagnostic } if diagnostic.starts_with("timed out after 5s")
        ));
    }

    #[test]
    fn ignored_cancellation_is_a_failure() {
        let exec = Arc::new(MockExecutor::new().script("install-x", ScriptedRun::ending(StreamExit::Unresponsive)));
        let (outcome, _) = live(&engine(&exec, LatestVersions::default()), &simple("x", &[]), Action::Install);
        assert!(matches!(outcome, TaskOutcome::Failed { exit_code: None, .. }));
    }

    #[test]
    fn cancelled_before_start() {
        let exec = Arc::new(MockExecutor::new());
        let cancel = CancelToken::new();
        cancel.cancel();
        let (outcome, _) = run(
            &engine(&exec, LatestVersions::default()),
            &simple("x", &[]),
            Action::Install,
            false,
            false,
            &cancel,
        );
        assert_eq!(outcome, TaskOutcome::Cancelled);
        assert!(exec.streamed().is_empty());
    }

    #[test]
    fn cask_guard_fails_without_running() {
        let mut cask = entry(
            "zed_stable",
            InstallerKind::SystemCask,
            VersionProbe::Bundle {
                path: Some("/nonexistent/Zed.app".to_string()),
                name: None,
            },
            &[],
        );
        cask.install = CommandRecipe::Shell("curl -fsSL https://example.invalid | sh".to_string());
        let exec = Arc::new(MockExecutor::new());
        let (outcome, _) = live(&engine(&exec, LatestVersions::default()), &cask, Action::Install);
        assert!(matches!(
            outcome,
            TaskOutcome::Failed { ref diagnostic, .. } if diagnostic.starts_with("refusing to run")
        ));
        assert!(exec.streamed().is_empty());
    }

    #[test]
    fn adapter_environment_reaches_executor() {
        let cask = entry(
            "raycast",
            InstallerKind::SystemCask,
            VersionProbe::Bundle {
                path: Some("/nonexistent/Raycast.app".to_string()),
                name: None,
            },
            &[],
        );
        let mut cask = cask;
        cask.install = CommandRecipe::Shell("brew install --cask raycast".to_string());
        let exec = Arc::new(MockExecutor::new());
        live(&engine(&exec, LatestVersions::default()), &cask, Action::Install);
        let calls = exec.streamed();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "sh");
        assert!(
            calls[0]
                .env
                .contains(&("HOMEBREW_NO_AUTO_UPDATE".to_string(), "1".to_string()))
        );
    }

    #[test]
    fn skip_reason_display() {
        assert_eq!(SkipReason::DryRun.to_string(), "dry-run");
        assert_eq!(
            SkipReason::DependencyFailed(SoftwareId::from("x")).to_string(),
            "dependency failed (x)"
        );
    }
}
