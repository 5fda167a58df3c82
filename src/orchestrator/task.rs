//! Task records and the shared task table.
//!
//! The table is the only mutable state shared between the dispatcher and
//! the workers. Every change is one locked operation, and states only move
//! forward: `Pending → Running → terminal`, or `Pending → Skipped|Cancelled`.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::catalog::{Action, InstallerKind, SoftwareId};
use crate::engine::{SkipReason, TaskOutcome};

/// Position of a task in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub usize);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Waiting for its gating tasks or a free slot.
    Pending,
    /// Handed to a worker.
    Running,
    /// Finished successfully (including no-ops and status checks).
    Succeeded,
    /// The command failed.
    Failed,
    /// Did not run.
    Skipped,
    /// Stopped by cancellation.
    Cancelled,
}

impl TaskState {
    /// Return `true` once the state can no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    const fn can_become(self, next: Self) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Running | Self::Skipped | Self::Cancelled),
            Self::Running => next.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl From<&TaskOutcome> for TaskState {
    fn from(outcome: &TaskOutcome) -> Self {
        match outcome {
            TaskOutcome::Succeeded { .. } | TaskOutcome::Checked(_) => Self::Succeeded,
            TaskOutcome::Failed { .. } => Self::Failed,
            TaskOutcome::Skipped(_) => Self::Skipped,
            TaskOutcome::Cancelled => Self::Cancelled,
        }
    }
}

/// A rejected state change.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The move goes backwards or leaves a terminal state.
    #[error("task {id} cannot move from {from} to {to}")]
    Illegal {
        /// Task.
        id: TaskId,
        /// Current state.
        from: TaskState,
        /// Requested state.
        to: TaskState,
    },
    /// No task with this id.
    #[error("no task {0}")]
    UnknownTask(TaskId),
}

/// One unit of work: an action on one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Position in the run.
    pub id: TaskId,
    /// Target entry.
    pub software_id: SoftwareId,
    /// Installer kind of the entry, for concurrency caps.
    pub installer: InstallerKind,
    /// What to do.
    pub action: Action,
    /// Current state.
    pub state: TaskState,
    /// Output lines received so far.
    pub output: Vec<String>,
    /// When the task started running.
    pub started_at: Option<DateTime<Utc>>,
    /// When the task reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
    /// Final outcome, set with the terminal state.
    pub outcome: Option<TaskOutcome>,
}

impl Task {
    /// A pending task.
    #[must_use]
    pub const fn new(id: TaskId, software_id: SoftwareId, installer: InstallerKind, action: Action) -> Self {
        Self {
            id,
            software_id,
            installer,
            action,
            state: TaskState::Pending,
            output: Vec::new(),
            started_at: None,
            finished_at: None,
            outcome: None,
        }
    }

    /// Return `true` if dependents gated on this task may proceed.
    ///
    /// A dry-run skip counts, so a preview walks the whole graph. So does a
    /// manual update step: the installed version stays usable.
    #[must_use]
    pub const fn is_satisfied(&self) -> bool {
        match (self.state, &self.outcome) {
            (TaskState::Succeeded, _)
            | (TaskState::Skipped, Some(TaskOutcome::Skipped(SkipReason::DryRun))) => true,
            (TaskState::Skipped, Some(TaskOutcome::Skipped(SkipReason::Manual(_)))) => {
                matches!(self.action, Action::Update)
            }
            _ => false,
        }
    }

    /// Return `true` if the task ended without satisfying its dependents.
    #[must_use]
    pub const fn is_blocking(&self) -> bool {
        self.state.is_terminal() && !self.is_satisfied()
    }
}

/// Mutex-guarded list of the run's tasks, indexed by [`TaskId`].
#[derive(Debug, Default)]
pub struct TaskTable {
    tasks: Mutex<Vec<Task>>,
}

impl TaskTable {
    /// Build a table from pending tasks; ids must equal positions.
    #[must_use]
    pub const fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Task>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move task `id` to `to`, recording `outcome` with terminal states.
    ///
    /// Returns the commit timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] if the task does not exist or the move is
    /// not forward.
    pub fn transition(
        &self,
        id: TaskId,
        to: TaskState,
        outcome: Option<TaskOutcome>,
    ) -> Result<DateTime<Utc>, TransitionError> {
        let mut tasks = self.lock();
        let task = tasks.get_mut(id.0).ok_or(TransitionError::UnknownTask(id))?;
        if !task.state.can_become(to) {
            return Err(TransitionError::Illegal {
                id,
                from: task.state,
                to,
            });
        }
        let now = Utc::now();
        task.state = to;
        if to == TaskState::Running {
            task.started_at = Some(now);
        } else {
            task.finished_at = Some(now);
            task.outcome = outcome;
        }
        Ok(now)
    }

    /// Append an output line to task `id`.
    pub fn push_output(&self, id: TaskId, line: &str) {
        if let Some(task) = self.lock().get_mut(id.0) {
            task.output.push(line.to_string());
        }
    }

    /// Copy of task `id`.
    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<Task> {
        self.lock().get(id.0).cloned()
    }

    /// Current state of every task, in id order.
    #[must_use]
    pub fn states(&self) -> Vec<TaskState> {
        self.lock().iter().map(|t| t.state).collect()
    }

    /// Number of tasks not yet terminal.
    #[must_use]
    pub fn unfinished(&self) -> usize {
        self.lock().iter().filter(|t| !t.state.is_terminal()).count()
    }

    /// Consume the table, returning the tasks.
    #[must_use]
    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn table(n: usize) -> TaskTable {
        TaskTable::new(
            (0..n)
                .map(|i| {
                    Task::new(
                        TaskId(i),
                        SoftwareId::from(format!("t{i}")),
                        InstallerKind::Script,
                        Action::Install,
                    )
                })
                .collect(),
        )
    }

    fn ok() -> Option<TaskOutcome> {
        Some(TaskOutcome::Succeeded {
            version: None,
            noop: None,
        })
    }

    #[test]
    fn forward_transitions_are_recorded() {
        let t = table(1);
        t.transition(TaskId(0), TaskState::Running, None).unwrap();
        t.transition(TaskId(0), TaskState::Succeeded, ok()).unwrap();
        let task = t.get(TaskId(0)).unwrap();
        assert_eq!(task.state, TaskState::Succeeded);
        assert!(task.started_at.is_some());
        assert!(task.finished_at >= task.started_at);
        assert_eq!(task.outcome, ok());
    }

    #[test]
    fn terminal_states_are_final() {
        let t = table(1);
        t.transition(TaskId(0), TaskState::Cancelled, Some(TaskOutcome::Cancelled))
            .unwrap();
        let err = t
            .transition(TaskId(0), TaskState::Running, None)
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::Illegal {
                id: TaskId(0),
                from: TaskState::Cancelled,
                to: TaskState::Running,
            }
        );
    }

    #[test]
    fn pending_cannot_jump_to_succeeded() {
        let t = table(1);
        assert!(t.transition(TaskId(0), TaskState::Succeeded, ok()).is_err());
        assert!(t.transition(TaskId(0), TaskState::Pending, None).is_err());
    }

    #[test]
    fn unknown_task_is_rejected() {
        let t = table(1);
        assert_eq!(
            t.transition(TaskId(5), TaskState::Running, None),
            Err(TransitionError::UnknownTask(TaskId(5)))
        );
    }

    #[test]
    fn dry_run_skip_is_satisfying() {
        let t = table(2);
        t.transition(TaskId(0), TaskState::Skipped, Some(TaskOutcome::Skipped(SkipReason::DryRun)))
            .unwrap();
        t.transition(
            TaskId(1),
            TaskState::Skipped,
            Some(TaskOutcome::Skipped(SkipReason::Manual("by hand".into()))),
        )
        .unwrap();
        assert!(t.get(TaskId(0)).unwrap().is_satisfied());
        let manual = t.get(TaskId(1)).unwrap();
        assert!(!manual.is_satisfied());
        assert!(manual.is_blocking());
    }

    #[test]
    fn manual_update_step_is_satisfying() {
        let mut task = Task::new(TaskId(0), SoftwareId::from("nvm"), InstallerKind::Script, Action::Update);
        task.state = TaskState::Skipped;
        task.outcome = Some(TaskOutcome::Skipped(SkipReason::Manual("git pull".into())));
        assert!(task.is_satisfied());
        assert!(!task.is_blocking());

        task.action = Action::Uninstall;
        assert!(task.is_blocking());
    }

    #[test]
    fn output_and_counts() {
        let t = table(2);
        t.push_output(TaskId(1), "hello");
        t.transition(TaskId(0), TaskState::Running, None).unwrap();
        assert_eq!(t.unfinished(), 2);
        assert_eq!(t.states(), [TaskState::Running, TaskState::Pending]);
        let tasks = t.into_tasks();
        assert_eq!(tasks[1].output, ["hello"]);
    }
}
