//! Summary of a finished run and the exit-status rule.
use crate::catalog::{Action, SoftwareId};
use crate::engine::{SkipReason, TaskOutcome};
use crate::status::Status;

use super::task::{Task, TaskState};

/// Per-state task counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    /// Succeeded, including no-ops and status checks.
    pub succeeded: usize,
    /// Of the succeeded, how many had nothing to do.
    pub unchanged: usize,
    /// Failed.
    pub failed: usize,
    /// Skipped for any reason.
    pub skipped: usize,
    /// Cancelled.
    pub cancelled: usize,
}

/// Final task table of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The run's action.
    pub action: Action,
    /// Whether it was a dry run.
    pub dry_run: bool,
    /// Every task, in dispatch order.
    pub tasks: Vec<Task>,
}

impl RunReport {
    /// Return `true` if the run counts as successful.
    ///
    /// Every task must have satisfied its dependents. Status checks never
    /// fail; no-op successes count as success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.tasks.iter().all(Task::is_satisfied)
    }

    /// Count tasks by terminal state.
    #[must_use]
    pub fn counts(&self) -> Counts {
        let mut counts = Counts::default();
        for task in &self.tasks {
            match task.state {
                TaskState::Succeeded => {
                    counts.succeeded += 1;
                    if matches!(task.outcome, Some(TaskOutcome::Succeeded { noop: Some(_), .. })) {
                        counts.unchanged += 1;
                    }
                }
                TaskState::Failed => counts.failed += 1,
                TaskState::Skipped => counts.skipped += 1,
                TaskState::Cancelled | TaskState::Pending | TaskState::Running => {
                    counts.cancelled += 1;
                }
            }
        }
        counts
    }

    /// Failed tasks with their diagnostics.
    pub fn failures(&self) -> impl Iterator<Item = (&Task, &str)> {
        self.tasks.iter().filter_map(|t| match &t.outcome {
            Some(TaskOutcome::Failed { diagnostic, .. }) => Some((t, diagnostic.as_str())),
            _ => None,
        })
    }

    /// Skipped tasks with their reasons, excluding dry-run skips.
    pub fn skips(&self) -> impl Iterator<Item = (&Task, &SkipReason)> {
        self.tasks.iter().filter_map(|t| match &t.outcome {
            Some(TaskOutcome::Skipped(reason)) if *reason != SkipReason::DryRun => Some((t, reason)),
            _ => None,
        })
    }

    /// The task for `id`.
    #[must_use]
    pub fn task(&self, id: &SoftwareId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.software_id == id)
    }

    /// Status check results.
    pub fn statuses(&self) -> impl Iterator<Item = (&SoftwareId, &Status)> {
        self.tasks.iter().filter_map(|t| match &t.outcome {
            Some(TaskOutcome::Checked(status)) => Some((&t.software_id, status)),
            _ => None,
        })
    }
}
