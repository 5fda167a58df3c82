//! Console rendering of the task event stream.
use crossbeam_channel::Receiver;

use crate::catalog::Action;
use crate::engine::TaskOutcome;
use crate::logging::Logger;
use crate::orchestrator::{TaskEvent, TaskState};

/// Log events until the bus goes away.
///
/// Output lines are debug messages (visible with `-v`) except in a dry run,
/// where they are the commands that would have run.
pub fn events(rx: &Receiver<TaskEvent>, log: &Logger, dry_run: bool) {
    for event in rx {
        render(&event, log, dry_run);
    }
}

fn render(event: &TaskEvent, log: &Logger, dry_run: bool) {
    let id = &event.software_id;
    if let Some(line) = &event.output_line {
        if dry_run {
            log.dry_run(&format!("{} {id}: {line}", event.action));
        } else {
            log.debug(&format!("[{id}] {line}"));
        }
        return;
    }
    match (event.state, &event.outcome) {
        (TaskState::Running, _) if !dry_run => log.info(&format!("{} {id}", progressive(event.action))),
        (TaskState::Failed, Some(TaskOutcome::Failed { diagnostic, .. })) => {
            let first = diagnostic.lines().next().unwrap_or_default();
            log.warn(&format!("{} {id} failed: {first}", event.action));
        }
        (TaskState::Skipped | TaskState::Cancelled, Some(outcome)) if !dry_run => {
            log.debug(&format!("{id}: {outcome:?}"));
        }
        (TaskState::Succeeded, Some(TaskOutcome::Succeeded { version: Some(v), noop: None })) => {
            log.debug(&format!("{id} now at {v}"));
        }
        _ => {}
    }
}

const fn progressive(action: Action) -> &'static str {
    match action {
        Action::Install => "installing",
        Action::Update => "updating",
        Action::Uninstall => "uninstalling",
        Action::StatusCheck => "checking",
    }
}
