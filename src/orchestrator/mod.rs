//! Dependency-gated parallel execution of a resolved order.
//!
//! The dispatcher runs on the calling thread and owns every scheduling
//! decision. Workers, a fixed pool of scoped OS threads sized to the global
//! cap, pull task ids from a job channel, run them through the
//! [`ExecutionEngine`] and report outcomes on a completion channel. The
//! dispatcher reacts to completions and wakes on a short timeout only to
//! notice cancellation.

mod limits;
pub mod events;
pub mod report;
pub mod task;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;

pub use limits::ConcurrencyLimits;
use limits::Slots;

use crate::cancel::CancelToken;
use crate::catalog::{Action, Catalog, SoftwareId};
use crate::config::RunConfig;
use crate::engine::adapter::Adapter;
use crate::engine::{ExecContext, ExecutionEngine, SkipReason, TaskOutcome};
use crate::error::ResolutionError;
use crate::history::{HistoryRecord, HistorySink};

pub use events::{EventBus, TaskEvent};
pub use report::{Counts, RunReport};
pub use task::{Task, TaskId, TaskState};
use task::TaskTable;

/// How often an idle dispatcher checks for cancellation.
const CANCEL_POLL: Duration = Duration::from_millis(100);

/// Schedules tasks onto workers and records the results.
pub struct Orchestrator {
    catalog: Arc<Catalog>,
    engine: ExecutionEngine,
    history: Option<Arc<dyn HistorySink>>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("catalog", &self.catalog.len())
            .field("engine", &self.engine)
            .field("history", &self.history.is_some())
            .finish()
    }
}

/// Everything a run shares between the dispatcher and the workers.
struct RunState<'a> {
    table: TaskTable,
    events: &'a EventBus,
    ctx: ExecContext<'a>,
}

impl RunState<'_> {
    /// Mark every pending task cancelled.
    fn cancel_pending(&self) {
        for (i, s) in self.table.states().into_iter().enumerate() {
            if s == TaskState::Pending {
                self.commit(TaskId(i), TaskState::Cancelled, Some(TaskOutcome::Cancelled));
            }
        }
    }

    /// Skip pending tasks behind a blocking gate, until nothing changes.
    fn cascade_skips(&self, gates: &[Vec<usize>]) {
        let mut changed = true;
        while changed {
            changed = false;
            for (i, waits_on) in gates.iter().enumerate() {
                if self.table.get(TaskId(i)).map(|t| t.state) != Some(TaskState::Pending) {
                    continue;
                }
                let blocker = waits_on.iter().find_map(|&g| {
                    self.table
                        .get(TaskId(g))
                        .filter(Task::is_blocking)
                        .map(|t| t.software_id)
                });
                if let Some(dep) = blocker {
                    tracing::debug!(task = %TaskId(i), %dep, "skipping, dependency failed");
                    self.commit(
                        TaskId(i),
                        TaskState::Skipped,
                        Some(TaskOutcome::Skipped(SkipReason::DependencyFailed(dep))),
                    );
                    changed = true;
                }
            }
        }
    }

    /// Start ready tasks in order while slots allow.
    fn start_ready(
        &self,
        gates: &[Vec<usize>],
        slots: &mut Slots<'_>,
        jobs: &crossbeam_channel::Sender<TaskId>,
    ) {
        if self.ctx.cancel.is_cancelled() {
            return;
        }
        for (i, waits_on) in gates.iter().enumerate() {
            let Some(task) = self.table.get(TaskId(i)) else {
                continue;
            };
            if task.state != TaskState::Pending {
                continue;
            }
            let ready = waits_on
                .iter()
                .all(|&g| self.table.get(TaskId(g)).is_some_and(|t| t.is_satisfied()));
            if !ready || !slots.available(task.installer, task.action) {
                continue;
            }
            if self.commit(task.id, TaskState::Running, None).is_some() {
                slots.acquire(task.installer, task.action);
                if jobs.send(task.id).is_err() {
                    tracing::error!(task = %task.id, "worker pool is gone");
                }
            }
        }
    }

    /// Commit a transition, then announce it.
    fn commit(&self, id: TaskId, to: TaskState, outcome: Option<TaskOutcome>) -> Option<Task> {
        match self.table.transition(id, to, outcome) {
            Ok(timestamp) => {
                let task = self.table.get(id)?;
                self.events.emit(&TaskEvent {
                    task_id: id,
                    software_id: task.software_id.clone(),
                    action: task.action,
                    state: task.state,
                    timestamp,
                    output_line: None,
                    outcome: task.outcome.clone(),
                });
                Some(task)
            }
            Err(e) => {
                tracing::error!("{e}");
                None
            }
        }
    }
}

impl Orchestrator {
    /// Create an orchestrator without a history sink.
    #[must_use]
    pub const fn new(catalog: Arc<Catalog>, engine: ExecutionEngine) -> Self {
        Self {
            catalog,
            engine,
            history: None,
        }
    }

    /// Record successful mutations to `sink`.
    #[must_use]
    pub fn with_history(mut self, sink: Arc<dyn HistorySink>) -> Self {
        self.history = Some(sink);
        self
    }

    /// The catalog tasks are looked up in.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Run `action` over `order`, which should come from the resolver.
    ///
    /// Install and update tasks wait for their dependencies inside the run,
    /// uninstall tasks for their dependents, status checks for nothing. A
    /// task whose gating task did not succeed is skipped without running.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::MissingDependency`] for an id not in the
    /// catalog and [`ResolutionError::DependencyCycle`] if the gating
    /// relation within `order` is cyclic. Nothing runs in either case.
    pub fn run(
        &self,
        order: &[SoftwareId],
        action: Action,
        config: &RunConfig,
        cancel: &CancelToken,
        events: &EventBus,
    ) -> Result<RunReport, ResolutionError> {
        let mut unique: Vec<&SoftwareId> = Vec::with_capacity(order.len());
        for id in order {
            if !self.catalog.contains(id) {
                return Err(ResolutionError::unknown(id.clone()));
            }
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        let gates = self.gates(&unique, action);
        check_acyclic(&unique, &gates)?;

        let tasks = unique
            .iter()
            .enumerate()
            .filter_map(|(i, id)| {
                let software = self.catalog.get(id)?;
                Some(Task::new(TaskId(i), (*id).clone(), software.installer, action))
            })
            .collect();
        let state = RunState {
            table: TaskTable::new(tasks),
            events,
            ctx: ExecContext {
                dry_run: config.dry_run,
                force: config.force,
                timeouts: config.timeouts,
                cancel,
            },
        };

        tracing::debug!(%action, tasks = unique.len(), dry_run = config.dry_run, "starting run");
        self.dispatch(&state, &gates, config);

        Ok(RunReport {
            action,
            dry_run: config.dry_run,
            tasks: state.table.into_tasks(),
        })
    }

    /// For each task, the indices of the tasks it waits for.
    fn gates(&self, ids: &[&SoftwareId], action: Action) -> Vec<Vec<usize>> {
        let position: HashMap<&SoftwareId, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let deps_of = |id: &SoftwareId| -> Vec<usize> {
            self.catalog
                .get(id)
                .map(|s| {
                    s.dependencies
                        .iter()
                        .filter_map(|d| position.get(d).copied())
                        .collect()
                })
                .unwrap_or_default()
        };
        match action {
            Action::StatusCheck => vec![Vec::new(); ids.len()],
            Action::Install | Action::Update => ids.iter().map(|id| deps_of(id)).collect(),
            Action::Uninstall => {
                let mut dependents = vec![Vec::new(); ids.len()];
                for (i, id) in ids.iter().enumerate() {
                    for dep in deps_of(id) {
                        if let Some(list) = dependents.get_mut(dep) {
                            list.push(i);
                        }
                    }
                }
                dependents
            }
        }
    }

    fn dispatch(&self, state: &RunState<'_>, gates: &[Vec<usize>], config: &RunConfig) {
        let total = gates.len();
        if total == 0 {
            return;
        }
        let workers = config.limits.global().min(total);
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<TaskId>();
        let (done_tx, done_rx) = crossbeam_channel::unbounded::<(TaskId, TaskOutcome)>();

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let done_tx = done_tx.clone();
                scope.spawn(move || {
                    for id in job_rx {
                        let outcome = self.work(state, id);
                        if done_tx.send((id, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(done_tx);

            let mut slots = Slots::new(&config.limits);
            loop {
                if state.ctx.cancel.is_cancelled() {
                    state.cancel_pending();
                }
                state.cascade_skips(gates);
                state.start_ready(gates, &mut slots, &job_tx);

                if state.table.unfinished() == 0 {
                    break;
                }
                if slots.running() == 0 {
                    // Nothing running and nothing startable: give up on the rest.
                    tracing::error!("scheduler stalled with pending tasks");
                    state.cancel_pending();
                    break;
                }

                match done_rx.recv_timeout(CANCEL_POLL) {
                    Ok((id, outcome)) => {
                        if let Some(task) = state.table.get(id) {
                            slots.release(task.installer, task.action);
                        }
                        self.finish(state, id, outcome);
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            drop(job_tx);
        });
    }

    /// Worker side: execute one task.
    fn work(&self, state: &RunState<'_>, id: TaskId) -> TaskOutcome {
        let Some(task) = state.table.get(id) else {
            return TaskOutcome::Cancelled;
        };
        let Some(software) = self.catalog.get(&task.software_id) else {
            return TaskOutcome::Failed {
                exit_code: None,
                diagnostic: format!("'{}' is not in the catalog", task.software_id),
            };
        };
        self.engine.execute(software, task.action, &state.ctx, &mut |line| {
            state.table.push_output(id, &line);
            state.events.emit(&TaskEvent {
                task_id: id,
                software_id: task.software_id.clone(),
                action: task.action,
                state: TaskState::Running,
                timestamp: chrono::Utc::now(),
                output_line: Some(line),
                outcome: None,
            });
        })
    }

    /// Dispatcher side: commit a worker's outcome and record history.
    fn finish(&self, state: &RunState<'_>, id: TaskId, outcome: TaskOutcome) {
        let to = TaskState::from(&outcome);
        let Some(task) = state.commit(id, to, Some(outcome)) else {
            return;
        };
        if let (Some(sink), Some(record)) = (&self.history, self.history_record(&task))
            && let Err(e) = sink.append(&record)
        {
            tracing::warn!(id = %task.software_id, "could not write history: {e:#}");
        }
    }

    fn history_record(&self, task: &Task) -> Option<HistoryRecord> {
        if !task.action.is_mutating() {
            return None;
        }
        let Some(TaskOutcome::Succeeded { version, noop }) = &task.outcome else {
            return None;
        };
        let source = match noop {
            Some(n) => n.label(),
            None => Adapter::for_kind(self.catalog.get(&task.software_id)?.installer).source_label(),
        };
        Some(HistoryRecord {
            software_id: task.software_id.clone(),
            action: task.action,
            version: version.clone(),
            source: source.to_string(),
            timestamp: task.finished_at?,
        })
    }
}

/// Reject a cyclic gating relation before anything runs.
fn check_acyclic(ids: &[&SoftwareId], gates: &[Vec<usize>]) -> Result<(), ResolutionError> {
    let mut waiting: Vec<usize> = gates.iter().map(Vec::len).collect();
    let mut released = vec![Vec::new(); gates.len()];
    for (i, waits_on) in gates.iter().enumerate() {
        for &g in waits_on {
            if let Some(list) = released.get_mut(g) {
                list.push(i);
            }
        }
    }
    let mut ready: Vec<usize> = (0..gates.len()).filter(|&i| waiting.get(i) == Some(&0)).collect();
    let mut seen = 0;
    while let Some(i) = ready.pop() {
        seen += 1;
        for &next in released.get(i).into_iter().flatten() {
            if let Some(n) = waiting.get_mut(next) {
                *n -= 1;
                if *n == 0 {
                    ready.push(next);
                }
            }
        }
    }
    if seen == gates.len() {
        return Ok(());
    }
    let members = waiting
        .iter()
        .enumerate()
        .filter(|(_, n)| **n > 0)
        .filter_map(|(i, _)| ids.get(i).map(|id| (*id).clone()))
        .collect();
    Err(ResolutionError::DependencyCycle(members))
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
    use crate::catalog::test_helpers::catalog;
    use crate::config::manifest::LatestVersions;
    use crate::exec::Executor;
    use crate::history::MockHistorySink;
    use crate::resolver;
    use crate::status::StatusDetector;
    use crate::test_helpers::{MockExecutor, ScriptedRun};

    fn ids(list: &[&str]) -> Vec<SoftwareId> {
        list.iter().map(|s| SoftwareId::from(*s)).collect()
    }

    fn orchestrator(cat: Catalog, exec: &Arc<MockExecutor>) -> Orchestrator {
        let executor: Arc<dyn Executor> = Arc::clone(exec) as Arc<dyn Executor>;
        let detector = StatusDetector::new(Arc::clone(&executor), Arc::new(LatestVersions::default()))
            .with_app_dirs(Vec::new());
        Orchestrator::new(Arc::new(cat), ExecutionEngine::new(executor, detector))
    }

    fn run(orch: &Orchestrator, order: &[SoftwareId], action: Action, config: &RunConfig) -> RunReport {
        orch.run(order, action, config, &CancelToken::new(), &EventBus::new())
            .unwrap()
    }

    fn state_of(report: &RunReport, id: &str) -> TaskState {
        report.task(&SoftwareId::from(id)).unwrap().state
    }

    // ---- gating and cascades ----

    #[test]
    fn failure_skips_dependents_and_spares_siblings() {
        let cat = catalog(&[("x", ""), ("y", "x"), ("z", "x"), ("w", "")]);
        let exec = Arc::new(MockExecutor::new().script("install-x", ScriptedRun::exit(1)));
        let orch = orchestrator(cat, &exec);
        let order = resolver::resolve(orch.catalog(), &ids(&["y", "z", "w"])).unwrap();
        let report = run(&orch, &order, Action::Install, &RunConfig::default());

        assert_eq!(state_of(&report, "x"), TaskState::Failed);
        assert_eq!(state_of(&report, "y"), TaskState::Skipped);
        assert_eq!(state_of(&report, "z"), TaskState::Skipped);
        assert_eq!(state_of(&report, "w"), TaskState::Succeeded);
        assert_eq!(
            report.task(&SoftwareId::from("y")).unwrap().outcome,
            Some(TaskOutcome::Skipped(SkipReason::DependencyFailed(SoftwareId::from("x"))))
        );
        assert!(!report.is_success());
        let streamed: Vec<String> = exec.streamed().iter().map(|c| c.args[1].clone()).collect();
        assert!(!streamed.iter().any(|s| s.contains("install-y") || s.contains("install-z")));
    }

    #[test]
    fn cascade_is_transitive() {
        let cat = catalog(&[("a", ""), ("b", "a"), ("c", "b")]);
        let exec = Arc::new(MockExecutor::new().script("install-a", ScriptedRun::exit(2)));
        let orch = orchestrator(cat, &exec);
        let report = run(&orch, &ids(&["a", "b", "c"]), Action::Install, &RunConfig::default());
        assert_eq!(state_of(&report, "c"), TaskState::Skipped);
        assert_eq!(exec.streamed().len(), 1);
    }

    #[test]
    fn uninstall_waits_for_dependents() {
        let cat = catalog(&[("rustup", ""), ("just", "rustup")]);
        let exec = Arc::new(
            MockExecutor::new()
                .with_program("rustup")
                .with_program("just")
                .respond("rustup --version", true, "rustup 1.27.1")
                .respond("just --version", true, "just 1.25.2")
                .script("uninstall-just", ScriptedRun::exit(1)),
        );
        let orch = orchestrator(cat, &exec);
        let order = resolver::resolve_removal(orch.catalog(), &ids(&["rustup", "just"])).unwrap();
        let report = run(&orch, &order, Action::Uninstall, &RunConfig::default());
        assert_eq!(state_of(&report, "just"), TaskState::Failed);
        assert_eq!(state_of(&report, "rustup"), TaskState::Skipped);
    }

    #[test]
    fn status_checks_ignore_dependencies() {
        let cat = catalog(&[("a", ""), ("b", "a")]);
        let exec = Arc::new(MockExecutor::new());
        let orch = orchestrator(cat, &exec);
        let report = run(&orch, &ids(&["b"]), Action::StatusCheck, &RunConfig::default());
        assert_eq!(report.tasks.len(), 1);
        assert!(report.is_success());
        assert_eq!(report.statuses().count(), 1);
    }

    // ---- concurrency ----

    #[test]
    fn global_cap_serializes_independent_tasks() {
        let cat = catalog(&[("a", ""), ("b", "")]);
        let slow = ScriptedRun::ok().with_delay(Duration::from_millis(100));
        let exec = Arc::new(
            MockExecutor::new()
                .script("install-a", slow.clone())
                .script("install-b", slow),
        );
        let orch = orchestrator(cat, &exec);
        let config = RunConfig {
            limits: ConcurrencyLimits::default().with_global(1),
            ..RunConfig::default()
        };
        let report = run(&orch, &ids(&["a", "b"]), Action::Install, &config);
        assert!(report.is_success());
        let a = report.task(&SoftwareId::from("a")).unwrap();
        let b = report.task(&SoftwareId::from("b")).unwrap();
        assert!(b.started_at >= a.finished_at);
    }

    #[test]
    fn independent_tasks_overlap_under_a_wider_cap() {
        let cat = catalog(&[("a", ""), ("b", "")]);
        let slow = ScriptedRun::ok().with_delay(Duration::from_millis(300));
        let exec = Arc::new(
            MockExecutor::new()
                .script("install-a", slow.clone())
                .script("install-b", slow),
        );
        let orch = orchestrator(cat, &exec);
        let report = run(&orch, &ids(&["a", "b"]), Action::Install, &RunConfig::default());
        let a = report.task(&SoftwareId::from("a")).unwrap();
        let b = report.task(&SoftwareId::from("b")).unwrap();
        assert!(b.started_at < a.finished_at);
    }

    // ---- dry run ----

    #[test]
    fn dry_run_walks_the_whole_graph() {
        let cat = catalog(&[("a", ""), ("b", "a")]);
        let exec = Arc::new(MockExecutor::new());
        let orch = orchestrator(cat, &exec);
        let config = RunConfig {
            dry_run: true,
            ..RunConfig::default()
        };
        let report = run(&orch, &ids(&["a", "b"]), Action::Install, &config);
        assert!(
            report
                .tasks
                .iter()
                .all(|t| t.outcome == Some(TaskOutcome::Skipped(SkipReason::DryRun)))
        );
        assert!(report.is_success());
        assert!(exec.streamed().is_empty());
        assert!(exec.calls().is_empty());
    }

    // ---- history ----

    #[test]
    fn history_written_once_per_successful_mutation() {
        let cat = catalog(&[("a", ""), ("b", "")]);
        let exec = Arc::new(MockExecutor::new().script("install-b", ScriptedRun::exit(1)));
        let mut sink = MockHistorySink::new();
        sink.expect_append()
            .withf(|r| r.software_id.as_str() == "a" && r.source == "shell")
            .times(1)
            .returning(|_| Ok(()));
        let orch = orchestrator(cat, &exec).with_history(Arc::new(sink));
        let report = run(&orch, &ids(&["a", "b"]), Action::Install, &RunConfig::default());
        assert_eq!(state_of(&report, "a"), TaskState::Succeeded);
    }

    #[test]
    fn history_failure_does_not_fail_the_task() {
        let cat = catalog(&[("a", "")]);
        let exec = Arc::new(MockExecutor::new());
        let mut sink = MockHistorySink::new();
        sink.expect_append()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("disk full")));
        let orch = orchestrator(cat, &exec).with_history(Arc::new(sink));
        let report = run(&orch, &ids(&["a"]), Action::Install, &RunConfig::default());
        assert!(report.is_success());
    }

    #[test]
    fn no_history_for_dry_runs_or_status_checks() {
        let cat = catalog(&[("a", "")]);
        let exec = Arc::new(MockExecutor::new());
        let mut sink = MockHistorySink::new();
        sink.expect_append().never();
        let orch = orchestrator(cat, &exec).with_history(Arc::new(sink));
        let dry = RunConfig {
            dry_run: true,
            ..RunConfig::default()
        };
        run(&orch, &ids(&["a"]), Action::Install, &dry);
        run(&orch, &ids(&["a"]), Action::StatusCheck, &RunConfig::default());
    }

    // ---- events ----

    #[test]
    fn events_follow_the_state_machine() {
        let cat = catalog(&[("a", "")]);
        let exec = Arc::new(
            MockExecutor::new().script("install-a", ScriptedRun::ok().with_lines(&["one", "two"])),
        );
        let orch = orchestrator(cat, &exec);
        let bus = EventBus::new();
        let rx = bus.subscribe();
        orch.run(&ids(&["a"]), Action::Install, &RunConfig::default(), &CancelToken::new(), &bus)
            .unwrap();
        drop(bus);
        let events: Vec<TaskEvent> = rx.iter().collect();
        let states: Vec<TaskState> = events.iter().map(|e| e.state).collect();
        assert_eq!(
            states,
            [TaskState::Running, TaskState::Running, TaskState::Running, TaskState::Succeeded]
        );
        let lines: Vec<&str> = events.iter().filter_map(|e| e.output_line.as_deref()).collect();
        assert_eq!(lines, ["one", "two"]);
        assert!(events.last().unwrap().outcome.is_some());
    }

    // ---- cancellation ----

    #[test]
    fn cancellation_stops_dispatch() {
        let cat = catalog(&[("a", ""), ("b", "a")]);
        let exec = Arc::new(
            MockExecutor::new().script("install-a", ScriptedRun::ok().with_delay(Duration::from_secs(5))),
        );
        let orch = orchestrator(cat, &exec);
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            trigger.cancel();
        });
        let report = orch
            .run(&ids(&["a", "b"]), Action::Install, &RunConfig::default(), &cancel, &EventBus::new())
            .unwrap();
        handle.join().unwrap();
        assert_eq!(state_of(&report, "a"), TaskState::Cancelled);
        assert_eq!(state_of(&report, "b"), TaskState::Cancelled);
        assert!(!report.is_success());
    }

    // ---- validation ----

    #[test]
    fn unknown_id_is_rejected_before_running() {
        let cat = catalog(&[("a", "")]);
        let exec = Arc::new(MockExecutor::new());
        let orch = orchestrator(cat, &exec);
        let err = orch
            .run(&ids(&["ghost"]), Action::Install, &RunConfig::default(), &CancelToken::new(), &EventBus::new())
            .unwrap_err();
        assert_eq!(err, ResolutionError::unknown(SoftwareId::from("ghost")));
        assert!(exec.streamed().is_empty());
    }

    #[test]
    fn cyclic_order_is_rejected_before_running() {
        let cat = catalog(&[("a", "b"), ("b", "a")]);
        let exec = Arc::new(MockExecutor::new());
        let orch = orchestrator(cat, &exec);
        let err = orch
            .run(&ids(&["a", "b"]), Action::Install, &RunConfig::default(), &CancelToken::new(), &EventBus::new())
            .unwrap_err();
        assert!(matches!(err, ResolutionError::DependencyCycle(_)));
        assert!(exec.streamed().is_empty());
    }

    #[test]
    fn out_of_order_input_still_respects_dependencies() {
        let cat = catalog(&[("a", ""), ("b", "a")]);
        let exec = Arc::new(MockExecutor::new());
        let orch = orchestrator(cat, &exec);
        let report = run(&orch, &ids(&["b", "a"]), Action::Install, &RunConfig::default());
        assert!(report.is_success());
        let b = report.task(&SoftwareId::from("b")).unwrap();
        let a = report.task(&SoftwareId::from("a")).unwrap();
        assert!(b.started_at >= a.finished_at);
    }
}
