//! Subcommand handlers and the setup they share.
pub mod completions;
pub mod list;
pub mod plan;
pub mod provision;
pub mod render;
pub mod status;
pub mod template;
pub mod version;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::cancel::{self, CancelToken};
use crate::catalog::{Action, Catalog, SoftwareId};
use crate::cli::GlobalOpts;
use crate::config::{self, Config, RunConfig};
use crate::engine::ExecutionEngine;
use crate::exec::{Executor, SystemExecutor};
use crate::history::JsonlHistory;
use crate::logging::Logger;
use crate::orchestrator::{EventBus, Orchestrator, RunReport};
use crate::status::StatusDetector;

/// Shared state produced by the common command setup sequence.
///
/// Loads the conf directory once and applies the global flags on top of
/// `settings.toml`, so every command sees the same catalog and run options.
#[derive(Debug)]
pub struct CommandSetup {
    /// Loaded configuration.
    pub config: Config,
    /// The catalog, shared with the orchestrator.
    pub catalog: Arc<Catalog>,
    /// Settings with the global flags applied.
    pub run_config: RunConfig,
}

impl CommandSetup {
    /// Locate and load the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration file fails to read or parse.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        let conf_dir = config::resolve_conf_dir(global.conf_dir.as_deref());
        match &conf_dir {
            Some(dir) => log.debug(&format!("conf dir: {}", dir.display())),
            None => log.debug("no conf dir found, using the embedded catalog"),
        }
        let config = Config::load(conf_dir.as_deref())?;
        log.debug(&format!(
            "{} catalog entries, {} latest versions",
            config.catalog.len(),
            config.latest.len()
        ));

        let run_config = apply_flags(RunConfig::from_settings(&config.settings), global);
        Ok(Self {
            catalog: Arc::new(config.catalog.clone()),
            config,
            run_config,
        })
    }

    /// A detector backed by `executor` and the manifest's latest versions.
    #[must_use]
    pub fn detector(&self, executor: Arc<dyn Executor>) -> StatusDetector {
        StatusDetector::new(executor, Arc::new(self.config.latest.clone()))
    }

    /// An orchestrator running real commands and recording history.
    #[must_use]
    pub fn orchestrator(&self, executor: Arc<dyn Executor>) -> Orchestrator {
        let detector = self.detector(Arc::clone(&executor));
        let orchestrator =
            Orchestrator::new(Arc::clone(&self.catalog), ExecutionEngine::new(executor, detector));
        match JsonlHistory::default_path() {
            Some(path) => orchestrator.with_history(Arc::new(JsonlHistory::new(path))),
            None => orchestrator,
        }
    }
}

/// Overlay the command-line flags on settings-derived options.
fn apply_flags(mut run_config: RunConfig, global: &GlobalOpts) -> RunConfig {
    run_config.dry_run = global.dry_run;
    run_config.force = global.force;
    if let Some(n) = global.max_parallel {
        run_config.limits = run_config.limits.with_global(n);
    }
    if let Some(secs) = global.timeout {
        run_config.timeouts = run_config.timeouts.uniform(Duration::from_secs(secs));
    }
    run_config
}

/// Convert command-line ids into catalog ids.
#[must_use]
pub fn parse_ids(ids: &[String]) -> Vec<SoftwareId> {
    ids.iter().map(|s| SoftwareId::from(s.trim())).collect()
}

/// The system executor as a trait object.
#[must_use]
pub fn system_executor() -> Arc<dyn Executor> {
    Arc::new(SystemExecutor)
}

/// Run `order` on a fresh event bus, rendering events as they arrive.
///
/// Ctrl-C cancels the run. Returns the report once every task is terminal.
///
/// # Errors
///
/// Returns an error if the order is rejected before anything runs.
pub fn execute(
    orchestrator: &Orchestrator,
    order: &[SoftwareId],
    action: Action,
    run_config: &RunConfig,
    log: &Logger,
) -> Result<RunReport> {
    let cancel = CancelToken::new();
    if let Err(e) = cancel::install_ctrlc_handler(&cancel) {
        log.debug(&format!("Ctrl-C handler unavailable: {e}"));
    }

    std::thread::scope(|scope| {
        let bus = EventBus::new();
        let events = bus.subscribe();
        let dry_run = run_config.dry_run;
        let renderer = scope.spawn(move || render::events(&events, log, dry_run));
        let result = orchestrator.run(order, action, run_config, &cancel, &bus);
        drop(bus);
        if renderer.join().is_err() {
            log.warn("event renderer panicked");
        }
        result.map_err(Into::into)
    })
}

/// Print the summary and turn an unsuccessful run into an error.
///
/// # Errors
///
/// Returns an error naming the number of tasks that did not succeed.
pub fn finish(report: &RunReport, log: &Logger) -> Result<()> {
    log.print_summary(report);
    if report.is_success() {
        return Ok(());
    }
    let count = report.tasks.iter().filter(|t| !t.is_satisfied()).count();
    anyhow::bail!("{count} task(s) did not succeed");
}
