//! Command: detect the installed state of catalog entries.
use anyhow::Result;

use crate::catalog::{Action, Catalog, SoftwareId};
use crate::cli::{GlobalOpts, TargetOpts};
use crate::logging::Logger;
use crate::orchestrator::RunReport;
use crate::status::{Status, StatusState};

use super::{CommandSetup, execute, parse_ids, system_executor};

/// Run the status command. No ids means the whole catalog.
///
/// Checks run as status-check tasks, so they share the concurrency caps
/// but ignore dependencies.
///
/// # Errors
///
/// Returns an error if configuration loading fails or an id is unknown.
pub fn run(global: &GlobalOpts, opts: &TargetOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let ids: Vec<SoftwareId> = if opts.ids.is_empty() {
        setup.catalog.ids()
    } else {
        parse_ids(&opts.ids)
    };

    log.stage("Detecting installed software");
    let orchestrator = setup.orchestrator(system_executor());
    let mut run_config = setup.run_config.clone();
    run_config.dry_run = false;
    let report = execute(&orchestrator, &ids, Action::StatusCheck, &run_config, log)?;

    print_table(&setup.catalog, &report, log);
    Ok(())
}

fn print_table(catalog: &Catalog, report: &RunReport, log: &Logger) {
    let width = report
        .statuses()
        .map(|(id, _)| id.as_str().len())
        .max()
        .unwrap_or(0);
    for (id, status) in report.statuses() {
        let name = catalog.get(id).map_or("", |s| s.name.as_str());
        log.info(&format_row(id, name, status, width));
    }
    let installed = report.statuses().filter(|(_, s)| s.installed).count();
    let outdated = report
        .statuses()
        .filter(|(_, s)| s.state == StatusState::Outdated)
        .count();
    log.info(&format!(
        "{installed} of {} installed, {outdated} outdated",
        report.statuses().count()
    ));
}

fn format_row(id: &SoftwareId, name: &str, status: &Status, width: usize) -> String {
    let color = match status.state {
        StatusState::UpToDate => "\x1b[32m",
        StatusState::Outdated => "\x1b[33m",
        StatusState::NotInstalled => "\x1b[2m",
        StatusState::Unknown => "\x1b[35m",
    };
    format!("{color}{:<width$}\x1b[0m  {status}  \x1b[2m{name}\x1b[0m", id.as_str())
}
