//! Commands: install, update and uninstall catalog entries.
use anyhow::Result;

use crate::catalog::{Action, SoftwareId};
use crate::cli::{GlobalOpts, TargetOpts};
use crate::logging::Logger;
use crate::resolver;

use super::{CommandSetup, execute, finish, parse_ids, system_executor};

/// Run a mutating command over the ids on the command line.
///
/// # Errors
///
/// Returns an error if no ids were given, configuration or resolution
/// fails, or any task did not succeed.
pub fn run(global: &GlobalOpts, opts: &TargetOpts, action: Action, log: &Logger) -> Result<()> {
    if opts.ids.is_empty() {
        anyhow::bail!("no software ids given");
    }
    let setup = CommandSetup::init(global, log)?;
    run_ids(&setup, &parse_ids(&opts.ids), action, log)
}

/// Resolve `ids` for `action` and run them.
///
/// Install and update pull in missing dependencies; uninstall touches only
/// the named entries, dependents first.
///
/// # Errors
///
/// Returns an error if resolution fails or any task did not succeed.
pub fn run_ids(setup: &CommandSetup, ids: &[SoftwareId], action: Action, log: &Logger) -> Result<()> {
    log.stage("Resolving dependencies");
    let order = match action {
        Action::Uninstall => resolver::resolve_removal(&setup.catalog, ids)?,
        Action::Install | Action::Update | Action::StatusCheck => resolver::resolve(&setup.catalog, ids)?,
    };
    log.info(&format!("order: {}", render_order(&order)));

    let stage = if setup.run_config.dry_run {
        format!("Planning {action} (dry run)")
    } else {
        format!("Running {action}")
    };
    log.stage(&stage);
    let orchestrator = setup.orchestrator(system_executor());
    let report = execute(&orchestrator, &order, action, &setup.run_config, log)?;
    finish(&report, log)
}

/// Ids joined with arrows.
pub(super) fn render_order(order: &[SoftwareId]) -> String {
    order
        .iter()
        .map(SoftwareId::as_str)
        .collect::<Vec<_>>()
        .join(" → ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_joined_with_arrows() {
        let order = [SoftwareId::from("rustup"), SoftwareId::from("just")];
        insta::assert_snapshot!(render_order(&order), @"rustup → just");
    }
}
