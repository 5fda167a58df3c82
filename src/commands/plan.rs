//! Command: print a resolved execution order without running anything.
use anyhow::Result;

use crate::catalog::{Action, Catalog, CommandRecipe, SoftwareId};
use crate::cli::{GlobalOpts, PlanOpts};
use crate::logging::Logger;
use crate::resolver;

use super::{CommandSetup, parse_ids};

/// Run the plan command.
///
/// # Errors
///
/// Returns an error if configuration loading or resolution fails.
pub fn run(global: &GlobalOpts, opts: &PlanOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    print_plan(&setup.catalog, &parse_ids(&opts.ids), opts.action.into(), log)
}

/// Resolve `ids` for `action` and log one numbered line per step.
///
/// # Errors
///
/// Returns the resolution error, if any.
pub fn print_plan(catalog: &Catalog, ids: &[SoftwareId], action: Action, log: &Logger) -> Result<()> {
    let order = match action {
        Action::Uninstall => resolver::resolve_removal(catalog, ids)?,
        Action::Install | Action::Update | Action::StatusCheck => resolver::resolve(catalog, ids)?,
    };
    log.stage(&format!("Plan: {action} ({} steps)", order.len()));
    for line in plan_lines(catalog, &order, action) {
        log.info(&line);
    }
    Ok(())
}

fn plan_lines(catalog: &Catalog, order: &[SoftwareId], action: Action) -> Vec<String> {
    order
        .iter()
        .enumerate()
        .filter_map(|(i, id)| {
            let software = catalog.get(id)?;
            let step = match software.recipe(action) {
                Some(CommandRecipe::Shell(script)) => script.lines().next().unwrap_or_default().to_string(),
                Some(CommandRecipe::Manual(note)) => format!("manual: {note}"),
                None => "detect".to_string(),
            };
            Some(format!("{:>2}. {:<18} [{}] {step}", i + 1, id.as_str(), software.installer))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::catalog::test_helpers::catalog;

    #[test]
    fn install_plan_puts_dependencies_first() {
        let cat = catalog(&[("rustup", ""), ("just", "rustup")]);
        let order = resolver::resolve(&cat, &[SoftwareId::from("just")]).unwrap();
        insta::assert_snapshot!(plan_lines(&cat, &order, Action::Install).join("\n"), @r"
         1. rustup             [script] install-rustup
         2. just               [script] install-just
        ");
    }

    #[test]
    fn uninstall_plan_is_reversed() {
        let cat = catalog(&[("rustup", ""), ("just", "rustup")]);
        let order =
            resolver::resolve_removal(&cat, &[SoftwareId::from("rustup"), SoftwareId::from("just")])
                .unwrap();
        let lines = plan_lines(&cat, &order, Action::Uninstall);
        assert!(lines[0].contains("uninstall-just"));
        assert!(lines[1].contains("uninstall-rustup"));
    }
}
