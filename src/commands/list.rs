//! Commands: list the catalog and show one entry.
use anyhow::Result;

use crate::catalog::{Action, CommandRecipe, Software, SoftwareId};
use crate::cli::{GlobalOpts, ListOpts, ShowOpts};
use crate::error::ResolutionError;
use crate::logging::Logger;

use super::{CommandSetup, system_executor};

/// Run the list command, grouped by category.
///
/// With `--status` every entry is probed in parallel first.
///
/// # Errors
///
/// Returns an error if configuration loading fails.
pub fn run(global: &GlobalOpts, opts: &ListOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let entries: Vec<&Software> = setup
        .catalog
        .iter()
        .filter(|s| {
            opts.category
                .as_ref()
                .is_none_or(|c| s.category.eq_ignore_ascii_case(c))
        })
        .collect();

    let statuses = if opts.status {
        setup.detector(system_executor()).detect_all(&entries)
    } else {
        Vec::new()
    };

    let mut category = None;
    for (i, software) in entries.iter().enumerate() {
        if category != Some(software.category.as_str()) {
            category = Some(software.category.as_str());
            log.stage(&software.category);
        }
        let state = statuses
            .get(i)
            .map_or_else(String::new, |s| format!("  [{s}]"));
        log.info(&format!(
            "{:<20} {} ({}){state}",
            software.id.as_str(),
            software.name,
            software.installer
        ));
    }
    log.info(&format!("{} entries", entries.len()));
    Ok(())
}

/// Run the show command.
///
/// # Errors
///
/// Returns an error if configuration loading fails or the id is unknown.
pub fn show(global: &GlobalOpts, opts: &ShowOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let id = SoftwareId::from(opts.id.trim());
    let software = setup
        .catalog
        .get(&id)
        .ok_or_else(|| ResolutionError::unknown(id.clone()))?;

    for line in describe(software) {
        log.info(&line);
    }
    let status = setup.detector(system_executor()).detect(software);
    log.info(&format!("status:       {status}"));
    if let Some(latest) = setup.config.latest.get(&id) {
        log.info(&format!("latest:       {latest}"));
    }
    Ok(())
}

/// Static description lines of one entry.
fn describe(software: &Software) -> Vec<String> {
    let deps = if software.dependencies.is_empty() {
        "-".to_string()
    } else {
        software
            .dependencies
            .iter()
            .map(SoftwareId::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };
    let mut lines = vec![
        format!("{} ({})", software.name, software.id),
        format!("category:     {}", software.category),
        format!("installer:    {}", software.installer),
        format!("dependencies: {deps}"),
        format!("probe:        {}", software.probe.describe()),
    ];
    if !software.summary.is_empty() {
        lines.insert(1, software.summary.clone());
    }
    for action in [Action::Install, Action::Update, Action::Uninstall] {
        let recipe = match software.recipe(action) {
            Some(CommandRecipe::Shell(script)) => script.clone(),
            Some(CommandRecipe::Manual(note)) => format!("manual: {note}"),
            None => continue,
        };
        let label = format!("{action}:");
        lines.push(format!("{label:<13} {recipe}"));
    }
    lines
}
