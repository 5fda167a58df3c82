//! Commands: list templates and run them.
use anyhow::Result;

use crate::catalog::Action;
use crate::cli::{GlobalOpts, TemplateCommand};
use crate::config::templates::{self, Template};
use crate::logging::Logger;

use super::{CommandSetup, plan, provision};

/// Run a template subcommand.
///
/// # Errors
///
/// Returns an error if the template cannot be found or names software the
/// catalog does not know, or if the run fails.
pub fn run(global: &GlobalOpts, command: &TemplateCommand, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let dir = setup.config.templates_dir();

    let (name, action, dry) = match command {
        TemplateCommand::List => {
            for template in templates::load_all(&dir)? {
                log.info(&list_line(&template));
            }
            return Ok(());
        }
        TemplateCommand::Install(t) => (&t.name, Action::Install, false),
        TemplateCommand::Update(t) => (&t.name, Action::Update, false),
        TemplateCommand::Uninstall(t) => (&t.name, Action::Uninstall, false),
        TemplateCommand::Plan(t) => (&t.name, t.action.into(), true),
    };

    let template = templates::load_named(&dir, name)?;
    template.validate(&setup.catalog)?;
    log.stage(&format!("Template {}", template.name));
    if let Some(description) = &template.description {
        log.info(description);
    }

    if dry {
        return plan::print_plan(&setup.catalog, &template.software, action, log);
    }
    provision::run_ids(&setup, &template.software, action, log)
}

fn list_line(template: &Template) -> String {
    let description = template.description.as_deref().unwrap_or("");
    format!(
        "{:<16} {} entries  \x1b[2m{description}\x1b[0m",
        template.slug(),
        template.software.len()
    )
}
