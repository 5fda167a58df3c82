//! `maziq` command-line entry point.
use anyhow::Result;
use clap::Parser;

use maziq::catalog::Action;
use maziq::cli::{self, Command};
use maziq::commands;
use maziq::logging::{self, Logger};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();

    match &args.command {
        Command::Version => return Ok(commands::version::run(&mut std::io::stdout().lock())?),
        Command::Completions(opts) => {
            commands::completions::run(opts.shell, &mut std::io::stdout().lock());
            return Ok(());
        }
        _ => {}
    }

    let name = args.command.log_name();
    logging::init_subscriber(args.verbose, name);
    let log = Logger::new(name);
    let global = &args.global;

    match &args.command {
        Command::List(opts) => commands::list::run(global, opts, &log),
        Command::Show(opts) => commands::list::show(global, opts, &log),
        Command::Status(opts) => commands::status::run(global, opts, &log),
        Command::Install(opts) => commands::provision::run(global, opts, Action::Install, &log),
        Command::Update(opts) => commands::provision::run(global, opts, Action::Update, &log),
        Command::Uninstall(opts) => commands::provision::run(global, opts, Action::Uninstall, &log),
        Command::Plan(opts) => commands::plan::run(global, opts, &log),
        Command::Template(sub) => commands::template::run(global, sub, &log),
        Command::Version | Command::Completions(_) => Ok(()),
    }
}
