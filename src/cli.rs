//! Command-line definitions.
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::catalog::Action;

/// Top-level CLI entry point for the provisioning engine.
#[derive(Parser, Debug)]
#[command(
    name = "maziq",
    about = "Dependency-aware developer workstation provisioning",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output (shows installer output)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Preview commands without running them
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Maximum number of tasks running at once
    #[arg(short = 'j', long, global = true, value_name = "N")]
    pub max_parallel: Option<usize>,

    /// Run install/update even when already satisfied
    #[arg(long, global = true)]
    pub force: bool,

    /// Time limit in seconds for every command
    #[arg(long, global = true, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Directory with catalog.toml, templates/, manifest.toml and settings.toml
    #[arg(long, global = true, value_name = "DIR")]
    pub conf_dir: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List catalog entries
    List(ListOpts),
    /// Show one catalog entry
    Show(ShowOpts),
    /// Detect installed versions
    Status(TargetOpts),
    /// Install software and its dependencies
    Install(TargetOpts),
    /// Update software, installing missing dependencies first
    Update(TargetOpts),
    /// Uninstall software, dependents first
    Uninstall(TargetOpts),
    /// Print the resolved execution order without running anything
    Plan(PlanOpts),
    /// Work with templates
    #[command(subcommand)]
    Template(TemplateCommand),
    /// Generate shell completions
    Completions(CompletionsOpts),
    /// Print version information
    Version,
}

/// Template subcommands.
#[derive(Subcommand, Debug)]
pub enum TemplateCommand {
    /// List available templates
    List,
    /// Install everything a template names
    Install(TemplateOpts),
    /// Update everything a template names
    Update(TemplateOpts),
    /// Uninstall everything a template names
    Uninstall(TemplateOpts),
    /// Print a template's resolved order
    Plan(TemplatePlanOpts),
}

/// Catalog ids a command operates on.
#[derive(Args, Debug, Clone)]
pub struct TargetOpts {
    /// Catalog ids
    #[arg(value_name = "ID")]
    pub ids: Vec<String>,
}

/// Options for `list`.
#[derive(Args, Debug, Clone)]
pub struct ListOpts {
    /// Only entries in this category
    #[arg(long)]
    pub category: Option<String>,

    /// Detect and show the installed state of every entry
    #[arg(long)]
    pub status: bool,
}

/// Options for `show`.
#[derive(Args, Debug, Clone)]
pub struct ShowOpts {
    /// Catalog id
    pub id: String,
}

/// Options for `plan`.
#[derive(Args, Debug, Clone)]
pub struct PlanOpts {
    /// Action to plan for
    #[arg(long, value_enum, default_value_t = PlanAction::Install)]
    pub action: PlanAction,

    /// Catalog ids
    #[arg(value_name = "ID", required = true)]
    pub ids: Vec<String>,
}

/// Options naming one template.
#[derive(Args, Debug, Clone)]
pub struct TemplateOpts {
    /// Template file stem, name or slug
    pub name: String,
}

/// Options for `template plan`.
#[derive(Args, Debug, Clone)]
pub struct TemplatePlanOpts {
    /// Action to plan for
    #[arg(long, value_enum, default_value_t = PlanAction::Install)]
    pub action: PlanAction,

    /// Template file stem, name or slug
    pub name: String,
}

/// Options for `completions`.
#[derive(Args, Debug, Clone)]
pub struct CompletionsOpts {
    /// Target shell
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

/// Actions a plan can be computed for.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    /// Install the requested software and its dependencies.
    Install,
    /// Update the requested software and its dependencies.
    Update,
    /// Remove the requested software, dependents first.
    Uninstall,
}

impl From<PlanAction> for Action {
    fn from(action: PlanAction) -> Self {
        match action {
            PlanAction::Install => Self::Install,
            PlanAction::Update => Self::Update,
            PlanAction::Uninstall => Self::Uninstall,
        }
    }
}

impl Command {
    /// Name used for the log file.
    #[must_use]
    pub const fn log_name(&self) -> &'static str {
        match self {
            Self::List(_) => "list",
            Self::Show(_) => "show",
            Self::Status(_) => "status",
            Self::Install(_) => "install",
            Self::Update(_) => "update",
            Self::Uninstall(_) => "uninstall",
            Self::Plan(_) => "plan",
            Self::Template(_) => "template",
            Self::Completions(_) => "completions",
            Self::Version => "version",
        }
    }
}
