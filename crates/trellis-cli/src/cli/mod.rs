//! CLI argument definitions using the clap derive API.
//!
//! This module is the *only* place that knows about argument names, aliases,
//! help text, and value enums.  No business logic lives here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use trellis_core::domain::{ConflictMode, DatabaseEngine, Environment};

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

// ── Top-level CLI ─────────────────────────────────────────────────────────────

/// Main CLI entry-point.
#[derive(Debug, Parser)]
#[command(
    name    = "trellis",
    bin_name = "trellis",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "Idempotent Django project scaffolding",
    long_about = "Trellis builds a ready-to-run Django project: a virtual environment, \
                  split settings, per-environment requirements and a restricted .env. \
                  Rerunning it on an existing project only fills in what is missing.",
    after_help = "EXAMPLES:\n\
        \x20 trellis new shop --yes\n\
        \x20 trellis new blog --db-engine postgresql --skip-migrate\n\
        \x20 trellis plan shop\n\
        \x20 trellis render settings-production --name shop\n\
        \x20 trellis completions bash > /usr/share/bash-completion/completions/trellis",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    /// Flags available on every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// All available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create (or complete) a Django project.
    #[command(
        visible_alias = "n",
        about = "Create a new Django project",
        after_help = "EXAMPLES:\n\
            \x20 trellis new shop\n\
            \x20 trellis new shop --root ~/code/shop --yes\n\
            \x20 trellis new shop --dry-run\n\
            \x20 trellis new shop --on-conflict skip --skip-install --skip-migrate"
    )]
    New(NewArgs),

    /// Print the files and directories a project would get.
    #[command(
        about = "Show the planned file set",
        after_help = "EXAMPLES:\n\
            \x20 trellis plan shop\n\
            \x20 trellis --output-format json plan shop"
    )]
    Plan(PlanArgs),

    /// Render one template to stdout.
    #[command(
        about = "Render a single template",
        after_help = "EXAMPLES:\n\
            \x20 trellis render env --name shop\n\
            \x20 trellis render settings-production --name shop\n\
            \x20 trellis render requirements-local\n\
            \x20 trellis render --list"
    )]
    Render(RenderArgs),

    /// Check that a supported Python interpreter is available.
    #[command(
        about = "Check prerequisites",
        after_help = "EXAMPLES:\n\
            \x20 trellis check\n\
            \x20 trellis check --python /usr/bin/python3.13"
    )]
    Check(CheckArgs),

    /// Initialise a Trellis configuration file.
    #[command(
        about = "Initialise configuration",
        after_help = "EXAMPLES:\n\
            \x20 trellis init           # platform config location\n\
            \x20 trellis init --local   # trellis.toml in CWD"
    )]
    Init(InitArgs),

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 trellis completions bash > ~/.local/share/bash-completion/completions/trellis\n\
            \x20 trellis completions zsh  > ~/.zfunc/_trellis\n\
            \x20 trellis completions fish > ~/.config/fish/completions/trellis.fish"
    )]
    Completions(CompletionsArgs),

    /// Inspect the Trellis configuration.
    #[command(
        about = "Configuration management",
        subcommand,
        after_help = "EXAMPLES:\n\
            \x20 trellis config get project.python\n\
            \x20 trellis config list\n\
            \x20 trellis config path"
    )]
    Config(ConfigCommands),
}

// ── new ───────────────────────────────────────────────────────────────────────

/// Arguments for `trellis new`.
#[derive(Debug, Args)]
pub struct NewArgs {
    /// Project name; also the Python package name.
    #[arg(value_name = "NAME", help = "Project (package) name")]
    pub name: String,

    /// Project root. Defaults to `./NAME`.
    #[arg(long = "root", value_name = "PATH", help = "Project root directory")]
    pub root: Option<PathBuf>,

    /// Never prompt; every question takes its default answer.
    #[arg(short = 'y', long = "yes", help = "Answer every prompt with its default")]
    pub yes: bool,

    /// Preview what would be created without writing any files.
    #[arg(long = "dry-run", help = "Show what would be done without doing it")]
    pub dry_run: bool,

    /// What to do with files that exist with different content.
    #[arg(
        long = "on-conflict",
        value_name = "MODE",
        value_enum,
        help = "Conflict policy for existing files"
    )]
    pub on_conflict: Option<ConflictArg>,

    #[arg(long = "skip-install", help = "Do not install the requirements manifest")]
    pub skip_install: bool,

    #[arg(long = "skip-migrate", help = "Do not run the initial migrations")]
    pub skip_migrate: bool,

    /// Interpreter used to create the virtual environment.
    #[arg(long = "python", value_name = "PATH", help = "Python interpreter to use")]
    pub python: Option<String>,

    #[arg(long = "debug", overrides_with = "no_debug", help = "Write DEBUG=True")]
    pub debug: bool,

    #[arg(long = "no-debug", overrides_with = "debug", help = "Write DEBUG=False")]
    pub no_debug: bool,

    #[arg(
        long = "db-engine",
        value_name = "ENGINE",
        value_enum,
        help = "Database engine"
    )]
    pub db_engine: Option<DbEngineArg>,

    /// Settings variant used for migrations and the installed manifest.
    #[arg(
        long = "settings",
        value_name = "ENV",
        value_enum,
        help = "Settings variant for migrations"
    )]
    pub settings: Option<EnvironmentArg>,
}

impl NewArgs {
    /// `Some` when the user picked a side with `--debug` / `--no-debug`.
    pub fn debug_override(&self) -> Option<bool> {
        match (self.debug, self.no_debug) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

// ── plan / render / check ─────────────────────────────────────────────────────

/// Arguments for `trellis plan`.
#[derive(Debug, Args)]
pub struct PlanArgs {
    #[arg(value_name = "NAME", help = "Project (package) name")]
    pub name: String,
}

/// Arguments for `trellis render`.
#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Template name, e.g. `env`, `settings-base`, `requirements-local`.
    #[arg(
        value_name = "TEMPLATE",
        required_unless_present = "list",
        help = "Template to render"
    )]
    pub template: Option<String>,

    #[arg(long = "list", conflicts_with = "template", help = "List template names")]
    pub list: bool,

    #[arg(
        long = "name",
        value_name = "NAME",
        default_value = "mysite",
        help = "Project name to render with"
    )]
    pub name: String,
}

/// Arguments for `trellis check`.
#[derive(Debug, Args)]
pub struct CheckArgs {
    #[arg(long = "python", value_name = "PATH", help = "Python interpreter to check")]
    pub python: Option<String>,
}

// ── init ──────────────────────────────────────────────────────────────────────

/// Arguments for `trellis init`.
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Write to `trellis.toml` in the current directory.
    #[arg(
        long = "local",
        help = "Create local configuration in current directory"
    )]
    pub local: bool,

    /// Overwrite an existing config file.
    #[arg(short = 'f', long = "force", help = "Overwrite existing configuration")]
    pub force: bool,
}

// ── completions ───────────────────────────────────────────────────────────────

/// Arguments for `trellis completions`.
#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: Shell,
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ── config subcommands ────────────────────────────────────────────────────────

/// Subcommands for `trellis config`.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the value of a configuration key.
    Get {
        /// Dotted key path, e.g. `project.python`.
        key: String,
    },
    /// Print all configuration values.
    List,
    /// Print the path to the configuration file.
    Path,
}

// ── value enums ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum ConflictArg {
    /// Ask for top-level files, keep everything deeper.
    Auto,
    /// Never overwrite.
    Skip,
    /// Ask for every differing file.
    Prompt,
}

impl From<ConflictArg> for ConflictMode {
    fn from(arg: ConflictArg) -> Self {
        match arg {
            ConflictArg::Auto => Self::Auto,
            ConflictArg::Skip => Self::Skip,
            ConflictArg::Prompt => Self::Prompt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum DbEngineArg {
    #[value(alias = "postgres")]
    Postgresql,
    #[value(alias = "sqlite")]
    Sqlite3,
}

impl From<DbEngineArg> for DatabaseEngine {
    fn from(arg: DbEngineArg) -> Self {
        match arg {
            DbEngineArg::Postgresql => Self::Postgresql,
            DbEngineArg::Sqlite3 => Self::Sqlite3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum EnvironmentArg {
    Local,
    Staging,
    Production,
    Testing,
}

impl From<EnvironmentArg> for Environment {
    fn from(arg: EnvironmentArg) -> Self {
        match arg {
            EnvironmentArg::Local => Self::Local,
            EnvironmentArg::Staging => Self::Staging,
            EnvironmentArg::Production => Self::Production,
            EnvironmentArg::Testing => Self::Testing,
        }
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_new_command() {
        let cli = Cli::parse_from(["trellis", "new", "shop", "--yes", "--skip-migrate"]);
        let Commands::New(args) = cli.command else {
            panic!("expected New command");
        };
        assert_eq!(args.name, "shop");
        assert!(args.yes);
        assert!(args.skip_migrate);
        assert!(!args.skip_install);
        assert_eq!(args.debug_override(), None);
    }

    #[test]
    fn last_debug_flag_wins() {
        let cli = Cli::parse_from(["trellis", "new", "shop", "--debug", "--no-debug"]);
        let Commands::New(args) = cli.command else {
            panic!("expected New command");
        };
        assert_eq!(args.debug_override(), Some(false));

        let cli = Cli::parse_from(["trellis", "new", "shop", "--no-debug", "--debug"]);
        let Commands::New(args) = cli.command else {
            panic!("expected New command");
        };
        assert_eq!(args.debug_override(), Some(true));
    }

    #[test]
    fn engine_aliases() {
        let cli = Cli::parse_from(["trellis", "new", "shop", "--db-engine", "postgres"]);
        let Commands::New(args) = cli.command else {
            panic!("expected New command");
        };
        assert_eq!(
            args.db_engine.map(DatabaseEngine::from),
            Some(DatabaseEngine::Postgresql)
        );
    }

    #[test]
    fn conflict_modes_map_onto_core() {
        assert_eq!(ConflictMode::from(ConflictArg::Skip), ConflictMode::Skip);
        assert_eq!(ConflictMode::from(ConflictArg::Prompt), ConflictMode::Prompt);
        assert_eq!(ConflictMode::from(ConflictArg::Auto), ConflictMode::Auto);
    }

    #[test]
    fn unknown_conflict_mode_is_rejected() {
        let result = Cli::try_parse_from(["trellis", "new", "shop", "--on-conflict", "always"]);
        assert!(result.is_err());
    }

    #[test]
    fn render_defaults_the_project_name() {
        let cli = Cli::parse_from(["trellis", "render", "env"]);
        let Commands::Render(args) = cli.command else {
            panic!("expected Render command");
        };
        assert_eq!(args.name, "mysite");
        assert_eq!(args.template.as_deref(), Some("env"));
    }

    #[test]
    fn render_needs_a_template_or_list() {
        assert!(Cli::try_parse_from(["trellis", "render"]).is_err());
        assert!(Cli::try_parse_from(["trellis", "render", "--list"]).is_ok());
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        let result = Cli::try_parse_from(["trellis", "--quiet", "--verbose", "plan", "shop"]);
        assert!(result.is_err());
    }
}
