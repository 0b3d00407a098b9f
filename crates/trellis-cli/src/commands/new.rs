//! Implementation of the `trellis new` command.
//!
//! Responsibility: turn CLI arguments and config into a `ScaffoldConfig`,
//! wire the real adapters into the orchestrator, and display the summary.
//! No business logic lives here.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use trellis_adapters::{LocalFilesystem, ProcessRunner, SystemProbe};
use trellis_core::{
    application::{Orchestrator, ScaffoldConfig},
    domain::{generate_secret, validate_project_name},
    error::TrellisError,
};

use crate::{
    cli::NewArgs,
    config::AppConfig,
    error::{CliError, CliResult, IntoCli},
    output::OutputManager,
    progress::ProgressObserver,
    prompt::TerminalPrompter,
};

/// Execute the `trellis new` command.
///
/// 1. Validate the project name (it becomes a Python package)
/// 2. Resolve the run configuration from flags, config file and environment
/// 3. Run the orchestrator with the local filesystem and real processes
/// 4. Print the summary; a run that did not complete becomes an error
#[instrument(skip_all, fields(project = %args.name))]
pub fn execute(args: NewArgs, config: &AppConfig, output: &OutputManager) -> CliResult<()> {
    validate_project_name(&args.name).map_err(TrellisError::from)?;
    let scaffold = build_config(&args, config)?;

    debug!(
        root = %scaffold.root().display(),
        python = %scaffold.python,
        range = %scaffold.python_range,
        conflict = ?scaffold.conflict_mode,
        settings = %scaffold.settings_env,
        "Run configured"
    );

    let fs = LocalFilesystem::new();
    let runner = ProcessRunner::new();
    let probe = SystemProbe::new();
    let progress = ProgressObserver::new(output.shows_progress(), output.supports_color());
    let prompter = TerminalPrompter::new(args.yes).with_progress(progress.bar());

    let verb = if scaffold.dry_run { "Planning" } else { "Scaffolding" };
    output.header(&format!(
        "{verb} '{}' in {}",
        args.name,
        scaffold.root().display()
    ))?;

    let summary = Orchestrator::new(&fs, &runner, &probe, &prompter)
        .with_observer(&progress)
        .run(&scaffold);
    progress.finish();
    info!(state = %summary.state, "Run finished");

    output.summary(&summary)?;
    if summary.state.is_success() {
        Ok(())
    } else {
        Err(CliError::from_summary(&summary))
    }
}

/// Flags win over config; config wins over built-in defaults.
pub fn build_config(args: &NewArgs, config: &AppConfig) -> CliResult<ScaffoldConfig> {
    let root = project_root(&args.name, args.root.as_deref())?;
    let secret = generate_secret(config.project.secret_length).map_err(TrellisError::from)?;

    let mut params = config.project_parameters(&args.name, secret);
    if let Some(debug) = args.debug_override() {
        params.debug = debug;
    }
    if let Some(engine) = args.db_engine {
        params.db_engine = engine.into();
    }

    let settings_env = match args.settings {
        Some(env) => env.into(),
        None => config.settings_env()?,
    };
    let python = args
        .python
        .clone()
        .unwrap_or_else(|| config.project.python.clone());
    let (default_timeout, install_timeout) = config.timeouts();

    Ok(ScaffoldConfig::new(root, params.into_parameters())
        .with_python(python, config.python_range()?)
        .with_settings_env(settings_env)
        .with_conflict_mode(
            args.on_conflict
                .map_or(config.materialize.on_conflict, Into::into),
        )
        .with_timeouts(default_timeout, install_timeout)
        .skip_install(args.skip_install)
        .skip_migrate(args.skip_migrate)
        .dry_run(args.dry_run)
        .with_path_env(std::env::var("PATH").ok())
        .with_passthrough_env(config.passthrough_env()))
}

/// `--root`, or `./NAME`, made absolute without touching the filesystem.
fn project_root(name: &str, root: Option<&Path>) -> CliResult<PathBuf> {
    let root = root.map_or_else(|| PathBuf::from(name), Path::to_path_buf);
    std::path::absolute(&root)
        .with_cli_context(|| format!("Cannot resolve project root '{}'", root.display()))
}
