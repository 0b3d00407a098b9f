//! `trellis`: scaffold a Django project in ordered, rerunnable steps.
//!
//! Exit codes: 0 success, 1 internal error, 2 bad input or a declined
//! prompt, 3 unknown template or missing tool, 4 configuration, 5 a
//! scaffolding run that ended `Aborted` or `Failed`.

use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info, instrument};

use crate::{
    cli::{Cli, Commands},
    config::AppConfig,
    error::{CliError, CliResult},
    logging::init_logging,
    output::OutputManager,
};

mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod output;
mod progress;
mod prompt;

fn main() -> ExitCode {
    // Lets TRELLIS_* overrides live in a .env next to where trellis runs.
    let _ = dotenvy::dotenv();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here too, on stdout.
            let _ = e.print();
            return ExitCode::from(if e.use_stderr() { 2 } else { 0 });
        }
    };

    if let Err(e) = init_logging(&cli.global) {
        eprintln!("Failed to initialise logging: {e}");
        return ExitCode::from(1);
    }

    debug!(
        version = env!("CARGO_PKG_VERSION"),
        verbose = cli.global.verbose,
        format = ?cli.global.output_format,
        "trellis starting"
    );

    let config = match AppConfig::load(cli.global.config.as_ref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "configuration rejected");
            eprintln!("Error: failed to load configuration: {e:#}");
            return ExitCode::from(4);
        }
    };

    let output = OutputManager::new(&cli.global, &config);
    let verbose = cli.global.verbose > 0;
    let color = output.supports_color() && std::io::IsTerminal::is_terminal(&std::io::stderr());

    match run(cli, &config, &output) {
        Ok(()) => {
            info!("done");
            ExitCode::SUCCESS
        }
        Err(e) => handle_error(e, verbose, color),
    }
}

#[instrument(skip_all)]
fn run(cli: Cli, config: &AppConfig, output: &OutputManager) -> CliResult<()> {
    match cli.command {
        Commands::New(cmd) => commands::new::execute(cmd, config, output),
        Commands::Plan(cmd) => commands::plan::execute(cmd, config, output),
        Commands::Render(cmd) => commands::render::execute(cmd, config, output),
        Commands::Check(cmd) => commands::check::execute(cmd, config, output),
        Commands::Init(cmd) => commands::init::execute(cmd, output),
        Commands::Completions(cmd) => commands::completions::execute(cmd),
        Commands::Config(cmd) => commands::config::execute(cmd, config, output),
    }
}

fn handle_error(err: CliError, verbose: bool, color: bool) -> ExitCode {
    err.log();
    eprint!("{}", err.report(verbose, color));
    ExitCode::from(err.exit_code())
}
