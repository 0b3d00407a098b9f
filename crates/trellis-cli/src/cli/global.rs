//! Flags accepted by every subcommand.

use std::path::PathBuf;

use clap::{ArgAction, Args, ValueEnum};

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Log more: -v info, -vv debug with targets, -vvv trace.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only errors and requested output (`render`, `config`, JSON).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Plain text, no ANSI colours.
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Hide the step spinner during `new`. Finished steps are still listed.
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// TOML configuration file, used instead of the platform config file
    /// and `./trellis.toml`.
    #[arg(short, long, global = true, value_name = "FILE", env = "TRELLIS_CONFIG")]
    pub config: Option<PathBuf>,

    /// How results are written to stdout.
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Auto,
        env = "TRELLIS_OUTPUT_FORMAT"
    )]
    pub output_format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `human` on a terminal, `plain` when piped.
    #[default]
    Auto,
    /// Coloured, with symbols.
    Human,
    /// Symbols without colour.
    Plain,
    /// A single JSON document from `new`, `plan` and `check`.
    Json,
}

impl OutputFormat {
    /// Settle `Auto` against whether stdout is a terminal.
    pub fn resolve(self, stdout_is_terminal: bool) -> Self {
        match self {
            Self::Auto if stdout_is_terminal => Self::Human,
            Self::Auto => Self::Plain,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_follows_the_terminal() {
        assert_eq!(OutputFormat::Auto.resolve(true), OutputFormat::Human);
        assert_eq!(OutputFormat::Auto.resolve(false), OutputFormat::Plain);
        assert_eq!(OutputFormat::Json.resolve(true), OutputFormat::Json);
    }
}
