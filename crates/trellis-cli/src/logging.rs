//! Log setup for the binary. The library crates only emit events.
//!
//! Everything goes to stderr so stdout stays clean for `render`, `config`
//! and JSON output. `RUST_LOG`, when set, replaces the flag-derived filter.

use std::io::IsTerminal as _;

use tracing_subscriber::{
    EnvFilter, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::cli::GlobalArgs;

const CRATES: [&str; 3] = ["trellis", "trellis_core", "trellis_adapters"];

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(args: &GlobalArgs) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directives(level(args))));

    // From -vv up, closed spans are logged with their timings, which gives
    // one line per step with its duration.
    let detailed = args.verbose >= 2;
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(!args.no_color && std::io::stderr().is_terminal())
        .with_target(detailed)
        .with_span_events(if detailed { FmtSpan::CLOSE } else { FmtSpan::NONE });

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing subscriber already installed: {e}"))
}

/// `--quiet` → error, nothing → warn, then info / debug / trace per `-v`.
fn level(args: &GlobalArgs) -> &'static str {
    match (args.quiet, args.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    }
}

/// Same level for every workspace crate, dependencies stay silent.
fn directives(level: &str) -> String {
    CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}
