//! Terminal confirmations.
//!
//! With the `interactive` feature, questions go through `dialoguer`; without
//! it a plain `[y/N]` line is read from stdin. Either way a prompter built
//! with `--yes`, or with stdin not attached to a terminal, never asks and
//! returns each question's default.

use std::io::{self, IsTerminal};

use indicatif::ProgressBar;
use tracing::debug;
use trellis_core::{
    application::{ApplicationError, ports::Prompter},
    error::TrellisResult,
};

pub struct TerminalPrompter {
    interactive: bool,
    progress: Option<ProgressBar>,
}

impl TerminalPrompter {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            interactive: !assume_yes && io::stdin().is_terminal() && io::stderr().is_terminal(),
            progress: None,
        }
    }

    /// Hide `bar` while a question is on screen.
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }
}

impl Prompter for TerminalPrompter {
    fn confirm(&self, question: &str, default: bool) -> TrellisResult<bool> {
        if !self.interactive {
            debug!(question, default, "non-interactive, taking the default");
            return Ok(default);
        }
        match &self.progress {
            Some(bar) => bar.suspend(|| ask(question, default)),
            None => ask(question, default),
        }
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }
}

fn cancelled(reason: impl Into<String>) -> ApplicationError {
    ApplicationError::Cancelled {
        reason: reason.into(),
    }
}

#[cfg(feature = "interactive")]
fn ask(question: &str, default: bool) -> TrellisResult<bool> {
    let answer = dialoguer::Confirm::new()
        .with_prompt(question)
        .default(default)
        .interact_opt()
        .map_err(|e| cancelled(e.to_string()))?;
    answer.ok_or_else(|| cancelled(format!("no answer to \"{question}\"")).into())
}

#[cfg(not(feature = "interactive"))]
fn ask(question: &str, default: bool) -> TrellisResult<bool> {
    use std::io::Write;

    let hint = if default { "[Y/n]" } else { "[y/N]" };
    eprint!("{question} {hint} ");
    io::stderr().flush().map_err(|e| cancelled(e.to_string()))?;

    let mut input = String::new();
    let read = io::stdin()
        .read_line(&mut input)
        .map_err(|e| cancelled(e.to_string()))?;
    if read == 0 {
        return Err(cancelled(format!("no answer to \"{question}\"")).into());
    }
    Ok(parse_answer(&input).unwrap_or(default))
}

/// `Some(true)` for yes, `Some(false)` for no, `None` for an empty or
/// unrecognised answer.
#[cfg_attr(feature = "interactive", allow(dead_code))]
fn parse_answer(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assume_yes_never_asks() {
        let prompter = TerminalPrompter::new(true);
        assert!(!prompter.is_interactive());
        assert!(prompter.confirm("Continue anyway?", true).unwrap());
        assert!(!prompter.confirm("Overwrite it?", false).unwrap());
    }

    #[test]
    fn answers_are_parsed_loosely() {
        assert_eq!(parse_answer("Y\n"), Some(true));
        assert_eq!(parse_answer(" no "), Some(false));
        assert_eq!(parse_answer("\n"), None);
        assert_eq!(parse_answer("maybe"), None);
    }
}
