//! Output management and formatting.

use std::io::{self, IsTerminal};

use console::Term;
use owo_colors::OwoColorize;
use serde_json::{Value, json};
use trellis_core::application::{StepStatus, Summary};

use crate::cli::global::{GlobalArgs, OutputFormat};
use crate::config::AppConfig;

/// Manages CLI output based on configuration.
pub struct OutputManager {
    resolved_format: OutputFormat,
    quiet: bool,
    no_color: bool,
    progress: bool,
    term: Term,
}

impl OutputManager {
    /// Build an `OutputManager` from parsed CLI flags and loaded config.
    pub fn new(args: &GlobalArgs, config: &AppConfig) -> Self {
        let resolved_format = args.output_format.resolve(io::stdout().is_terminal());

        Self {
            resolved_format,
            quiet: args.quiet,
            no_color: args.no_color
                || config.output.no_color
                || resolved_format != OutputFormat::Human,
            progress: config.output.progress && !args.no_progress,
            term: Term::stdout(),
        }
    }

    /// Quiet mode and JSON output both keep decorative lines off stdout.
    fn silent(&self) -> bool {
        self.quiet || self.resolved_format == OutputFormat::Json
    }

    // ── Public write methods ───────────────────────────────────────────────

    /// Generic message; suppressed in quiet mode.
    pub fn print(&self, msg: &str) -> io::Result<()> {
        if self.silent() {
            return Ok(());
        }
        self.term.write_line(msg)
    }

    /// Success indicator: `✓ <msg>`.
    pub fn success(&self, msg: &str) -> io::Result<()> {
        if self.silent() {
            return Ok(());
        }
        let line = if self.no_color {
            format!("\u{2713} {msg}") // ✓
        } else {
            format!("{} {}", "\u{2713}".green().bold(), msg.green())
        };
        self.term.write_line(&line)
    }

    /// Warning indicator: `⚠ <msg>`.
    pub fn warning(&self, msg: &str) -> io::Result<()> {
        if self.silent() {
            return Ok(());
        }
        let line = if self.no_color {
            format!("\u{26a0} {msg}") // ⚠
        } else {
            format!("{} {}", "\u{26a0}".yellow().bold(), msg.yellow())
        };
        self.term.write_line(&line)
    }

    /// Informational indicator: `ℹ <msg>`.
    pub fn info(&self, msg: &str) -> io::Result<()> {
        if self.silent() {
            return Ok(());
        }
        let line = if self.no_color {
            format!("\u{2139} {msg}") // ℹ
        } else {
            format!("{} {}", "\u{2139}".blue().bold(), msg.blue())
        };
        self.term.write_line(&line)
    }

    /// Bold cyan header line.
    pub fn header(&self, text: &str) -> io::Result<()> {
        if self.silent() {
            return Ok(());
        }
        let line = if self.no_color {
            text.to_owned()
        } else {
            text.cyan().bold().to_string()
        };
        self.term.write_line(&line)
    }

    /// Indented list under a heading; nothing is printed for an empty list.
    pub fn list<I, S>(&self, heading: &str, items: I) -> io::Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let items: Vec<S> = items.into_iter().collect();
        if items.is_empty() {
            return Ok(());
        }
        self.print("")?;
        self.header(heading)?;
        for item in &items {
            self.print(&format!("  {}", item.as_ref()))?;
        }
        Ok(())
    }

    /// Text exactly as given, for output meant to be redirected into a file.
    /// Printed even in quiet mode.
    pub fn raw(&self, text: &str) -> io::Result<()> {
        self.term.write_str(text)
    }

    /// Machine-readable document on stdout. Printed even in quiet mode.
    pub fn json(&self, value: &Value) -> io::Result<()> {
        let text = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        self.term.write_line(&text)
    }

    /// Report a finished run. Failures are reported by the caller's error
    /// path; this covers what was done and what comes next.
    pub fn summary(&self, summary: &Summary) -> io::Result<()> {
        if self.resolved_format == OutputFormat::Json {
            return self.json(&summary_json(summary));
        }

        if summary.dry_run {
            self.info("Dry run: nothing was changed")?;
            self.list("Would create:", &summary.planned_paths)?;
            let commands: Vec<String> = summary
                .steps
                .iter()
                .filter_map(|step| match &step.status {
                    StepStatus::Planned(commands) => Some(
                        commands
                            .iter()
                            .map(|c| format!("{}: {}", step.name, c))
                            .collect::<Vec<_>>(),
                    ),
                    _ => None,
                })
                .flatten()
                .collect();
            return self.list("Would run:", commands);
        }

        if !summary.state.is_success() {
            return Ok(());
        }

        let counts = &summary.materialized;
        let package = summary.package.as_deref().unwrap_or("project");
        self.success(&format!("Project '{package}' is ready"))?;
        self.print(&format!(
            "  {} written, {} overwritten, {} unchanged, {} kept",
            counts.written, counts.overwritten, counts.unchanged, counts.skipped
        ))?;
        if !counts.skipped_paths.is_empty() {
            self.warning(&format!(
                "{} existing file(s) differ from the template and were kept; \
                 rerun with --on-conflict prompt to review them",
                counts.skipped_paths.len()
            ))?;
        }
        self.list("Next steps:", &summary.next_actions)
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    /// `true` if ANSI colours are enabled.
    pub fn supports_color(&self) -> bool {
        !self.no_color
    }

    /// `true` when the step spinner should be drawn.
    pub fn shows_progress(&self) -> bool {
        self.progress && !self.silent()
    }

    /// The resolved (non-Auto) output format.
    pub fn format(&self) -> OutputFormat {
        self.resolved_format
    }
}

fn summary_json(summary: &Summary) -> Value {
    let steps: Vec<Value> = summary
        .steps
        .iter()
        .map(|step| {
            let (status, detail) = match &step.status {
                StepStatus::Done(detail) => ("done", json!(detail)),
                StepStatus::Skipped(reason) => ("skipped", json!(reason)),
                StepStatus::Failed => ("failed", Value::Null),
                StepStatus::Planned(commands) => ("planned", json!(commands)),
            };
            json!({
                "name": step.name,
                "phase": step.phase.as_str(),
                "status": status,
                "detail": detail,
            })
        })
        .collect();

    let counts = &summary.materialized;
    json!({
        "state": summary.state.to_string(),
        "package": summary.package,
        "dry_run": summary.dry_run,
        "steps": steps,
        "error": summary.failure.as_ref().map(ToString::to_string),
        "files": {
            "written": counts.written,
            "overwritten": counts.overwritten,
            "unchanged": counts.unchanged,
            "skipped": counts.skipped,
            "skipped_paths": counts
                .skipped_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>(),
        },
        "planned_paths": summary.planned_paths,
        "next_actions": summary.next_actions,
    })
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::application::{Phase, RunState, StepReport};

    fn make_manager(quiet: bool, format: OutputFormat) -> OutputManager {
        let args = GlobalArgs {
            verbose: 0,
            quiet,
            no_color: false,
            no_progress: false,
            config: None,
            output_format: format,
        };
        OutputManager::new(&args, &AppConfig::default())
    }

    fn completed() -> Summary {
        Summary {
            state: RunState::Completed,
            steps: vec![
                StepReport {
                    name: "check-prerequisites",
                    phase: Phase::CheckingPrereqs,
                    status: StepStatus::Done("python3 3.13.1".into()),
                },
                StepReport {
                    name: "install-dependencies",
                    phase: Phase::InstallingDependencies,
                    status: StepStatus::Skipped("--skip-install".into()),
                },
            ],
            failure: None,
            materialized: Default::default(),
            next_actions: vec!["cd /work/shop".into()],
            package: Some("shop".into()),
            dry_run: false,
            planned_paths: Vec::new(),
        }
    }

    #[test]
    fn quiet_output_still_succeeds() {
        let out = make_manager(true, OutputFormat::Plain);
        assert!(!out.shows_progress());
        assert!(out.print("hello").is_ok());
    }

    #[test]
    fn only_human_output_is_colored() {
        assert!(make_manager(false, OutputFormat::Human).supports_color());
        assert!(!make_manager(false, OutputFormat::Plain).supports_color());
        assert!(!make_manager(false, OutputFormat::Json).supports_color());
    }

    #[test]
    fn summary_json_reports_each_step() {
        let value = summary_json(&completed());
        assert_eq!(value["state"], "Completed");
        assert_eq!(value["package"], "shop");
        assert_eq!(value["steps"][0]["status"], "done");
        assert_eq!(value["steps"][1]["status"], "skipped");
        assert_eq!(value["steps"][1]["detail"], "--skip-install");
        assert_eq!(value["steps"][1]["phase"], "InstallingDependencies");
        assert!(value["error"].is_null());
    }

    #[test]
    fn planned_steps_carry_their_commands() {
        let mut summary = completed();
        summary.dry_run = true;
        summary.steps[1].status = StepStatus::Planned(vec!["pip install -r requirements/local.txt".into()]);
        let value = summary_json(&summary);
        assert_eq!(value["dry_run"], true);
        assert_eq!(value["steps"][1]["detail"][0], "pip install -r requirements/local.txt");
    }
}
