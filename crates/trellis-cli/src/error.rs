//! Errors surfaced by the `trellis` binary and their exit codes.
//!
//! Core errors pass through unchanged; what this layer adds is the mapping
//! to a process exit code and the report printed on stderr.

use std::error::Error;
use std::fmt::Write as _;

use owo_colors::OwoColorize;
use thiserror::Error;

use trellis_core::{
    application::{ApplicationError, RunState, Summary},
    error::{ErrorCategory as CoreCategory, TrellisError},
};

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    /// An argument clap accepted but the command could not use.
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },

    /// Configuration that could not be loaded, validated or written.
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },

    /// A core error raised outside a scaffolding run.
    #[error("{0}")]
    Core(#[from] TrellisError),

    /// A scaffolding run that ended `Aborted` or `Failed`.
    #[error("Run {state} at step '{step}': {source}")]
    RunStopped {
        state: RunState,
        step: String,
        #[source]
        source: TrellisError,
    },

    #[error("I/O error: {message}")]
    IoError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// The user declined a confirmation.
    #[error("Cancelled")]
    Cancelled,
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::IoError {
            message: err.to_string(),
            source: err,
        }
    }
}

impl CliError {
    /// Error for a run that did not end `Completed`.
    pub fn from_summary(summary: &Summary) -> Self {
        let source = summary.failure.clone().unwrap_or_else(|| TrellisError::Internal {
            message: format!("run ended in state {} without an error", summary.state),
        });

        if matches!(
            source,
            TrellisError::Application(ApplicationError::Cancelled { .. })
        ) {
            return Self::Cancelled;
        }

        let step = summary
            .failed_step()
            .unwrap_or("render-blueprint")
            .to_string();
        Self::RunStopped {
            state: summary.state,
            step,
            source,
        }
    }

    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidInput { .. } => vec!["See the accepted values: trellis help".into()],

            Self::ConfigError { .. } => vec![
                "Show which file is read: trellis config path".into(),
                "Show the merged values: trellis config list".into(),
                "Environment overrides look like TRELLIS_PROJECT__PYTHON".into(),
            ],

            Self::Core(core) => core.suggestions(),

            Self::RunStopped { state, source, .. } => {
                let mut suggestions = source.suggestions();
                if matches!(state, RunState::Failed(_)) {
                    suggestions.push(
                        "Fix the cause and rerun the same command; finished work is kept".into(),
                    );
                }
                suggestions
            }

            Self::IoError { .. } => vec![
                "Check that the directory exists and is writable".into(),
            ],

            Self::Cancelled => vec![
                "Pass --yes to accept the defaults without asking".into(),
                "Steps that already finished were kept".into(),
            ],
        }
    }

    /// Stderr tail of a failed external command, if that is the cause.
    pub fn details(&self) -> Option<&str> {
        let source = match self {
            Self::Core(e) | Self::RunStopped { source: e, .. } => e,
            _ => return None,
        };
        match source {
            TrellisError::Application(
                ApplicationError::ExternalCommandFailed { stderr_tail, .. }
                | ApplicationError::CommandTimedOut { stderr_tail, .. },
            ) if !stderr_tail.trim().is_empty() => Some(stderr_tail),
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput { .. } | Self::Cancelled => ErrorCategory::UserError,
            Self::ConfigError { .. } => ErrorCategory::Configuration,
            Self::Core(core) => match core.category() {
                CoreCategory::Validation | CoreCategory::Cancelled => ErrorCategory::UserError,
                CoreCategory::NotFound | CoreCategory::Prerequisite => ErrorCategory::NotFound,
                CoreCategory::Filesystem
                | CoreCategory::ExternalCommand
                | CoreCategory::Internal => ErrorCategory::Internal,
            },
            Self::RunStopped { .. } => ErrorCategory::RunStopped,
            Self::IoError { .. } => ErrorCategory::Internal,
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.category().exit_code()
    }

    /// The stderr report: message, command output, causes (verbose only)
    /// and suggestions.
    pub fn report(&self, verbose: bool, color: bool) -> String {
        let paint = |text: &str, style: fn(&str) -> String| {
            if color { style(text) } else { text.to_string() }
        };
        let mut out = String::new();

        let _ = writeln!(
            out,
            "\n{} {}",
            paint("\u{2717} Error:", |t| t.red().bold().to_string()),
            paint(&self.to_string(), |t| t.red().to_string()),
        );

        if let Some(details) = self.details() {
            let _ = writeln!(out, "\n  {}", paint("stderr:", |t| t.dimmed().to_string()));
            for line in details.lines() {
                let _ = writeln!(out, "    {}", paint(line, |t| t.dimmed().to_string()));
            }
        }

        if verbose {
            let mut cause = self.source();
            while let Some(err) = cause {
                let _ = writeln!(out, "  caused by: {err}");
                cause = err.source();
            }
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            let _ = writeln!(
                out,
                "\n{}",
                paint("Suggestions:", |t| t.yellow().bold().to_string())
            );
            for suggestion in &suggestions {
                let _ = writeln!(out, "  {suggestion}");
            }
        }

        if !verbose {
            let _ = writeln!(
                out,
                "\n{}",
                paint("Rerun with -v for the underlying causes.", |t| {
                    t.dimmed().to_string()
                })
            );
        }
        out
    }

    pub fn log(&self) {
        let category = self.category();
        match category {
            ErrorCategory::UserError | ErrorCategory::NotFound => {
                tracing::warn!(?category, error = %self, "command rejected")
            }
            _ => tracing::error!(?category, error = %self, "command failed"),
        }
        if let Some(source) = self.source() {
            tracing::debug!(%source, "cause");
        }
    }
}

/// How an error is classified for the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    UserError,
    /// An unknown template, or a missing or unsupported tool.
    NotFound,
    Configuration,
    /// A scaffolding run ended `Aborted` or `Failed`.
    RunStopped,
    Internal,
}

impl ErrorCategory {
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Internal => 1,
            Self::UserError => 2,
            Self::NotFound => 3,
            Self::Configuration => 4,
            Self::RunStopped => 5,
        }
    }
}

/// Attach a context message while converting a foreign error.
pub trait IntoCli<T> {
    fn with_cli_context<F, S>(self, f: F) -> CliResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IntoCli<T> for Result<T, std::io::Error> {
    fn with_cli_context<F, S>(self, f: F) -> CliResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| CliError::IoError {
            message: f().into(),
            source: e,
        })
    }
}

impl<T> IntoCli<T> for Result<T, toml::ser::Error> {
    fn with_cli_context<F, S>(self, f: F) -> CliResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| CliError::ConfigError {
            message: format!("{}: {e}", f().into()),
            source: Some(Box::new(e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use trellis_core::application::{Phase, StepReport, StepStatus};
    use trellis_core::domain::DomainError;

    fn summary(state: RunState, failure: TrellisError, failed: &'static str) -> Summary {
        Summary {
            state,
            steps: vec![StepReport {
                name: failed,
                phase: Phase::RunningMigration,
                status: StepStatus::Failed,
            }],
            failure: Some(failure),
            materialized: Default::default(),
            next_actions: Vec::new(),
            package: Some("shop".into()),
            dry_run: false,
            planned_paths: Vec::new(),
        }
    }

    fn migration_failure() -> TrellisError {
        ApplicationError::ExternalCommandFailed {
            step: "run-migrations".into(),
            exit_code: Some(1),
            stderr_tail: "django.db.utils.OperationalError: no such table".into(),
        }
        .into()
    }

    // ── run summaries ─────────────────────────────────────────────────────

    #[test]
    fn failed_run_exits_with_five_and_names_the_step() {
        let err = CliError::from_summary(&summary(
            RunState::Failed(Phase::RunningMigration),
            migration_failure(),
            "run-migrations",
        ));
        assert_eq!(err.exit_code(), 5);
        let text = err.to_string();
        assert!(text.contains("Failed(RunningMigration)"));
        assert!(text.contains("run-migrations"));
        assert!(err.suggestions().iter().any(|s| s.contains("rerun")));
    }

    #[test]
    fn failed_command_shows_its_stderr() {
        let err = CliError::from_summary(&summary(
            RunState::Failed(Phase::RunningMigration),
            migration_failure(),
            "run-migrations",
        ));
        let plain = err.report(false, false);
        assert!(plain.contains("stderr:"));
        assert!(plain.contains("no such table"));
    }

    #[test]
    fn timed_out_command_shows_what_it_printed() {
        let err = CliError::from_summary(&summary(
            RunState::Failed(Phase::InstallingDependencies),
            ApplicationError::CommandTimedOut {
                step: "install-dependencies".into(),
                timeout_secs: 900,
                stderr_tail: "WARNING: Retrying after connection broken".into(),
            }
            .into(),
            "install-dependencies",
        ));
        let plain = err.report(false, false);
        assert!(plain.contains("timed out after 900s"));
        assert!(plain.contains("Retrying after connection broken"));
    }

    #[test]
    fn cancelled_confirmation_is_a_user_error() {
        let err = CliError::from_summary(&summary(
            RunState::Aborted,
            ApplicationError::Cancelled {
                reason: "no answer".into(),
            }
            .into(),
            "check-prerequisites",
        ));
        assert!(matches!(err, CliError::Cancelled));
        assert_eq!(err.exit_code(), 2);
    }

    // ── core errors ───────────────────────────────────────────────────────

    #[test]
    fn invalid_name_is_a_user_error() {
        let err = CliError::from(TrellisError::from(DomainError::InvalidProjectName {
            name: "my-site".into(),
            reason: "not a Python identifier".into(),
        }));
        assert_eq!(err.exit_code(), 2);
        assert!(!err.suggestions().is_empty());
        assert!(err.details().is_none());
    }

    #[test]
    fn unknown_template_is_not_found() {
        let err = CliError::from(TrellisError::from(DomainError::UnknownTemplate(
            "settings-dev".into(),
        )));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn exit_codes_per_category() {
        let invalid = CliError::InvalidInput {
            message: "x".into(),
            source: None,
        };
        let config = CliError::ConfigError {
            message: "x".into(),
            source: None,
        };
        let io = CliError::IoError {
            message: "x".into(),
            source: io::Error::other("e"),
        };
        assert_eq!(invalid.exit_code(), 2);
        assert_eq!(config.exit_code(), 4);
        assert_eq!(io.exit_code(), 1);
    }

    #[test]
    fn plain_report_has_no_escape_codes() {
        let err = CliError::ConfigError {
            message: "project.python_versions: bad range".into(),
            source: None,
        };
        let report = err.report(false, false);
        assert!(report.contains("Error: Configuration error"));
        assert!(report.contains("Suggestions:"));
        assert!(report.contains("-v"));
        assert!(!report.contains('\u{1b}'));
    }

    #[test]
    fn verbose_report_lists_causes_instead_of_the_hint() {
        let err = CliError::IoError {
            message: "writing trellis.toml".into(),
            source: io::Error::other("disk full"),
        };
        let report = err.report(true, false);
        assert!(report.contains("caused by: disk full"));
        assert!(!report.contains("Rerun with -v"));
    }

    #[test]
    fn into_cli_io_error() {
        let result: Result<(), io::Error> = Err(io::Error::new(io::ErrorKind::NotFound, "missing"));
        let cli: CliResult<()> = result.with_cli_context(|| "reading config");
        assert!(matches!(cli, Err(CliError::IoError { .. })));
    }
}
