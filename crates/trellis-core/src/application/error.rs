//! Application layer errors.
//!
//! These errors represent failures while driving the outside world:
//! missing tools, filesystem refusals and external commands. Plan and
//! template errors are `DomainError` from `crate::domain`.

use std::path::PathBuf;
use thiserror::Error;

use crate::error::ErrorCategory;

/// Errors that occur while executing a run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApplicationError {
    /// A required tool is not on PATH.
    #[error("Required tool '{tool}' was not found")]
    PrerequisiteMissing { tool: String, hint: String },

    /// A tool was found but its version is outside the accepted range.
    #[error("'{tool}' version {found} is outside the supported range {required}")]
    PrerequisiteVersionMismatch {
        tool: String,
        found: String,
        required: String,
    },

    /// A path exists with the wrong kind (file vs directory vs link).
    #[error("Path conflict at {path}: expected {expected}, found {found}")]
    PathConflict {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("No space left on device while writing {path}")]
    DiskFull { path: PathBuf },

    /// Any other filesystem failure.
    #[error("Filesystem error at {path}: {reason}")]
    FilesystemError { path: PathBuf, reason: String },

    /// An external command exited unsuccessfully.
    #[error("Step '{step}' failed with {}", describe_exit(.exit_code))]
    ExternalCommandFailed {
        step: String,
        exit_code: Option<i32>,
        stderr_tail: String,
    },

    #[error("Step '{step}' timed out after {timeout_secs}s")]
    CommandTimedOut {
        step: String,
        timeout_secs: u64,
        /// Last lines the command wrote before it was killed.
        stderr_tail: String,
    },

    #[error("Step '{step}' could not start '{program}': {reason}")]
    CommandSpawnFailed {
        step: String,
        program: String,
        reason: String,
    },

    /// The user declined a confirmation the run depends on.
    #[error("Cancelled: {reason}")]
    Cancelled { reason: String },

    /// Shared state lock poisoned (in-memory adapters).
    #[error("Internal lock poisoned")]
    LockPoisoned,
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "termination by signal".to_string(),
    }
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::PrerequisiteMissing { tool, hint } => vec![
                format!("Install '{}' and make sure it is on PATH", tool),
                hint.clone(),
            ],
            Self::PrerequisiteVersionMismatch { required, .. } => vec![
                format!("Use an interpreter in the range {}", required),
                "Point --python at another interpreter, or rerun and confirm to continue".into(),
            ],
            Self::PathConflict { path, .. } => vec![
                format!("Move or remove: {}", path.display()),
                "Then rerun; existing files are kept".into(),
            ],
            Self::PermissionDenied { path } => vec![
                format!("Check write permissions for: {}", path.display()),
                "Choose another --root".into(),
            ],
            Self::DiskFull { .. } => vec![
                "Free some disk space and rerun".into(),
                "Files already written are kept and skipped on rerun".into(),
            ],
            Self::FilesystemError { path, .. } => vec![
                format!("Failed to access: {}", path.display()),
                "Ensure the parent directory exists".into(),
            ],
            Self::ExternalCommandFailed { stderr_tail, .. } => {
                let mut out = vec!["Fix the cause reported above and rerun".into()];
                if stderr_tail.trim().is_empty() {
                    out.push("Run with -vv to see the full command line".into());
                }
                out
            }
            Self::CommandTimedOut { .. } => vec![
                "Check your network connection".into(),
                "Raise the timeout with TRELLIS_COMMANDS__INSTALL_TIMEOUT_SECS".into(),
            ],
            Self::CommandSpawnFailed { program, .. } => vec![
                format!("Check that '{}' exists and is executable", program),
                "Delete the virtual environment directory to have it recreated".into(),
            ],
            Self::Cancelled { .. } => vec!["Nothing further was changed".into()],
            Self::LockPoisoned => vec!["This is a bug, please report it".into()],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::PrerequisiteMissing { .. } | Self::PrerequisiteVersionMismatch { .. } => {
                ErrorCategory::Prerequisite
            }
            Self::PathConflict { .. }
            | Self::PermissionDenied { .. }
            | Self::DiskFull { .. }
            | Self::FilesystemError { .. } => ErrorCategory::Filesystem,
            Self::ExternalCommandFailed { .. }
            | Self::CommandTimedOut { .. }
            | Self::CommandSpawnFailed { .. } => ErrorCategory::ExternalCommand,
            Self::Cancelled { .. } => ErrorCategory::Cancelled,
            Self::LockPoisoned => ErrorCategory::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failure_reports_exit_code() {
        let err = ApplicationError::ExternalCommandFailed {
            step: "run-migrations".into(),
            exit_code: Some(1),
            stderr_tail: "boom".into(),
        };
        assert_eq!(err.to_string(), "Step 'run-migrations' failed with exit code 1");
        assert_eq!(err.category(), ErrorCategory::ExternalCommand);
    }

    #[test]
    fn signal_termination_is_described() {
        let err = ApplicationError::ExternalCommandFailed {
            step: "x".into(),
            exit_code: None,
            stderr_tail: String::new(),
        };
        assert!(err.to_string().ends_with("termination by signal"));
    }

    #[test]
    fn timeout_names_the_limit() {
        let err = ApplicationError::CommandTimedOut {
            step: "install-dependencies".into(),
            timeout_secs: 900,
            stderr_tail: "Collecting Django".into(),
        };
        assert_eq!(err.to_string(), "Step 'install-dependencies' timed out after 900s");
        assert_eq!(err.category(), ErrorCategory::ExternalCommand);
    }

    #[test]
    fn missing_tool_suggests_install_hint() {
        let err = ApplicationError::PrerequisiteMissing {
            tool: "python3".into(),
            hint: "apt install python3".into(),
        };
        assert!(err.suggestions().iter().any(|s| s == "apt install python3"));
        assert_eq!(err.category(), ErrorCategory::Prerequisite);
    }
}
