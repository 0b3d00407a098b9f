//! The single error type every public core operation returns.

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::{DomainError, ErrorCategory as DomainCategory};

#[derive(Debug, Error, Clone)]
pub enum TrellisError {
    /// A plan, template or parameter problem, found before anything runs.
    #[error("{0}")]
    Domain(#[from] DomainError),

    /// A failure while touching the outside world.
    #[error("{0}")]
    Application(#[from] ApplicationError),

    /// A broken invariant inside trellis itself.
    #[error("Internal error: {message}. This is a bug, please report it.")]
    Internal { message: String },
}

impl TrellisError {
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Domain(e) => e.suggestions(),
            Self::Application(e) => e.suggestions(),
            Self::Internal { .. } => vec![
                "Rerun with -vv and include the log when reporting it".into(),
                "Issues: https://github.com/cosecruz/trellis/issues".into(),
            ],
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Domain(e) => match e.category() {
                DomainCategory::Validation => ErrorCategory::Validation,
                DomainCategory::NotFound => ErrorCategory::NotFound,
                DomainCategory::Internal => ErrorCategory::Internal,
            },
            Self::Application(e) => e.category(),
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Coarse classification, used by the CLI for exit codes and styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Prerequisite,
    Filesystem,
    ExternalCommand,
    Cancelled,
    Internal,
}

pub type TrellisResult<T> = Result<T, TrellisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_categories_carry_through() {
        let err = TrellisError::from(DomainError::UnknownTemplate("nope".into()));
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn internal_errors_ask_for_a_report() {
        let err = TrellisError::Internal {
            message: "step list empty".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Internal);
        assert!(err.suggestions().iter().any(|s| s.contains("issues")));
    }
}
