// ============================================================================
// domain/error.rs - PLAN, TEMPLATE AND PARAMETER ERRORS
// ============================================================================

use thiserror::Error;

/// Root domain error type.
///
/// Every variant is raised before the project root is touched: rendering and
/// plan validation run to completion ahead of any filesystem mutation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Template errors
    // ========================================================================
    #[error("Template '{template}' references unbound parameter '{parameter}'")]
    MissingTemplateParameter { template: String, parameter: String },

    #[error("Template '{template}' is malformed: {reason}")]
    MalformedTemplate { template: String, reason: String },

    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    // ========================================================================
    // Parameter errors
    // ========================================================================
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Invalid project name '{name}': {reason}")]
    InvalidProjectName { name: String, reason: String },

    #[error("Invalid version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    // ========================================================================
    // Plan errors
    // ========================================================================
    #[error("Scaffold plan is empty")]
    EmptyPlan,

    #[error("Duplicate path in plan: {path}")]
    DuplicatePath { path: String },

    #[error("Absolute paths not allowed: {path}")]
    AbsolutePathNotAllowed { path: String },

    #[error("Path escapes the project root: {path}")]
    PathEscapesRoot { path: String },

    #[error("Entry '{path}' refers to '{dependency}', which is not planned before it")]
    ForwardReference { path: String, dependency: String },
}

impl DomainError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::MissingTemplateParameter { parameter, .. } => vec![
                format!("Provide a value for '{}'", parameter),
                "Nothing was written: templates are validated before any file is created".into(),
            ],
            Self::MalformedTemplate { template, .. } => vec![
                format!("Template '{}' has unbalanced {{{{ }}}} markers", template),
                "Please report this issue".into(),
            ],
            Self::UnknownTemplate(name) => vec![
                format!("No template named '{}'", name),
                "List the template names: trellis render --list".into(),
            ],
            Self::InvalidProjectName { .. } => vec![
                "The project name becomes a Python package name".into(),
                "Use letters, digits and underscores, starting with a letter".into(),
                "Examples: demo, shop_backend, blog2".into(),
            ],
            Self::InvalidVersion { input, .. } if input.contains("..") => vec![
                "Write the lower bound first, as in 3.12..=3.14".into(),
            ],
            Self::InvalidVersion { input, .. } => vec![
                format!("'{}' is not a version like 3.12 or 3.12.4", input),
            ],
            _ => vec!["See documentation for more details".into()],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingTemplateParameter { .. }
            | Self::InvalidParameter { .. }
            | Self::InvalidProjectName { .. }
            | Self::InvalidVersion { .. } => ErrorCategory::Validation,
            Self::UnknownTemplate(_) => ErrorCategory::NotFound,
            _ => ErrorCategory::Internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Internal,
}
