//! Application layer for Trellis.
//!
//! This layer contains:
//! - **Services**: the orchestrator, its steps, the materializer and the
//!   prerequisite checker
//! - **Ports**: Interface definitions (traits) for external dependencies
//! - **Config**: the per-run [`ScaffoldConfig`]
//! - **Errors**: Application-specific error types
//!
//! The application layer drives the outside world through ports. Plans,
//! templates and settings composition live in `crate::domain`.

pub mod config;
pub mod error;
pub mod ports;
pub mod services;

pub use config::{ScaffoldConfig, venv_bin};
pub use services::{
    MaterializeResult, Materializer, Orchestrator, Phase, PrerequisiteChecker, RunState,
    StepReport, StepStatus, Summary,
};

pub use error::ApplicationError;
