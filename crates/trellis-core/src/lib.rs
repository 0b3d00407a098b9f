//! Trellis Core - Hexagonal Architecture Implementation
//!
//! This crate provides the domain and application layers for the Trellis
//! Django project scaffolder, following hexagonal (ports and adapters) architecture.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           trellis-cli (CLI)             │
//! │     (Builds config, drives a run)       │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Application Services            │
//! │  (Orchestrator, Materializer, Checker)  │
//! │     Ordered steps, one run at a time    │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      Application Ports (Traits)         │
//! │ (Filesystem, CommandRunner, ToolProbe,  │
//! │          Prompter, RunObserver)         │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │    trellis-adapters (Infrastructure)    │
//! │ (LocalFilesystem, ProcessRunner, etc.)  │
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Domain Layer (Pure Logic)       │
//! │ (ScaffoldPlan, templates, settings,     │
//! │   rendered ProjectStructure)            │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use trellis_core::prelude::*;
//!
//! # fn adapters() -> (Box<dyn Filesystem>, Box<dyn CommandRunner>, Box<dyn ToolProbe>, Box<dyn Prompter>) { unimplemented!() }
//! let (fs, runner, probe, prompter) = adapters();
//! let parameters = ProjectParameters::new("demo", generate_secret(50).unwrap()).into_parameters();
//! let config = ScaffoldConfig::new("/tmp/demo", parameters);
//!
//! let orchestrator = Orchestrator::new(fs.as_ref(), runner.as_ref(), probe.as_ref(), prompter.as_ref());
//! let summary = orchestrator.run(&config);
//! println!("{}", summary.state);
//! ```

pub mod domain;

pub mod application;

pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        MaterializeResult, Materializer, Orchestrator, PrerequisiteChecker, RunState,
        ScaffoldConfig, Summary,
        ports::{CommandRunner, Filesystem, Prompter, RunObserver, ToolProbe},
    };
    pub use crate::domain::{
        ConflictMode, Environment, ExecutionStep, ProjectParameters, ProjectStructure,
        RenderedBlueprint, ScaffoldPlan, TemplateId, TemplateParameters, generate_secret,
    };
    pub use crate::error::{TrellisError, TrellisResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
