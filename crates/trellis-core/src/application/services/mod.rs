//! Application services - drive one scaffold run.
//!
//! The orchestrator iterates the steps in [`steps`]; the steps lean on the
//! prerequisite checker and the materializer.

pub mod materializer;
pub mod orchestrator;
pub mod prerequisites;
pub mod steps;

pub use materializer::{MaterializeResult, Materializer};
pub use orchestrator::{Orchestrator, Phase, RunState, StepReport, StepStatus, Summary, next_actions};
pub use prerequisites::PrerequisiteChecker;
pub use steps::{RunContext, Step, StepOutcome};
