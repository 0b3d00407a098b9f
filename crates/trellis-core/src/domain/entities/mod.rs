pub mod common;
pub mod execution;
pub mod plan;
pub mod project_structure;
pub mod template;

pub use crate::domain::DomainError;
pub use execution::{CommandOutput, ExecutionStep};
pub use plan::{PlanEntry, ScaffoldPlan};
pub use project_structure::ProjectStructure;
pub use template::TemplateId;
