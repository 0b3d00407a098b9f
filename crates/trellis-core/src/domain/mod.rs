// ============================================================================
//  CLEAN MODULE BOUNDARIES
// ============================================================================

//! Core domain layer for Trellis.
//!
//! Pure logic: plans, template rendering, settings composition and version
//! rules. All I/O (filesystem, processes, prompts) goes through ports defined
//! in the application layer.
//!
//! - **No I/O**: rendering a blueprint never touches the disk
//! - **Deterministic**: the same parameters always render the same bytes
//! - **Immutable inputs**: plans and parameters are built once per run

pub mod blueprint;
pub mod entities;
pub mod error;
pub mod parameters;
pub mod secret;
pub mod settings;
pub mod value_objects;

pub use blueprint::{
    RenderedBlueprint, environment_plan, parse_env_file, structure_plan, validate_project_name,
};
pub use entities::{
    common::{Permissions, RelativePath},
    execution::{CommandOutput, DEFAULT_TIMEOUT, ExecutionStep, INSTALL_TIMEOUT},
    plan::{DirSpec, FileContent, FileSpec, LinkSpec, PlanEntry, ScaffoldPlan},
    project_structure::{DirectoryToCreate, FileToWrite, FsEntry, LinkToCreate, ProjectStructure},
    template::{TemplateId, render_source},
};
pub use error::{DomainError, ErrorCategory};
pub use parameters::{ProjectParameters, TemplateParameters, TemplateParametersBuilder};
pub use secret::{DEFAULT_SECRET_LENGTH, generate_secret};
pub use settings::SettingsModule;
pub use value_objects::{
    ConflictMode, ConflictPolicy, DatabaseEngine, Environment, PrerequisiteStatus,
    ToolRequirement, VersionRange, extract_version,
};
