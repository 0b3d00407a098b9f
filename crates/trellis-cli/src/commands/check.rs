//! `trellis check`: probe the interpreter a run would use.

use serde_json::json;
use tracing::instrument;

use trellis_adapters::SystemProbe;
use trellis_core::{
    application::{ApplicationError, PrerequisiteChecker},
    domain::{PrerequisiteStatus, ToolRequirement},
    error::TrellisError,
};

use crate::{
    cli::{CheckArgs, OutputFormat},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

#[instrument(skip_all)]
pub fn execute(args: CheckArgs, config: &AppConfig, output: &OutputManager) -> CliResult<()> {
    let program = args
        .python
        .unwrap_or_else(|| config.project.python.clone());
    let range = config.python_range()?;
    let requirement = ToolRequirement::python(program, range.clone());

    let probe = SystemProbe::new();
    let status = PrerequisiteChecker::new(&probe).check(&requirement);

    if output.format() == OutputFormat::Json {
        output.json(&status_json(&requirement, &status))?;
    }

    match status {
        PrerequisiteStatus::Satisfied { path, version } => {
            let version = version.map(|v| v.to_string()).unwrap_or_default();
            output.success(&format!(
                "{} {} at {} (supported: {})",
                requirement.name,
                version,
                path.display(),
                range
            ))?;
            Ok(())
        }
        PrerequisiteStatus::Missing => Err(TrellisError::from(
            ApplicationError::PrerequisiteMissing {
                tool: requirement.name.clone(),
                hint: requirement.install_hint.clone(),
            },
        )
        .into()),
        PrerequisiteStatus::VersionMismatch {
            found, required, ..
        } => Err(TrellisError::from(ApplicationError::PrerequisiteVersionMismatch {
            tool: requirement.name.clone(),
            found: found.map_or_else(|| "unknown".to_string(), |v| v.to_string()),
            required: required.to_string(),
        })
        .into()),
    }
}

fn status_json(requirement: &ToolRequirement, status: &PrerequisiteStatus) -> serde_json::Value {
    let required = requirement.range.as_ref().map(ToString::to_string);
    match status {
        PrerequisiteStatus::Satisfied { path, version } => json!({
            "tool": requirement.name,
            "status": "satisfied",
            "path": path.display().to_string(),
            "version": version.as_ref().map(ToString::to_string),
            "required": required,
        }),
        PrerequisiteStatus::Missing => json!({
            "tool": requirement.name,
            "status": "missing",
            "required": required,
        }),
        PrerequisiteStatus::VersionMismatch { path, found, .. } => json!({
            "tool": requirement.name,
            "status": "version-mismatch",
            "path": path.display().to_string(),
            "version": found.as_ref().map(ToString::to_string),
            "required": required,
        }),
    }
}
