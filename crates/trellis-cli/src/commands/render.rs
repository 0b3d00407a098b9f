//! `trellis render`: print one rendered template.

use trellis_core::{
    domain::{TemplateId, generate_secret, validate_project_name},
    error::TrellisError,
};

use crate::{cli::RenderArgs, config::AppConfig, error::CliResult, output::OutputManager};

pub fn execute(args: RenderArgs, config: &AppConfig, output: &OutputManager) -> CliResult<()> {
    if args.list {
        for id in TemplateId::all() {
            output.raw(&format!("{id}\n"))?;
        }
        return Ok(());
    }

    // clap guarantees a template unless --list was given.
    let Some(name) = args.template.as_deref() else {
        return Ok(());
    };
    let id: TemplateId = name.parse().map_err(TrellisError::from)?;
    validate_project_name(&args.name).map_err(TrellisError::from)?;

    let secret = generate_secret(config.project.secret_length).map_err(TrellisError::from)?;
    let params = config.project_parameters(&args.name, secret).into_parameters();
    let text = id.render(&params).map_err(TrellisError::from)?;
    output.raw(&text)?;
    Ok(())
}
