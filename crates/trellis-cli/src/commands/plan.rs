//! `trellis plan`: print the file set a project would get.
//!
//! Pure rendering: nothing is probed, spawned or written.

use trellis_core::{
    domain::{FsEntry, RenderedBlueprint},
    error::TrellisError,
};
use serde_json::json;

use crate::{
    cli::{OutputFormat, PlanArgs},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

/// Stand-in for the generated secret; plans never show real key material.
const SECRET_PLACEHOLDER: &str = "<generated>";

pub fn execute(args: PlanArgs, config: &AppConfig, output: &OutputManager) -> CliResult<()> {
    let root = std::env::current_dir()?.join(&args.name);
    let params = config
        .project_parameters(&args.name, SECRET_PLACEHOLDER.into())
        .into_parameters();
    let blueprint = RenderedBlueprint::render(&root, &params).map_err(TrellisError::from)?;

    if output.format() == OutputFormat::Json {
        let entries: Vec<_> = blueprint.entries().map(entry_json).collect();
        output.json(&json!({ "package": blueprint.package, "entries": entries }))?;
        return Ok(());
    }

    output.header(&format!("Files for '{}':", blueprint.package))?;
    for entry in blueprint.entries() {
        output.print(&format!("  {}", describe(entry)))?;
    }
    Ok(())
}

/// One line per entry: directories end in `/`, links show their target,
/// restricted and executable entries show their mode.
fn describe(entry: &FsEntry) -> String {
    match entry {
        FsEntry::Directory(dir) if dir.permissions.is_restricted() => {
            format!("{}/  (0700)", dir.path)
        }
        FsEntry::Directory(dir) => format!("{}/", dir.path),
        FsEntry::File(file) if file.permissions.is_default() => file.path.to_string(),
        FsEntry::File(file) => {
            format!("{}  ({:04o})", file.path, file.permissions.unix_mode(false))
        }
        FsEntry::Link(link) => format!("{} -> {}", link.path, link.link_text().display()),
    }
}

fn entry_json(entry: &FsEntry) -> serde_json::Value {
    match entry {
        FsEntry::Directory(dir) => json!({
            "path": dir.path.to_string(),
            "kind": "directory",
            "mode": format!("{:04o}", dir.permissions.unix_mode(true)),
        }),
        FsEntry::File(file) => json!({
            "path": file.path.to_string(),
            "kind": "file",
            "mode": format!("{:04o}", file.permissions.unix_mode(false)),
            "bytes": file.size(),
        }),
        FsEntry::Link(link) => json!({
            "path": link.path.to_string(),
            "kind": "symlink",
            "target": link.link_text().display().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn blueprint() -> RenderedBlueprint {
        let params = AppConfig::default()
            .project_parameters("shop", SECRET_PLACEHOLDER.into())
            .into_parameters();
        RenderedBlueprint::render(Path::new("/work/shop"), &params).unwrap()
    }

    #[test]
    fn lines_mark_kinds_and_modes() {
        let lines: Vec<String> = blueprint().entries().map(describe).collect();
        assert!(lines.contains(&"credentials/  (0700)".to_string()));
        assert!(lines.contains(&".env  (0600)".to_string()));
        assert!(lines.contains(&"manage.py  (0755)".to_string()));
        assert!(lines.contains(&"credentials/.env -> ../.env".to_string()));
        assert!(lines.contains(&"shop/settings/base.py".to_string()));
        assert!(lines.contains(&"requirements/".to_string()));
    }

    #[test]
    fn json_entries_name_their_kind() {
        let entries: Vec<_> = blueprint().entries().map(entry_json).collect();
        let link = entries
            .iter()
            .find(|e| e["kind"] == "symlink")
            .unwrap();
        assert_eq!(link["path"], "credentials/.env");
        assert_eq!(link["target"], "../.env");
        assert!(entries.iter().any(|e| e["path"] == ".env" && e["mode"] == "0600"));
    }
}
