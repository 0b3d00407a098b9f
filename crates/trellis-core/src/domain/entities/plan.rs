//! The declarative scaffold plan.
//!
//! A plan is an ordered list of directory, file and link entries, built in a
//! single pass. Paths are unique and relative to the project root, and an
//! entry may only refer to entries planned before it.

use std::collections::HashSet;
use std::path::Path;

use crate::domain::{
    entities::common::{Permissions, RelativePath},
    entities::project_structure::ProjectStructure,
    entities::template::TemplateId,
    error::DomainError,
    parameters::TemplateParameters,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Template(TemplateId),
    Literal(String),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirSpec {
    pub path: RelativePath,
    pub permissions: Permissions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub path: RelativePath,
    pub content: FileContent,
    pub permissions: Permissions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    pub path: RelativePath,
    pub target: RelativePath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanEntry {
    Dir(DirSpec),
    File(FileSpec),
    Link(LinkSpec),
}

impl PlanEntry {
    pub fn path(&self) -> &RelativePath {
        match self {
            Self::Dir(d) => &d.path,
            Self::File(f) => &f.path,
            Self::Link(l) => &l.path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaffoldPlan {
    entries: Vec<PlanEntry>,
}

impl ScaffoldPlan {
    pub fn builder() -> ScaffoldPlanBuilder {
        ScaffoldPlanBuilder::default()
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.entries.is_empty() {
            return Err(DomainError::EmptyPlan);
        }

        let mut seen: HashSet<&RelativePath> = HashSet::new();
        for entry in &self.entries {
            if let PlanEntry::Link(link) = entry {
                if !seen.contains(&link.target) {
                    return Err(DomainError::ForwardReference {
                        path: link.path.to_string(),
                        dependency: link.target.to_string(),
                    });
                }
            }
            if !seen.insert(entry.path()) {
                return Err(DomainError::DuplicatePath {
                    path: entry.path().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Render every entry against `params`.
    ///
    /// Fails on the first template error; nothing is produced for a plan that
    /// does not render completely.
    pub fn render(
        &self,
        root: &Path,
        params: &TemplateParameters,
    ) -> Result<ProjectStructure, DomainError> {
        self.validate()?;

        let mut structure = ProjectStructure::new(root);
        for entry in &self.entries {
            match entry {
                PlanEntry::Dir(dir) => structure.add_directory(dir.path.clone(), dir.permissions),
                PlanEntry::File(file) => {
                    let body = match &file.content {
                        FileContent::Template(id) => id.render(params)?,
                        FileContent::Literal(text) => text.clone(),
                        FileContent::Empty => String::new(),
                    };
                    structure.add_file(file.path.clone(), body, file.permissions);
                }
                PlanEntry::Link(link) => {
                    structure.add_link(link.path.clone(), link.target.clone())
                }
            }
        }

        structure.validate()?;
        Ok(structure)
    }
}

/// Single-pass builder. Invalid paths are remembered and reported by `build`.
#[derive(Debug, Default)]
pub struct ScaffoldPlanBuilder {
    entries: Vec<PlanEntry>,
    error: Option<DomainError>,
}

impl ScaffoldPlanBuilder {
    pub fn dir(self, path: impl AsRef<str>) -> Self {
        self.dir_with(path, Permissions::read_write())
    }

    pub fn dir_with(mut self, path: impl AsRef<str>, permissions: Permissions) -> Self {
        if let Some(path) = self.path(path.as_ref()) {
            self.entries.push(PlanEntry::Dir(DirSpec { path, permissions }));
        }
        self
    }

    pub fn file(self, path: impl AsRef<str>, content: FileContent) -> Self {
        self.file_with(path, content, Permissions::read_write())
    }

    pub fn file_with(
        mut self,
        path: impl AsRef<str>,
        content: FileContent,
        permissions: Permissions,
    ) -> Self {
        if let Some(path) = self.path(path.as_ref()) {
            self.entries.push(PlanEntry::File(FileSpec {
                path,
                content,
                permissions,
            }));
        }
        self
    }

    pub fn template(self, path: impl AsRef<str>, id: TemplateId) -> Self {
        self.file(path, FileContent::Template(id))
    }

    pub fn empty(self, path: impl AsRef<str>) -> Self {
        self.file(path, FileContent::Empty)
    }

    pub fn link(mut self, path: impl AsRef<str>, target: impl AsRef<str>) -> Self {
        let path = self.path(path.as_ref());
        let target = self.path(target.as_ref());
        if let (Some(path), Some(target)) = (path, target) {
            self.entries.push(PlanEntry::Link(LinkSpec { path, target }));
        }
        self
    }

    pub fn build(self) -> Result<ScaffoldPlan, DomainError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let plan = ScaffoldPlan {
            entries: self.entries,
        };
        plan.validate()?;
        Ok(plan)
    }

    fn path(&mut self, raw: &str) -> Option<RelativePath> {
        match RelativePath::try_new(raw) {
            Ok(path) => Some(path),
            Err(e) => {
                self.error.get_or_insert(e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> TemplateParameters {
        TemplateParameters::builder().set("project_name", "demo").build()
    }

    #[test]
    fn builder_keeps_order() {
        let plan = ScaffoldPlan::builder()
            .dir("static")
            .empty("static/.gitkeep")
            .file("README", FileContent::Literal("hi".into()))
            .build()
            .unwrap();

        let paths: Vec<String> = plan.entries().iter().map(|e| e.path().to_string()).collect();
        assert_eq!(paths, vec!["static", "static/.gitkeep", "README"]);
    }

    #[test]
    fn builder_reports_first_bad_path() {
        let err = ScaffoldPlan::builder()
            .dir("ok")
            .dir("/abs")
            .dir("../up")
            .build()
            .unwrap_err();
        assert!(matches!(err, DomainError::AbsolutePathNotAllowed { .. }));
    }

    #[test]
    fn duplicate_paths_are_rejected() {
        let err = ScaffoldPlan::builder()
            .dir("apps")
            .empty("apps")
            .build()
            .unwrap_err();
        assert_eq!(err, DomainError::DuplicatePath { path: "apps".into() });
    }

    #[test]
    fn links_must_point_backwards() {
        let err = ScaffoldPlan::builder()
            .dir("credentials")
            .link("credentials/.env", ".env")
            .empty(".env")
            .build()
            .unwrap_err();
        assert!(matches!(err, DomainError::ForwardReference { .. }));
    }

    #[test]
    fn empty_plan_is_rejected() {
        assert_eq!(
            ScaffoldPlan::builder().build().unwrap_err(),
            DomainError::EmptyPlan
        );
    }

    #[test]
    fn renders_literals_and_empties() {
        let plan = ScaffoldPlan::builder()
            .dir("apps")
            .empty("apps/__init__.py")
            .file("NAME", FileContent::Literal("literal {{kept}}".into()))
            .build()
            .unwrap();

        let structure = plan.render(Path::new("/tmp/demo"), &params()).unwrap();
        assert_eq!(structure.file("apps/__init__.py").unwrap().content, "");
        // Literal bodies are not templates.
        assert_eq!(structure.file("NAME").unwrap().content, "literal {{kept}}");
    }

    #[test]
    fn render_fails_on_missing_parameter() {
        let plan = ScaffoldPlan::builder()
            .template("manage.py", TemplateId::Manage)
            .build()
            .unwrap();

        let err = plan
            .render(Path::new("/tmp/demo"), &TemplateParameters::default())
            .unwrap_err();
        assert!(matches!(err, DomainError::MissingTemplateParameter { .. }));
    }
}
