use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::domain::{
    entities::common::{Permissions, RelativePath, relative_link_target},
    error::DomainError,
};

/// Final project structure ready for materialization.
///
/// This is the output of rendering a [`ScaffoldPlan`](super::plan::ScaffoldPlan):
/// every path is resolved and every file body is final text. It contains no
/// business logic, only data.
#[derive(Debug, Clone)]
pub struct ProjectStructure {
    pub(crate) root: PathBuf,
    pub(crate) entries: Vec<FsEntry>,
}

impl ProjectStructure {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn add_file(&mut self, path: RelativePath, content: String, perms: Permissions) {
        self.entries.push(FsEntry::File(FileToWrite {
            path,
            content,
            permissions: perms,
        }));
    }

    pub fn add_directory(&mut self, path: RelativePath, perms: Permissions) {
        self.entries.push(FsEntry::Directory(DirectoryToCreate {
            path,
            permissions: perms,
        }));
    }

    pub fn add_link(&mut self, path: RelativePath, target: RelativePath) {
        self.entries.push(FsEntry::Link(LinkToCreate { path, target }));
    }

    pub fn with_file(mut self, path: impl Into<RelativePath>, content: impl Into<String>, perms: Permissions) -> Self {
        self.add_file(path.into(), content.into(), perms);
        self
    }

    pub fn with_directory(mut self, path: impl Into<RelativePath>, perms: Permissions) -> Self {
        self.add_directory(path.into(), perms);
        self
    }

    pub fn with_link(mut self, path: impl Into<RelativePath>, target: impl Into<RelativePath>) -> Self {
        self.add_link(path.into(), target.into());
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.entries.is_empty() {
            return Err(DomainError::EmptyPlan);
        }

        let mut seen = HashSet::new();
        for entry in &self.entries {
            if let FsEntry::Link(link) = entry {
                if !seen.contains(&link.target) {
                    return Err(DomainError::ForwardReference {
                        path: link.path.to_string(),
                        dependency: link.target.to_string(),
                    });
                }
            }
            if !seen.insert(entry.path().clone()) {
                return Err(DomainError::DuplicatePath {
                    path: entry.path().to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn entries(&self) -> &[FsEntry] {
        &self.entries
    }

    pub fn files(&self) -> impl Iterator<Item = &FileToWrite> {
        self.entries.iter().filter_map(|e| match e {
            FsEntry::File(f) => Some(f),
            _ => None,
        })
    }

    pub fn directories(&self) -> impl Iterator<Item = &DirectoryToCreate> {
        self.entries.iter().filter_map(|e| match e {
            FsEntry::Directory(d) => Some(d),
            _ => None,
        })
    }

    pub fn links(&self) -> impl Iterator<Item = &LinkToCreate> {
        self.entries.iter().filter_map(|e| match e {
            FsEntry::Link(l) => Some(l),
            _ => None,
        })
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<&FileToWrite> {
        let path = path.as_ref();
        self.files().find(|f| f.path.as_path() == path)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Absolute location of a root-relative path.
    pub fn absolute(&self, path: &RelativePath) -> PathBuf {
        self.root.join(path)
    }
}

#[derive(Debug, Clone)]
pub enum FsEntry {
    Directory(DirectoryToCreate),
    File(FileToWrite),
    Link(LinkToCreate),
}

impl FsEntry {
    pub fn path(&self) -> &RelativePath {
        match self {
            Self::Directory(d) => &d.path,
            Self::File(f) => &f.path,
            Self::Link(l) => &l.path,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileToWrite {
    pub path: RelativePath,
    pub content: String,
    pub permissions: Permissions,
}

impl FileToWrite {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryToCreate {
    pub path: RelativePath,
    pub permissions: Permissions,
}

/// A relative symbolic link. `target` is root-relative; the text stored in
/// the link is relative to the link's own directory.
#[derive(Debug, Clone)]
pub struct LinkToCreate {
    pub path: RelativePath,
    pub target: RelativePath,
}

impl LinkToCreate {
    pub fn link_text(&self) -> PathBuf {
        relative_link_target(&self.path, &self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_and_counts_entries() {
        let structure = ProjectStructure::new("/tmp/proj")
            .with_directory("credentials", Permissions::restricted())
            .with_file(".env", "A=1\n", Permissions::restricted())
            .with_link("credentials/.env", ".env");

        assert!(structure.validate().is_ok());
        assert_eq!(structure.entry_count(), 3);
        assert_eq!(structure.files().count(), 1);
        assert_eq!(structure.links().count(), 1);
        assert_eq!(
            structure.links().next().unwrap().link_text(),
            PathBuf::from("../.env")
        );
        assert_eq!(
            structure.absolute(&RelativePath::new(".env")),
            PathBuf::from("/tmp/proj/.env")
        );
    }

    #[test]
    fn rejects_duplicates() {
        let structure = ProjectStructure::new("/tmp/proj")
            .with_file("manage.py", "", Permissions::executable())
            .with_file("manage.py", "", Permissions::executable());

        assert!(matches!(
            structure.validate(),
            Err(DomainError::DuplicatePath { .. })
        ));
    }

    #[test]
    fn rejects_link_to_later_entry() {
        let structure = ProjectStructure::new("/tmp/proj")
            .with_link("credentials/.env", ".env")
            .with_file(".env", "", Permissions::restricted());

        assert!(matches!(
            structure.validate(),
            Err(DomainError::ForwardReference { .. })
        ));
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(
            ProjectStructure::new("/tmp/proj").validate(),
            Err(DomainError::EmptyPlan)
        );
    }
}
