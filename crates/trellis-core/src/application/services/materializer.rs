//! Directory/file materializer.
//!
//! Walks a rendered [`ProjectStructure`] in order and makes the project root
//! match it without destroying anything the user did not agree to lose:
//!
//! - directories are created when absent and left alone when present;
//! - files are written when absent, left alone when identical, and otherwise
//!   handled by the resolved [`ConflictPolicy`];
//! - links are created when absent and must point where the plan says.
//!
//! Every file write goes through [`Filesystem::write_file_atomic`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::{
    application::{
        ApplicationError,
        ports::{EntryKind, Filesystem, NoopObserver, Prompter, RunObserver},
    },
    domain::{
        ConflictMode, ConflictPolicy, DirectoryToCreate, FileToWrite, FsEntry, LinkToCreate,
        ProjectStructure, RelativePath,
    },
    error::TrellisResult,
};

/// Counts of what one materialization did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeResult {
    pub created_dirs: usize,
    pub written: usize,
    pub overwritten: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub links: usize,
    pub skipped_paths: Vec<PathBuf>,
}

impl MaterializeResult {
    pub fn merge(&mut self, other: MaterializeResult) {
        self.created_dirs += other.created_dirs;
        self.written += other.written;
        self.overwritten += other.overwritten;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
        self.links += other.links;
        self.skipped_paths.extend(other.skipped_paths);
    }

    /// Writes that replaced existing content.
    pub fn destructive_writes(&self) -> usize {
        self.overwritten
    }
}

pub struct Materializer<'a> {
    fs: &'a dyn Filesystem,
    prompter: &'a dyn Prompter,
    mode: ConflictMode,
    observer: &'a dyn RunObserver,
}

impl<'a> Materializer<'a> {
    pub fn new(fs: &'a dyn Filesystem, prompter: &'a dyn Prompter, mode: ConflictMode) -> Self {
        Self {
            fs,
            prompter,
            mode,
            observer: &NoopObserver,
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn RunObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Materialize `structure` under its root.
    ///
    /// Paths in `replaceable` were produced earlier in the same run and are
    /// overwritten without consulting the conflict policy.
    #[instrument(skip_all, fields(root = %structure.root().display(), entries = structure.entry_count()))]
    pub fn materialize(
        &self,
        structure: &ProjectStructure,
        replaceable: &BTreeSet<RelativePath>,
    ) -> TrellisResult<MaterializeResult> {
        let mut result = MaterializeResult::default();
        self.ensure_root(structure.root(), &mut result)?;

        for entry in structure.entries() {
            match entry {
                FsEntry::Directory(dir) => self.directory(structure, dir, &mut result)?,
                FsEntry::File(file) => self.file(structure, file, replaceable, &mut result)?,
                FsEntry::Link(link) => self.link(structure, link, replaceable, &mut result)?,
            }
        }

        info!(
            created_dirs = result.created_dirs,
            written = result.written,
            overwritten = result.overwritten,
            unchanged = result.unchanged,
            skipped = result.skipped,
            links = result.links,
            "materialized"
        );
        Ok(result)
    }

    fn ensure_root(&self, root: &Path, result: &mut MaterializeResult) -> TrellisResult<()> {
        match self.fs.kind(root) {
            None => {
                self.fs.create_dir_all(root)?;
                result.created_dirs += 1;
                Ok(())
            }
            Some(EntryKind::Directory) | Some(EntryKind::Symlink) => Ok(()),
            Some(EntryKind::File) => Err(conflict(root, "directory", EntryKind::File)),
        }
    }

    fn directory(
        &self,
        structure: &ProjectStructure,
        dir: &DirectoryToCreate,
        result: &mut MaterializeResult,
    ) -> TrellisResult<()> {
        let path = structure.absolute(&dir.path);
        match self.fs.kind(&path) {
            None => {
                self.fs.create_dir_all(&path)?;
                if !dir.permissions.is_default() {
                    self.fs.set_permissions(&path, dir.permissions, true)?;
                }
                debug!(path = %dir.path, "created directory");
                result.created_dirs += 1;
                Ok(())
            }
            Some(EntryKind::Directory) | Some(EntryKind::Symlink) => Ok(()),
            Some(found @ EntryKind::File) => Err(conflict(&path, "directory", found)),
        }
    }

    fn file(
        &self,
        structure: &ProjectStructure,
        file: &FileToWrite,
        replaceable: &BTreeSet<RelativePath>,
        result: &mut MaterializeResult,
    ) -> TrellisResult<()> {
        let path = structure.absolute(&file.path);
        match self.fs.kind(&path) {
            None => {
                self.ensure_parent(&path)?;
                self.write(&path, file)?;
                debug!(path = %file.path, bytes = file.size(), "wrote file");
                result.written += 1;
            }
            Some(found @ EntryKind::Directory) => return Err(conflict(&path, "file", found)),
            Some(EntryKind::File) | Some(EntryKind::Symlink) => {
                let current = self.fs.read_to_string(&path).ok();
                if current.as_deref() == Some(file.content.as_str()) {
                    result.unchanged += 1;
                } else if replaceable.contains(&file.path) {
                    self.write(&path, file)?;
                    debug!(path = %file.path, "replaced generator output");
                    result.overwritten += 1;
                } else if self.may_overwrite(&file.path, "differs from the generated version")? {
                    self.write(&path, file)?;
                    info!(path = %file.path, "overwrote existing file");
                    result.overwritten += 1;
                } else {
                    self.skip(&file.path, &path, result);
                }
            }
        }
        Ok(())
    }

    fn link(
        &self,
        structure: &ProjectStructure,
        link: &LinkToCreate,
        replaceable: &BTreeSet<RelativePath>,
        result: &mut MaterializeResult,
    ) -> TrellisResult<()> {
        let path = structure.absolute(&link.path);
        let text = link.link_text();
        match self.fs.kind(&path) {
            None => {
                self.ensure_parent(&path)?;
                self.fs.symlink(&text, &path)?;
                debug!(path = %link.path, target = %text.display(), "created link");
                result.links += 1;
            }
            Some(EntryKind::Symlink) => {
                let current = self.fs.read_link(&path)?;
                if current == text {
                    result.unchanged += 1;
                } else {
                    return Err(ApplicationError::PathConflict {
                        path,
                        expected: format!("link to {}", text.display()),
                        found: format!("link to {}", current.display()),
                    }
                    .into());
                }
            }
            Some(EntryKind::File) => {
                // A plain copy of the target is what platforms without links
                // produce, and what older scaffolds left behind.
                let target = self.fs.read_to_string(&structure.absolute(&link.target)).ok();
                let current = self.fs.read_to_string(&path).ok();
                if target.is_some() && target == current {
                    result.unchanged += 1;
                } else if replaceable.contains(&link.path)
                    || self.may_overwrite(&link.path, "is a separate copy, not a link")?
                {
                    self.fs.remove_file(&path)?;
                    self.fs.symlink(&text, &path)?;
                    result.overwritten += 1;
                } else {
                    self.skip(&link.path, &path, result);
                }
            }
            Some(found @ EntryKind::Directory) => return Err(conflict(&path, "link", found)),
        }
        Ok(())
    }

    fn may_overwrite(&self, rel: &RelativePath, why: &str) -> TrellisResult<bool> {
        match self.mode.resolve(rel, self.prompter.is_interactive()) {
            ConflictPolicy::Skip => Ok(false),
            ConflictPolicy::PromptOverwrite => self
                .prompter
                .confirm(&format!("{} {}. Overwrite it?", rel, why), false),
        }
    }

    fn skip(&self, rel: &RelativePath, path: &Path, result: &mut MaterializeResult) {
        info!(path = %rel, "kept existing file");
        self.observer.path_skipped(path);
        result.skipped += 1;
        result.skipped_paths.push(path.to_path_buf());
    }

    fn write(&self, path: &Path, file: &FileToWrite) -> TrellisResult<()> {
        self.fs.write_file_atomic(path, &file.content)?;
        if !file.permissions.is_default() {
            self.fs.set_permissions(path, file.permissions, false)?;
        }
        Ok(())
    }

    fn ensure_parent(&self, path: &Path) -> TrellisResult<()> {
        match path.parent() {
            Some(parent) if self.fs.kind(parent).is_none() => self.fs.create_dir_all(parent),
            _ => Ok(()),
        }
    }
}

fn conflict(path: &Path, expected: &str, found: EntryKind) -> crate::error::TrellisError {
    ApplicationError::PathConflict {
        path: path.to_path_buf(),
        expected: expected.to_string(),
        found: found.as_str().to_string(),
    }
    .into()
}
