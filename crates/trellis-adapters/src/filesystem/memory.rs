//! In-memory filesystem adapter for testing.
//!
//! Models files, directories and symlinks under absolute paths. Writes can
//! be made to fail on demand; a failed write leaves the previous content in
//! place, which is the guarantee the local adapter gives through rename.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Component, Path, PathBuf},
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use trellis_core::{
    application::{
        ApplicationError,
        ports::{EntryKind, Filesystem},
    },
    domain::Permissions,
    error::TrellisResult,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Directory { permissions: Permissions },
    File { content: String, permissions: Permissions },
    Link { target: PathBuf },
}

/// In-memory filesystem for testing.
#[derive(Debug, Clone, Default)]
pub struct MemoryFilesystem {
    inner: Arc<RwLock<MemoryFilesystemInner>>,
}

#[derive(Debug, Default)]
struct MemoryFilesystemInner {
    nodes: BTreeMap<PathBuf, Node>,
    failing_writes: BTreeSet<PathBuf>,
    writes: usize,
}

impl MemoryFilesystem {
    /// Create a new empty memory filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later write to `path` fail with `DiskFull`.
    pub fn fail_writes_to(&self, path: impl Into<PathBuf>) {
        if let Ok(mut inner) = self.inner.write() {
            inner.failing_writes.insert(path.into());
        }
    }

    pub fn clear_faults(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.failing_writes.clear();
        }
    }

    /// Seed a file, creating its parents.
    pub fn insert_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            let _ = self.create_dir_all(parent);
        }
        if let Ok(mut inner) = self.inner.write() {
            inner.nodes.insert(
                path.to_path_buf(),
                Node::File {
                    content: content.into(),
                    permissions: Permissions::read_write(),
                },
            );
        }
    }

    /// File content, if `path` is a regular file.
    pub fn read_file(&self, path: impl AsRef<Path>) -> Option<String> {
        let inner = self.inner.read().ok()?;
        match inner.nodes.get(path.as_ref()) {
            Some(Node::File { content, .. }) => Some(content.clone()),
            _ => None,
        }
    }

    pub fn permissions_of(&self, path: impl AsRef<Path>) -> Option<Permissions> {
        let inner = self.inner.read().ok()?;
        match inner.nodes.get(path.as_ref())? {
            Node::File { permissions, .. } | Node::Directory { permissions } => Some(*permissions),
            Node::Link { .. } => None,
        }
    }

    pub fn link_target(&self, path: impl AsRef<Path>) -> Option<PathBuf> {
        let inner = self.inner.read().ok()?;
        match inner.nodes.get(path.as_ref())? {
            Node::Link { target } => Some(target.clone()),
            _ => None,
        }
    }

    /// Every path below `root`, relative to it, in sorted order.
    pub fn paths_under(&self, root: impl AsRef<Path>) -> Vec<PathBuf> {
        let root = root.as_ref();
        self.inner
            .read()
            .map(|inner| {
                inner
                    .nodes
                    .keys()
                    .filter_map(|p| p.strip_prefix(root).ok())
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(Path::to_path_buf)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Successful file writes so far.
    pub fn write_count(&self) -> usize {
        self.inner.read().map(|inner| inner.writes).unwrap_or(0)
    }

    fn read(&self) -> TrellisResult<RwLockReadGuard<'_, MemoryFilesystemInner>> {
        self.inner
            .read()
            .map_err(|_| ApplicationError::LockPoisoned.into())
    }

    fn write(&self) -> TrellisResult<RwLockWriteGuard<'_, MemoryFilesystemInner>> {
        self.inner
            .write()
            .map_err(|_| ApplicationError::LockPoisoned.into())
    }
}

fn fs_error(path: &Path, reason: &str) -> trellis_core::error::TrellisError {
    ApplicationError::FilesystemError {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
    .into()
}

/// Lexically resolve `.` and `..`.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

impl MemoryFilesystemInner {
    fn require_parent_dir(&self, path: &Path) -> TrellisResult<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && parent.parent().is_some() => {
                match self.nodes.get(parent) {
                    Some(Node::Directory { .. }) => Ok(()),
                    Some(_) => Err(fs_error(path, "parent is not a directory")),
                    None => Err(fs_error(path, "parent directory does not exist")),
                }
            }
            _ => Ok(()),
        }
    }

    /// Follow links until a non-link node or a dangling path.
    fn resolve(&self, path: &Path) -> PathBuf {
        let mut current = path.to_path_buf();
        for _ in 0..8 {
            match self.nodes.get(&current) {
                Some(Node::Link { target }) => {
                    let base = current.parent().map(Path::to_path_buf).unwrap_or_default();
                    current = normalize(&base.join(target));
                }
                _ => break,
            }
        }
        current
    }
}

impl Filesystem for MemoryFilesystem {
    fn create_dir_all(&self, path: &Path) -> TrellisResult<()> {
        let mut inner = self.write()?;

        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            match inner.nodes.get(&current) {
                Some(Node::Directory { .. }) => {}
                Some(_) => return Err(fs_error(&current, "not a directory")),
                None => {
                    inner.nodes.insert(
                        current.clone(),
                        Node::Directory {
                            permissions: Permissions::read_write(),
                        },
                    );
                }
            }
        }
        Ok(())
    }

    fn write_file_atomic(&self, path: &Path, content: &str) -> TrellisResult<()> {
        let mut inner = self.write()?;
        inner.require_parent_dir(path)?;

        if inner.failing_writes.contains(path) {
            return Err(ApplicationError::DiskFull {
                path: path.to_path_buf(),
            }
            .into());
        }

        let permissions = match inner.nodes.get(path) {
            Some(Node::Directory { .. }) => return Err(fs_error(path, "is a directory")),
            Some(Node::File { permissions, .. }) => *permissions,
            _ => Permissions::read_write(),
        };
        inner.nodes.insert(
            path.to_path_buf(),
            Node::File {
                content: content.to_string(),
                permissions,
            },
        );
        inner.writes += 1;
        Ok(())
    }

    fn read_to_string(&self, path: &Path) -> TrellisResult<String> {
        let inner = self.read()?;
        let resolved = inner.resolve(path);
        match inner.nodes.get(&resolved) {
            Some(Node::File { content, .. }) => Ok(content.clone()),
            Some(_) => Err(fs_error(path, "not a file")),
            None => Err(fs_error(path, "no such file")),
        }
    }

    fn set_permissions(
        &self,
        path: &Path,
        permissions: Permissions,
        _is_dir: bool,
    ) -> TrellisResult<()> {
        let mut inner = self.write()?;
        match inner.nodes.get_mut(path) {
            Some(Node::File { permissions: p, .. }) | Some(Node::Directory { permissions: p }) => {
                *p = permissions;
                Ok(())
            }
            Some(Node::Link { .. }) => Ok(()),
            None => Err(fs_error(path, "no such file")),
        }
    }

    fn kind(&self, path: &Path) -> Option<EntryKind> {
        let inner = self.inner.read().ok()?;
        inner.nodes.get(path).map(|node| match node {
            Node::Directory { .. } => EntryKind::Directory,
            Node::File { .. } => EntryKind::File,
            Node::Link { .. } => EntryKind::Symlink,
        })
    }

    fn read_link(&self, path: &Path) -> TrellisResult<PathBuf> {
        let inner = self.read()?;
        match inner.nodes.get(path) {
            Some(Node::Link { target }) => Ok(target.clone()),
            _ => Err(fs_error(path, "not a link")),
        }
    }

    fn symlink(&self, target: &Path, link: &Path) -> TrellisResult<()> {
        let mut inner = self.write()?;
        inner.require_parent_dir(link)?;
        if inner.nodes.contains_key(link) {
            return Err(fs_error(link, "already exists"));
        }
        inner.nodes.insert(
            link.to_path_buf(),
            Node::Link {
                target: target.to_path_buf(),
            },
        );
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> TrellisResult<()> {
        let mut inner = self.write()?;
        match inner.nodes.get(path) {
            Some(Node::File { .. }) | Some(Node::Link { .. }) => {
                inner.nodes.remove(path);
                Ok(())
            }
            Some(Node::Directory { .. }) => Err(fs_error(path, "is a directory")),
            None => Err(fs_error(path, "no such file")),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> TrellisResult<()> {
        let mut inner = self.write()?;
        if !inner.nodes.contains_key(path) {
            return Err(fs_error(path, "no such directory"));
        }
        inner.nodes.retain(|p, _| !p.starts_with(path));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::error::TrellisError;

    #[test]
    fn write_requires_parent() {
        let fs = MemoryFilesystem::new();
        assert!(fs.write_file_atomic(Path::new("/p/a.txt"), "x").is_err());
        fs.create_dir_all(Path::new("/p")).unwrap();
        fs.write_file_atomic(Path::new("/p/a.txt"), "x").unwrap();
        assert_eq!(fs.read_file("/p/a.txt").as_deref(), Some("x"));
        assert_eq!(fs.write_count(), 1);
    }

    #[test]
    fn failed_write_keeps_previous_content() {
        let fs = MemoryFilesystem::new();
        fs.insert_file("/p/.env", "OLD=1\n");
        fs.fail_writes_to("/p/.env");

        let err = fs
            .write_file_atomic(Path::new("/p/.env"), "NEW=1\n")
            .unwrap_err();
        assert!(matches!(
            err,
            TrellisError::Application(ApplicationError::DiskFull { .. })
        ));
        assert_eq!(fs.read_file("/p/.env").as_deref(), Some("OLD=1\n"));

        fs.clear_faults();
        fs.write_file_atomic(Path::new("/p/.env"), "NEW=1\n").unwrap();
        assert_eq!(fs.read_file("/p/.env").as_deref(), Some("NEW=1\n"));
    }

    #[test]
    fn links_resolve_relative_to_their_directory() {
        let fs = MemoryFilesystem::new();
        fs.insert_file("/p/.env", "A=1\n");
        fs.create_dir_all(Path::new("/p/credentials")).unwrap();
        fs.symlink(Path::new("../.env"), Path::new("/p/credentials/.env"))
            .unwrap();

        assert_eq!(fs.kind(Path::new("/p/credentials/.env")), Some(EntryKind::Symlink));
        assert_eq!(
            fs.read_to_string(Path::new("/p/credentials/.env")).unwrap(),
            "A=1\n"
        );
        assert_eq!(
            fs.link_target("/p/credentials/.env"),
            Some(PathBuf::from("../.env"))
        );
    }

    #[test]
    fn directory_over_file_is_rejected() {
        let fs = MemoryFilesystem::new();
        fs.insert_file("/p/static", "oops");
        assert!(fs.create_dir_all(Path::new("/p/static/css")).is_err());
    }

    #[test]
    fn remove_dir_all_drops_descendants() {
        let fs = MemoryFilesystem::new();
        fs.insert_file("/p/.venv/bin/python", "");
        fs.insert_file("/p/manage.py", "");
        fs.remove_dir_all(Path::new("/p/.venv")).unwrap();
        assert_eq!(fs.paths_under("/p"), vec![PathBuf::from("manage.py")]);
    }

    #[test]
    fn permissions_survive_rewrite() {
        let fs = MemoryFilesystem::new();
        fs.insert_file("/p/.env", "A=1");
        fs.set_permissions(Path::new("/p/.env"), Permissions::restricted(), false)
            .unwrap();
        fs.write_file_atomic(Path::new("/p/.env"), "A=2").unwrap();
        assert_eq!(fs.permissions_of("/p/.env"), Some(Permissions::restricted()));
    }
}
