//! Local filesystem adapter using std::fs.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::trace;
use trellis_core::{
    application::{
        ApplicationError,
        ports::{EntryKind, Filesystem},
    },
    domain::Permissions,
    error::{TrellisError, TrellisResult},
};

/// Production filesystem implementation using `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    /// Create a new local filesystem adapter.
    pub fn new() -> Self {
        Self
    }
}

impl Filesystem for LocalFilesystem {
    fn create_dir_all(&self, path: &Path) -> TrellisResult<()> {
        fs::create_dir_all(path).map_err(|e| map_io_error(path, e, "create directory"))
    }

    fn write_file_atomic(&self, path: &Path, content: &str) -> TrellisResult<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        // The temporary file lives next to the target so the rename never
        // crosses a filesystem.
        let mut tmp =
            NamedTempFile::new_in(parent).map_err(|e| map_io_error(path, e, "create temp file"))?;
        tmp.write_all(content.as_bytes())
            .and_then(|()| tmp.flush())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| map_io_error(path, e, "write file"))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(path)
                .map(|m| m.permissions().mode() & 0o7777)
                .unwrap_or(0o644);
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(mode))
                .map_err(|e| map_io_error(path, e, "set permissions"))?;
        }

        tmp.persist(path)
            .map_err(|e| map_io_error(path, e.error, "replace file"))?;
        trace!(path = %path.display(), bytes = content.len(), "atomic write");
        Ok(())
    }

    fn read_to_string(&self, path: &Path) -> TrellisResult<String> {
        fs::read_to_string(path).map_err(|e| map_io_error(path, e, "read file"))
    }

    fn set_permissions(
        &self,
        path: &Path,
        permissions: Permissions,
        is_dir: bool,
    ) -> TrellisResult<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = permissions.unix_mode(is_dir);
            fs::set_permissions(path, fs::Permissions::from_mode(mode))
                .map_err(|e| map_io_error(path, e, "set permissions"))?;
        }
        #[cfg(not(unix))]
        {
            // No mode bits; access control lists are left to the user.
            let _ = (path, permissions, is_dir);
        }
        Ok(())
    }

    fn kind(&self, path: &Path) -> Option<EntryKind> {
        let meta = fs::symlink_metadata(path).ok()?;
        let file_type = meta.file_type();
        Some(if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        })
    }

    fn read_link(&self, path: &Path) -> TrellisResult<PathBuf> {
        fs::read_link(path).map_err(|e| map_io_error(path, e, "read link"))
    }

    fn symlink(&self, target: &Path, link: &Path) -> TrellisResult<()> {
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(target, link)
                .map_err(|e| map_io_error(link, e, "create link"))
        }
        #[cfg(not(unix))]
        {
            let source = link
                .parent()
                .map_or_else(|| target.to_path_buf(), |dir| dir.join(target));
            fs::copy(&source, link)
                .map(|_| ())
                .map_err(|e| map_io_error(link, e, "copy link target"))
        }
    }

    fn remove_file(&self, path: &Path) -> TrellisResult<()> {
        fs::remove_file(path).map_err(|e| map_io_error(path, e, "remove file"))
    }

    fn remove_dir_all(&self, path: &Path) -> TrellisResult<()> {
        fs::remove_dir_all(path).map_err(|e| map_io_error(path, e, "remove directory"))
    }
}

/// ENOSPC on Linux and macOS.
const NO_SPACE_OS_ERROR: i32 = 28;

fn map_io_error(path: &Path, e: io::Error, operation: &str) -> TrellisError {
    let path = path.to_path_buf();
    match e.kind() {
        io::ErrorKind::PermissionDenied => ApplicationError::PermissionDenied { path },
        io::ErrorKind::StorageFull => ApplicationError::DiskFull { path },
        _ if e.raw_os_error() == Some(NO_SPACE_OS_ERROR) => ApplicationError::DiskFull { path },
        _ => ApplicationError::FilesystemError {
            path,
            reason: format!("Failed to {}: {}", operation, e),
        },
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.py");
        let fs = LocalFilesystem::new();

        fs.write_file_atomic(&path, "DEBUG = True\n").unwrap();
        assert_eq!(fs.read_to_string(&path).unwrap(), "DEBUG = True\n");

        fs.write_file_atomic(&path, "DEBUG = False\n").unwrap();
        assert_eq!(fs.read_to_string(&path).unwrap(), "DEBUG = False\n");

        // Only the target remains; no temporary files left behind.
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn write_into_missing_directory_fails_with_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("file.txt");
        let err = LocalFilesystem.write_file_atomic(&path, "x").unwrap_err();
        match err {
            TrellisError::Application(ApplicationError::FilesystemError { path: p, .. }) => {
                assert_eq!(p, path)
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn kinds() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFilesystem;
        let file = dir.path().join("a.txt");
        fs.write_file_atomic(&file, "a").unwrap();

        assert_eq!(fs.kind(dir.path()), Some(EntryKind::Directory));
        assert_eq!(fs.kind(&file), Some(EntryKind::File));
        assert_eq!(fs.kind(&dir.path().join("nope")), None);
    }

    #[cfg(unix)]
    #[test]
    fn restricted_permissions_and_relative_links() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let fs = LocalFilesystem;
        let env = dir.path().join(".env");
        let credentials = dir.path().join("credentials");

        fs.write_file_atomic(&env, "SECRET_KEY=x\n").unwrap();
        fs.set_permissions(&env, Permissions::restricted(), false).unwrap();
        fs.create_dir_all(&credentials).unwrap();
        fs.set_permissions(&credentials, Permissions::restricted(), true)
            .unwrap();

        let mode = |p: &Path| std::fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&env), 0o600);
        assert_eq!(mode(&credentials), 0o700);

        let link = credentials.join(".env");
        fs.symlink(Path::new("../.env"), &link).unwrap();
        assert_eq!(fs.kind(&link), Some(EntryKind::Symlink));
        assert_eq!(fs.read_link(&link).unwrap(), PathBuf::from("../.env"));
        assert_eq!(fs.read_to_string(&link).unwrap(), "SECRET_KEY=x\n");
    }

    #[cfg(unix)]
    #[test]
    fn rewrite_keeps_existing_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let fs = LocalFilesystem;
        let manage = dir.path().join("manage.py");
        fs.write_file_atomic(&manage, "v1").unwrap();
        fs.set_permissions(&manage, Permissions::executable(), false)
            .unwrap();
        fs.write_file_atomic(&manage, "v2").unwrap();

        let mode = std::fs::metadata(&manage).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o755);
    }

    #[test]
    fn remove_dir_all_removes_tree() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFilesystem;
        let venv = dir.path().join(".venv").join("bin");
        fs.create_dir_all(&venv).unwrap();
        fs.remove_dir_all(&dir.path().join(".venv")).unwrap();
        assert!(!fs.exists(&dir.path().join(".venv")));
    }
}
