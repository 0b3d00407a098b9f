use super::DomainError;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A filesystem path guaranteed to stay inside the project root.
///
/// Invariant: never absolute and never contains `..`. Enforced at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelativePath(PathBuf);

impl RelativePath {
    /// Create a new relative path.
    ///
    /// # Panics
    /// Panics if path is absolute or escapes the root (use `try_new` for fallible).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        match Self::try_new(path) {
            Ok(path) => path,
            Err(e) => panic!("invalid RelativePath: {e}"),
        }
    }

    /// Fallible constructor.
    pub fn try_new(path: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let path = path.into();
        if path.is_absolute() || path.has_root() {
            return Err(DomainError::AbsolutePathNotAllowed {
                path: path.display().to_string(),
            });
        }
        if path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(DomainError::PathEscapesRoot {
                path: path.display().to_string(),
            });
        }
        Ok(Self(path))
    }

    /// Join a segment, maintaining the relative invariant.
    pub fn join(&self, segment: impl AsRef<Path>) -> Result<Self, DomainError> {
        Self::try_new(self.0.join(segment))
    }

    /// Number of normal components (`a/b/c` has depth 3).
    pub fn depth(&self) -> usize {
        self.0
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .count()
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for RelativePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl From<&str> for RelativePath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RelativePath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Capability-based permissions model.
///
/// `restricted` marks secret material: owner-only access where the platform
/// supports it (`0600` files, `0700` directories on Unix).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    executable: bool,
    restricted: bool,
}

impl Permissions {
    pub const fn read_write() -> Self {
        Self {
            executable: false,
            restricted: false,
        }
    }

    pub const fn executable() -> Self {
        Self {
            executable: true,
            restricted: false,
        }
    }

    pub const fn restricted() -> Self {
        Self {
            executable: false,
            restricted: true,
        }
    }

    pub const fn executable_flag(&self) -> bool {
        self.executable
    }

    pub const fn is_restricted(&self) -> bool {
        self.restricted
    }

    /// `true` when the default mode of a freshly created entry is good enough.
    pub const fn is_default(&self) -> bool {
        !self.executable && !self.restricted
    }

    /// Unix mode bits for this capability set.
    pub const fn unix_mode(&self, is_dir: bool) -> u32 {
        match (is_dir, self.restricted, self.executable) {
            (true, true, _) => 0o700,
            (true, false, _) => 0o755,
            (false, true, _) => 0o600,
            (false, false, true) => 0o755,
            (false, false, false) => 0o644,
        }
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::read_write()
    }
}

/// Compute the text of a relative symlink placed at `link` (root-relative)
/// that points at `target` (root-relative).
///
/// `credentials/.env` → `.env` yields `../.env`.
pub fn relative_link_target(link: &RelativePath, target: &RelativePath) -> PathBuf {
    let mut out = PathBuf::new();
    for _ in 1..link.depth() {
        out.push("..");
    }
    out.push(target.as_path());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_absolute_paths() {
        assert!(matches!(
            RelativePath::try_new("/etc/passwd"),
            Err(DomainError::AbsolutePathNotAllowed { .. })
        ));
    }

    #[test]
    fn rejects_parent_components() {
        assert!(matches!(
            RelativePath::try_new("static/../../outside"),
            Err(DomainError::PathEscapesRoot { .. })
        ));
    }

    #[test]
    fn depth_counts_normal_components() {
        assert_eq!(RelativePath::new(".env").depth(), 1);
        assert_eq!(RelativePath::new("demo/settings/base.py").depth(), 3);
    }

    #[test]
    fn link_target_climbs_to_root() {
        let link = RelativePath::new("credentials/.env");
        let target = RelativePath::new(".env");
        assert_eq!(relative_link_target(&link, &target), PathBuf::from("../.env"));
    }

    #[test]
    fn link_target_at_root_is_target() {
        let link = RelativePath::new("env-link");
        let target = RelativePath::new(".env");
        assert_eq!(relative_link_target(&link, &target), PathBuf::from(".env"));
    }

    #[test]
    fn restricted_modes() {
        assert_eq!(Permissions::restricted().unix_mode(false), 0o600);
        assert_eq!(Permissions::restricted().unix_mode(true), 0o700);
        assert_eq!(Permissions::executable().unix_mode(false), 0o755);
    }
}
