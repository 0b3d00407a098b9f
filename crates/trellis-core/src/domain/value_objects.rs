//! Domain value objects: Environment, DatabaseEngine, conflict policies and
//! tool version requirements.
//!
//! These are pure value types with equality by value and no identity. Each
//! one has a string form and a `FromStr` parser so the CLI and config layers
//! can round-trip them without extra glue.

use crate::domain::entities::common::RelativePath;
use crate::domain::error::DomainError;
use semver::{Comparator, Op, Prerelease, Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// ── Environment ──────────────────────────────────────────────────────────────

/// A deployment environment. Each one has a settings module and, except for
/// `Testing`, a requirements manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Local,
    Staging,
    Production,
    Testing,
}

impl Environment {
    pub const ALL: [Environment; 4] = [
        Environment::Local,
        Environment::Staging,
        Environment::Production,
        Environment::Testing,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Staging => "staging",
            Self::Production => "production",
            Self::Testing => "testing",
        }
    }

    /// Whether a `requirements/<env>.txt` manifest is generated for this environment.
    pub const fn has_manifest(&self) -> bool {
        !matches!(self, Self::Testing)
    }

    /// Dotted settings module path, e.g. `demo.settings.local`.
    pub fn settings_module(&self, package: &str) -> String {
        format!("{}.settings.{}", package, self.as_str())
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" | "dev" | "development" => Ok(Self::Local),
            "staging" | "stage" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            "testing" | "test" => Ok(Self::Testing),
            other => Err(DomainError::InvalidParameter {
                name: "environment".into(),
                reason: format!(
                    "'{}' is not one of: local, staging, production, testing",
                    other
                ),
            }),
        }
    }
}

// ── DatabaseEngine ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseEngine {
    Postgresql,
    #[default]
    Sqlite3,
}

impl DatabaseEngine {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Postgresql => "postgresql",
            Self::Sqlite3 => "sqlite3",
        }
    }

    /// Database name used when none is configured.
    pub fn default_name(&self, project_name: &str) -> String {
        match self {
            Self::Postgresql => project_name.to_string(),
            Self::Sqlite3 => "db.sqlite3".to_string(),
        }
    }

    pub const fn default_port(&self) -> &'static str {
        match self {
            Self::Postgresql => "5432",
            Self::Sqlite3 => "",
        }
    }
}

impl fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseEngine {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" | "pg" => Ok(Self::Postgresql),
            "sqlite3" | "sqlite" => Ok(Self::Sqlite3),
            other => Err(DomainError::InvalidParameter {
                name: "db_engine".into(),
                reason: format!("'{}' is not one of: postgresql, sqlite3", other),
            }),
        }
    }
}

// ── Conflict handling ────────────────────────────────────────────────────────

/// What the user asked for when a file already exists with different content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictMode {
    /// Prompt for files directly under the project root, skip inside subtrees.
    #[default]
    Auto,
    Skip,
    Prompt,
}

impl ConflictMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Skip => "skip",
            Self::Prompt => "prompt",
        }
    }

    /// Resolve the concrete policy for one root-relative path.
    pub fn resolve(&self, path: &RelativePath, interactive: bool) -> ConflictPolicy {
        match self {
            Self::Skip => ConflictPolicy::Skip,
            Self::Prompt => ConflictPolicy::PromptOverwrite,
            Self::Auto if !interactive => ConflictPolicy::Skip,
            Self::Auto if path.depth() <= 1 => ConflictPolicy::PromptOverwrite,
            Self::Auto => ConflictPolicy::Skip,
        }
    }
}

impl fmt::Display for ConflictMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "skip" => Ok(Self::Skip),
            "prompt" | "ask" => Ok(Self::Prompt),
            other => Err(DomainError::InvalidParameter {
                name: "on_conflict".into(),
                reason: format!("'{}' is not one of: auto, skip, prompt", other),
            }),
        }
    }
}

/// Per-file policy applied by the materializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    Skip,
    PromptOverwrite,
}

// ── Versions ─────────────────────────────────────────────────────────────────

/// Inclusive version range `[min, max]`, either end optional.
///
/// Bounds are precision-aware: a max of `3.14` admits every `3.14.x`, a min of
/// `3.12` admits `3.12.0` and later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    min: Option<String>,
    max: Option<String>,
    req: VersionReq,
}

impl VersionRange {
    pub fn new(min: Option<&str>, max: Option<&str>) -> Result<Self, DomainError> {
        let mut comparators = Vec::new();
        if let Some(min) = min {
            comparators.push(parse_bound(min, Op::GreaterEq)?);
        }
        if let Some(max) = max {
            comparators.push(parse_bound(max, Op::LessEq)?);
        }
        if let [low, high] = comparators.as_slice() {
            if is_inverted(low, high) {
                return Err(DomainError::InvalidVersion {
                    input: format!("{}..={}", min.unwrap_or_default(), max.unwrap_or_default()),
                    reason: "the minimum is above the maximum".into(),
                });
            }
        }
        Ok(Self {
            min: min.map(str::to_string),
            max: max.map(str::to_string),
            req: VersionReq { comparators },
        })
    }

    /// A range that admits every version.
    pub fn any() -> Self {
        Self {
            min: None,
            max: None,
            req: VersionReq::STAR,
        }
    }

    pub fn min(&self) -> Option<&str> {
        self.min.as_deref()
    }

    pub fn max(&self) -> Option<&str> {
        self.max.as_deref()
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.req.matches(version)
    }
}

/// Compared at the precision both bounds share, so `3.12.5..=3.12` is
/// still a valid range.
fn is_inverted(min: &Comparator, max: &Comparator) -> bool {
    let parts = |c: &Comparator| [Some(c.major), c.minor, c.patch];
    for (low, high) in parts(min).into_iter().zip(parts(max)) {
        match (low, high) {
            (Some(low), Some(high)) if low != high => return low > high,
            (Some(_), Some(_)) => continue,
            _ => return false,
        }
    }
    false
}

fn parse_bound(input: &str, op: Op) -> Result<Comparator, DomainError> {
    let invalid = |reason: &str| DomainError::InvalidVersion {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let mut parts = input.trim().split('.');
    let mut next = |required: bool| -> Result<Option<u64>, DomainError> {
        match parts.next() {
            Some(p) => p
                .parse::<u64>()
                .map(Some)
                .map_err(|_| invalid("components must be numbers")),
            None if required => Err(invalid("expected at least a major version")),
            None => Ok(None),
        }
    };

    let major = next(true)?.unwrap_or_default();
    let minor = next(false)?;
    let patch = if minor.is_some() { next(false)? } else { None };
    if parts.next().is_some() {
        return Err(invalid("at most three components are allowed"));
    }

    Ok(Comparator {
        op,
        major,
        minor,
        patch,
        pre: Prerelease::EMPTY,
    })
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.min, &self.max) {
            (None, None) => f.write_str("*"),
            (Some(min), None) => write!(f, "{}..", min),
            (None, Some(max)) => write!(f, "..={}", max),
            (Some(min), Some(max)) => write!(f, "{}..={}", min, max),
        }
    }
}

impl FromStr for VersionRange {
    type Err = DomainError;

    /// Accepts `3.12..=3.14`, `3.12..`, `..=3.14`, a single `3.12` (exact
    /// at that precision) or `*`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "*" {
            return Ok(Self::any());
        }
        match s.split_once("..") {
            Some((min, max)) => {
                let max = max.strip_prefix('=').unwrap_or(max);
                let min = Some(min.trim()).filter(|m| !m.is_empty());
                let max = Some(max.trim()).filter(|m| !m.is_empty());
                Self::new(min, max)
            }
            None => Self::new(Some(s), Some(s)),
        }
    }
}

/// Extract the first dotted version number from tool output.
///
/// `"Python 3.12.4"` yields `3.12.4`; `"pip 24.0 from ..."` yields `24.0.0`.
/// Missing components are padded with zero.
pub fn extract_version(output: &str) -> Option<Version> {
    output
        .split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .filter(|token| token.contains('.'))
        .find_map(|token| {
            let mut numbers = token
                .split('.')
                .take(3)
                .map(|part| part.parse::<u64>().ok());
            let major = numbers.next()??;
            let minor = numbers.next()??;
            let patch = numbers.next().flatten().unwrap_or(0);
            Some(Version::new(major, minor, patch))
        })
}

// ── Prerequisites ────────────────────────────────────────────────────────────

/// An external tool the run depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRequirement {
    pub name: String,
    pub version_args: Vec<String>,
    pub range: Option<VersionRange>,
    pub install_hint: String,
}

impl ToolRequirement {
    pub fn new(name: impl Into<String>, install_hint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version_args: vec!["--version".into()],
            range: None,
            install_hint: install_hint.into(),
        }
    }

    pub fn with_range(mut self, range: VersionRange) -> Self {
        self.range = Some(range);
        self
    }

    /// The Python interpreter requirement.
    pub fn python(program: impl Into<String>, range: VersionRange) -> Self {
        Self::new(
            program,
            "Install Python from https://www.python.org/downloads/ or your package manager",
        )
        .with_range(range)
    }
}

/// Outcome of probing one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrerequisiteStatus {
    Satisfied {
        path: PathBuf,
        version: Option<Version>,
    },
    Missing,
    VersionMismatch {
        path: PathBuf,
        /// `None` when the version output could not be parsed.
        found: Option<Version>,
        required: VersionRange,
    },
}

impl PrerequisiteStatus {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_from_str_accepts_aliases() {
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("Local".parse::<Environment>().unwrap(), Environment::Local);
        assert!("qa".parse::<Environment>().is_err());
    }

    #[test]
    fn testing_has_no_manifest() {
        assert!(!Environment::Testing.has_manifest());
        assert!(Environment::Staging.has_manifest());
    }

    #[test]
    fn settings_module_path() {
        assert_eq!(
            Environment::Local.settings_module("demo"),
            "demo.settings.local"
        );
    }

    #[test]
    fn auto_prompts_at_root_and_skips_in_subtrees() {
        let root_file = RelativePath::new("manage.py");
        let nested = RelativePath::new("demo/settings/base.py");

        assert_eq!(
            ConflictMode::Auto.resolve(&root_file, true),
            ConflictPolicy::PromptOverwrite
        );
        assert_eq!(
            ConflictMode::Auto.resolve(&nested, true),
            ConflictPolicy::Skip
        );
    }

    #[test]
    fn auto_skips_everywhere_when_non_interactive() {
        let root_file = RelativePath::new(".env");
        assert_eq!(
            ConflictMode::Auto.resolve(&root_file, false),
            ConflictPolicy::Skip
        );
    }

    #[test]
    fn explicit_modes_ignore_depth() {
        let nested = RelativePath::new("requirements/base.txt");
        assert_eq!(
            ConflictMode::Prompt.resolve(&nested, true),
            ConflictPolicy::PromptOverwrite
        );
        assert_eq!(
            ConflictMode::Skip.resolve(&RelativePath::new(".env"), true),
            ConflictPolicy::Skip
        );
    }

    #[test]
    fn range_is_inclusive_and_precision_aware() {
        let range: VersionRange = "3.12..=3.14".parse().unwrap();

        assert!(range.contains(&Version::new(3, 12, 0)));
        assert!(range.contains(&Version::new(3, 14, 7)));
        assert!(!range.contains(&Version::new(3, 11, 9)));
        assert!(!range.contains(&Version::new(3, 15, 0)));
    }

    #[test]
    fn open_ended_ranges() {
        let min_only: VersionRange = "3.10..".parse().unwrap();
        assert!(min_only.contains(&Version::new(4, 0, 0)));
        assert!(!min_only.contains(&Version::new(3, 9, 18)));

        let max_only: VersionRange = "..=3.13".parse().unwrap();
        assert!(max_only.contains(&Version::new(2, 7, 18)));
        assert!(!max_only.contains(&Version::new(3, 14, 0)));

        assert!(VersionRange::any().contains(&Version::new(0, 1, 0)));
    }

    #[test]
    fn range_display_round_trips() {
        let range: VersionRange = "3.12..=3.14".parse().unwrap();
        assert_eq!(range.to_string(), "3.12..=3.14");
        assert_eq!(range, range.to_string().parse().unwrap());
    }

    #[test]
    fn range_rejects_garbage() {
        assert!(matches!(
            "three..=four".parse::<VersionRange>(),
            Err(DomainError::InvalidVersion { .. })
        ));
        assert!("3.1.2.4".parse::<VersionRange>().is_err());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = "3.14..=3.12".parse::<VersionRange>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidVersion { ref reason, .. } if reason.contains("above")));
        assert!(VersionRange::new(Some("3.12.5"), Some("3.12.3")).is_err());
        assert!(VersionRange::new(Some("4"), Some("3.14")).is_err());

        // Bounds that overlap at the shared precision are fine.
        assert!(VersionRange::new(Some("3.12.5"), Some("3.12")).is_ok());
        assert!("3.12".parse::<VersionRange>().is_ok());
        assert!("3.12..=3.12".parse::<VersionRange>().is_ok());
    }

    #[test]
    fn extracts_first_dotted_version() {
        assert_eq!(
            extract_version("Python 3.12.4"),
            Some(Version::new(3, 12, 4))
        );
        assert_eq!(
            extract_version("pip 24.0 from /usr/lib/python3/dist-packages/pip (python 3.12)"),
            Some(Version::new(24, 0, 0))
        );
        assert_eq!(extract_version("no version here"), None);
    }
}
