//! Per-run configuration handed to the orchestrator.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::{
    ConflictMode, DEFAULT_TIMEOUT, Environment, INSTALL_TIMEOUT, TemplateParameters,
    VersionRange, parameters,
};

pub const DEFAULT_PYTHON: &str = "python3";
pub const DEFAULT_PYTHON_RANGE: &str = "3.12..=3.14";
const DEFAULT_VENV_DIR: &str = ".venv";

/// Everything one run needs. Built once, read-only afterwards.
#[derive(Debug, Clone)]
pub struct ScaffoldConfig {
    pub root: PathBuf,
    /// Interpreter used to create the virtual environment.
    pub python: String,
    pub python_range: VersionRange,
    /// Settings variant used for migrations and the installed manifest.
    pub settings_env: Environment,
    pub conflict_mode: ConflictMode,
    pub default_timeout: Duration,
    pub install_timeout: Duration,
    pub skip_install: bool,
    pub skip_migrate: bool,
    pub dry_run: bool,
    pub parameters: TemplateParameters,
    /// Ambient `PATH`, appended after the virtual environment's bin directory.
    pub path_env: Option<String>,
    /// Extra variables forwarded to the migration command.
    pub passthrough_env: BTreeMap<String, String>,
}

impl ScaffoldConfig {
    pub fn new(root: impl Into<PathBuf>, parameters: TemplateParameters) -> Self {
        Self {
            root: root.into(),
            python: DEFAULT_PYTHON.to_string(),
            python_range: default_python_range(),
            settings_env: Environment::Local,
            conflict_mode: ConflictMode::Auto,
            default_timeout: DEFAULT_TIMEOUT,
            install_timeout: INSTALL_TIMEOUT,
            skip_install: false,
            skip_migrate: false,
            dry_run: false,
            parameters,
            path_env: None,
            passthrough_env: BTreeMap::new(),
        }
    }

    pub fn with_python(mut self, python: impl Into<String>, range: VersionRange) -> Self {
        self.python = python.into();
        self.python_range = range;
        self
    }

    /// Settings variant used for migrations and the dependency manifest.
    pub fn with_settings_env(mut self, env: Environment) -> Self {
        self.settings_env = env;
        self
    }

    pub fn with_conflict_mode(mut self, mode: ConflictMode) -> Self {
        self.conflict_mode = mode;
        self
    }

    pub fn with_timeouts(mut self, default: Duration, install: Duration) -> Self {
        self.default_timeout = default;
        self.install_timeout = install;
        self
    }

    pub fn skip_install(mut self, skip: bool) -> Self {
        self.skip_install = skip;
        self
    }

    pub fn skip_migrate(mut self, skip: bool) -> Self {
        self.skip_migrate = skip;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_path_env(mut self, path: Option<String>) -> Self {
        self.path_env = path;
        self
    }

    pub fn with_passthrough_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.passthrough_env = env;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Virtual environment directory, relative to the root unless absolute.
    pub fn venv_dir(&self) -> PathBuf {
        let dir = self
            .parameters
            .get(parameters::VENV_DIR)
            .unwrap_or(DEFAULT_VENV_DIR);
        self.root.join(dir)
    }

    /// Requirement spec for the framework bootstrap.
    pub fn django_requirement(&self) -> &str {
        self.parameters
            .get(parameters::DJANGO_REQUIREMENT)
            .unwrap_or("Django")
    }

    /// Manifest installed by the full dependency step.
    pub fn manifest(&self) -> String {
        let env = if self.settings_env.has_manifest() {
            self.settings_env
        } else {
            Environment::Local
        };
        format!("requirements/{}.txt", env)
    }
}

fn default_python_range() -> VersionRange {
    DEFAULT_PYTHON_RANGE
        .parse()
        .unwrap_or_else(|_| VersionRange::any())
}

/// Path of `tool` inside a virtual environment.
pub fn venv_bin(venv: &Path, tool: &str) -> PathBuf {
    if cfg!(windows) {
        venv.join("Scripts").join(format!("{}.exe", tool))
    } else {
        venv.join("bin").join(tool)
    }
}

/// Directory holding the environment's executables.
pub fn venv_bin_dir(venv: &Path) -> PathBuf {
    venv.join(if cfg!(windows) { "Scripts" } else { "bin" })
}
