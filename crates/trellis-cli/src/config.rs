//! Application configuration.
//!
//! [`AppConfig`] is loaded once at startup and passed down by reference. The
//! CLI layer owns config; the core crate only sees the `ScaffoldConfig` built
//! from it.
//!
//! # Resolution order (highest priority first)
//!
//! 1. CLI flags (handled at the call-site, not here)
//! 2. `TRELLIS_<SECTION>__<KEY>` environment variables
//! 3. Config file: `--config FILE`, otherwise the platform config file and
//!    then `trellis.toml` in the current directory
//! 4. Built-in defaults (always present)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use config::{Config, Environment as EnvSource, File, FileFormat};
use serde::{Deserialize, Serialize};
use trellis_core::{
    application::config::{DEFAULT_PYTHON, DEFAULT_PYTHON_RANGE},
    domain::{
        ConflictMode, DEFAULT_SECRET_LENGTH, DatabaseEngine, Environment, ProjectParameters,
        VersionRange,
    },
};

use crate::error::{CliError, CliResult};

/// File name used by `trellis init --local`.
pub const LOCAL_CONFIG_FILE: &str = "trellis.toml";

const ENV_PREFIX: &str = "TRELLIS";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub project: ProjectConfig,
    pub database: DatabaseConfig,
    pub email: EmailConfig,
    pub cache: CacheConfig,
    pub commands: CommandsConfig,
    pub materialize: MaterializeConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Interpreter name or path used to create the virtual environment.
    pub python: String,
    /// Accepted interpreter versions, e.g. `3.12..=3.14`.
    pub python_versions: String,
    /// Settings variant for migrations and the installed manifest.
    pub settings: String,
    pub venv_dir: String,
    pub secret_length: usize,
    pub debug: bool,
    pub allowed_hosts: Vec<String>,
    pub time_zone: String,
    pub log_level: String,
    pub django_requirement: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub engine: DatabaseEngine,
    /// Defaults to the project name (PostgreSQL) or `db.sqlite3`.
    pub name: Option<String>,
    pub user: String,
    pub password: String,
    pub host: String,
    /// Defaults to the engine's usual port.
    pub port: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub use_tls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub redis_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub timeout_secs: u64,
    /// Applies to every pip invocation.
    pub install_timeout_secs: u64,
    /// Variables copied from the caller into the migration environment.
    pub passthrough_env: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterializeConfig {
    pub on_conflict: ConflictMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub no_color: bool,
    /// Show a spinner while steps run.
    pub progress: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        let defaults = ProjectParameters::new("", "");
        Self {
            python: DEFAULT_PYTHON.into(),
            python_versions: DEFAULT_PYTHON_RANGE.into(),
            settings: Environment::Local.to_string(),
            venv_dir: defaults.venv_dir,
            secret_length: DEFAULT_SECRET_LENGTH,
            debug: defaults.debug,
            allowed_hosts: defaults.allowed_hosts,
            time_zone: defaults.time_zone,
            log_level: defaults.log_level,
            django_requirement: defaults.django_requirement,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let defaults = ProjectParameters::new("", "");
        Self {
            engine: defaults.db_engine,
            name: None,
            user: defaults.db_user,
            password: defaults.db_password,
            host: defaults.db_host,
            port: None,
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        let defaults = ProjectParameters::new("", "");
        Self {
            host: defaults.email_host,
            port: defaults.email_port,
            user: defaults.email_host_user,
            password: defaults.email_host_password,
            use_tls: defaults.email_use_tls,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: ProjectParameters::new("", "").redis_url,
        }
    }
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: trellis_core::domain::DEFAULT_TIMEOUT.as_secs(),
            install_timeout_secs: trellis_core::domain::INSTALL_TIMEOUT.as_secs(),
            passthrough_env: ["HOME", "USER", "LANG", "LC_ALL", "TMPDIR", "TEMP", "TMP", "SYSTEMROOT"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            no_color: false,
            progress: true,
        }
    }
}

impl AppConfig {
    /// Load configuration.
    ///
    /// `config_file` is the path the user passed via `--config`; when given it
    /// must exist and replaces the default file locations.
    pub fn load(config_file: Option<&PathBuf>) -> anyhow::Result<Self> {
        let files = match config_file {
            Some(path) => vec![(path.clone(), true)],
            None => vec![
                (Self::config_path(), false),
                (PathBuf::from(LOCAL_CONFIG_FILE), false),
            ],
        };
        Self::load_from(&files, environment_source())
    }

    /// Layer defaults, `(path, required)` files and `env` in that order.
    fn load_from(files: &[(PathBuf, bool)], env: EnvSource) -> anyhow::Result<Self> {
        let mut builder = Config::builder().add_source(
            Config::try_from(&Self::default()).context("Failed to serialise built-in defaults")?,
        );
        for (path, required) in files {
            builder = builder.add_source(
                File::from(path.as_path())
                    .format(FileFormat::Toml)
                    .required(*required),
            );
        }

        let config: Self = builder
            .add_source(env)
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values that only fail once they are used.
    fn validate(&self) -> CliResult<()> {
        self.python_range()?;
        self.settings_env()?;
        if self.project.secret_length == 0 {
            return Err(config_error("project.secret_length must be at least 1"));
        }
        Ok(())
    }

    pub fn python_range(&self) -> CliResult<VersionRange> {
        self.project.python_versions.parse().map_err(|e| CliError::ConfigError {
            message: format!("project.python_versions: {e}"),
            source: Some(Box::new(e)),
        })
    }

    pub fn settings_env(&self) -> CliResult<Environment> {
        self.project.settings.parse().map_err(|e| CliError::ConfigError {
            message: format!("project.settings: {e}"),
            source: Some(Box::new(e)),
        })
    }

    pub fn timeouts(&self) -> (Duration, Duration) {
        (
            Duration::from_secs(self.commands.timeout_secs),
            Duration::from_secs(self.commands.install_timeout_secs),
        )
    }

    /// Typed template inputs for `project_name`, before CLI overrides.
    pub fn project_parameters(&self, project_name: &str, secret_key: String) -> ProjectParameters {
        let mut params = ProjectParameters::new(project_name, secret_key);
        params.debug = self.project.debug;
        params.allowed_hosts = self.project.allowed_hosts.clone();
        params.time_zone = self.project.time_zone.clone();
        params.log_level = self.project.log_level.clone();
        params.venv_dir = self.project.venv_dir.clone();
        params.django_requirement = self.project.django_requirement.clone();

        params.db_engine = self.database.engine;
        params.db_name = self.database.name.clone();
        params.db_user = self.database.user.clone();
        params.db_password = self.database.password.clone();
        params.db_host = self.database.host.clone();
        params.db_port = self.database.port.clone();

        params.email_host = self.email.host.clone();
        params.email_port = self.email.port;
        params.email_host_user = self.email.user.clone();
        params.email_host_password = self.email.password.clone();
        params.email_use_tls = self.email.use_tls;

        params.redis_url = self.cache.redis_url.clone();
        params
    }

    /// The configured pass-through variables that are set in this process.
    pub fn passthrough_env(&self) -> BTreeMap<String, String> {
        self.commands
            .passthrough_env
            .iter()
            .filter_map(|key| std::env::var(key).ok().map(|value| (key.clone(), value)))
            .collect()
    }

    /// Path to the default configuration file.
    ///
    /// Uses `directories::ProjectDirs` for cross-platform correctness,
    /// falling back to `trellis.toml` in the current directory.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("io", "trellis", "trellis")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE))
    }

    /// Where `trellis init` writes.
    pub fn init_path(local: bool) -> PathBuf {
        if local {
            Path::new(LOCAL_CONFIG_FILE).to_path_buf()
        } else {
            Self::config_path()
        }
    }
}

/// `TRELLIS_PROJECT__PYTHON=python3.13` sets `project.python`.
fn environment_source() -> EnvSource {
    EnvSource::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("project.allowed_hosts")
        .with_list_parse_key("commands.passthrough_env")
}

fn config_error(message: &str) -> CliError {
    CliError::ConfigError {
        message: message.to_string(),
        source: None,
    }
}
