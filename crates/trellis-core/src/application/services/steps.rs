//! The ordered steps of a scaffold run.
//!
//! Each step is a small object the orchestrator iterates over. Steps never
//! change the process working directory; every path they touch comes from
//! [`RunContext`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use tracing::{debug, info, instrument, warn};

use crate::{
    application::{
        ApplicationError,
        config::{ScaffoldConfig, venv_bin, venv_bin_dir},
        ports::{CommandRunner, EntryKind, Filesystem, Prompter, RunObserver, ToolProbe, run_checked},
        services::{
            materializer::{MaterializeResult, Materializer},
            orchestrator::Phase,
            prerequisites::PrerequisiteChecker,
        },
    },
    domain::{
        ExecutionStep, PrerequisiteStatus, RelativePath, RenderedBlueprint, ToolRequirement,
        blueprint::{ENV_FILE, MANAGE_PY, parse_env_file},
    },
    error::TrellisResult,
};

/// What a step did when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Done { detail: String },
    Skipped { reason: String },
}

impl StepOutcome {
    fn done(detail: impl Into<String>) -> Self {
        Self::Done {
            detail: detail.into(),
        }
    }

    fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }
}

pub type StepResult = TrellisResult<StepOutcome>;

/// Mutable state threaded through the steps of one run.
pub struct RunContext<'a> {
    pub config: &'a ScaffoldConfig,
    pub blueprint: &'a RenderedBlueprint,
    pub fs: &'a dyn Filesystem,
    pub runner: &'a dyn CommandRunner,
    pub probe: &'a dyn ToolProbe,
    pub prompter: &'a dyn Prompter,
    pub observer: &'a dyn RunObserver,
    /// Interpreter resolved by the prerequisite check.
    pub python: Option<PathBuf>,
    /// Paths the project generator created during this run.
    pub fresh: BTreeSet<RelativePath>,
    pub materialized: MaterializeResult,
}

impl<'a> RunContext<'a> {
    fn interpreter(&self) -> PathBuf {
        self.python
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.config.python))
    }

    fn venv_python(&self) -> PathBuf {
        venv_bin(&self.config.venv_dir(), "python")
    }

    fn materializer(&self) -> Materializer<'a> {
        Materializer::new(self.fs, self.prompter, self.config.conflict_mode)
            .with_observer(self.observer)
    }
}

pub trait Step {
    fn name(&self) -> &'static str;

    fn phase(&self) -> Phase;

    fn execute(&self, ctx: &mut RunContext<'_>) -> StepResult;

    /// Commands this step would run, for dry runs.
    fn planned_commands(&self, _ctx: &RunContext<'_>) -> Vec<ExecutionStep> {
        Vec::new()
    }
}

/// The fixed run order.
pub fn default_steps() -> Vec<Box<dyn Step>> {
    vec![
        Box::new(CheckPrerequisites),
        Box::new(CreateVirtualenv),
        Box::new(BootstrapDependencies),
        Box::new(GenerateProject),
        Box::new(WriteStructure),
        Box::new(WriteEnvironment),
        Box::new(InstallDependencies),
        Box::new(RunMigrations),
    ]
}

// ── check-prerequisites ──────────────────────────────────────────────────────

pub struct CheckPrerequisites;

impl Step for CheckPrerequisites {
    fn name(&self) -> &'static str {
        "check-prerequisites"
    }

    fn phase(&self) -> Phase {
        Phase::CheckingPrereqs
    }

    #[instrument(skip_all, name = "check-prerequisites")]
    fn execute(&self, ctx: &mut RunContext<'_>) -> StepResult {
        let requirement =
            ToolRequirement::python(ctx.config.python.clone(), ctx.config.python_range.clone());
        let status = PrerequisiteChecker::new(ctx.probe).enforce(&requirement, ctx.prompter)?;

        let (path, version) = match status {
            PrerequisiteStatus::Satisfied { path, version } => (path, version),
            PrerequisiteStatus::VersionMismatch { path, found, .. } => (path, found),
            PrerequisiteStatus::Missing => return Ok(StepOutcome::skipped("no interpreter")),
        };
        let version = version.map_or_else(|| "unknown version".to_string(), |v| v.to_string());
        let detail = format!("{} {} at {}", requirement.name, version, path.display());
        ctx.python = Some(path);
        Ok(StepOutcome::done(detail))
    }
}

// ── create-virtualenv ────────────────────────────────────────────────────────

pub struct CreateVirtualenv;

impl CreateVirtualenv {
    fn command(ctx: &RunContext<'_>) -> ExecutionStep {
        ExecutionStep::new("create-virtualenv", ctx.interpreter(), ctx.config.root())
            .args(["-m", "venv"])
            .arg(ctx.config.venv_dir().display().to_string())
            .with_timeout(ctx.config.default_timeout)
    }
}

impl Step for CreateVirtualenv {
    fn name(&self) -> &'static str {
        "create-virtualenv"
    }

    fn phase(&self) -> Phase {
        Phase::BuildingEnv
    }

    #[instrument(skip_all, name = "create-virtualenv")]
    fn execute(&self, ctx: &mut RunContext<'_>) -> StepResult {
        let root = ctx.config.root();
        if !ctx.fs.exists(root) {
            ctx.fs.create_dir_all(root)?;
        }

        let venv = ctx.config.venv_dir();
        match ctx.fs.kind(&venv) {
            None => {}
            Some(EntryKind::File) => {
                return Err(ApplicationError::PathConflict {
                    path: venv,
                    expected: "directory".into(),
                    found: EntryKind::File.as_str().into(),
                }
                .into());
            }
            Some(EntryKind::Directory) | Some(EntryKind::Symlink) => {
                let question = format!(
                    "Virtual environment {} already exists. Recreate it?",
                    venv.display()
                );
                if !ctx.prompter.confirm(&question, false)? {
                    return Ok(StepOutcome::skipped("reusing existing virtual environment"));
                }
                info!(path = %venv.display(), "removing virtual environment");
                ctx.fs.remove_dir_all(&venv)?;
            }
        }

        run_checked(ctx.runner, &Self::command(ctx))?;
        Ok(StepOutcome::done(format!("created {}", venv.display())))
    }

    fn planned_commands(&self, ctx: &RunContext<'_>) -> Vec<ExecutionStep> {
        vec![Self::command(ctx)]
    }
}

// ── bootstrap-dependencies ───────────────────────────────────────────────────

pub struct BootstrapDependencies;

const DOTENV_REQUIREMENT: &str = "python-dotenv";

impl BootstrapDependencies {
    fn commands(ctx: &RunContext<'_>) -> Vec<ExecutionStep> {
        let pip = |args: &[&str]| {
            ExecutionStep::new("bootstrap-dependencies", ctx.venv_python(), ctx.config.root())
                .args(["-m", "pip", "install"])
                .args(args.iter().copied())
                .with_timeout(ctx.config.install_timeout)
        };
        vec![
            pip(&["--upgrade", "pip"]),
            // manage.py loads .env through python-dotenv, so migrations
            // need it even when the requirements install is skipped.
            pip(&[ctx.config.django_requirement(), DOTENV_REQUIREMENT]),
        ]
    }
}

impl Step for BootstrapDependencies {
    fn name(&self) -> &'static str {
        "bootstrap-dependencies"
    }

    fn phase(&self) -> Phase {
        Phase::BuildingEnv
    }

    #[instrument(skip_all, name = "bootstrap-dependencies")]
    fn execute(&self, ctx: &mut RunContext<'_>) -> StepResult {
        for command in Self::commands(ctx) {
            debug!(command = %command.display_command(), "running");
            run_checked(ctx.runner, &command)?;
        }
        Ok(StepOutcome::done(format!(
            "installed pip, {} and {}",
            ctx.config.django_requirement(),
            DOTENV_REQUIREMENT
        )))
    }

    fn planned_commands(&self, ctx: &RunContext<'_>) -> Vec<ExecutionStep> {
        Self::commands(ctx)
    }
}

// ── generate-project ─────────────────────────────────────────────────────────

pub struct GenerateProject;

impl GenerateProject {
    fn command(ctx: &RunContext<'_>) -> ExecutionStep {
        ExecutionStep::new(
            "generate-project",
            venv_bin(&ctx.config.venv_dir(), "django-admin"),
            ctx.config.root(),
        )
        .args(["startproject", ctx.blueprint.package.as_str()])
        .arg(ctx.config.root().display().to_string())
        .with_timeout(ctx.config.default_timeout)
    }

    /// Files `startproject` writes. Any of them that did not exist before the
    /// command ran may be replaced by later steps without asking.
    fn stock_files(package: &str) -> Vec<RelativePath> {
        let mut files = vec![RelativePath::from(MANAGE_PY)];
        for name in ["__init__.py", "settings.py", "urls.py", "wsgi.py", "asgi.py"] {
            files.push(RelativePath::from(format!("{}/{}", package, name)));
        }
        files
    }

    /// Whether `content` is what `startproject` writes for `path`.
    ///
    /// Recognised by the markers the generator always emits: the bare
    /// `<package>.settings` default module, the settings and URLconf
    /// docstrings, and an empty package `__init__.py`.
    fn is_stock(path: &RelativePath, content: &str, package: &str) -> bool {
        let name = path.as_path().file_name().and_then(|n| n.to_str());
        match name {
            Some("manage.py" | "wsgi.py" | "asgi.py") => ["'", "\""].iter().any(|q| {
                content.contains(&format!(
                    "DJANGO_SETTINGS_MODULE{q}, {q}{package}.settings{q})"
                ))
            }),
            Some("settings.py") => {
                content.contains(&format!("Django settings for {package} project."))
            }
            Some("urls.py") => {
                content.contains(&format!("URL configuration for {package} project."))
                    || content.contains(&format!("{package} URL Configuration"))
            }
            Some("__init__.py") => content.trim().is_empty(),
            _ => false,
        }
    }

    /// Generator output left behind by a run that stopped before the
    /// structure was written. Only considered while manage.py itself is
    /// still the stock one.
    fn leftover_stock(ctx: &RunContext<'_>) -> Vec<RelativePath> {
        let root = ctx.config.root();
        let package = ctx.blueprint.package.as_str();
        let stock_content = |path: &RelativePath| {
            ctx.fs
                .read_to_string(&root.join(path))
                .map(|content| Self::is_stock(path, &content, package))
                .unwrap_or(false)
        };
        let manage = RelativePath::from(MANAGE_PY);
        if !stock_content(&manage) {
            return Vec::new();
        }
        Self::stock_files(package)
            .into_iter()
            .filter(|path| stock_content(path))
            .collect()
    }
}

impl Step for GenerateProject {
    fn name(&self) -> &'static str {
        "generate-project"
    }

    fn phase(&self) -> Phase {
        Phase::CreatingStructure
    }

    #[instrument(skip_all, name = "generate-project")]
    fn execute(&self, ctx: &mut RunContext<'_>) -> StepResult {
        let root = ctx.config.root();
        if ctx.fs.exists(&root.join(MANAGE_PY)) {
            let leftover = Self::leftover_stock(ctx);
            if leftover.is_empty() {
                return Ok(StepOutcome::skipped("manage.py already exists"));
            }
            info!(files = leftover.len(), "found generator output from an earlier run");
            ctx.fresh.extend(leftover);
            return Ok(StepOutcome::skipped(
                "manage.py already exists; earlier generator output will be replaced",
            ));
        }

        let stock = Self::stock_files(&ctx.blueprint.package);
        let before: Vec<bool> = stock
            .iter()
            .map(|path| ctx.fs.exists(&root.join(path)))
            .collect();

        run_checked(ctx.runner, &Self::command(ctx))?;

        for (path, existed) in stock.into_iter().zip(before) {
            if !existed && ctx.fs.exists(&root.join(&path)) {
                debug!(%path, "generated");
                ctx.fresh.insert(path);
            }
        }
        Ok(StepOutcome::done(format!(
            "generated project package {}",
            ctx.blueprint.package
        )))
    }

    fn planned_commands(&self, ctx: &RunContext<'_>) -> Vec<ExecutionStep> {
        vec![Self::command(ctx)]
    }
}

// ── write-structure ──────────────────────────────────────────────────────────

pub struct WriteStructure;

impl Step for WriteStructure {
    fn name(&self) -> &'static str {
        "write-structure"
    }

    fn phase(&self) -> Phase {
        Phase::CreatingStructure
    }

    #[instrument(skip_all, name = "write-structure")]
    fn execute(&self, ctx: &mut RunContext<'_>) -> StepResult {
        // The generated single-file settings module would shadow the package.
        let stock_settings = RelativePath::from(format!("{}/settings.py", ctx.blueprint.package));
        if ctx.fresh.contains(&stock_settings) {
            ctx.fs
                .remove_file(&ctx.config.root().join(&stock_settings))?;
            debug!(path = %stock_settings, "removed generated settings module");
        }

        let result = ctx
            .materializer()
            .materialize(&ctx.blueprint.structure, &ctx.fresh)?;
        let detail = describe(&result);
        ctx.materialized.merge(result);
        Ok(StepOutcome::done(detail))
    }
}

// ── write-environment ────────────────────────────────────────────────────────

pub struct WriteEnvironment;

impl Step for WriteEnvironment {
    fn name(&self) -> &'static str {
        "write-environment"
    }

    fn phase(&self) -> Phase {
        Phase::WritingConfig
    }

    #[instrument(skip_all, name = "write-environment")]
    fn execute(&self, ctx: &mut RunContext<'_>) -> StepResult {
        let result = ctx
            .materializer()
            .materialize(&ctx.blueprint.environment, &ctx.fresh)?;
        let detail = describe(&result);
        ctx.materialized.merge(result);
        Ok(StepOutcome::done(detail))
    }
}

fn describe(result: &MaterializeResult) -> String {
    format!(
        "{} written, {} overwritten, {} unchanged, {} skipped",
        result.written + result.links,
        result.overwritten,
        result.unchanged,
        result.skipped
    )
}

// ── install-dependencies ─────────────────────────────────────────────────────

pub struct InstallDependencies;

impl InstallDependencies {
    fn command(ctx: &RunContext<'_>) -> ExecutionStep {
        ExecutionStep::new("install-dependencies", ctx.venv_python(), ctx.config.root())
            .args(["-m", "pip", "install", "-r"])
            .arg(ctx.config.manifest())
            .with_timeout(ctx.config.install_timeout)
    }
}

impl Step for InstallDependencies {
    fn name(&self) -> &'static str {
        "install-dependencies"
    }

    fn phase(&self) -> Phase {
        Phase::InstallingDependencies
    }

    #[instrument(skip_all, name = "install-dependencies")]
    fn execute(&self, ctx: &mut RunContext<'_>) -> StepResult {
        if ctx.config.skip_install {
            return Ok(StepOutcome::skipped("--skip-install"));
        }
        run_checked(ctx.runner, &Self::command(ctx))?;
        Ok(StepOutcome::done(format!("installed {}", ctx.config.manifest())))
    }

    fn planned_commands(&self, ctx: &RunContext<'_>) -> Vec<ExecutionStep> {
        if ctx.config.skip_install {
            Vec::new()
        } else {
            vec![Self::command(ctx)]
        }
    }
}

// ── run-migrations ───────────────────────────────────────────────────────────

pub struct RunMigrations;

impl RunMigrations {
    /// The explicit child environment: forwarded variables, then the project
    /// environment file, then the interpreter and settings selection.
    fn environment(ctx: &RunContext<'_>) -> BTreeMap<String, String> {
        let config = ctx.config;
        let mut env = config.passthrough_env.clone();

        let env_file = config.root().join(ENV_FILE);
        let file_vars = match ctx.fs.read_to_string(&env_file) {
            Ok(text) => parse_env_file(&text),
            Err(e) => {
                warn!(error = %e, "environment file unreadable, using rendered values");
                ctx.blueprint.env_vars.clone()
            }
        };
        env.extend(file_vars);

        let venv = config.venv_dir();
        let bin = venv_bin_dir(&venv).display().to_string();
        let path = match &config.path_env {
            Some(ambient) if !ambient.is_empty() => {
                format!("{}{}{}", bin, PATH_SEPARATOR, ambient)
            }
            _ => bin,
        };
        env.insert("PATH".into(), path);
        env.insert("VIRTUAL_ENV".into(), venv.display().to_string());
        env.insert(
            "DJANGO_SETTINGS_MODULE".into(),
            config.settings_env.settings_module(&ctx.blueprint.package),
        );
        env
    }

    fn command(ctx: &RunContext<'_>) -> ExecutionStep {
        ExecutionStep::new("run-migrations", ctx.venv_python(), ctx.config.root())
            .args([MANAGE_PY, "migrate", "--noinput"])
            .with_env(Self::environment(ctx))
            .with_timeout(ctx.config.default_timeout)
    }
}

const PATH_SEPARATOR: &str = if cfg!(windows) { ";" } else { ":" };

impl Step for RunMigrations {
    fn name(&self) -> &'static str {
        "run-migrations"
    }

    fn phase(&self) -> Phase {
        Phase::RunningMigration
    }

    #[instrument(skip_all, name = "run-migrations")]
    fn execute(&self, ctx: &mut RunContext<'_>) -> StepResult {
        if ctx.config.skip_migrate {
            return Ok(StepOutcome::skipped("--skip-migrate"));
        }
        let command = Self::command(ctx);
        let output = run_checked(ctx.runner, &command)?;
        let applied = output
            .stdout
            .lines()
            .filter(|line| line.trim_start().starts_with("Applying"))
            .count();
        Ok(StepOutcome::done(format!("{} migrations applied", applied)))
    }

    fn planned_commands(&self, ctx: &RunContext<'_>) -> Vec<ExecutionStep> {
        if ctx.config.skip_migrate {
            Vec::new()
        } else {
            vec![Self::command(ctx)]
        }
    }
}
