//! Orchestrator: runs the steps in order and reports a summary.
//!
//! ```text
//! Init → CheckingPrereqs → {Aborted | BuildingEnv} → CreatingStructure
//!      → WritingConfig → InstallingDependencies → RunningMigration
//!      → {Completed | Failed(phase)}
//! ```
//!
//! The whole blueprint is rendered before the first step runs, so a missing
//! parameter aborts without touching the disk. There is no rollback: a rerun
//! picks up where a failed run stopped.

use std::collections::BTreeSet;
use std::fmt;

use tracing::{error, info, info_span, instrument, warn};

use crate::{
    application::{
        config::ScaffoldConfig,
        ports::{CommandRunner, Filesystem, NoopObserver, Prompter, RunObserver, ToolProbe},
        services::{
            materializer::MaterializeResult,
            steps::{RunContext, Step, StepOutcome, default_steps},
        },
    },
    domain::{FsEntry, RenderedBlueprint},
    error::TrellisError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    CheckingPrereqs,
    BuildingEnv,
    CreatingStructure,
    WritingConfig,
    InstallingDependencies,
    RunningMigration,
}

impl Phase {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CheckingPrereqs => "CheckingPrereqs",
            Self::BuildingEnv => "BuildingEnv",
            Self::CreatingStructure => "CreatingStructure",
            Self::WritingConfig => "WritingConfig",
            Self::InstallingDependencies => "InstallingDependencies",
            Self::RunningMigration => "RunningMigration",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Running(Phase),
    Completed,
    /// Stopped before anything was built.
    Aborted,
    Failed(Phase),
}

impl RunState {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => f.write_str("Init"),
            Self::Running(phase) => write!(f, "Running({})", phase),
            Self::Completed => f.write_str("Completed"),
            Self::Aborted => f.write_str("Aborted"),
            Self::Failed(phase) => write!(f, "Failed({})", phase),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Done(String),
    Skipped(String),
    Failed,
    /// Dry run: the commands the step would run.
    Planned(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub name: &'static str,
    pub phase: Phase,
    pub status: StepStatus,
}

/// Result of one run, successful or not.
#[derive(Debug, Clone)]
pub struct Summary {
    pub state: RunState,
    pub steps: Vec<StepReport>,
    pub failure: Option<TrellisError>,
    pub materialized: MaterializeResult,
    /// Recommended manual actions, filled on success.
    pub next_actions: Vec<String>,
    pub package: Option<String>,
    pub dry_run: bool,
    /// Dry run: every path the blueprint would materialize.
    pub planned_paths: Vec<String>,
}

impl Summary {
    fn new(dry_run: bool) -> Self {
        Self {
            state: RunState::Init,
            steps: Vec::new(),
            failure: None,
            materialized: MaterializeResult::default(),
            next_actions: Vec::new(),
            package: None,
            dry_run,
            planned_paths: Vec::new(),
        }
    }

    fn aborted(mut self, error: TrellisError) -> Self {
        self.state = RunState::Aborted;
        self.failure = Some(error);
        self
    }

    /// Name of the step that failed, if any.
    pub fn failed_step(&self) -> Option<&'static str> {
        self.steps
            .iter()
            .find(|s| s.status == StepStatus::Failed)
            .map(|s| s.name)
    }
}

pub struct Orchestrator<'a> {
    fs: &'a dyn Filesystem,
    runner: &'a dyn CommandRunner,
    probe: &'a dyn ToolProbe,
    prompter: &'a dyn Prompter,
    observer: &'a dyn RunObserver,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        fs: &'a dyn Filesystem,
        runner: &'a dyn CommandRunner,
        probe: &'a dyn ToolProbe,
        prompter: &'a dyn Prompter,
    ) -> Self {
        Self {
            fs,
            runner,
            probe,
            prompter,
            observer: &NoopObserver,
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn RunObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Execute a full run. Dry-run configs are routed to [`Self::preview`].
    #[instrument(skip_all, fields(root = %config.root().display(), dry_run = config.dry_run))]
    pub fn run(&self, config: &ScaffoldConfig) -> Summary {
        if config.dry_run {
            return self.preview(config);
        }

        let summary = Summary::new(false);
        let blueprint = match RenderedBlueprint::render(config.root(), &config.parameters) {
            Ok(blueprint) => blueprint,
            Err(e) => {
                error!(error = %e, "blueprint rejected, nothing was changed");
                return summary.aborted(e.into());
            }
        };
        self.execute(config, &blueprint, summary)
    }

    fn execute(
        &self,
        config: &ScaffoldConfig,
        blueprint: &RenderedBlueprint,
        mut summary: Summary,
    ) -> Summary {
        summary.package = Some(blueprint.package.clone());
        let mut ctx = self.context(config, blueprint);
        let steps = default_steps();
        let total = steps.len();

        for (index, step) in steps.iter().enumerate() {
            let phase = step.phase();
            summary.state = RunState::Running(phase);
            self.observer.step_started(index + 1, total, step.name());
            let _span = info_span!("step", name = step.name(), %phase).entered();

            match step.execute(&mut ctx) {
                Ok(StepOutcome::Done { detail }) => {
                    info!(%detail, "step done");
                    self.observer.step_completed(step.name(), &detail);
                    summary.steps.push(report(step.as_ref(), StepStatus::Done(detail)));
                }
                Ok(StepOutcome::Skipped { reason }) => {
                    info!(%reason, "step skipped");
                    self.observer.step_skipped(step.name(), &reason);
                    summary.steps.push(report(step.as_ref(), StepStatus::Skipped(reason)));
                }
                Err(e) => {
                    error!(error = %e, "step failed");
                    self.observer.step_failed(step.name(), &e);
                    summary.steps.push(report(step.as_ref(), StepStatus::Failed));
                    summary.state = if phase == Phase::CheckingPrereqs {
                        RunState::Aborted
                    } else {
                        RunState::Failed(phase)
                    };
                    summary.failure = Some(e);
                    summary.materialized = ctx.materialized;
                    return summary;
                }
            }
        }

        summary.state = RunState::Completed;
        summary.materialized = ctx.materialized;
        summary.next_actions = next_actions(config);
        info!(
            overwritten = summary.materialized.overwritten,
            skipped = summary.materialized.skipped,
            "run completed"
        );
        summary
    }

    /// Render, validate and check prerequisites, then list what a run would
    /// do. Nothing is written and no command other than the version probe
    /// is started.
    #[instrument(skip_all, fields(root = %config.root().display()))]
    pub fn preview(&self, config: &ScaffoldConfig) -> Summary {
        let mut summary = Summary::new(true);
        let blueprint = match RenderedBlueprint::render(config.root(), &config.parameters) {
            Ok(blueprint) => blueprint,
            Err(e) => return summary.aborted(e.into()),
        };
        summary.package = Some(blueprint.package.clone());
        summary.planned_paths = blueprint
            .entries()
            .map(|entry| match entry {
                FsEntry::Directory(_) => format!("{}/", entry.path()),
                _ => entry.path().to_string(),
            })
            .collect();

        let mut ctx = self.context(config, &blueprint);
        for step in default_steps() {
            if step.phase() == Phase::CheckingPrereqs {
                summary.state = RunState::Running(step.phase());
                match step.execute(&mut ctx) {
                    Ok(StepOutcome::Done { detail }) => {
                        summary.steps.push(report(step.as_ref(), StepStatus::Done(detail)));
                    }
                    Ok(StepOutcome::Skipped { reason }) => {
                        summary.steps.push(report(step.as_ref(), StepStatus::Skipped(reason)));
                    }
                    Err(e) => {
                        warn!(error = %e, "prerequisites not met");
                        summary.steps.push(report(step.as_ref(), StepStatus::Failed));
                        return summary.aborted(e);
                    }
                }
                continue;
            }
            let commands = step
                .planned_commands(&ctx)
                .iter()
                .map(|c| c.display_command())
                .collect();
            summary.steps.push(report(step.as_ref(), StepStatus::Planned(commands)));
        }

        summary.state = RunState::Completed;
        summary
    }

    fn context<'b>(
        &self,
        config: &'b ScaffoldConfig,
        blueprint: &'b RenderedBlueprint,
    ) -> RunContext<'b>
    where
        'a: 'b,
    {
        RunContext {
            config,
            blueprint,
            fs: self.fs,
            runner: self.runner,
            probe: self.probe,
            prompter: self.prompter,
            observer: self.observer,
            python: None,
            fresh: BTreeSet::new(),
            materialized: MaterializeResult::default(),
        }
    }
}

fn report(step: &dyn Step, status: StepStatus) -> StepReport {
    StepReport {
        name: step.name(),
        phase: step.phase(),
        status,
    }
}

/// Manual follow-ups printed after a successful run.
pub fn next_actions(config: &ScaffoldConfig) -> Vec<String> {
    let venv = config
        .venv_dir()
        .strip_prefix(config.root())
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| config.venv_dir().display().to_string());
    let activate = if cfg!(windows) {
        format!("{}\\Scripts\\activate", venv)
    } else {
        format!("source {}/bin/activate", venv)
    };
    vec![
        format!("cd {}", config.root().display()),
        activate,
        "Review .env and replace the development defaults".to_string(),
        "python manage.py createsuperuser".to_string(),
        "python manage.py runserver".to_string(),
        "Start an app: python manage.py startapp <name> apps/<name>".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ApplicationError;
    use crate::application::ports::{
        EntryKind, MockCommandRunner, MockFilesystem, MockPrompter, MockToolProbe,
    };
    use crate::domain::{DomainError, ProjectParameters, TemplateParameters, parameters};
    use std::path::PathBuf;

    fn config() -> ScaffoldConfig {
        ScaffoldConfig::new(
            "/work/demo",
            ProjectParameters::new("demo", "s3cret").into_parameters(),
        )
    }

    fn python_probe() -> MockToolProbe {
        let mut probe = MockToolProbe::new();
        probe
            .expect_locate()
            .returning(|_| Some(PathBuf::from("/usr/bin/python3")));
        probe
            .expect_version_output()
            .returning(|_, _| Ok("Python 3.13.2".into()));
        probe
    }

    #[test]
    fn missing_parameter_aborts_before_any_io() {
        let params = TemplateParameters::builder()
            .set(parameters::PROJECT_NAME, "demo")
            .build();
        let config = ScaffoldConfig::new("/work/demo", params);

        let mut fs = MockFilesystem::new();
        fs.expect_create_dir_all().never();
        fs.expect_write_file_atomic().never();
        let mut runner = MockCommandRunner::new();
        runner.expect_run().never();
        let mut probe = MockToolProbe::new();
        probe.expect_locate().never();
        let prompter = MockPrompter::new();

        let summary = Orchestrator::new(&fs, &runner, &probe, &prompter).run(&config);
        assert_eq!(summary.state, RunState::Aborted);
        assert!(summary.steps.is_empty());
        assert!(matches!(
            summary.failure,
            Some(TrellisError::Domain(DomainError::MissingTemplateParameter { .. }))
        ));
    }

    #[test]
    fn missing_interpreter_aborts() {
        let config = config();
        let mut fs = MockFilesystem::new();
        fs.expect_create_dir_all().never();
        let mut runner = MockCommandRunner::new();
        runner.expect_run().never();
        let mut probe = MockToolProbe::new();
        probe.expect_locate().returning(|_| None);
        let prompter = MockPrompter::new();

        let summary = Orchestrator::new(&fs, &runner, &probe, &prompter).run(&config);
        assert_eq!(summary.state, RunState::Aborted);
        assert_eq!(summary.failed_step(), Some("check-prerequisites"));
        assert!(matches!(
            summary.failure,
            Some(TrellisError::Application(ApplicationError::PrerequisiteMissing { .. }))
        ));
    }

    #[test]
    fn failure_after_prerequisites_is_reported_with_its_phase() {
        let config = config();
        let mut fs = MockFilesystem::new();
        fs.expect_kind().returning(|_| None);
        fs.expect_create_dir_all().returning(|_| Ok(()));
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .times(1)
            .returning(|_| Ok(crate::domain::CommandOutput::failure(1, "No module named venv")));
        let probe = python_probe();
        let prompter = MockPrompter::new();

        let summary = Orchestrator::new(&fs, &runner, &probe, &prompter).run(&config);
        assert_eq!(summary.state, RunState::Failed(Phase::BuildingEnv));
        assert_eq!(summary.failed_step(), Some("create-virtualenv"));
        assert_eq!(summary.steps.len(), 2);
        assert!(summary.next_actions.is_empty());
    }

    #[test]
    fn preview_plans_without_mutating() {
        let config = config().dry_run(true);
        let mut fs = MockFilesystem::new();
        fs.expect_create_dir_all().never();
        fs.expect_write_file_atomic().never();
        fs.expect_kind().returning(|_| Some(EntryKind::Directory));
        fs.expect_read_to_string().returning(|_| Ok(String::new()));
        let mut runner = MockCommandRunner::new();
        runner.expect_run().never();
        let probe = python_probe();
        let prompter = MockPrompter::new();

        let summary = Orchestrator::new(&fs, &runner, &probe, &prompter).run(&config);
        assert_eq!(summary.state, RunState::Completed);
        assert!(summary.dry_run);
        assert!(summary.planned_paths.contains(&"demo/settings/base.py".to_string()));
        assert!(summary.planned_paths.contains(&"media/".to_string()));

        let migrate = summary.steps.last().unwrap();
        assert_eq!(migrate.name, "run-migrations");
        match &migrate.status {
            StepStatus::Planned(commands) => {
                assert_eq!(commands.len(), 1);
                assert!(commands[0].ends_with("manage.py migrate --noinput"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn state_display() {
        assert_eq!(RunState::Failed(Phase::RunningMigration).to_string(), "Failed(RunningMigration)");
        assert_eq!(RunState::Running(Phase::BuildingEnv).to_string(), "Running(BuildingEnv)");
        assert!(Phase::CheckingPrereqs < Phase::RunningMigration);
    }

    #[test]
    fn next_actions_use_a_root_relative_venv() {
        let actions = next_actions(&config());
        assert_eq!(actions[0], "cd /work/demo");
        if cfg!(unix) {
            assert_eq!(actions[1], "source .venv/bin/activate");
        }
    }
}
