//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the application needs from external systems.
//! The `trellis-adapters` crate provides implementations; the CLI adds a
//! terminal prompter and a progress observer.

use std::path::{Path, PathBuf};

use crate::application::ApplicationError;
use crate::domain::{CommandOutput, ExecutionStep, Permissions};
use crate::error::{TrellisError, TrellisResult};

/// What is found at a path, without following a final symlink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

impl EntryKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
        }
    }
}

/// Port for filesystem operations.
///
/// Implemented by:
/// - `trellis_adapters::filesystem::LocalFilesystem` (production)
/// - `trellis_adapters::filesystem::MemoryFilesystem` (testing)
///
/// Paths are absolute; the materializer joins them onto the project root.
#[cfg_attr(test, mockall::automock)]
pub trait Filesystem: Send + Sync {
    /// Create a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> TrellisResult<()>;

    /// Replace `path` with `content` in one step.
    ///
    /// Readers observe either the previous file or the complete new one,
    /// never a partial write.
    fn write_file_atomic(&self, path: &Path, content: &str) -> TrellisResult<()>;

    fn read_to_string(&self, path: &Path) -> TrellisResult<String>;

    /// Apply a capability set. No-op where the platform has no equivalent.
    fn set_permissions(&self, path: &Path, permissions: Permissions, is_dir: bool)
    -> TrellisResult<()>;

    /// Kind of entry at `path`, or `None` if nothing is there.
    fn kind(&self, path: &Path) -> Option<EntryKind>;

    /// Target text of a symlink.
    fn read_link(&self, path: &Path) -> TrellisResult<PathBuf>;

    /// Create a symlink at `link` whose text is `target`. Platforms without
    /// symlinks copy the target file instead.
    fn symlink(&self, target: &Path, link: &Path) -> TrellisResult<()>;

    fn remove_file(&self, path: &Path) -> TrellisResult<()>;

    fn remove_dir_all(&self, path: &Path) -> TrellisResult<()>;

    fn exists(&self, path: &Path) -> bool {
        self.kind(path).is_some()
    }
}

/// Port for running external commands.
///
/// Implemented by:
/// - `trellis_adapters::process::ProcessRunner` (production)
/// - `trellis_adapters::process::ScriptedRunner` (testing)
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner: Send + Sync {
    /// Run the step to completion and capture its output.
    ///
    /// A non-zero exit is reported in `CommandOutput::exit_code`, not as an
    /// error. Errors are reserved for spawn failures and timeouts.
    fn run(&self, step: &ExecutionStep) -> TrellisResult<CommandOutput>;
}

/// Run `step` and turn an unsuccessful exit into `ExternalCommandFailed`.
pub fn run_checked(runner: &dyn CommandRunner, step: &ExecutionStep) -> TrellisResult<CommandOutput> {
    let output = runner.run(step)?;
    if output.succeeded() {
        Ok(output)
    } else {
        Err(TrellisError::from(ApplicationError::ExternalCommandFailed {
            step: step.name().to_string(),
            exit_code: output.exit_code,
            stderr_tail: output.stderr_tail(20),
        }))
    }
}

/// Port for locating tools and asking them for their version.
#[cfg_attr(test, mockall::automock)]
pub trait ToolProbe: Send + Sync {
    /// Resolve a program name against PATH (or accept an explicit path).
    fn locate(&self, program: &str) -> Option<PathBuf>;

    /// Combined stdout and stderr of `<program> <args>`.
    fn version_output(&self, program: &Path, args: &[String]) -> TrellisResult<String>;
}

/// Port for yes/no confirmations.
#[cfg_attr(test, mockall::automock)]
pub trait Prompter: Send + Sync {
    /// Ask `question`. Non-interactive implementations return `default`.
    fn confirm(&self, question: &str, default: bool) -> TrellisResult<bool>;

    /// Whether a human is answering.
    fn is_interactive(&self) -> bool;
}

/// Receives progress notifications. Every method defaults to a no-op.
pub trait RunObserver {
    fn step_started(&self, _index: usize, _total: usize, _name: &str) {}

    fn step_completed(&self, _name: &str, _detail: &str) {}

    fn step_skipped(&self, _name: &str, _reason: &str) {}

    fn step_failed(&self, _name: &str, _error: &TrellisError) {}

    /// A path was left alone because it already existed with other content.
    fn path_skipped(&self, _path: &Path) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_checked_maps_non_zero_exit() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_| Ok(CommandOutput::failure(3, "line1\nline2\n")));

        let step = ExecutionStep::new("run-migrations", "python", "/tmp");
        let err = run_checked(&runner, &step).unwrap_err();

        match err {
            TrellisError::Application(ApplicationError::ExternalCommandFailed {
                step,
                exit_code,
                stderr_tail,
            }) => {
                assert_eq!(step, "run-migrations");
                assert_eq!(exit_code, Some(3));
                assert_eq!(stderr_tail, "line1\nline2");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn run_checked_passes_success_through() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_| Ok(CommandOutput::success().with_stdout("ok")));

        let step = ExecutionStep::new("x", "true", "/tmp");
        assert_eq!(run_checked(&runner, &step).unwrap().stdout, "ok");
    }
}
