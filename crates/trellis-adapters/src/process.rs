//! External command runners.
//!
//! [`ProcessRunner`] spawns real processes with captured output and a hard
//! timeout. [`ScriptedRunner`] records what would have run and answers from
//! a script, for orchestration tests.

use std::collections::BTreeMap;
use std::io::{ErrorKind, Read};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, instrument, warn};
use trellis_core::{
    application::{ApplicationError, ports::CommandRunner},
    domain::{CommandOutput, ExecutionStep},
    error::TrellisResult,
};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs steps as child processes.
///
/// The child never inherits the caller's working directory; when the step
/// carries an environment, the child sees exactly that mapping.
#[derive(Debug, Clone, Copy)]
pub struct ProcessRunner {
    poll_interval: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
        }
    }

    fn spawn(&self, step: &ExecutionStep) -> TrellisResult<Child> {
        let mut command = Command::new(step.program());
        command
            .args(step.arguments())
            .current_dir(step.working_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(env) = step.env() {
            command.env_clear().envs(env);
        }

        command.spawn().map_err(|e| {
            ApplicationError::CommandSpawnFailed {
                step: step.name().to_string(),
                program: step.program().display().to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

/// How long captured pipes may stay open once the child is gone. A pipe
/// still open after that is held by a process the child left running.
const DRAIN_GRACE: Duration = Duration::from_secs(2);
const DRAIN_POLL: Duration = Duration::from_millis(10);
const TAIL_LINES: usize = 20;

/// One pipe, read on its own thread so a chatty child never blocks on a
/// full pipe buffer while we poll for its exit. What has been read so far
/// is readable at any time.
struct Capture {
    buffer: Arc<Mutex<Vec<u8>>>,
    reader: Option<JoinHandle<()>>,
}

impl Capture {
    fn start<R: Read + Send + 'static>(pipe: Option<R>) -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);
        let reader = pipe.map(|mut pipe| {
            thread::spawn(move || {
                let mut chunk = [0u8; 8192];
                loop {
                    match pipe.read(&mut chunk) {
                        Ok(0) => break,
                        Ok(n) => {
                            if let Ok(mut buf) = sink.lock() {
                                buf.extend_from_slice(&chunk[..n]);
                            }
                        }
                        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                        Err(_) => break,
                    }
                }
            })
        });
        Self { buffer, reader }
    }

    fn closed(&self) -> bool {
        self.reader.as_ref().is_none_or(JoinHandle::is_finished)
    }

    fn text(&self) -> String {
        self.buffer
            .lock()
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default()
    }
}

/// Wait for both pipes to close, at most [`DRAIN_GRACE`]. Readers still
/// blocked afterwards are detached.
fn settle(stdout: &Capture, stderr: &Capture) -> bool {
    let deadline = Instant::now() + DRAIN_GRACE;
    while !(stdout.closed() && stderr.closed()) {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(DRAIN_POLL);
    }
    true
}

impl CommandRunner for ProcessRunner {
    #[instrument(skip_all, fields(step = step.name(), timeout_secs = step.timeout().as_secs()))]
    fn run(&self, step: &ExecutionStep) -> TrellisResult<CommandOutput> {
        debug!(command = %step.display_command(), cwd = %step.working_dir().display(), "spawning");
        let mut child = self.spawn(step)?;
        let stdout = Capture::start(child.stdout.take());
        let stderr = Capture::start(child.stderr.take());

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if started.elapsed() > step.timeout() {
                        warn!("timed out, killing child");
                        let _ = child.kill();
                        let _ = child.wait();
                        settle(&stdout, &stderr);
                        let partial = CommandOutput {
                            exit_code: None,
                            stdout: stdout.text(),
                            stderr: stderr.text(),
                        };
                        return Err(ApplicationError::CommandTimedOut {
                            step: step.name().to_string(),
                            timeout_secs: step.timeout().as_secs(),
                            stderr_tail: partial.stderr_tail(TAIL_LINES),
                        }
                        .into());
                    }
                    thread::sleep(self.poll_interval);
                }
                Err(e) => {
                    let _ = child.kill();
                    return Err(ApplicationError::CommandSpawnFailed {
                        step: step.name().to_string(),
                        program: step.program().display().to_string(),
                        reason: format!("wait failed: {}", e),
                    }
                    .into());
                }
            }
        };

        if !settle(&stdout, &stderr) {
            warn!("output still open after exit, a background process holds it; keeping what was read");
        }
        let output = CommandOutput {
            exit_code: status.code(),
            stdout: stdout.text(),
            stderr: stderr.text(),
        };
        debug!(
            exit_code = ?output.exit_code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "finished"
        );
        Ok(output)
    }
}

type Effect = Arc<dyn Fn(&ExecutionStep) + Send + Sync>;

/// Command runner that never spawns anything.
///
/// Every step succeeds unless scripted otherwise. Effects let a test mimic
/// what a real command would leave behind (for example the files a project
/// generator writes).
#[derive(Clone, Default)]
pub struct ScriptedRunner {
    outputs: Arc<Mutex<BTreeMap<String, CommandOutput>>>,
    effects: Arc<Mutex<BTreeMap<String, Effect>>>,
    calls: Arc<Mutex<Vec<ExecutionStep>>>,
}

impl std::fmt::Debug for ScriptedRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedRunner")
            .field("calls", &self.step_names())
            .finish_non_exhaustive()
    }
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every run of step `name` with `output`.
    pub fn respond(self, name: &str, output: CommandOutput) -> Self {
        if let Ok(mut outputs) = self.outputs.lock() {
            outputs.insert(name.to_string(), output);
        }
        self
    }

    /// Make step `name` exit with `exit_code` and `stderr`.
    pub fn fail(self, name: &str, exit_code: i32, stderr: &str) -> Self {
        self.respond(name, CommandOutput::failure(exit_code, stderr))
    }

    /// Run `effect` whenever step `name` runs successfully.
    pub fn on_run(self, name: &str, effect: impl Fn(&ExecutionStep) + Send + Sync + 'static) -> Self {
        if let Ok(mut effects) = self.effects.lock() {
            effects.insert(name.to_string(), Arc::new(effect));
        }
        self
    }

    /// Every step run so far, in order.
    pub fn calls(&self) -> Vec<ExecutionStep> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn step_names(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|step| step.name().to_string())
            .collect()
    }

    pub fn ran(&self, name: &str) -> bool {
        self.calls().iter().any(|step| step.name() == name)
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, step: &ExecutionStep) -> TrellisResult<CommandOutput> {
        self.calls
            .lock()
            .map_err(|_| ApplicationError::LockPoisoned)?
            .push(step.clone());

        let output = self
            .outputs
            .lock()
            .map_err(|_| ApplicationError::LockPoisoned)?
            .get(step.name())
            .cloned()
            .unwrap_or_else(CommandOutput::success);

        if output.succeeded() {
            let effect = self
                .effects
                .lock()
                .map_err(|_| ApplicationError::LockPoisoned)?
                .get(step.name())
                .cloned();
            if let Some(effect) = effect {
                effect(step);
            }
        }
        Ok(output)
    }
}
