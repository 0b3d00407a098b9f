//! Tool probes: PATH lookup and version queries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;
use trellis_core::{
    application::{ApplicationError, ports::ToolProbe},
    error::TrellisResult,
};

/// Looks tools up on the real PATH and runs them.
#[derive(Debug, Clone, Default)]
pub struct SystemProbe;

impl SystemProbe {
    pub fn new() -> Self {
        Self
    }
}

impl ToolProbe for SystemProbe {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        match which::which(program) {
            Ok(path) => Some(path),
            Err(e) => {
                debug!(program, error = %e, "lookup failed");
                None
            }
        }
    }

    fn version_output(&self, program: &Path, args: &[String]) -> TrellisResult<String> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ApplicationError::CommandSpawnFailed {
                step: "check-prerequisites".into(),
                program: program.display().to_string(),
                reason: e.to_string(),
            })?;

        // Older interpreters print their version on stderr.
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }
}

/// Probe answering from a fixed table.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    tools: BTreeMap<String, (PathBuf, String)>,
}

impl StaticProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` at `path`, reporting `version_output` when asked.
    pub fn with_tool(
        mut self,
        name: &str,
        path: impl Into<PathBuf>,
        version_output: impl Into<String>,
    ) -> Self {
        self.tools
            .insert(name.to_string(), (path.into(), version_output.into()));
        self
    }
}

impl ToolProbe for StaticProbe {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        self.tools.get(program).map(|(path, _)| path.clone())
    }

    fn version_output(&self, program: &Path, _args: &[String]) -> TrellisResult<String> {
        self.tools
            .values()
            .find(|(path, _)| path == program)
            .map(|(_, output)| output.clone())
            .ok_or_else(|| {
                ApplicationError::CommandSpawnFailed {
                    step: "check-prerequisites".into(),
                    program: program.display().to_string(),
                    reason: "not registered".into(),
                }
                .into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_probe_answers_from_table() {
        let probe = StaticProbe::new().with_tool("python3", "/usr/bin/python3", "Python 3.13.0");
        let path = probe.locate("python3").unwrap();
        assert_eq!(path, PathBuf::from("/usr/bin/python3"));
        assert_eq!(probe.version_output(&path, &[]).unwrap(), "Python 3.13.0");
        assert!(probe.locate("pip").is_none());
    }

    #[test]
    fn system_probe_misses_unknown_tools() {
        assert!(SystemProbe::new().locate("trellis-no-such-tool-xyz").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn system_probe_combines_both_streams() {
        let output = SystemProbe::new()
            .version_output(
                Path::new("/bin/sh"),
                &["-c".into(), "echo a; echo b >&2".into()],
            )
            .unwrap();
        assert!(output.contains('a') && output.contains('b'));
    }
}
