//! Prerequisite checker.
//!
//! Read-only: probes PATH, asks the tool for its version and compares it
//! against an inclusive range. The only side effect is the probe process.

use tracing::{debug, info, instrument, warn};

use crate::{
    application::{
        ApplicationError,
        ports::{Prompter, ToolProbe},
    },
    domain::{PrerequisiteStatus, ToolRequirement, extract_version},
    error::TrellisResult,
};

pub struct PrerequisiteChecker<'a> {
    probe: &'a dyn ToolProbe,
}

impl<'a> PrerequisiteChecker<'a> {
    pub fn new(probe: &'a dyn ToolProbe) -> Self {
        Self { probe }
    }

    /// Classify one requirement.
    #[instrument(skip_all, fields(tool = %requirement.name))]
    pub fn check(&self, requirement: &ToolRequirement) -> PrerequisiteStatus {
        let Some(path) = self.probe.locate(&requirement.name) else {
            debug!("not found on PATH");
            return PrerequisiteStatus::Missing;
        };

        let Some(range) = &requirement.range else {
            return PrerequisiteStatus::Satisfied {
                path,
                version: None,
            };
        };

        let found = match self.probe.version_output(&path, &requirement.version_args) {
            Ok(output) => extract_version(&output),
            Err(e) => {
                warn!(error = %e, "version query failed");
                None
            }
        };
        debug!(path = %path.display(), version = ?found, range = %range, "probed");

        match found {
            Some(version) if range.contains(&version) => PrerequisiteStatus::Satisfied {
                path,
                version: Some(version),
            },
            found => PrerequisiteStatus::VersionMismatch {
                path,
                found,
                required: range.clone(),
            },
        }
    }

    /// Check and apply the run policy: `Missing` aborts, `VersionMismatch`
    /// asks for confirmation and aborts when declined.
    ///
    /// Returns the status so callers can report the resolved path and version.
    pub fn enforce(
        &self,
        requirement: &ToolRequirement,
        prompter: &dyn Prompter,
    ) -> TrellisResult<PrerequisiteStatus> {
        let status = self.check(requirement);
        match &status {
            PrerequisiteStatus::Satisfied { path, version } => {
                info!(
                    tool = %requirement.name,
                    path = %path.display(),
                    version = %version.as_ref().map(ToString::to_string).unwrap_or_default(),
                    "prerequisite satisfied"
                );
            }
            PrerequisiteStatus::Missing => {
                return Err(ApplicationError::PrerequisiteMissing {
                    tool: requirement.name.clone(),
                    hint: requirement.install_hint.clone(),
                }
                .into());
            }
            PrerequisiteStatus::VersionMismatch {
                found, required, ..
            } => {
                let found = found
                    .as_ref()
                    .map_or_else(|| "unknown".to_string(), ToString::to_string);
                let question = format!(
                    "{} {} is outside the supported range {}. Continue anyway?",
                    requirement.name, found, required
                );
                if !prompter.confirm(&question, true)? {
                    return Err(ApplicationError::PrerequisiteVersionMismatch {
                        tool: requirement.name.clone(),
                        found,
                        required: required.to_string(),
                    }
                    .into());
                }
                warn!(tool = %requirement.name, %found, %required, "continuing with unsupported version");
            }
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MockPrompter, MockToolProbe};
    use crate::domain::VersionRange;
    use crate::error::TrellisError;
    use semver::Version;
    use std::path::PathBuf;

    fn python() -> ToolRequirement {
        ToolRequirement::python("python3", "3.12..=3.14".parse().unwrap())
    }

    fn probe_reporting(output: &'static str) -> MockToolProbe {
        let mut probe = MockToolProbe::new();
        probe
            .expect_locate()
            .returning(|_| Some(PathBuf::from("/usr/bin/python3")));
        probe
            .expect_version_output()
            .returning(move |_, _| Ok(output.to_string()));
        probe
    }

    #[test]
    fn missing_tool() {
        let mut probe = MockToolProbe::new();
        probe.expect_locate().returning(|_| None);
        probe.expect_version_output().never();

        let checker = PrerequisiteChecker::new(&probe);
        assert_eq!(checker.check(&python()), PrerequisiteStatus::Missing);
    }

    #[test]
    fn version_inside_range_is_satisfied() {
        let probe = probe_reporting("Python 3.13.1\n");
        let status = PrerequisiteChecker::new(&probe).check(&python());
        assert_eq!(
            status,
            PrerequisiteStatus::Satisfied {
                path: PathBuf::from("/usr/bin/python3"),
                version: Some(Version::new(3, 13, 1)),
            }
        );
    }

    #[test]
    fn version_outside_range_mismatches() {
        let probe = probe_reporting("Python 3.11.9");
        let status = PrerequisiteChecker::new(&probe).check(&python());
        assert!(matches!(
            status,
            PrerequisiteStatus::VersionMismatch { found: Some(v), .. } if v == Version::new(3, 11, 9)
        ));
    }

    #[test]
    fn unparseable_version_mismatches() {
        let probe = probe_reporting("command not understood");
        let status = PrerequisiteChecker::new(&probe).check(&python());
        assert!(matches!(
            status,
            PrerequisiteStatus::VersionMismatch { found: None, .. }
        ));
    }

    #[test]
    fn no_range_skips_version_query() {
        let mut probe = MockToolProbe::new();
        probe
            .expect_locate()
            .returning(|_| Some(PathBuf::from("/usr/bin/git")));
        probe.expect_version_output().never();

        let status = PrerequisiteChecker::new(&probe).check(&ToolRequirement::new("git", "install git"));
        assert!(status.is_satisfied());
    }

    #[test]
    fn enforce_aborts_on_missing() {
        let mut probe = MockToolProbe::new();
        probe.expect_locate().returning(|_| None);
        let mut prompter = MockPrompter::new();
        prompter.expect_confirm().never();

        let err = PrerequisiteChecker::new(&probe)
            .enforce(&python(), &prompter)
            .unwrap_err();
        assert!(matches!(
            err,
            TrellisError::Application(ApplicationError::PrerequisiteMissing { .. })
        ));
    }

    #[test]
    fn enforce_asks_on_mismatch_and_honours_decline() {
        let probe = probe_reporting("Python 3.10.0");
        let mut prompter = MockPrompter::new();
        prompter.expect_confirm().times(1).returning(|_, _| Ok(false));

        let err = PrerequisiteChecker::new(&probe)
            .enforce(&python(), &prompter)
            .unwrap_err();
        assert!(matches!(
            err,
            TrellisError::Application(ApplicationError::PrerequisiteVersionMismatch { ref found, .. })
                if found == "3.10.0"
        ));
    }

    #[test]
    fn enforce_continues_when_confirmed() {
        let probe = probe_reporting("Python 3.15.0");
        let mut prompter = MockPrompter::new();
        prompter.expect_confirm().times(1).returning(|_, _| Ok(true));

        let status = PrerequisiteChecker::new(&probe)
            .enforce(&python(), &prompter)
            .unwrap();
        assert!(!status.is_satisfied());
    }

    #[test]
    fn open_range_accepts_newer_versions() {
        let probe = probe_reporting("Python 3.20.0");
        let requirement = ToolRequirement::python("python3", VersionRange::new(Some("3.12"), None).unwrap());
        assert!(PrerequisiteChecker::new(&probe).check(&requirement).is_satisfied());
    }
}
