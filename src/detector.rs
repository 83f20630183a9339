//! Tool Presence Detector

use std::path::Path;
use tracing::debug;

use crate::commands::Invocation;
use crate::process::CommandRunner;
use crate::recognizer::{OutputRecognizer, VersionRecognizer};

/// An installed tool as reported by its version probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolVersion {
    pub tool: String,
    pub version: String,
}

/// Runs version probes and recognizes their output
pub struct Detector<'a> {
    runner: &'a dyn CommandRunner,
    recognizer: Box<dyn OutputRecognizer + 'a>,
}

impl<'a> Detector<'a> {
    /// Detector using the default `<word> version <semver>` recognizer
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self::with_recognizer(runner, Box::new(VersionRecognizer::default()))
    }

    pub fn with_recognizer(runner: &'a dyn CommandRunner, recognizer: Box<dyn OutputRecognizer + 'a>) -> Self {
        Self { runner, recognizer }
    }

    /// `None` means the tool is not installed (or not on PATH)
    pub async fn detect(&self, probe: &Invocation, working_dir: &Path) -> Option<ToolVersion> {
        let result = probe.run(self.runner, working_dir).await;
        if result.is_total_failure() {
            debug!("Version probe '{}' produced no output", probe.display());
            return None;
        }

        let recognized = self.recognizer.recognize(&result.output)?;
        let tool = recognized.name.unwrap_or_else(|| probe.program.clone());
        let version = recognized.version.unwrap_or_default();

        debug!("Detected {} {}", tool, version);
        Some(ToolVersion { tool, version })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{CommandResult, MockCommandRunner};
    use crate::recognizer::SubstringRecognizer;
    use std::path::PathBuf;

    fn probe() -> Invocation {
        Invocation::new("git", ["--version"])
    }

    #[tokio::test]
    async fn test_detects_installed_tool() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|exe: &str, args: &[String], _dir: &Path| exe == "git" && args == ["--version".to_string()])
            .times(1)
            .returning(|_, _, _| CommandResult::ok("git version 2.43.0\n"));

        let detector = Detector::new(&runner);
        let found = detector.detect(&probe(), &PathBuf::from("/tmp")).await;

        assert_eq!(
            found,
            Some(ToolVersion {
                tool: "git".to_string(),
                version: "2.43.0".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_localized_output_still_detected() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .times(1)
            .returning(|_, _, _| CommandResult::ok("Herramienta instalada:\r\ngit version 2.43.0.windows.1\r\n"));

        let found = Detector::new(&runner).detect(&probe(), Path::new("/tmp")).await;
        assert_eq!(found.map(|v| v.version), Some("2.43.0".to_string()));
    }

    #[tokio::test]
    async fn test_missing_tool_not_detected() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_, _, _| CommandResult::failure());

        let found = Detector::new(&runner).detect(&probe(), Path::new("/tmp")).await;
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_unrecognized_output_not_detected() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_, _, _| CommandResult::error("'git' is not recognized as an internal or external command"));

        let found = Detector::new(&runner).detect(&probe(), Path::new("/tmp")).await;
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_recognizer_without_captures_falls_back_to_program_name() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_, _, _| CommandResult::ok("installed"));

        let detector = Detector::with_recognizer(&runner, Box::new(SubstringRecognizer::new("installed")));
        let found = detector.detect(&probe(), Path::new("/tmp")).await.expect("should detect");
        assert_eq!(found.tool, "git");
        assert_eq!(found.version, "");
    }
}
