//! Process Runner
//!
//! Every external tool the core talks to goes through [`CommandRunner`]. The
//! runner never fails: spawn and I/O errors come back as a [`CommandResult`]
//! carrying the [`ERROR_SENTINEL`] so the rest of the pipeline can keep going.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Output reported when a command produced nothing usable on either stream
pub const ERROR_SENTINEL: &str = "Error";

/// Normalized result of an external invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Stdout if non-blank, else stderr if non-blank, else [`ERROR_SENTINEL`]
    pub output: String,
    /// The command could not be started or exited unsuccessfully
    pub is_error: bool,
}

impl CommandResult {
    /// Successful invocation with the given output
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            is_error: false,
        }
    }

    /// Unsuccessful invocation that still produced output
    pub fn error(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            is_error: true,
        }
    }

    /// Total failure: nothing ran or nothing was printed
    pub fn failure() -> Self {
        Self::error(ERROR_SENTINEL)
    }

    /// Build a result from captured streams.
    ///
    /// Stdout wins over stderr whenever it is non-blank; many tools write
    /// progress or warnings to stderr even when they succeed.
    pub fn from_streams(stdout: &str, stderr: &str, success: bool) -> Self {
        let output = if !stdout.trim().is_empty() {
            stdout.to_string()
        } else if !stderr.trim().is_empty() {
            stderr.to_string()
        } else {
            ERROR_SENTINEL.to_string()
        };

        Self {
            output,
            is_error: !success,
        }
    }

    /// True when the sentinel stands in for output of a failed command
    pub fn is_total_failure(&self) -> bool {
        self.is_error && self.output == ERROR_SENTINEL
    }

    /// Output text, unless it is the sentinel
    pub fn text(&self) -> Option<&str> {
        if self.output == ERROR_SENTINEL {
            None
        } else {
            Some(&self.output)
        }
    }
}

/// Capability to run an external command and wait for it to exit
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run with both output streams captured
    async fn run(&self, executable: &str, args: &[String], working_dir: &Path) -> CommandResult;

    /// Run attached to the user's terminal (installers, interactive login).
    ///
    /// Runners without a terminal fall back to [`CommandRunner::run`].
    async fn run_interactive(
        &self,
        executable: &str,
        args: &[String],
        working_dir: &Path,
    ) -> CommandResult {
        self.run(executable, args, working_dir).await
    }
}

/// Runner backed by real OS processes
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, executable: &str, args: &[String], working_dir: &Path) -> CommandResult {
        debug!("Running: {} {} (in {})", executable, args.join(" "), working_dir.display());

        let output = Command::new(executable)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                let result = CommandResult::from_streams(&stdout, &stderr, output.status.success());
                if result.is_error {
                    debug!("{} exited with {}", executable, output.status);
                }
                result
            }
            Err(e) => {
                warn!("Failed to execute {}: {}", executable, e);
                CommandResult::failure()
            }
        }
    }

    async fn run_interactive(
        &self,
        executable: &str,
        args: &[String],
        working_dir: &Path,
    ) -> CommandResult {
        debug!(
            "Running attached: {} {} (in {})",
            executable,
            args.join(" "),
            working_dir.display()
        );

        let status = Command::new(executable)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .status()
            .await;

        match status {
            Ok(status) if status.success() => CommandResult::ok(format!("{} finished: {}", executable, status)),
            Ok(status) => CommandResult::error(format!("{} finished: {}", executable, status)),
            Err(e) => {
                warn!("Failed to execute {}: {}", executable, e);
                CommandResult::failure()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdout_wins_over_stderr() {
        let result = CommandResult::from_streams("gh version 2.40.1\n", "warning: update available\n", true);
        assert_eq!(result.output, "gh version 2.40.1\n");
        assert!(!result.is_error);
    }

    #[test]
    fn test_stderr_used_when_stdout_blank() {
        let result = CommandResult::from_streams("  \n", "Cloning into 'repo'...\n", true);
        assert_eq!(result.output, "Cloning into 'repo'...\n");
    }

    #[test]
    fn test_both_blank_yields_sentinel() {
        let result = CommandResult::from_streams("", " \n", false);
        assert_eq!(result.output, ERROR_SENTINEL);
        assert!(result.is_error);
        assert!(result.is_total_failure());
        assert_eq!(result.text(), None);
    }

    #[test]
    fn test_silent_success_is_not_total_failure() {
        let result = CommandResult::from_streams("", "", true);
        assert_eq!(result.output, ERROR_SENTINEL);
        assert!(!result.is_error);
        assert!(!result.is_total_failure());
    }

    #[test]
    fn test_failed_exit_keeps_output() {
        let result = CommandResult::from_streams("", "fatal: repository not found\n", false);
        assert!(result.is_error);
        assert!(!result.is_total_failure());
        assert_eq!(result.text(), Some("fatal: repository not found\n"));
    }

    #[tokio::test]
    async fn test_missing_executable_becomes_failure() {
        let runner = SystemRunner::new();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let result = runner
            .run("definitely-not-a-real-binary-1f2e3d", &[], dir.path())
            .await;
        assert!(result.is_total_failure());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_in_working_directory() {
        let runner = SystemRunner::new();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("marker.txt"), "").expect("Failed to write marker");

        let result = runner
            .run("sh", &["-c".to_string(), "ls".to_string()], dir.path())
            .await;

        assert!(!result.is_error);
        assert!(result.output.contains("marker.txt"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_error_with_stderr() {
        let runner = SystemRunner::new();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");

        let result = runner
            .run("sh", &["-c".to_string(), "echo boom >&2; exit 3".to_string()], dir.path())
            .await;

        assert!(result.is_error);
        assert_eq!(result.output.trim(), "boom");
    }
}
