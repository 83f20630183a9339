//! Tool Installer/Configurer
//!
//! Drives git and the GitHub CLI from an unknown state to ready. The state
//! machine never exits or relaunches the process itself: a login or a fresh
//! hosting CLI install ends in [`ProvisionOutcome::RestartRequired`] and the
//! caller decides what to do with it.

use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::commands::{CommandTable, Invocation};
use crate::config::GitConfig;
use crate::detector::{Detector, ToolVersion};
use crate::error::ToolError;
use crate::process::CommandRunner;
use crate::recognizer::{OutputRecognizer, SubstringRecognizer};

/// Transient state of a required tool, derived by inspection every run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolState {
    Unknown,
    NotInstalled,
    InstalledUnconfigured,
    Ready,
}

impl fmt::Display for ToolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ToolState::Unknown => "unknown",
            ToolState::NotInstalled => "not installed",
            ToolState::InstalledUnconfigured => "installed, not configured",
            ToolState::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// How long to wait for a freshly installed tool to become detectable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: 30,
            interval: Duration::from_secs(2),
        }
    }
}

/// Why the program has to start over in a fresh session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartReason {
    Installed { tool: String },
    LoggedIn { tool: String },
}

impl fmt::Display for RestartReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartReason::Installed { tool } => write!(f, "{} was just installed", tool),
            RestartReason::LoggedIn { tool } => write!(f, "{} login completed", tool),
        }
    }
}

/// Terminal state of one provisioning run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Ready { version: Option<String> },
    RestartRequired { reason: RestartReason },
    /// The tool is left in `state`; later steps will fail if it is really unusable
    Unavailable { state: ToolState, error: ToolError },
}

impl ProvisionOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, ProvisionOutcome::Ready { .. })
    }
}

pub struct ToolProvisioner<'a> {
    runner: &'a dyn CommandRunner,
    commands: &'a CommandTable,
    work_dir: &'a Path,
    poll: PollPolicy,
    auth: Box<dyn OutputRecognizer + 'a>,
}

impl<'a> ToolProvisioner<'a> {
    pub fn new(runner: &'a dyn CommandRunner, commands: &'a CommandTable, work_dir: &'a Path) -> Self {
        Self {
            runner,
            commands,
            work_dir,
            poll: PollPolicy::default(),
            auth: Box::new(SubstringRecognizer::active_account()),
        }
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_auth_recognizer(mut self, auth: Box<dyn OutputRecognizer + 'a>) -> Self {
        self.auth = auth;
        self
    }

    /// Make sure git is installed and carries the configured identity
    pub async fn provision_git(&self, identity: &GitConfig) -> ProvisionOutcome {
        let tool = self.commands.git_program.as_str();
        let probe = self.commands.git_version();
        let detector = Detector::new(self.runner);

        let version = match detector.detect(&probe, self.work_dir).await {
            Some(version) => {
                info!("Found {} {}", version.tool, version.version);
                transition(tool, ToolState::Unknown, ToolState::InstalledUnconfigured);
                version
            }
            None => {
                transition(tool, ToolState::Unknown, ToolState::NotInstalled);
                let install_error = self.install(tool, &self.commands.git_install).await;

                // identity is configured in this session, so git has to show up here
                match self.wait_until_detected(&detector, &probe).await {
                    Some(version) => {
                        info!("Installed {} {}", version.tool, version.version);
                        transition(tool, ToolState::NotInstalled, ToolState::InstalledUnconfigured);
                        version
                    }
                    None => return self.not_detected(tool, install_error),
                }
            }
        };

        if let Err(error) = self.configure_git(identity).await {
            error!("{}", error);
            return ProvisionOutcome::Unavailable {
                state: ToolState::InstalledUnconfigured,
                error,
            };
        }

        transition(tool, ToolState::InstalledUnconfigured, ToolState::Ready);
        ProvisionOutcome::Ready {
            version: Some(version.version),
        }
    }

    /// Make sure the hosting CLI is installed and authenticated
    pub async fn provision_hosting_cli(&self) -> ProvisionOutcome {
        let tool = self.commands.gh_program.as_str();
        let probe = self.commands.gh_version();
        let detector = Detector::new(self.runner);

        let version = match detector.detect(&probe, self.work_dir).await {
            Some(version) => {
                info!("Found {} {}", version.tool, version.version);
                transition(tool, ToolState::Unknown, ToolState::InstalledUnconfigured);
                version
            }
            None => {
                transition(tool, ToolState::Unknown, ToolState::NotInstalled);

                // A successful install only shows up on PATH in a new session.
                // A reported failure is checked here before asking for one.
                if let Some(install_error) = self.install(tool, &self.commands.gh_install).await {
                    if self.wait_until_detected(&detector, &probe).await.is_none() {
                        return self.not_detected(tool, Some(install_error));
                    }
                }

                info!("{} installed, restart required", tool);
                return ProvisionOutcome::RestartRequired {
                    reason: RestartReason::Installed {
                        tool: tool.to_string(),
                    },
                };
            }
        };

        let status = self
            .commands
            .gh_auth_status()
            .run(self.runner, self.work_dir)
            .await;

        if self.auth.is_match(&status.output) {
            debug!("{} is authenticated", tool);
            transition(tool, ToolState::InstalledUnconfigured, ToolState::Ready);
            return ProvisionOutcome::Ready {
                version: Some(version.version),
            };
        }

        info!("{} is not authenticated, starting login", tool);
        let login = self.commands.gh_auth_login();
        let result = login.run_interactive(self.runner, self.work_dir).await;

        if result.is_error {
            let error = ToolError::Login {
                tool: tool.to_string(),
                output: result.output,
            };
            error!("{}", error);
            return ProvisionOutcome::Unavailable {
                state: ToolState::InstalledUnconfigured,
                error,
            };
        }

        ProvisionOutcome::RestartRequired {
            reason: RestartReason::LoggedIn {
                tool: tool.to_string(),
            },
        }
    }

    /// Run the installer interactively. Returns the failure it reported, if any.
    async fn install(&self, tool: &str, install: &Invocation) -> Option<ToolError> {
        info!("{} not found, installing with: {}", tool, install.display());

        let result = install.run_interactive(self.runner, self.work_dir).await;
        if !result.is_error {
            return None;
        }

        warn!("{} installer reported a failure: {}", tool, result.output.trim());
        Some(ToolError::Install {
            tool: tool.to_string(),
            output: result.output,
        })
    }

    /// An installer failure explains a missing tool better than the poll count
    fn not_detected(&self, tool: &str, install_error: Option<ToolError>) -> ProvisionOutcome {
        let error = install_error.unwrap_or(ToolError::NotDetected {
            tool: tool.to_string(),
            attempts: self.poll.attempts,
        });
        error!("{}", error);
        ProvisionOutcome::Unavailable {
            state: ToolState::NotInstalled,
            error,
        }
    }

    async fn wait_until_detected(&self, detector: &Detector<'_>, probe: &Invocation) -> Option<ToolVersion> {
        for attempt in 1..=self.poll.attempts {
            if let Some(version) = detector.detect(probe, self.work_dir).await {
                return Some(version);
            }
            debug!(
                "'{}' not detected yet (attempt {}/{})",
                probe.display(),
                attempt,
                self.poll.attempts
            );
            if attempt < self.poll.attempts {
                tokio::time::sleep(self.poll.interval).await;
            }
        }
        None
    }

    async fn configure_git(&self, identity: &GitConfig) -> Result<(), ToolError> {
        let listing = self
            .commands
            .git_config_list()
            .run(self.runner, self.work_dir)
            .await;

        if let Some(text) = listing.text() {
            if text.contains(&identity.name) && text.contains(&identity.email) {
                debug!("git identity already configured");
                return Ok(());
            }
        }

        info!("Configuring git identity for {} <{}>", identity.name, identity.email);
        for command in [
            self.commands.git_set_name(&identity.name),
            self.commands.git_set_email(&identity.email),
        ] {
            let result = command.run(self.runner, self.work_dir).await;
            if result.is_error {
                return Err(ToolError::Configure {
                    tool: self.commands.git_program.clone(),
                    output: result.output,
                });
            }
        }

        Ok(())
    }
}

fn transition(tool: &str, from: ToolState, to: ToolState) {
    debug!("{}: {} -> {}", tool, from, to);
}
