//! Self-relaunch after an install or login
//!
//! Nothing in memory crosses the restart boundary. The only state carried
//! over is the list of reasons already relaunched for, kept in the
//! environment. A fresh workstation needs one relaunch after installing the
//! hosting CLI and another after logging in; a reason that comes back after
//! its own relaunch (a login that never sticks) is refused.

use anyhow::{Context, Result};
use std::process::Command;
use tracing::info;

use crate::installer::RestartReason;

/// Environment variable listing the reasons this run has relaunched for
pub const RELAUNCH_HISTORY_VAR: &str = "PROJECTS_MANAGER_RELAUNCHED_FOR";

/// Hard cap on relaunches in one chain, whatever the reasons
pub const MAX_RELAUNCH_DEPTH: usize = 2;

const SEPARATOR: char = ',';

/// Reasons recorded by parent processes, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelaunchHistory {
    reasons: Vec<String>,
}

impl RelaunchHistory {
    /// History recorded by the parent process, empty for a first launch
    pub fn from_env() -> Self {
        Self::parse(std::env::var(RELAUNCH_HISTORY_VAR).ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        let reasons = value
            .unwrap_or_default()
            .split(SEPARATOR)
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect();
        Self { reasons }
    }

    pub fn depth(&self) -> usize {
        self.reasons.len()
    }

    pub fn contains(&self, reason: &RestartReason) -> bool {
        let key = reason_key(reason);
        self.reasons.iter().any(|r| *r == key)
    }

    /// History handed to the next process
    pub fn with(&self, reason: &RestartReason) -> Self {
        let mut reasons = self.reasons.clone();
        reasons.push(reason_key(reason));
        Self { reasons }
    }

    fn to_env_value(&self) -> String {
        self.reasons.join(&SEPARATOR.to_string())
    }
}

fn reason_key(reason: &RestartReason) -> String {
    match reason {
        RestartReason::Installed { tool } => format!("installed:{}", tool),
        RestartReason::LoggedIn { tool } => format!("logged-in:{}", tool),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelaunchDecision {
    /// Start over, passing `history` to the new process
    Relaunch { history: RelaunchHistory },
    /// Already relaunched for this; ask the user to start again by hand
    Suppress { depth: usize },
}

pub fn decide(history: &RelaunchHistory, reason: &RestartReason) -> RelaunchDecision {
    if history.contains(reason) || history.depth() >= MAX_RELAUNCH_DEPTH {
        RelaunchDecision::Suppress {
            depth: history.depth(),
        }
    } else {
        RelaunchDecision::Relaunch {
            history: history.with(reason),
        }
    }
}

/// Start this executable again with the same arguments.
///
/// On Unix the process image is replaced and this only returns on failure.
/// On Windows the new process gets its own console and the caller should
/// exit once this returns.
pub fn relaunch(history: &RelaunchHistory) -> Result<()> {
    let exe = std::env::current_exe().context("Failed to locate the running executable")?;
    let mut command = Command::new(&exe);
    command
        .args(std::env::args_os().skip(1))
        .env(RELAUNCH_HISTORY_VAR, history.to_env_value());

    info!(
        "Relaunching {} (depth {}, after: {})",
        exe.display(),
        history.depth(),
        history.to_env_value()
    );
    spawn_replacement(command)
}

#[cfg(unix)]
fn spawn_replacement(mut command: Command) -> Result<()> {
    use std::os::unix::process::CommandExt;

    let error = command.exec();
    Err(error).context("Failed to relaunch")
}

#[cfg(windows)]
fn spawn_replacement(mut command: Command) -> Result<()> {
    use std::os::windows::process::CommandExt;

    const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;

    command
        .creation_flags(CREATE_NEW_CONSOLE)
        .spawn()
        .context("Failed to relaunch")?;
    Ok(())
}
