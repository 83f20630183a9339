//! projects-manager - Workstation bootstrapper for git-hosted projects
//!
//! Brings a developer machine to a known state in one run: git and the GitHub
//! CLI are installed and configured, every repository owned by the account and
//! its organizations is discovered, mapped to a local folder, and cloned or
//! synced.
//!
//! ## Pipeline
//!
//! - **Tools**: [`installer`] drives each tool to ready, reporting a restart
//!   request instead of relaunching by itself
//! - **Discovery**: [`discovery`] lists repositories through `gh`
//! - **Mapping**: [`mapping`] resolves each repository to one declared folder
//! - **Reconciliation**: [`reconcile`] clones or syncs, one repository at a time
//!
//! ## Modules
//!
//! - [`config`]: `appsettings.json` loading, overlays and host paths
//! - [`process`]: the command runner every external call goes through
//! - [`workflow`]: the end-to-end driver used by the binary

pub mod commands;
pub mod config;
pub mod detector;
pub mod discovery;
pub mod error;
pub mod health;
pub mod installer;
pub mod logging;
pub mod mapping;
pub mod process;
pub mod recognizer;
pub mod reconcile;
pub mod restart;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use commands::CommandTable;
pub use config::{FolderSpec, GitConfig, HostPaths, RootConfig};
pub use discovery::{Owner, RepositoryDescriptor, Visibility};
pub use health::HealthCheck;
pub use installer::{ProvisionOutcome, RestartReason, ToolState};
pub use process::{CommandResult, CommandRunner, SystemRunner};
pub use reconcile::{ReconcileSummary, RepoOutcome};
pub use workflow::{RunOptions, RunOutcome, RunReport, Workflow};
