//! End-to-end driver: tools, discovery, directory bootstrap, resolution and
//! reconciliation, in that order.
//!
//! A restart request from the installer stops the run and is handed back to
//! the caller as [`RunOutcome::RestartRequired`].

use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::commands::CommandTable;
use crate::config::{HostPaths, RootConfig};
use crate::discovery::{DiscoveredRepositories, Discovery, GhDiscovery};
use crate::installer::{PollPolicy, ProvisionOutcome, RestartReason, ToolProvisioner};
use crate::process::CommandRunner;
use crate::reconcile::{self, BootstrapReport, PlanEntry, ReconcileSummary, Reconciler};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Plan only: no tool provisioning, no directories, no clone or sync
    pub dry_run: bool,
    /// Assume git and the hosting CLI are ready
    pub skip_tools: bool,
}

/// Provisioning result for one tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolReport {
    pub tool: String,
    pub outcome: ProvisionOutcome,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub tools: Vec<ToolReport>,
    pub discovered: DiscoveredRepositories,
    /// Directories that did not exist when the run started
    pub missing_directories: Vec<PathBuf>,
    /// Empty on a dry run
    pub bootstrap: BootstrapReport,
    pub plan: Vec<PlanEntry>,
    /// `None` on a dry run
    pub summary: Option<ReconcileSummary>,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(RunReport),
    RestartRequired(RestartReason),
}

pub struct Workflow<'a> {
    runner: &'a dyn CommandRunner,
    commands: &'a CommandTable,
    config: &'a RootConfig,
    paths: &'a HostPaths,
    poll: PollPolicy,
}

impl<'a> Workflow<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        commands: &'a CommandTable,
        config: &'a RootConfig,
        paths: &'a HostPaths,
    ) -> Self {
        Self {
            runner,
            commands,
            config,
            paths,
            poll: PollPolicy::default(),
        }
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Provision git, then the hosting CLI. Stops at the first restart request.
    pub async fn provision_tools(&self) -> Result<Vec<ToolReport>, RestartReason> {
        let provisioner = ToolProvisioner::new(self.runner, self.commands, &self.paths.work_dir)
            .with_poll_policy(self.poll);

        let mut reports = Vec::new();

        let git = provisioner.provision_git(&self.config.git_config).await;
        if let ProvisionOutcome::RestartRequired { reason } = git {
            return Err(reason);
        }
        reports.push(ToolReport {
            tool: self.commands.git_program.clone(),
            outcome: git,
        });

        let gh = provisioner.provision_hosting_cli().await;
        if let ProvisionOutcome::RestartRequired { reason } = gh {
            return Err(reason);
        }
        reports.push(ToolReport {
            tool: self.commands.gh_program.clone(),
            outcome: gh,
        });

        for report in &reports {
            if let ProvisionOutcome::Unavailable { state, error } = &report.outcome {
                error!("{} is unavailable ({}): {}", report.tool, state, error);
            }
        }

        Ok(reports)
    }

    pub async fn discover(&self) -> DiscoveredRepositories {
        GhDiscovery::new(self.runner, self.commands, &self.paths.work_dir)
            .discover(&self.config.git_config.account)
            .await
    }

    /// Discovery and resolution only
    pub async fn list(&self) -> Vec<PlanEntry> {
        let discovered = self.discover().await;
        reconcile::plan(&discovered, self.config, &self.paths.documents_root)
    }

    pub async fn run(&self, options: RunOptions) -> RunOutcome {
        let tools = if options.dry_run || options.skip_tools {
            info!("Skipping tool provisioning");
            Vec::new()
        } else {
            match self.provision_tools().await {
                Ok(reports) => reports,
                Err(reason) => {
                    warn!("Restart required: {}", reason);
                    return RunOutcome::RestartRequired(reason);
                }
            }
        };

        let discovered = self.discover().await;
        info!("Discovered {} repositories in total", discovered.total());

        let directories = reconcile::required_directories(
            self.config,
            &self.paths.documents_root,
            discovered.organization_names(),
        );
        let missing_directories = reconcile::missing_directories(&directories);

        let plan = reconcile::plan(&discovered, self.config, &self.paths.documents_root);

        if options.dry_run {
            return RunOutcome::Completed(RunReport {
                tools,
                discovered,
                missing_directories,
                bootstrap: BootstrapReport::default(),
                plan,
                summary: None,
            });
        }

        let bootstrap = reconcile::bootstrap_directories(&directories).await;

        // clone or sync is decided per entry when it runs
        let summary = Reconciler::new(self.runner, self.commands, &self.paths.work_dir)
            .reconcile_all(&plan)
            .await;

        RunOutcome::Completed(RunReport {
            tools,
            discovered,
            missing_directories,
            bootstrap,
            plan,
            summary: Some(summary),
        })
    }
}
