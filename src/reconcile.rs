//! Reconciliation engine
//!
//! Brings every discovered repository to a consistent local state: clone when
//! the target folder is absent, `gh repo sync` when it exists. Repositories
//! are processed one at a time and a failure is recorded against that
//! repository only.

use path_clean::PathClean;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::commands::CommandTable;
use crate::config::{FolderSpec, RootConfig};
use crate::discovery::{DiscoveredRepositories, Owner, RepositoryDescriptor};
use crate::error::{ReconcileError, ResolutionError};
use crate::mapping;
use crate::process::CommandRunner;

/// `<documents root>/<folder path>/<repository>`
pub fn target_path(documents_root: &Path, folder: &FolderSpec, repository: &str) -> PathBuf {
    documents_root
        .join(folder.relative_path())
        .join(repository)
        .clean()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Clone,
    Sync,
}

impl Action {
    pub fn for_path(path: &Path) -> Self {
        if path.exists() {
            Action::Sync
        } else {
            Action::Clone
        }
    }
}

/// Resolved destination of one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub folder: FolderSpec,
    pub path: PathBuf,
}

/// One repository with its owner and resolution result, in discovery order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub owner: Owner,
    pub repository: RepositoryDescriptor,
    pub placement: Result<Placement, ResolutionError>,
}

impl PlanEntry {
    /// What reconciling this entry would do right now
    pub fn action(&self) -> Option<Action> {
        self.placement
            .as_ref()
            .ok()
            .map(|placement| Action::for_path(&placement.path))
    }
}

/// Resolve every discovered repository: personal ones first, then each
/// organization in listing order
pub fn plan(discovered: &DiscoveredRepositories, config: &RootConfig, documents_root: &Path) -> Vec<PlanEntry> {
    let personal_owner = Owner::Personal(config.git_config.account.clone());
    let personal = discovered
        .personal
        .iter()
        .map(|repo| (personal_owner.clone(), repo));
    let organizations = discovered.organizations.iter().flat_map(|org| {
        let owner = Owner::Organization(org.name.clone());
        org.repositories.iter().map(move |repo| (owner.clone(), repo))
    });

    personal
        .chain(organizations)
        .map(|(owner, repository)| {
            let placement = mapping::resolve_for_owner(&owner, repository, config).map(|folder| {
                let path = target_path(documents_root, &folder, &repository.name);
                Placement { folder, path }
            });
            PlanEntry {
                owner,
                repository: repository.clone(),
                placement,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoOutcome {
    Cloned { repository: String, path: PathBuf },
    Synced { repository: String, path: PathBuf },
    Failed { repository: String, error: ReconcileError },
    Skipped { repository: String, error: ResolutionError },
}

impl RepoOutcome {
    pub fn repository(&self) -> &str {
        match self {
            RepoOutcome::Cloned { repository, .. }
            | RepoOutcome::Synced { repository, .. }
            | RepoOutcome::Failed { repository, .. }
            | RepoOutcome::Skipped { repository, .. } => repository,
        }
    }
}

/// Results of a complete reconciliation pass
#[derive(Debug, Clone)]
pub struct ReconcileSummary {
    pub total_repositories: usize,
    pub cloned: usize,
    pub synced: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration: Duration,
    pub results: Vec<RepoOutcome>,
}

impl ReconcileSummary {
    fn compile(results: Vec<RepoOutcome>, duration: Duration) -> Self {
        let mut summary = Self {
            total_repositories: results.len(),
            cloned: 0,
            synced: 0,
            failed: 0,
            skipped: 0,
            duration,
            results: Vec::new(),
        };

        for result in &results {
            match result {
                RepoOutcome::Cloned { .. } => summary.cloned += 1,
                RepoOutcome::Synced { .. } => summary.synced += 1,
                RepoOutcome::Failed { .. } => summary.failed += 1,
                RepoOutcome::Skipped { .. } => summary.skipped += 1,
            }
        }

        summary.results = results;
        summary
    }

    pub fn successful(&self) -> usize {
        self.cloned + self.synced
    }
}

pub struct Reconciler<'a> {
    runner: &'a dyn CommandRunner,
    commands: &'a CommandTable,
    work_dir: &'a Path,
}

impl<'a> Reconciler<'a> {
    pub fn new(runner: &'a dyn CommandRunner, commands: &'a CommandTable, work_dir: &'a Path) -> Self {
        Self {
            runner,
            commands,
            work_dir,
        }
    }

    /// Clone or sync a single repository into `documents_root/folder/name`
    pub async fn reconcile(
        &self,
        repository: &RepositoryDescriptor,
        folder: &FolderSpec,
        documents_root: &Path,
        owner: &Owner,
    ) -> Result<RepoOutcome, ReconcileError> {
        let path = target_path(documents_root, folder, &repository.name);
        self.reconcile_at(owner, repository, path).await
    }

    async fn reconcile_at(
        &self,
        owner: &Owner,
        repository: &RepositoryDescriptor,
        path: PathBuf,
    ) -> Result<RepoOutcome, ReconcileError> {
        let qualified = owner.qualify(&repository.name);

        match Action::for_path(&path) {
            Action::Clone => {
                info!("Cloning {} into {}", qualified, path.display());
                let result = self
                    .commands
                    .repo_clone(&qualified, &path)
                    .run(self.runner, self.work_dir)
                    .await;
                debug!("clone {}: {}", qualified, result.output.trim());

                if result.is_error {
                    return Err(ReconcileError::Clone {
                        repository: qualified,
                        path,
                        output: result.output.trim().to_string(),
                    });
                }
                Ok(RepoOutcome::Cloned {
                    repository: qualified,
                    path,
                })
            }
            Action::Sync => {
                info!("Syncing {} at {}", qualified, path.display());
                let result = self
                    .commands
                    .repo_sync(&path)
                    .run(self.runner, self.work_dir)
                    .await;
                debug!("sync {}: {}", qualified, result.output.trim());

                if result.is_error {
                    return Err(ReconcileError::Sync {
                        repository: qualified,
                        path,
                        output: result.output.trim().to_string(),
                    });
                }
                Ok(RepoOutcome::Synced {
                    repository: qualified,
                    path,
                })
            }
        }
    }

    /// Reconcile one planned entry. Never fails: errors become outcomes.
    pub async fn reconcile_entry(&self, entry: &PlanEntry) -> RepoOutcome {
        let qualified = entry.owner.qualify(&entry.repository.name);

        let placement = match &entry.placement {
            Ok(placement) => placement,
            Err(e) => {
                warn!("Skipping {}: {}", qualified, e);
                return RepoOutcome::Skipped {
                    repository: qualified,
                    error: e.clone(),
                };
            }
        };

        match self
            .reconcile_at(&entry.owner, &entry.repository, placement.path.clone())
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("{}", e);
                RepoOutcome::Failed {
                    repository: qualified,
                    error: e,
                }
            }
        }
    }

    /// Reconcile every entry in order, with no early exit
    pub async fn reconcile_all(&self, entries: &[PlanEntry]) -> ReconcileSummary {
        let start_time = Instant::now();
        info!("Reconciling {} repositories", entries.len());

        let mut results = Vec::with_capacity(entries.len());
        for entry in entries {
            results.push(self.reconcile_entry(entry).await);
        }

        let summary = ReconcileSummary::compile(results, start_time.elapsed());
        info!(
            "Reconciliation completed: {} cloned, {} synced, {} failed, {} skipped in {:.1}s",
            summary.cloned,
            summary.synced,
            summary.failed,
            summary.skipped,
            summary.duration.as_secs_f64()
        );
        summary
    }
}

/// Outcome of the directory bootstrap step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub created: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Every declared folder and every discovered organization's folder, in
/// order and without duplicates
pub fn required_directories<'o>(
    config: &RootConfig,
    documents_root: &Path,
    organizations: impl IntoIterator<Item = &'o str>,
) -> Vec<PathBuf> {
    let organization_folders = organizations
        .into_iter()
        .map(|org| mapping::organization_folder(org, config));

    let mut seen = HashSet::new();
    config
        .folders
        .iter()
        .cloned()
        .chain(organization_folders)
        .map(|folder| documents_root.join(folder.relative_path()).clean())
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

pub fn missing_directories(directories: &[PathBuf]) -> Vec<PathBuf> {
    directories
        .iter()
        .filter(|dir| !dir.exists())
        .cloned()
        .collect()
}

/// Create every missing directory. Safe to repeat.
pub async fn bootstrap_directories(directories: &[PathBuf]) -> BootstrapReport {
    let mut report = BootstrapReport::default();

    for dir in missing_directories(directories) {
        match tokio::fs::create_dir_all(&dir).await {
            Ok(()) => {
                debug!("Created {}", dir.display());
                report.created.push(dir);
            }
            Err(e) => {
                warn!("Failed to create {}: {}", dir.display(), e);
                report.failed.push((dir, e.to_string()));
            }
        }
    }

    info!("Created {} directories", report.created.len());
    report
}
