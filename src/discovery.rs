//! Repository discovery
//!
//! Lists the repositories owned by the configured account and by every
//! organization it belongs to. Failures never propagate: a listing that
//! cannot be fetched or parsed is logged and treated as empty.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::commands::CommandTable;
use crate::error::DiscoveryError;
use crate::process::CommandRunner;

/// Syntactically valid account or organization login
const LOGIN_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9-]{0,38}$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum Visibility {
    Public,
    Private,
    Internal,
}

impl TryFrom<String> for Visibility {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_ascii_uppercase().as_str() {
            "PUBLIC" => Ok(Visibility::Public),
            "PRIVATE" => Ok(Visibility::Private),
            "INTERNAL" => Ok(Visibility::Internal),
            _ => Err(format!("unknown visibility '{}'", value)),
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// One remote repository as reported by the hosting service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub visibility: Visibility,
}

impl RepositoryDescriptor {
    pub fn new(name: impl Into<String>, description: Option<&str>, visibility: Visibility) -> Self {
        Self {
            name: name.into(),
            description: description.map(str::to_string),
            visibility,
        }
    }

    /// Description used as the folder mapping key, if it is not blank
    pub fn mapping_key(&self) -> Option<&str> {
        self.description.as_deref().filter(|d| !d.trim().is_empty())
    }
}

/// Who a repository listing is scoped to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Owner {
    Personal(String),
    Organization(String),
}

impl Owner {
    pub fn name(&self) -> &str {
        match self {
            Owner::Personal(name) | Owner::Organization(name) => name,
        }
    }

    pub fn is_organization(&self) -> bool {
        matches!(self, Owner::Organization(_))
    }

    /// Name passed to `gh repo clone`: bare for personal repositories,
    /// `org/name` for organization repositories
    pub fn qualify(&self, repository: &str) -> String {
        match self {
            Owner::Personal(_) => repository.to_string(),
            Owner::Organization(org) => format!("{}/{}", org, repository),
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Repositories of one organization, in listing order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationRepositories {
    pub name: String,
    pub repositories: Vec<RepositoryDescriptor>,
}

/// Everything discovered in one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredRepositories {
    pub personal: Vec<RepositoryDescriptor>,
    pub organizations: Vec<OrganizationRepositories>,
}

impl DiscoveredRepositories {
    pub fn total(&self) -> usize {
        self.personal.len()
            + self
                .organizations
                .iter()
                .map(|org| org.repositories.len())
                .sum::<usize>()
    }

    pub fn organization_names(&self) -> impl Iterator<Item = &str> {
        self.organizations.iter().map(|org| org.name.as_str())
    }
}

/// Source of repository listings
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Repositories owned by `owner`; empty when the listing fails
    async fn list_repositories(&self, owner: &Owner) -> Vec<RepositoryDescriptor>;

    /// Organizations the authenticated user belongs to, in listing order
    async fn list_organizations(&self) -> Vec<String>;

    /// Personal repositories followed by one listing per organization
    async fn discover(&self, account: &str) -> DiscoveredRepositories {
        let personal = self
            .list_repositories(&Owner::Personal(account.to_string()))
            .await;
        info!("Discovered {} repositories for {}", personal.len(), account);

        let mut organizations = Vec::new();
        for name in self.list_organizations().await {
            let repositories = self
                .list_repositories(&Owner::Organization(name.clone()))
                .await;
            info!("Discovered {} repositories for organization {}", repositories.len(), name);
            organizations.push(OrganizationRepositories { name, repositories });
        }

        DiscoveredRepositories {
            personal,
            organizations,
        }
    }
}

/// Discovery through the GitHub CLI
pub struct GhDiscovery<'a> {
    runner: &'a dyn CommandRunner,
    commands: &'a CommandTable,
    work_dir: &'a Path,
}

impl<'a> GhDiscovery<'a> {
    pub fn new(runner: &'a dyn CommandRunner, commands: &'a CommandTable, work_dir: &'a Path) -> Self {
        Self {
            runner,
            commands,
            work_dir,
        }
    }

    async fn fetch(&self, owner: &Owner) -> Result<Vec<RepositoryDescriptor>, DiscoveryError> {
        let command = self.commands.repo_list(owner.name());
        debug!("Listing repositories: {}", command.display());

        let result = command.run(self.runner, self.work_dir).await;
        if result.is_error {
            return Err(DiscoveryError::Command {
                owner: owner.name().to_string(),
                output: result.output.trim().to_string(),
            });
        }

        parse_repository_list(owner.name(), &result.output)
    }
}

#[async_trait]
impl Discovery for GhDiscovery<'_> {
    async fn list_repositories(&self, owner: &Owner) -> Vec<RepositoryDescriptor> {
        match self.fetch(owner).await {
            Ok(repositories) => repositories,
            Err(e) => {
                warn!("{}", e);
                Vec::new()
            }
        }
    }

    async fn list_organizations(&self) -> Vec<String> {
        let result = self.commands.org_list().run(self.runner, self.work_dir).await;
        if result.is_error {
            warn!("Organization listing failed: {}", result.output.trim());
            return Vec::new();
        }

        let organizations = parse_organizations(&result.output);
        debug!("Organizations: {:?}", organizations);
        organizations
    }
}

/// Parse `gh repo list --json name,description,visibility` output
pub fn parse_repository_list(owner: &str, output: &str) -> Result<Vec<RepositoryDescriptor>, DiscoveryError> {
    serde_json::from_str(output.trim()).map_err(|source| DiscoveryError::Parse {
        owner: owner.to_string(),
        source,
    })
}

/// Organization logins from `gh org list`, one per line. Lines that are not
/// a valid login (headers, notices) are ignored.
pub fn parse_organizations(output: &str) -> Vec<String> {
    let login = match Regex::new(LOGIN_PATTERN) {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    output
        .lines()
        .map(str::trim)
        .filter(|line| login.is_match(line))
        .map(str::to_string)
        .collect()
}
