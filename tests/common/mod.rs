//! Common test utilities and helpers for projects-manager tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

use projects_manager::{CommandResult, CommandRunner, FolderSpec, GitConfig, HostPaths, RootConfig};

/// Test configuration helper
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub documents_root: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let documents_root = temp_dir.path().join("Documents");

        Self {
            temp_dir,
            documents_root,
        }
    }

    pub fn host_paths(&self) -> HostPaths {
        HostPaths {
            documents_root: self.documents_root.clone(),
            work_dir: self.temp_dir.path().to_path_buf(),
        }
    }

    pub fn create_test_config(&self, name: &str, content: &str) -> PathBuf {
        let config_path = self.temp_dir.path().join(name);
        std::fs::write(&config_path, content).expect("Failed to write test config");
        config_path
    }

    pub fn create_minimal_config(&self) -> PathBuf {
        self.create_test_config("appsettings.json", MINIMAL_CONFIG)
    }

    /// Directory with no executables, to hide git and gh from child processes
    pub fn empty_path_dir(&self) -> PathBuf {
        let dir = self.temp_dir.path().join("empty-bin");
        std::fs::create_dir_all(&dir).expect("Failed to create empty bin dir");
        dir
    }
}

pub const MINIMAL_CONFIG: &str = r#"{
  "GitConfig": {
    "Name": "Ada Lovelace",
    "Email": "ada@example.com",
    "Account": "ada"
  },
  "Folders": [
    { "Name": "Personal", "Path": "Develop\\Personal" },
    { "Name": "Tools", "Path": "Develop/Tools" }
  ]
}"#;

pub fn sample_config() -> RootConfig {
    RootConfig {
        git_config: GitConfig {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            account: "ada".to_string(),
        },
        folders: vec![
            FolderSpec::new("Personal", "Develop/Personal"),
            FolderSpec::new("Tools", "Develop/Tools"),
            FolderSpec::new("acme", "Clients/Acme"),
        ],
        organizations_path: "Develop/CustomerProjects".to_string(),
        documents_root: None,
    }
}

/// Mock hosted repository for listings
#[derive(Debug, Clone)]
pub struct MockRepository {
    pub name: String,
    pub description: Option<String>,
    pub visibility: &'static str,
}

impl MockRepository {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            visibility: "PUBLIC",
        }
    }

    pub fn described(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn as_private(mut self) -> Self {
        self.visibility = "PRIVATE";
        self
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description.clone().unwrap_or_default(),
            "visibility": self.visibility,
        })
    }
}

/// In-memory stand-in for git and gh. Clones create the target directory so
/// a second run sees them as present.
#[derive(Default)]
pub struct FakeHost {
    listings: HashMap<String, Vec<MockRepository>>,
    organizations: Vec<String>,
    failing: HashSet<String>,
    identity: Option<(String, String)>,
    calls: Mutex<Vec<String>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repositories(mut self, owner: &str, repositories: Vec<MockRepository>) -> Self {
        self.listings.insert(owner.to_string(), repositories);
        self
    }

    pub fn with_organization(mut self, org: &str, repositories: Vec<MockRepository>) -> Self {
        self.organizations.push(org.to_string());
        self.with_repositories(org, repositories)
    }

    /// Clone and sync of this repository name fail
    pub fn failing(mut self, repository: &str) -> Self {
        self.failing.insert(repository.to_string());
        self
    }

    pub fn with_identity(mut self, name: &str, email: &str) -> Self {
        self.identity = Some((name.to_string(), email.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn count(&self, needle: &str) -> usize {
        self.calls().iter().filter(|c| c.contains(needle)).count()
    }

    fn answer(&self, executable: &str, args: &[String]) -> CommandResult {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        match (executable, args.as_slice()) {
            ("git", ["--version"]) => CommandResult::ok("git version 2.43.0\n"),
            ("gh", ["--version"]) => CommandResult::ok("gh version 2.40.1 (2023-12-13)\n"),
            ("git", ["config", "--global", "--list"]) => match &self.identity {
                Some((name, email)) => CommandResult::ok(format!("user.name={}\nuser.email={}\n", name, email)),
                None => CommandResult::failure(),
            },
            ("git", ["config", "--global", _, _]) => CommandResult::ok(""),
            ("gh", ["auth", "status"]) => CommandResult::ok("github.com\n  - Active account: true\n"),
            ("gh", ["org", "list"]) => CommandResult::ok(self.organizations.join("\n")),
            ("gh", ["repo", "list", owner, ..]) => match self.listings.get(*owner) {
                Some(repos) => {
                    let json: Vec<_> = repos.iter().map(MockRepository::to_json).collect();
                    CommandResult::ok(serde_json::Value::Array(json).to_string())
                }
                None => CommandResult::error(format!("GraphQL: Could not resolve to a User with the login of '{}'.", owner)),
            },
            ("gh", ["repo", "clone", name, path]) => {
                let bare = name.rsplit('/').next().unwrap_or(*name);
                if self.failing.contains(bare) {
                    return CommandResult::error(format!("failed to clone {}", name));
                }
                std::fs::create_dir_all(path).expect("Failed to simulate clone");
                CommandResult::from_streams("", &format!("Cloning into '{}'...", path), true)
            }
            (_, [_, script]) if script.contains("repo sync") => {
                if self.failing.iter().any(|name| script.contains(name.as_str())) {
                    return CommandResult::error("can't sync: diverging changes");
                }
                CommandResult::ok("✓ Synced the \"main\" branch from the remote\n")
            }
            _ => CommandResult::failure(),
        }
    }
}

#[async_trait]
impl CommandRunner for FakeHost {
    async fn run(&self, executable: &str, args: &[String], _working_dir: &Path) -> CommandResult {
        self.calls
            .lock()
            .expect("calls lock")
            .push(format!("{} {}", executable, args.join(" ")));
        self.answer(executable, args)
    }
}

/// Assertion helpers for test validation
pub fn assert_contains_all(text: &str, expected: &[&str]) {
    for item in expected {
        assert!(
            text.contains(item),
            "Expected text to contain '{}', but it didn't. Text: {}",
            item,
            text
        );
    }
}
