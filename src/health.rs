//! Read-only diagnostics for the `doctor` command
//!
//! Reuses the detector and recognizers the installer uses, but never
//! installs, configures or logs in.

use std::path::Path;

use crate::commands::CommandTable;
use crate::config::{HostPaths, RootConfig};
use crate::detector::Detector;
use crate::process::CommandRunner;
use crate::recognizer::{OutputRecognizer, SubstringRecognizer};
use crate::reconcile;

/// Result of system health checks
#[derive(Debug, Clone)]
pub struct HealthCheck {
    /// Git installation status
    pub git: CheckResult,
    /// Global git identity matches the configuration
    pub git_identity: CheckResult,
    /// GitHub CLI installation status
    pub hosting_cli: CheckResult,
    /// GitHub CLI authentication status
    pub hosting_auth: CheckResult,
    /// Documents root status
    pub documents_root: CheckResult,
    /// Declared folders (warning only, they are created on the next run)
    pub folders: CheckResult,
}

/// Result of an individual health check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
    pub is_warning: bool,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: None,
            is_warning: false,
        }
    }

    fn ok_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            details: Some(details.into()),
            ..Self::ok(message)
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
            details: None,
            is_warning: false,
        }
    }

    fn error_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            details: Some(details.into()),
            ..Self::error(message)
        }
    }

    fn warning_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: Some(details.into()),
            is_warning: true,
        }
    }
}

impl HealthCheck {
    /// Run all health checks
    pub async fn run(
        runner: &dyn CommandRunner,
        commands: &CommandTable,
        config: &RootConfig,
        paths: &HostPaths,
    ) -> Self {
        let work_dir = paths.work_dir.as_path();
        let detector = Detector::new(runner);

        let git_version = detector.detect(&commands.git_version(), work_dir).await;
        let git = match &git_version {
            Some(found) => CheckResult::ok_with_details("Git installed", found.version.clone()),
            None => CheckResult::error_with_details(
                "Git not found in PATH",
                format!("Run without --skip-tools to install it with: {}", commands.git_install.display()),
            ),
        };

        let git_identity = if git_version.is_some() {
            let listing = commands.git_config_list().run(runner, work_dir).await;
            Self::check_identity(listing.text(), config)
        } else {
            CheckResult::error("Git identity not checked (git missing)")
        };

        let gh_version = detector.detect(&commands.gh_version(), work_dir).await;
        let hosting_cli = match &gh_version {
            Some(found) => CheckResult::ok_with_details("GitHub CLI installed", found.version.clone()),
            None => CheckResult::error_with_details(
                "GitHub CLI not found in PATH",
                format!("Install it with: {}", commands.gh_install.display()),
            ),
        };

        let hosting_auth = if gh_version.is_some() {
            let status = commands.gh_auth_status().run(runner, work_dir).await;
            Self::check_auth(&status.output, &config.git_config.account)
        } else {
            CheckResult::error("GitHub authentication not checked (gh missing)")
        };

        Self {
            git,
            git_identity,
            hosting_cli,
            hosting_auth,
            documents_root: Self::check_documents_root(&paths.documents_root),
            folders: Self::check_folders(config, &paths.documents_root),
        }
    }

    /// Check if all required checks passed (excludes warnings)
    pub fn all_passed(&self) -> bool {
        self.all_checks().iter().all(|(_, r)| r.passed)
    }

    /// Get list of failed checks (errors only, not warnings)
    pub fn errors(&self) -> Vec<&CheckResult> {
        self.all_checks()
            .into_iter()
            .map(|(_, r)| r)
            .filter(|r| !r.passed && !r.is_warning)
            .collect()
    }

    /// Get list of warnings
    pub fn warnings(&self) -> Vec<&CheckResult> {
        self.all_checks()
            .into_iter()
            .map(|(_, r)| r)
            .filter(|r| r.is_warning)
            .collect()
    }

    pub fn all_checks(&self) -> [(&'static str, &CheckResult); 6] {
        [
            ("Git", &self.git),
            ("Git identity", &self.git_identity),
            ("GitHub CLI", &self.hosting_cli),
            ("GitHub auth", &self.hosting_auth),
            ("Documents root", &self.documents_root),
            ("Folders", &self.folders),
        ]
    }

    fn check_identity(listing: Option<&str>, config: &RootConfig) -> CheckResult {
        let identity = &config.git_config;
        match listing {
            Some(text) if text.contains(&identity.name) && text.contains(&identity.email) => {
                CheckResult::ok_with_details(
                    "Git identity configured",
                    format!("{} <{}>", identity.name, identity.email),
                )
            }
            _ => CheckResult::error_with_details(
                "Git identity not configured",
                format!(
                    "Expected user.name={} and user.email={} in the global git config",
                    identity.name, identity.email
                ),
            ),
        }
    }

    fn check_auth(status: &str, account: &str) -> CheckResult {
        if SubstringRecognizer::active_account().is_match(status) {
            CheckResult::ok("GitHub CLI authenticated")
        } else {
            CheckResult::error_with_details(
                "GitHub CLI not authenticated",
                format!("Run: gh auth login (as {})", account),
            )
        }
    }

    fn check_documents_root(path: &Path) -> CheckResult {
        if path.is_dir() {
            CheckResult::ok_with_details("Documents root exists", path.display().to_string())
        } else {
            CheckResult::error_with_details("Documents root missing", path.display().to_string())
        }
    }

    fn check_folders(config: &RootConfig, documents_root: &Path) -> CheckResult {
        let declared = reconcile::required_directories(config, documents_root, std::iter::empty());
        let missing = reconcile::missing_directories(&declared);

        if missing.is_empty() {
            CheckResult::ok_with_details("Declared folders exist", format!("{} folders", declared.len()))
        } else {
            let names: Vec<String> = missing.iter().map(|p| p.display().to_string()).collect();
            CheckResult::warning_with_details(
                format!("{} declared folders missing (created on next run)", missing.len()),
                names.join(", "),
            )
        }
    }
}
