//! Error taxonomy
//!
//! Every class except [`ConfigError`] is recovered at the boundary of the
//! operation that produced it: the installer reports [`ToolError`] inside its
//! outcome, discovery turns [`DiscoveryError`] into an empty list, and the
//! reconciliation loop records [`ResolutionError`] and [`ReconcileError`] per
//! repository before moving on.

use std::path::PathBuf;
use thiserror::Error;

/// A required external tool could not be brought to a usable state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("{tool} installer failed: {output}")]
    Install { tool: String, output: String },

    #[error("{tool} was not detected after {attempts} attempts")]
    NotDetected { tool: String, attempts: u32 },

    #[error("failed to configure {tool}: {output}")]
    Configure { tool: String, output: String },

    #[error("{tool} login failed: {output}")]
    Login { tool: String, output: String },
}

/// Listing or parsing a repository set failed
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("repository listing for '{owner}' failed: {output}")]
    Command { owner: String, output: String },

    #[error("could not parse repository listing for '{owner}': {source}")]
    Parse {
        owner: String,
        #[source]
        source: serde_json::Error,
    },
}

/// No declared folder matches a repository
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("no folder named '{key}' is declared for repository '{repository}'")]
    NoMatch { repository: String, key: String },

    #[error("no folders are declared, cannot place repository '{repository}'")]
    NoFolders { repository: String },
}

/// A clone or sync command failed for one repository
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("clone of '{repository}' into {} failed: {output}", path.display())]
    Clone {
        repository: String,
        path: PathBuf,
        output: String,
    },

    #[error("sync of '{repository}' at {} failed: {output}", path.display())]
    Sync {
        repository: String,
        path: PathBuf,
        output: String,
    },
}

/// Configuration file missing, unreadable or invalid. Aborts the run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no configuration file found (looked in: {})", searched.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    NotFound { searched: Vec<PathBuf> },

    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config file {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
