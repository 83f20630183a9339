use dirs::config_dir;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::ConfigError;

/// File name of the configuration document
pub const CONFIG_FILE_NAME: &str = "appsettings.json";

/// Selects an `appsettings.<env>.json` overlay when set
pub const ENVIRONMENT_VAR: &str = "PROJECTS_MANAGER_ENVIRONMENT";

/// Root configuration, loaded once per run and never mutated
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RootConfig {
    /// Identity used for git configuration and as the default repository owner
    pub git_config: GitConfig,

    /// Declared folder mappings, in declaration order
    pub folders: Vec<FolderSpec>,

    /// Parent folder for organizations without a declared folder
    #[serde(default = "default_organizations_path")]
    pub organizations_path: String,

    /// Override for the OS documents folder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents_root: Option<String>,
}

/// Git identity and hosting account
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct GitConfig {
    pub name: String,
    pub email: String,
    pub account: String,
}

/// A mapping key and the destination path relative to the documents root
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct FolderSpec {
    pub name: String,
    pub path: String,
}

impl FolderSpec {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// `path` split on either separator, so `Develop\Personal` and
    /// `Develop/Personal` mean the same thing on every platform
    pub fn relative_path(&self) -> PathBuf {
        self.path
            .split(['/', '\\'])
            .filter(|part| !part.is_empty())
            .collect()
    }
}

fn default_organizations_path() -> String {
    "Develop/CustomerProjects".to_string()
}

impl RootConfig {
    /// Minimal configuration written by `init`: one personal folder
    pub fn starter(git_config: GitConfig) -> Self {
        Self {
            git_config,
            folders: vec![FolderSpec::new("Personal", "Develop/Personal")],
            organizations_path: default_organizations_path(),
            documents_root: None,
        }
    }

    /// Find the configuration file: explicit path, then beside the
    /// executable, then the user config directory
    pub fn locate(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(ConfigError::NotFound {
                searched: vec![path.to_path_buf()],
            });
        }

        let searched = Self::candidate_paths();
        searched
            .iter()
            .find(|path| path.exists())
            .cloned()
            .ok_or(ConfigError::NotFound { searched })
    }

    /// Default search locations, in priority order
    pub fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            paths.push(exe_dir.join(CONFIG_FILE_NAME));
        }

        if let Ok(path) = Self::default_config_path() {
            paths.push(path);
        }

        paths
    }

    /// Per-user configuration path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = config_dir().ok_or_else(|| {
            ConfigError::Invalid("Failed to get user config directory".to_string())
        })?;

        Ok(config_dir.join("projects-manager").join(CONFIG_FILE_NAME))
    }

    /// Load from a file, applying the environment overlay named by
    /// [`ENVIRONMENT_VAR`] when one exists
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let environment = std::env::var(ENVIRONMENT_VAR).ok().filter(|e| !e.trim().is_empty());
        Self::load_with_environment(path, environment.as_deref())
    }

    pub fn load_with_environment(path: &Path, environment: Option<&str>) -> Result<Self, ConfigError> {
        let mut value = read_value(path)?;

        if let Some(environment) = environment {
            let overlay = overlay_path(path, environment);
            if overlay.exists() {
                info!("Applying configuration overlay: {}", overlay.display());
                merge_values(&mut value, read_value(&overlay)?);
            } else {
                debug!("No overlay for environment '{}' at {}", environment, overlay.display());
            }
        }

        let config: RootConfig = serde_json::from_value(value).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        for warning in config.validate()? {
            warn!("{}", warning);
        }

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = if is_yaml(path) {
            serde_yaml::to_string(self).map_err(|e| ConfigError::Invalid(e.to_string()))?
        } else {
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject blank required values. Returns non-fatal warnings.
    pub fn validate(&self) -> Result<Vec<String>, ConfigError> {
        let identity = [
            ("GitConfig.Name", &self.git_config.name),
            ("GitConfig.Email", &self.git_config.email),
            ("GitConfig.Account", &self.git_config.account),
        ];
        for (field, value) in identity {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", field)));
            }
        }

        let mut warnings = Vec::new();
        let mut seen = HashSet::new();

        for (index, folder) in self.folders.iter().enumerate() {
            if folder.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("Folders[{}].Name must not be empty", index)));
            }
            if folder.relative_path().as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!("Folders[{}].Path must not be empty", index)));
            }
            if !seen.insert(folder.name.as_str()) {
                warnings.push(format!(
                    "Folder name '{}' is declared more than once; the first declaration wins",
                    folder.name
                ));
            }
        }

        if self.folders.is_empty() {
            warnings.push("No folders are declared; every repository will fail to resolve".to_string());
        }

        Ok(warnings)
    }
}

/// Paths discovered from the host for this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPaths {
    /// Root all folder paths are relative to
    pub documents_root: PathBuf,
    /// Working directory for tool commands
    pub work_dir: PathBuf,
}

impl HostPaths {
    /// Documents root priority: explicit override, `DocumentsRoot`, the OS
    /// documents folder, then `<home>/Documents`
    pub fn resolve(config: &RootConfig, documents_override: Option<&Path>) -> Result<Self, ConfigError> {
        let home = dirs::home_dir();

        let documents_root = match (documents_override, &config.documents_root) {
            (Some(path), _) => path.to_path_buf(),
            (None, Some(configured)) => PathBuf::from(
                shellexpand::full(configured)
                    .map_err(|e| ConfigError::Invalid(format!("DocumentsRoot: {}", e)))?
                    .as_ref(),
            ),
            (None, None) => dirs::document_dir()
                .or_else(|| home.as_ref().map(|h| h.join("Documents")))
                .ok_or_else(|| ConfigError::Invalid("Failed to locate a documents folder".to_string()))?,
        };

        let work_dir = home
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            documents_root,
            work_dir,
        })
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}

/// Parse a JSON or YAML document into a generic value
fn read_value(path: &Path) -> Result<Value, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let parsed = if is_yaml(path) {
        serde_yaml::from_str::<Value>(&content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str::<Value>(&content).map_err(|e| e.to_string())
    };

    parsed.map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// `appsettings.json` + `Development` -> `appsettings.Development.json`
pub fn overlay_path(base: &Path, environment: &str) -> PathBuf {
    let stem = base
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("appsettings");
    let file_name = match base.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}.{}.{}", stem, environment, ext),
        None => format!("{}.{}", stem, environment),
    };
    base.with_file_name(file_name)
}

/// Objects merge key by key; anything else in the overlay replaces the base
pub fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
