//! Command shapes for the external tools
//!
//! The core only depends on the command-line contracts of git and the GitHub
//! CLI. This module is the one place those contracts are spelled out.

use std::path::Path;

use crate::process::{CommandResult, CommandRunner};

/// Maximum repositories requested per listing call
pub const REPO_LIST_LIMIT: u32 = 100;

/// Fields requested from `gh repo list --json`
pub const REPO_LIST_FIELDS: &str = "name,description,visibility";

/// General command shell used for compound commands such as `cd <dir> && ...`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    /// `cmd.exe /c`
    Cmd,
    /// `sh -c`
    Posix,
}

impl Shell {
    pub fn current() -> Self {
        if cfg!(windows) {
            Shell::Cmd
        } else {
            Shell::Posix
        }
    }

    pub fn program(&self) -> &'static str {
        match self {
            Shell::Cmd => "cmd.exe",
            Shell::Posix => "sh",
        }
    }

    /// Wrap a script into a shell invocation
    pub fn invocation(&self, script: String) -> Invocation {
        let flag = match self {
            Shell::Cmd => "/c",
            Shell::Posix => "-c",
        };
        Invocation::new(self.program(), [flag.to_string(), script])
    }

    /// Quote a path for use inside a script
    pub fn quote(&self, path: &Path) -> String {
        let raw = path.to_string_lossy();
        match self {
            Shell::Cmd => format!("\"{}\"", raw),
            Shell::Posix => format!("'{}'", raw.replace('\'', r"'\''")),
        }
    }
}

/// A program plus its argument vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Human readable command line, for logs
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    pub async fn run(&self, runner: &dyn CommandRunner, working_dir: &Path) -> CommandResult {
        runner.run(&self.program, &self.args, working_dir).await
    }

    pub async fn run_interactive(&self, runner: &dyn CommandRunner, working_dir: &Path) -> CommandResult {
        runner
            .run_interactive(&self.program, &self.args, working_dir)
            .await
    }
}

/// Every external command the pipeline issues, for one platform
#[derive(Debug, Clone)]
pub struct CommandTable {
    pub shell: Shell,
    pub git_program: String,
    pub gh_program: String,
    pub git_install: Invocation,
    pub gh_install: Invocation,
}

impl CommandTable {
    /// Commands for the platform this binary was built for
    pub fn for_platform() -> Self {
        let (git_install, gh_install) = if cfg!(windows) {
            (
                Invocation::new("winget", ["install", "--id", "Git.Git", "-e", "--source", "winget"]),
                Invocation::new("winget", ["install", "--id", "GitHub.cli", "-e", "--source", "winget"]),
            )
        } else if cfg!(target_os = "macos") {
            (
                Invocation::new("brew", ["install", "git"]),
                Invocation::new("brew", ["install", "gh"]),
            )
        } else {
            (
                Invocation::new("sudo", ["apt-get", "install", "-y", "git"]),
                Invocation::new("sudo", ["apt-get", "install", "-y", "gh"]),
            )
        };

        Self {
            shell: Shell::current(),
            git_program: "git".to_string(),
            gh_program: "gh".to_string(),
            git_install,
            gh_install,
        }
    }

    pub fn git_version(&self) -> Invocation {
        Invocation::new(&self.git_program, ["--version"])
    }

    pub fn git_config_list(&self) -> Invocation {
        Invocation::new(&self.git_program, ["config", "--global", "--list"])
    }

    pub fn git_set_name(&self, name: &str) -> Invocation {
        Invocation::new(&self.git_program, ["config", "--global", "user.name", name])
    }

    pub fn git_set_email(&self, email: &str) -> Invocation {
        Invocation::new(&self.git_program, ["config", "--global", "user.email", email])
    }

    pub fn gh_version(&self) -> Invocation {
        Invocation::new(&self.gh_program, ["--version"])
    }

    pub fn gh_auth_status(&self) -> Invocation {
        Invocation::new(&self.gh_program, ["auth", "status"])
    }

    pub fn gh_auth_login(&self) -> Invocation {
        Invocation::new(&self.gh_program, ["auth", "login"])
    }

    /// `gh repo list <owner> --json name,description,visibility --limit 100`
    pub fn repo_list(&self, owner: &str) -> Invocation {
        Invocation::new(
            &self.gh_program,
            [
                "repo".to_string(),
                "list".to_string(),
                owner.to_string(),
                "--json".to_string(),
                REPO_LIST_FIELDS.to_string(),
                "--limit".to_string(),
                REPO_LIST_LIMIT.to_string(),
            ],
        )
    }

    pub fn org_list(&self) -> Invocation {
        Invocation::new(&self.gh_program, ["org", "list"])
    }

    /// `gh repo clone <qualified-name> <path>`
    pub fn repo_clone(&self, qualified_name: &str, path: &Path) -> Invocation {
        Invocation::new(
            &self.gh_program,
            [
                "repo".to_string(),
                "clone".to_string(),
                qualified_name.to_string(),
                path.to_string_lossy().into_owned(),
            ],
        )
    }

    /// Change into `path` and run `gh repo sync` through the shell
    pub fn repo_sync(&self, path: &Path) -> Invocation {
        let script = format!("cd {} && {} repo sync", self.shell.quote(path), self.gh_program);
        self.shell.invocation(script)
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::for_platform()
    }
}
