use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use projects_manager::health::CheckResult;
use projects_manager::logging::init_logging;
use projects_manager::reconcile::{Action, PlanEntry};
use projects_manager::restart::{self, RelaunchDecision, RelaunchHistory};
use projects_manager::workflow::ToolReport;
use projects_manager::{
    CommandTable, GitConfig, HealthCheck, HostPaths, ProvisionOutcome, RepoOutcome, RestartReason,
    RootConfig, RunOptions, RunOutcome, RunReport, SystemRunner, Workflow,
};

#[derive(Parser)]
#[command(name = "projects-manager")]
#[command(about = "Set up git tooling and clone or sync every repository you own")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path (defaults to appsettings.json beside the
    /// executable, then the XDG config location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Root folder the configured paths are relative to (defaults to the OS
    /// documents folder)
    #[arg(long, global = true)]
    documents_root: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Install tools, discover repositories, then clone or sync them (default)
    Run {
        /// Show what would be created, cloned and synced without doing it
        #[arg(long)]
        dry_run: bool,

        /// Assume git and the GitHub CLI are already set up
        #[arg(long)]
        skip_tools: bool,
    },

    /// List discovered repositories and their resolved folders
    List,

    /// System health check and diagnostics
    Doctor,

    /// Write a starter configuration file
    Init {
        /// Git user.name
        #[arg(long)]
        name: String,

        /// Git user.email
        #[arg(long)]
        email: String,

        /// GitHub account that owns the personal repositories
        #[arg(long)]
        account: String,

        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },
}

/// Everything a command needs once configuration is loaded
struct Session {
    config: RootConfig,
    paths: HostPaths,
    runner: SystemRunner,
    commands: CommandTable,
}

impl Session {
    fn load(config_path: Option<&Path>, documents_root: Option<&Path>) -> Result<Self> {
        let path = RootConfig::locate(config_path)?;
        info!("Using configuration: {}", path.display());

        let config = RootConfig::load(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
        let paths = HostPaths::resolve(&config, documents_root).context("Failed to resolve host paths")?;
        info!("Documents root: {}", paths.documents_root.display());

        Ok(Self {
            config,
            paths,
            runner: SystemRunner::new(),
            commands: CommandTable::for_platform(),
        })
    }

    fn workflow(&self) -> Workflow<'_> {
        Workflow::new(&self.runner, &self.commands, &self.config, &self.paths)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let Cli {
        command,
        config,
        documents_root,
        verbose,
    } = Cli::parse();

    init_logging(verbose);
    info!("Starting projects-manager v{}", env!("CARGO_PKG_VERSION"));

    let command = command.unwrap_or(Commands::Run {
        dry_run: false,
        skip_tools: false,
    });

    match command {
        Commands::Init {
            name,
            email,
            account,
            force,
        } => cmd_init(GitConfig { name, email, account }, config, force),
        Commands::Run { dry_run, skip_tools } => {
            let session = Session::load(config.as_deref(), documents_root.as_deref())?;
            cmd_run(&session, RunOptions { dry_run, skip_tools }).await
        }
        Commands::List => {
            let session = Session::load(config.as_deref(), documents_root.as_deref())?;
            cmd_list(&session).await
        }
        Commands::Doctor => {
            let session = Session::load(config.as_deref(), documents_root.as_deref())?;
            cmd_doctor(&session).await
        }
    }
}

/// Write a starter configuration
fn cmd_init(git_config: GitConfig, config_path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = match config_path {
        Some(path) => path,
        None => RootConfig::default_config_path()?,
    };

    if path.exists() && !force {
        bail!(
            "Configuration already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    let config = RootConfig::starter(git_config);
    config.validate()?;
    config.save(&path)?;

    info!("Configuration saved to: {}", path.display());

    println!("✅ Configuration written");
    println!("   Config: {}", path.display());
    println!("   Next: add folders for your repository descriptions, then run 'projects-manager'");

    Ok(())
}

async fn cmd_run(session: &Session, options: RunOptions) -> Result<()> {
    match session.workflow().run(options).await {
        RunOutcome::Completed(report) => {
            print_run_report(&report, options.dry_run);
            Ok(())
        }
        RunOutcome::RestartRequired(reason) => {
            handle_restart(&reason);
            Ok(())
        }
    }
}

/// Relaunch after an install or login, at most once per reason
fn handle_restart(reason: &RestartReason) {
    println!("🔄 Restart required: {}", reason);

    match restart::decide(&RelaunchHistory::from_env(), reason) {
        RelaunchDecision::Relaunch { history } => match restart::relaunch(&history) {
            Ok(()) => println!("🚀 Continuing in a new window"),
            Err(e) => {
                error!("{:#}", e);
                println!("❌ Could not restart automatically. Open a new terminal and run projects-manager again.");
            }
        },
        RelaunchDecision::Suppress { depth } => {
            error!(
                "Restart requested again after {} relaunch(es) ({}), not relaunching",
                depth, reason
            );
            println!("❌ Still not ready after restarting. Check 'projects-manager doctor', then run again from a new terminal.");
        }
    }
}

fn print_run_report(report: &RunReport, dry_run: bool) {
    if !report.tools.is_empty() {
        println!("🔧 Tools:");
        for tool in &report.tools {
            print_tool(tool);
        }
        println!();
    }

    if dry_run {
        println!("🔍 Dry run - nothing was changed");
        for dir in &report.missing_directories {
            println!("  📁 Would create {}", dir.display());
        }
        for entry in &report.plan {
            print_plan_entry(entry);
        }
        return;
    }

    if !report.bootstrap.created.is_empty() {
        println!("📁 Created {} directories", report.bootstrap.created.len());
    }
    for (dir, reason) in &report.bootstrap.failed {
        println!("⚠️  Could not create {}: {}", dir.display(), reason);
    }

    if let Some(summary) = &report.summary {
        println!(
            "✅ Done: {} cloned, {} synced, {} failed, {} skipped ({:.1}s)",
            summary.cloned,
            summary.synced,
            summary.failed,
            summary.skipped,
            summary.duration.as_secs_f64()
        );

        for result in &summary.results {
            match result {
                RepoOutcome::Failed { repository, error } => println!("  ❌ {}: {}", repository, error),
                RepoOutcome::Skipped { repository, error } => println!("  ⏭️  {}: {}", repository, error),
                RepoOutcome::Cloned { .. } | RepoOutcome::Synced { .. } => {}
            }
        }
    }
}

fn print_tool(tool: &ToolReport) {
    match &tool.outcome {
        ProvisionOutcome::Ready { version } => {
            println!("  ✅ {} {}", tool.tool, version.as_deref().unwrap_or(""))
        }
        ProvisionOutcome::Unavailable { state, error } => {
            println!("  ❌ {} ({}): {}", tool.tool, state, error)
        }
        ProvisionOutcome::RestartRequired { reason } => println!("  🔄 {}: {}", tool.tool, reason),
    }
}

fn print_plan_entry(entry: &PlanEntry) {
    let name = entry.owner.qualify(&entry.repository.name);

    match &entry.placement {
        Ok(placement) => {
            let verb = match Action::for_path(&placement.path) {
                Action::Clone => "📥 Would clone",
                Action::Sync => "🔄 Would sync",
            };
            println!("  {} {} -> {}", verb, name, placement.path.display())
        }
        Err(e) => println!("  ⚠️  Would skip {}: {}", name, e),
    }
}

async fn cmd_list(session: &Session) -> Result<()> {
    info!("Listing repositories...");

    let entries = session.workflow().list().await;
    println!("Repositories ({}): ", entries.len());

    for entry in &entries {
        let name = entry.owner.qualify(&entry.repository.name);
        match &entry.placement {
            Ok(placement) => println!(
                "  📁 {} [{}] -> {}",
                name,
                entry.repository.visibility,
                placement.path.display()
            ),
            Err(e) => println!("  ⚠️  {} [{}]: {}", name, entry.repository.visibility, e),
        }
    }

    Ok(())
}

async fn cmd_doctor(session: &Session) -> Result<()> {
    let health = HealthCheck::run(&session.runner, &session.commands, &session.config, &session.paths).await;
    print_health_report(&health);
    Ok(())
}

/// Print health check report to stdout
fn print_health_report(health: &HealthCheck) {
    fn print_check(name: &str, result: &CheckResult) {
        println!("{}:", name);
        let icon = if result.passed {
            if result.is_warning { "⚠️ " } else { "✅" }
        } else {
            "❌"
        };
        println!("  {} {}", icon, result.message);
        if let Some(details) = &result.details {
            for line in details.lines() {
                println!("     {}", line);
            }
        }
    }

    println!("🔍 projects-manager diagnostics");
    println!();

    for (name, result) in health.all_checks() {
        print_check(name, result);
        println!();
    }

    if health.all_passed() {
        println!("✅ All checks passed");
    } else {
        println!("❌ Some checks failed");
    }
}
