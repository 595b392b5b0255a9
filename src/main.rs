//! weaver - governed autonomous mutation engine
//!
//! Usage:
//!   weaver run                  → bounded cycle run with the configured collaborators
//!   weaver scheduled            → single governed run (cron / CI entry point)
//!   weaver status               → print the status report
//!   weaver propose "<task>"     → print a proposal, touch nothing
//!   weaver validate             → collaborator health and readiness
//!   weaver --dump-config        → print the effective config as TOML

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weaver_autonomy::{
    export_status, run_scheduled_once, AutonomyGuard, Collaborators, CycleScheduler,
    ProposalEngine, ScheduledOptions, SchedulerConfig, SleepWait, StatusReport,
};
use weaver_core::config::GitConfig;
use weaver_core::{Governance, WeaverConfig};
use weaver_llm::DeterministicGenerator;
use weaver_tools::{GitOps, RepoWorkspace, Workspace};

const DEFAULT_LOG_FILTER: &str =
    "weaver=info,weaver_core=info,weaver_llm=info,weaver_tools=info,weaver_autonomy=info,weaver_echofield=info";

#[derive(Parser)]
#[command(
    name = "weaver",
    about = "Governed autonomous mutation engine",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the weaver config file (TOML)
    #[arg(long, global = true, default_value = "weaver.toml")]
    config: PathBuf,

    /// Print the effective config (file + environment) and exit
    #[arg(long, default_value_t = false)]
    dump_config: bool,

    /// Write logs to a file as well as stderr (or set WEAVER_LOGFILE)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the cycle scheduler once, up to the configured depth
    Run {
        /// Override the configured depth
        #[arg(short, long)]
        depth: Option<u32>,
        /// Override the configured task
        #[arg(short, long)]
        task: Option<String>,
    },
    /// Governed single run gated by governance/autonomy.json
    Scheduled {
        /// Task text for the run
        #[arg(short, long)]
        task: Option<String>,
    },
    /// Print the status report as JSON
    Status,
    /// Describe a change without applying it
    Propose {
        /// What the change should accomplish
        task: String,
    },
    /// Probe collaborators and report readiness
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log_file = cli
        .log_file
        .clone()
        .or_else(|| std::env::var("WEAVER_LOGFILE").ok().map(PathBuf::from));
    let _log_guard = init_tracing(log_file.as_deref())?;

    let mut config = WeaverConfig::load(&cli.config);
    config.apply_env(|k| std::env::var(k).ok());

    if cli.dump_config {
        print!("{}", config.to_toml());
        return Ok(());
    }

    let autonomous = std::env::var("WEAVER_AUTONOMOUS").is_ok_and(|v| v.trim() == "true");
    let governance = Governance::load(&config.governance.dir, autonomous);

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Run { depth, task } => run(&config, &governance, depth, task).await?,
        Commands::Scheduled { task } => scheduled(&config, &governance, task).await?,
        Commands::Status => status(&config, &governance).await?,
        Commands::Propose { task } => {
            let proposal = ProposalEngine::new().propose(&task);
            println!("{}", serde_json::to_string_pretty(&proposal)?);
        }
        Commands::Validate => validate(&config).await?,
    }

    Ok(())
}

fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(guard)
}

/// Scheduled runs inherit the autonomy extension allow-list when the git
/// section does not set its own.
fn scheduled_git_config(config: &WeaverConfig, governance: &Governance) -> GitConfig {
    let mut git = config.git.clone();
    if git.allowed_extensions.is_empty() {
        if let Some(autonomy) = &governance.autonomy {
            git.allowed_extensions = autonomy.allowed_extensions.clone();
        }
    }
    git
}

fn build_collaborators(config: &WeaverConfig, git: GitConfig) -> anyhow::Result<Collaborators> {
    let workspace = RepoWorkspace::from_config(&config.workspace)?;
    let vcs = GitOps::new(workspace.root(), git);
    Ok(Collaborators::new()
        .with_generator(Arc::new(DeterministicGenerator::default()))
        .with_workspace(Arc::new(workspace))
        .with_vcs(Arc::new(vcs)))
}

fn write_status(config: &WeaverConfig, report: &StatusReport) -> anyhow::Result<()> {
    if let Some(path) = &config.status.export_path {
        export_status(path, report)?;
    }
    Ok(())
}

async fn run(
    config: &WeaverConfig,
    governance: &Governance,
    depth: Option<u32>,
    task: Option<String>,
) -> anyhow::Result<()> {
    let mut scheduler_config = SchedulerConfig::from(&config.engine);
    if let Some(task) = task {
        scheduler_config.initial_task = task;
    }
    let collaborators = build_collaborators(config, config.git.clone())?
        .with_guard(AutonomyGuard::new(governance.guard_config()));
    let mut scheduler = CycleScheduler::new(scheduler_config, collaborators, Arc::new(SleepWait));
    if let Some(depth) = depth {
        scheduler.set_depth(depth);
    }

    let token = scheduler.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; stopping after the current cycle");
            token.cancel();
        }
    });

    let summary = scheduler.start().await;
    let report = scheduler.report(governance).await;
    write_status(config, &report)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn scheduled(
    config: &WeaverConfig,
    governance: &Governance,
    task: Option<String>,
) -> anyhow::Result<()> {
    let collaborators = build_collaborators(config, scheduled_git_config(config, governance))?;
    let mut options = ScheduledOptions {
        default_depth: config.engine.depth,
        interval: config.interval(),
        ..Default::default()
    };
    if let Some(task) = task {
        options.initial_task = task;
    }

    let outcome = run_scheduled_once(
        governance,
        collaborators,
        Arc::new(SleepWait),
        &options,
        |k| std::env::var(k).ok(),
    )
    .await;
    if let Some(report) = &outcome.status {
        write_status(config, report)?;
    }
    info!(
        "Scheduled run finished: ran={} commits={}",
        outcome.ran, outcome.commit_count
    );
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn status(config: &WeaverConfig, governance: &Governance) -> anyhow::Result<()> {
    let collaborators = build_collaborators(config, config.git.clone())?;
    let scheduler = CycleScheduler::new(
        SchedulerConfig::from(&config.engine),
        collaborators,
        Arc::new(SleepWait),
    );
    let report = scheduler.report(governance).await;
    write_status(config, &report)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn validate(config: &WeaverConfig) -> anyhow::Result<()> {
    let collaborators = build_collaborators(config, config.git.clone())?;
    let scheduler = CycleScheduler::new(
        SchedulerConfig::from(&config.engine),
        collaborators,
        Arc::new(SleepWait),
    );
    let report = serde_json::json!({
        "ready": scheduler.ready(),
        "enabled": config.engine.enabled,
        "collaborators": scheduler.validate().await,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
