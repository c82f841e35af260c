//! WebExplorer Daemon
//!
//! Serves read-only access to the host filesystem over HTTP.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use daemon::config::{Config, DaemonConfig, EnvOverride, ServerConfig};
use daemon::files::{platform_volume_source, DirectoryBrowser};
use daemon::orchestrator::{DaemonOrchestrator, OrchestratorEvent};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// WebExplorer Daemon - browse and stream host files over HTTP.
#[derive(Parser, Debug)]
#[command(name = "webexplorer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for the daemon.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the HTTP server
    Start,

    /// Print a directory listing as JSON
    Ls {
        /// Directory to list (defaults to the configured default path)
        path: Option<String>,
    },

    /// Print mounted volumes as JSON
    Volumes {
        /// Only list removable volumes
        #[arg(long, short)]
        removable: bool,
    },

    /// Print the effective configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(config_path) => Config::load(config_path)?,
        None => Config::load_default()?,
    };

    // Apply environment variable overrides
    let overrides = config.apply_env_overrides();

    // Validate configuration
    config.validate()?;

    let _log_guard = init_tracing(&config.daemon, cli.verbose)?;
    report_env_overrides(&overrides);
    if let Some(config_path) = &cli.config {
        tracing::info!("Using config file: {:?}", config_path);
    }

    match cli.command {
        Commands::Start => {
            let runtime = build_runtime(&config.server)?;
            runtime.block_on(run_headless(config))?;
        }
        Commands::Ls { path } => {
            let browser = DirectoryBrowser::new(config.file.default_path.clone());
            let entries = browser.list(path.as_deref());
            println!("{}", protocol::entries_to_json_pretty(&entries)?);
        }
        Commands::Volumes { removable } => {
            let source = platform_volume_source(&config.file);
            let entries = if removable {
                source.list_removable()
            } else {
                source.list_all()
            };
            println!("{}", protocol::entries_to_json_pretty(&entries)?);
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn report_env_overrides(overrides: &[EnvOverride]) {
    for entry in overrides {
        match entry {
            EnvOverride::Applied { var, value } => {
                tracing::info!("Overriding config from environment: {}={}", var, value)
            }
            EnvOverride::Ignored { var, value } => {
                tracing::warn!("Ignoring invalid {}: {}", var, value)
            }
        }
    }
}

/// Install the global subscriber: stdout, plus a daily log file when
/// `log_dir` is set. The returned guard flushes the file writer on drop.
fn init_tracing(daemon: &DaemonConfig, verbose: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let level = if verbose {
        "debug".to_string()
    } else {
        daemon.log_level.to_lowercase()
    };
    let filter = EnvFilter::try_new(&level)
        .with_context(|| format!("Invalid log level: {level}"))?;

    let (file_layer, guard) = match &daemon.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "webexplorer.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Multi-threaded runtime with a bounded blocking pool.
fn build_runtime(server: &ServerConfig) -> anyhow::Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder
        .enable_all()
        .thread_name("webexplorer-worker")
        .max_blocking_threads(server.max_blocking_threads);
    if server.worker_threads > 0 {
        builder.worker_threads(server.worker_threads);
    }
    builder.build().context("Failed to build tokio runtime")
}

/// Run the server until a shutdown signal arrives.
async fn run_headless(config: Config) -> anyhow::Result<()> {
    let orchestrator = DaemonOrchestrator::new(config)?;

    // Subscribe to orchestrator events for logging
    let mut events = orchestrator.subscribe();

    // Spawn event logging task
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                OrchestratorEvent::StateChanged(state) => {
                    tracing::info!("Orchestrator state: {:?}", state);
                }
                OrchestratorEvent::Listening { addr } => {
                    tracing::info!("Listening on http://{}", addr);
                }
                OrchestratorEvent::Error { message } => {
                    tracing::error!("Orchestrator error: {}", message);
                }
            }
        }
    });

    orchestrator.start().await?;

    wait_for_shutdown_signal().await?;
    tracing::info!("Received shutdown signal");

    orchestrator.stop().await?;

    Ok(())
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to register SIGINT handler")?;

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT");
        }
    }
    Ok(())
}

/// Wait for Ctrl-C.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")
}
