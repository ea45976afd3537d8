//! Planloop - unattended planning-document elaboration loop
//!
//! CLI entry point: builds the configuration once, wires the model client
//! and file storage into the driver, and forwards Ctrl+C to it.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::MakeWriterExt;

use planloop::cli::{Cli, Command};
use planloop::config::Config;
use planloop::llm::create_client;
use planloop::r#loop::{LoopDriver, RunSummary, StopReason};
use planloop::state::{FileStorage, ProjectFile, Storage, StoragePaths};

fn setup_logging(config: &Config) -> Result<()> {
    let log_dir = &config.paths.log_dir;
    fs::create_dir_all(log_dir).context("Failed to create log directory")?;

    let level = if config.debug { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_path = log_dir.join(format!("planloop_{}.log", Local::now().format("%Y%m%d_%H%M%S")));
    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr.and(log_file))
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (debug: {}, file: {})", config.debug, log_path.display());
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Built exactly once; read-only from here on
    let config = Config::load(cli.config.as_ref())
        .context("Failed to load configuration")?
        .with_overrides(&cli.overrides());
    config.validate().context("Invalid configuration")?;
    config.ensure_directories()?;

    setup_logging(&config).context("Failed to setup logging")?;
    info!(
        "Planloop loaded config: provider={}, model={}, runtime={}h, max_iterations={}",
        config.llm.provider, config.llm.model, config.run.max_runtime_hours, config.run.max_iterations
    );

    let config = Arc::new(config);
    match cli.command {
        Some(Command::Status) => cmd_status(&config, &cli.output).await,
        None => cmd_run(config, &cli.output, cli.resume).await,
    }
}

/// Run the loop until a budget, an error or Ctrl+C stops it
async fn cmd_run(config: Arc<Config>, output: &Path, resume: bool) -> Result<()> {
    let llm = create_client(&config.llm).context("Failed to create model client")?;
    let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(StoragePaths::from_config(&config, output)));

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    tokio::spawn(forward_shutdown(shutdown_tx));

    let mut driver = LoopDriver::new(Arc::clone(&config), llm, storage)?;
    let summary = driver.run(resume, shutdown_rx).await?;

    print_summary(&summary, &config.paths.output_dir.join(output));
    if let StopReason::Failed(e) = &summary.stop_reason {
        return Err(eyre::eyre!("Run stopped on error: {}", e));
    }
    Ok(())
}

/// Forward SIGINT/SIGTERM to the driver's shutdown channel
async fn forward_shutdown(shutdown_tx: mpsc::Sender<()>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let (mut sigint, mut sigterm) = match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
            (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Failed to install signal handlers: {}", e);
                return;
            }
        };
        tokio::select! {
            _ = sigint.recv() => warn!("SIGINT received"),
            _ = sigterm.recv() => warn!("SIGTERM received"),
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        warn!("Ctrl+C received");
    }

    let _ = shutdown_tx.send(()).await;
}

fn print_summary(summary: &RunSummary, output: &Path) {
    let headline = match summary.stop_reason {
        StopReason::TimeBudget | StopReason::IterationBudget => "Run complete".green().bold(),
        StopReason::Interrupted => "Run interrupted".yellow().bold(),
        _ => "Run stopped".red().bold(),
    };
    println!("{} ({})", headline, summary.stop_reason);
    println!("  Run ID:      {}", summary.run_id);
    println!("  Iterations:  {} (next: {})", summary.iterations, summary.next_iteration);
    println!("  Elapsed:     {:.1}s", summary.elapsed.as_secs_f64());
    println!(
        "  Project:     {} components, {} features, {} snippets",
        summary.component_count, summary.feature_count, summary.snippet_count
    );
    println!("  Output:      {}", output.display());
}

/// Print the saved snapshot and checkpoint without contacting the endpoint
async fn cmd_status(config: &Config, output: &Path) -> Result<()> {
    let storage = FileStorage::new(StoragePaths::from_config(config, output));

    match storage.load_state().await.context("Failed to read run state")? {
        Some(state) => {
            println!("{}", "Saved run state".bold());
            println!("  Run ID:           {}", state.run_id);
            println!("  Next iteration:   {}", state.iteration);
            println!("  Pending question: {}", state.pending_question);
            println!(
                "  Current module:   {}",
                state.current_module.as_deref().unwrap_or("(none)")
            );
            println!("  History turns:    {}", state.history.len());
            println!("  Saved at:         {}", state.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"));
        }
        None => {
            println!("No saved run state at {}", storage.paths().state.display());
        }
    }

    match storage
        .load_project(ProjectFile::Checkpoint)
        .await
        .context("Failed to read project checkpoint")?
    {
        Some(project) => {
            println!("{}", "Project checkpoint".bold());
            println!("  Name:       {}", project.name);
            println!("  Components: {}", project.components.len());
            println!("  Features:   {}", project.feature_count());
            for component in &project.components {
                println!("    - {} ({} features)", component.name, component.features.len());
            }
        }
        None => {
            println!("No project checkpoint at {}", storage.paths().checkpoint.display());
        }
    }

    let output_path = &storage.paths().output;
    match storage
        .load_project(ProjectFile::Output)
        .await
        .context("Failed to read final project")?
    {
        Some(project) => println!(
            "Final project at {}: {} components, {} features",
            output_path.display(),
            project.components.len(),
            project.feature_count()
        ),
        None => println!("No final project at {}", output_path.display()),
    }

    Ok(())
}
