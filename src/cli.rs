//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Overrides;

/// Planloop - unattended planning-document elaboration loop
#[derive(Parser)]
#[command(
    name = "planloop",
    about = "Iteratively elaborate planning documents into a structured project with a local model",
    version,
    after_help = "Logs are written to the configured log directory (default: ./logs)"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Model identifier sent to the endpoint
    #[arg(short, long)]
    pub model: Option<String>,

    /// Total runtime budget in hours
    #[arg(short = 't', long = "runtime", value_name = "HOURS")]
    pub runtime: Option<f64>,

    /// Output file name for the final project (inside the output directory)
    #[arg(short, long, global = true, default_value = "project.json")]
    pub output: PathBuf,

    /// Resume from the saved run-state snapshot
    #[arg(short, long)]
    pub resume: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Maximum number of iterations
    #[arg(long, value_name = "N")]
    pub max_iterations: Option<u32>,

    /// Directory holding the planning documents
    #[arg(long, value_name = "DIR")]
    pub planning_dir: Option<PathBuf>,

    /// Directory for project output, snapshots and snippets
    #[arg(long, global = true, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Subcommand to execute (default: run the loop)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Show the saved run state and checkpointed project without running
    Status,
}

impl Cli {
    /// Command-line values that override the configuration file
    pub fn overrides(&self) -> Overrides {
        Overrides {
            model: self.model.clone(),
            runtime_hours: self.runtime,
            max_iterations: self.max_iterations,
            planning_dir: self.planning_dir.clone(),
            output_dir: self.output_dir.clone(),
            debug: self.debug,
        }
    }
}
