//! Planloop configuration types and loading
//!
//! The configuration is built once at startup (file fallback chain, then CLI
//! overrides via [`Config::with_overrides`]) and shared read-only afterwards.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::prompts::{DEFAULT_INITIAL_QUESTION, DEFAULT_SYSTEM_PROMPT};

/// Main planloop configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model endpoint configuration
    pub llm: LlmConfig,

    /// File and directory locations
    pub paths: PathsConfig,

    /// Loop budgets and pacing
    pub run: RunConfig,

    /// Conversation context management
    pub context: ContextConfig,

    /// Output and extraction toggles
    pub output: OutputConfig,

    /// Debug logging
    #[serde(skip)]
    pub debug: bool,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if self.llm.model.trim().is_empty() {
            return Err(eyre::eyre!("llm.model must not be empty"));
        }
        if !self.run.max_runtime_hours.is_finite() || self.run.max_runtime_hours <= 0.0 {
            return Err(eyre::eyre!(
                "run.max-runtime-hours must be a positive number (got {})",
                self.run.max_runtime_hours
            ));
        }
        self.runtime_budget()?;
        if self.context.max_history == 0 {
            return Err(eyre::eyre!("context.max-history must be at least 1"));
        }
        if self.context.summarize_interval == 0 {
            return Err(eyre::eyre!("context.summarize-interval must be at least 1"));
        }
        if self.output.save_interval == 0 {
            return Err(eyre::eyre!("output.save-interval must be at least 1"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // An explicit path must load
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Project-local config: .planloop.yml
        let local_config = PathBuf::from(".planloop.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // User config: ~/.config/planloop/planloop.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("planloop").join("planloop.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Fold command-line overrides into the configuration
    ///
    /// Consumes `self` so the result is the single, final configuration.
    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(model) = &overrides.model {
            self.llm.model = model.clone();
        }
        if let Some(hours) = overrides.runtime_hours {
            self.run.max_runtime_hours = hours;
        }
        if let Some(max) = overrides.max_iterations {
            self.run.max_iterations = max;
        }
        if let Some(dir) = &overrides.planning_dir {
            self.paths.planning_docs_dir = dir.clone();
        }
        if let Some(dir) = &overrides.output_dir {
            self.paths.output_dir = dir.clone();
        }
        self.debug = self.debug || overrides.debug;
        self
    }

    /// Total wall-clock budget for the loop
    pub fn runtime_budget(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.run.max_runtime_hours * 3600.0)
            .map_err(|e| eyre::eyre!("run.max-runtime-hours is out of range ({}): {}", self.run.max_runtime_hours, e))
    }

    /// Full path of the run-state snapshot file
    pub fn state_path(&self) -> PathBuf {
        self.paths.output_dir.join(&self.paths.state_file)
    }

    /// Full path of the periodic project checkpoint
    pub fn checkpoint_path(&self) -> PathBuf {
        self.paths.output_dir.join(&self.paths.checkpoint_file)
    }

    /// Full path of the append-only transcript
    pub fn transcript_path(&self) -> PathBuf {
        self.paths.log_dir.join(&self.paths.transcript_file)
    }

    /// Directory where individual snippet files are written
    pub fn snippet_dir(&self) -> PathBuf {
        self.paths.output_dir.join(&self.paths.snippet_dir)
    }

    /// Create the planning, output and log directories if missing
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.paths.planning_docs_dir, &self.paths.output_dir, &self.paths.log_dir] {
            if !dir.exists() {
                fs::create_dir_all(dir).context(format!("Failed to create directory {}", dir.display()))?;
                tracing::info!("Created directory: {}", dir.display());
            }
        }
        Ok(())
    }
}

/// Values supplied on the command line that take precedence over files
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub model: Option<String>,
    pub runtime_hours: Option<f64>,
    pub max_iterations: Option<u32>,
    pub planning_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub debug: bool,
}

/// Model endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (currently only "ollama" supported)
    pub provider: String,

    /// Model identifier passed to the endpoint
    pub model: String,

    /// Endpoint base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "phi4".to_string(),
            base_url: "http://localhost:11434".to_string(),
            timeout_ms: 600_000,
        }
    }
}

/// File and directory locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding the planning documents
    #[serde(rename = "planning-docs-dir")]
    pub planning_docs_dir: PathBuf,

    /// Directory for project documents, snapshots and snippets
    #[serde(rename = "output-dir")]
    pub output_dir: PathBuf,

    /// Directory for the tracing log and the transcript
    #[serde(rename = "log-dir")]
    pub log_dir: PathBuf,

    /// Transcript file name (inside log-dir)
    #[serde(rename = "transcript-file")]
    pub transcript_file: String,

    /// Run-state snapshot file name (inside output-dir)
    #[serde(rename = "state-file")]
    pub state_file: String,

    /// Periodic checkpoint file name (inside output-dir)
    #[serde(rename = "checkpoint-file")]
    pub checkpoint_file: String,

    /// Snippet sub-directory (inside output-dir)
    #[serde(rename = "snippet-dir")]
    pub snippet_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            planning_docs_dir: PathBuf::from("planning_docs"),
            output_dir: PathBuf::from("output"),
            log_dir: PathBuf::from("logs"),
            transcript_file: "conversation_log.txt".to_string(),
            state_file: "state.json".to_string(),
            checkpoint_file: "project.json".to_string(),
            snippet_dir: "snippets".to_string(),
        }
    }
}

/// What the driver does when the model endpoint call fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayErrorPolicy {
    /// Drop the turn, keep the pending question, move on
    #[default]
    Skip,
    /// Treat the error text as if it were the completion
    Absorb,
    /// Stop the loop
    Abort,
}

impl std::fmt::Display for GatewayErrorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Absorb => write!(f, "absorb"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

/// Loop budgets and pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Total wall-clock budget in hours
    #[serde(rename = "max-runtime-hours")]
    pub max_runtime_hours: f64,

    /// Highest iteration number that may run
    #[serde(rename = "max-iterations")]
    pub max_iterations: u32,

    /// Pause between iterations in seconds
    #[serde(rename = "wait-secs")]
    pub wait_secs: u64,

    /// Question asked on iteration 1
    #[serde(rename = "initial-question")]
    pub initial_question: String,

    /// Static instructions placed at the top of every prompt
    #[serde(rename = "system-prompt")]
    pub system_prompt: String,

    /// Reaction to a failed endpoint call
    #[serde(rename = "on-gateway-error")]
    pub on_gateway_error: GatewayErrorPolicy,

    /// Stop after this many failed endpoint calls in a row (0 disables)
    #[serde(rename = "max-consecutive-failures")]
    pub max_consecutive_failures: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_runtime_hours: 6.0,
            max_iterations: 1000,
            wait_secs: 10,
            initial_question: DEFAULT_INITIAL_QUESTION.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            on_gateway_error: GatewayErrorPolicy::default(),
            max_consecutive_failures: 5,
        }
    }
}

/// Conversation context management
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Number of recent question/answer turns kept verbatim
    #[serde(rename = "max-history")]
    pub max_history: usize,

    /// Regenerate the rolling summary every N iterations
    #[serde(rename = "summarize-interval")]
    pub summarize_interval: u32,

    /// Describe the current project in each prompt
    #[serde(rename = "include-project-snapshot")]
    pub include_project_snapshot: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_history: 10,
            summarize_interval: 5,
            include_project_snapshot: true,
        }
    }
}

/// Output and extraction toggles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Write the project checkpoint periodically
    #[serde(rename = "save-intermediate")]
    pub save_intermediate: bool,

    /// Checkpoint every N iterations
    #[serde(rename = "save-interval")]
    pub save_interval: u32,

    /// Turn fenced code blocks into features
    #[serde(rename = "extract-snippets")]
    pub extract_snippets: bool,

    /// Write each extracted snippet to its own file
    #[serde(rename = "save-snippet-files")]
    pub save_snippet_files: bool,

    /// Capture architecture diagram sections
    #[serde(rename = "extract-diagrams")]
    pub extract_diagrams: bool,

    /// Write a Markdown report next to the final project document
    #[serde(rename = "write-report")]
    pub write_report: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            save_intermediate: true,
            save_interval: 5,
            extract_snippets: true,
            save_snippet_files: true,
            extract_diagrams: true,
            write_report: true,
        }
    }
}
