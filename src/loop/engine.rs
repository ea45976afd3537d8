//! LoopDriver - runs planning iterations until a budget or signal stops it

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use eyre::Context;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{Config, GatewayErrorPolicy};
use crate::domain::Project;
use crate::history::ConversationHistory;
use crate::interpret::{PatternInterpreter, ReconcileOptions, ResponseInterpreter, reconcile};
use crate::llm::{self, LlmClient, LlmError};
use crate::planning::load_planning_docs;
use crate::prompts::{PromptBuilder, PromptInput, clean_question, describe_project};
use crate::state::{ProjectFile, RunState, Storage, TranscriptEntry};

/// Driver lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStatus {
    Starting,
    Iterating,
    Checkpointing,
    Stopping,
    Done,
}

impl std::fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Starting => write!(f, "starting"),
            Self::Iterating => write!(f, "iterating"),
            Self::Checkpointing => write!(f, "checkpointing"),
            Self::Stopping => write!(f, "stopping"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Why the loop left ITERATING
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Wall-clock budget used up
    TimeBudget,
    /// Iteration counter passed the maximum
    IterationBudget,
    /// Shutdown signal received
    Interrupted,
    /// Gateway failure under the `abort` policy
    GatewayAborted(String),
    /// Too many gateway failures in a row
    TooManyFailures(u32),
    /// Unexpected error inside an iteration
    Failed(String),
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimeBudget => write!(f, "runtime budget exhausted"),
            Self::IterationBudget => write!(f, "iteration budget exhausted"),
            Self::Interrupted => write!(f, "interrupted"),
            Self::GatewayAborted(e) => write!(f, "aborted on gateway error: {}", e),
            Self::TooManyFailures(n) => write!(f, "{} consecutive gateway failures", n),
            Self::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// Totals reported at DONE
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    /// Iterations executed by this process
    pub iterations: u32,
    /// Next iteration a resume would start at
    pub next_iteration: u32,
    pub elapsed: Duration,
    pub component_count: usize,
    pub feature_count: usize,
    pub snippet_count: usize,
    pub stop_reason: StopReason,
}

/// Mutable state owned by one run
struct Session {
    run_id: String,
    first_iteration: u32,
    iteration: u32,
    question: String,
    module: Option<String>,
    history: ConversationHistory,
    project: Project,
    consecutive_failures: u32,
}

impl Session {
    fn fresh(config: &Config) -> Self {
        let state = RunState::fresh(config.run.initial_question.clone());
        Self {
            run_id: state.run_id,
            first_iteration: 1,
            iteration: 1,
            question: state.pending_question,
            module: None,
            history: ConversationHistory::new(config.context.max_history),
            project: Project::generated(),
            consecutive_failures: 0,
        }
    }

    fn resumed(config: &Config, state: RunState, project: Project) -> Self {
        let run_id = if state.run_id.is_empty() {
            Uuid::now_v7().to_string()
        } else {
            state.run_id
        };
        let iteration = state.iteration.max(1);
        Self {
            run_id,
            first_iteration: iteration,
            iteration,
            question: state.pending_question,
            module: state.current_module,
            history: ConversationHistory::restore(config.context.max_history, state.history, state.summary),
            project,
            consecutive_failures: 0,
        }
    }
}

/// Sequential iteration driver
///
/// Owns the project, history and counters for the whole run. Model calls
/// are awaited one at a time; the shutdown channel is only observed between
/// iterations and during the pacing delay.
pub struct LoopDriver {
    config: Arc<Config>,
    llm: Arc<dyn LlmClient>,
    storage: Arc<dyn Storage>,
    interpreter: Box<dyn ResponseInterpreter>,
    prompts: PromptBuilder,
    status: DriverStatus,
}

impl LoopDriver {
    pub fn new(config: Arc<Config>, llm: Arc<dyn LlmClient>, storage: Arc<dyn Storage>) -> eyre::Result<Self> {
        debug!(model = %config.llm.model, "LoopDriver::new: called");
        let interpreter = PatternInterpreter::new().context("Failed to compile response patterns")?;
        Ok(Self {
            config,
            llm,
            storage,
            interpreter: Box::new(interpreter),
            prompts: PromptBuilder::new()?,
            status: DriverStatus::Starting,
        })
    }

    /// Replace the response interpreter
    pub fn with_interpreter(mut self, interpreter: Box<dyn ResponseInterpreter>) -> Self {
        self.interpreter = interpreter;
        self
    }

    pub fn status(&self) -> DriverStatus {
        self.status
    }

    fn set_status(&mut self, status: DriverStatus) {
        debug!(from = %self.status, to = %status, "LoopDriver::set_status: called");
        self.status = status;
    }

    /// Run from STARTING to DONE
    ///
    /// Returns `Err` only when STARTING fails (unusable runtime budget, no
    /// planning documents, bad snapshot storage) or when the final project cannot be written. Every
    /// path that reaches ITERATING ends with finalization.
    pub async fn run(&mut self, resume: bool, mut shutdown_rx: mpsc::Receiver<()>) -> eyre::Result<RunSummary> {
        let started = Instant::now();
        self.set_status(DriverStatus::Starting);

        let budget = self.config.runtime_budget()?;
        let planning_doc = load_planning_docs(&self.config.paths.planning_docs_dir)?;
        let mut session = self.start(resume).await?;

        info!(
            run_id = %session.run_id,
            iteration = session.iteration,
            max_iterations = self.config.run.max_iterations,
            model = %self.config.llm.model,
            "Starting iterations"
        );
        self.set_status(DriverStatus::Iterating);

        let wait = Duration::from_secs(self.config.run.wait_secs);

        let reason = loop {
            if shutdown_rx.try_recv().is_ok() {
                break StopReason::Interrupted;
            }
            if started.elapsed() >= budget {
                break StopReason::TimeBudget;
            }
            if session.iteration > self.config.run.max_iterations {
                break StopReason::IterationBudget;
            }

            match self.iterate(&mut session, &planning_doc).await {
                Ok(None) => {}
                Ok(Some(reason)) => break reason,
                Err(e) => {
                    error!(iteration = session.iteration, "Iteration failed: {:?}", e);
                    break StopReason::Failed(format!("{:#}", e));
                }
            }

            if session.iteration > self.config.run.max_iterations {
                break StopReason::IterationBudget;
            }

            if !wait.is_zero() {
                debug!(?wait, "LoopDriver::run: pacing delay");
                tokio::select! {
                    biased;
                    Some(()) = shutdown_rx.recv() => break StopReason::Interrupted,
                    _ = tokio::time::sleep(wait) => {}
                }
            }
        };

        self.finalize(session, reason, started).await
    }

    /// STARTING: fresh session, or rebuild one from the snapshot
    async fn start(&self, resume: bool) -> eyre::Result<Session> {
        debug!(%resume, "LoopDriver::start: called");
        if !resume {
            info!("Fresh run requested");
            return Ok(Session::fresh(&self.config));
        }

        let Some(state) = self.storage.load_state().await.context("Failed to read run-state snapshot")? else {
            warn!("Resume requested but no saved run state exists; starting fresh");
            return Ok(Session::fresh(&self.config));
        };

        // The checkpoint is authoritative for what has been built
        let project = match self.storage.load_project(ProjectFile::Checkpoint).await {
            Ok(Some(project)) => {
                info!(
                    components = project.components.len(),
                    features = project.feature_count(),
                    "Loaded project checkpoint"
                );
                project
            }
            Ok(None) => {
                warn!("No project checkpoint found; resuming with an empty project");
                Project::generated()
            }
            Err(e) => {
                warn!("Unreadable project checkpoint, resuming with an empty project: {}", e);
                Project::generated()
            }
        };

        let session = Session::resumed(&self.config, state, project);
        info!(
            run_id = %session.run_id,
            iteration = session.iteration,
            module = ?session.module,
            "Resuming run"
        );
        Ok(session)
    }

    /// One ITERATING pass; `Some` asks the loop to stop
    async fn iterate(&mut self, s: &mut Session, planning_doc: &str) -> eyre::Result<Option<StopReason>> {
        let iteration = s.iteration;
        let config = Arc::clone(&self.config);
        info!("Iteration {}/{}", iteration, config.run.max_iterations);

        let snapshot = config
            .context
            .include_project_snapshot
            .then(|| describe_project(&s.project));
        let history_text = s.history.formatted();
        let summary = s.history.summary();
        let prompt = self.prompts.build(&PromptInput {
            instructions: &config.run.system_prompt,
            planning_doc,
            summary: (!summary.is_empty()).then_some(summary),
            history: &history_text,
            project: snapshot.as_deref(),
            question: &s.question,
        })?;

        let mut failure = None;
        let response = match llm::query(self.llm.as_ref(), &config.llm.model, prompt).await {
            Ok(text) => {
                s.consecutive_failures = 0;
                Some(text)
            }
            Err(e) => {
                s.consecutive_failures += 1;
                warn!(
                    kind = e.kind(),
                    transient = e.is_transient(),
                    consecutive = s.consecutive_failures,
                    policy = %config.run.on_gateway_error,
                    "Model query failed: {}",
                    e
                );
                match config.run.on_gateway_error {
                    GatewayErrorPolicy::Skip => {
                        failure = Some(failure_note(&e));
                        None
                    }
                    GatewayErrorPolicy::Absorb => Some(format!("Error: {}", e)),
                    GatewayErrorPolicy::Abort => return Ok(Some(StopReason::GatewayAborted(e.to_string()))),
                }
            }
        };

        if let Some(text) = &response {
            s.history.add(s.question.clone(), text.clone());
            self.apply_response(s, text).await;
        }

        if config.output.save_intermediate && iteration % config.output.save_interval == 0 {
            self.set_status(DriverStatus::Checkpointing);
            self.storage
                .save_project(&s.project, ProjectFile::Checkpoint)
                .await
                .context("Failed to write project checkpoint")?;
            info!(iteration, features = s.project.feature_count(), "Checkpoint saved");
            self.set_status(DriverStatus::Iterating);
        }

        if iteration % config.context.summarize_interval == 0 {
            match s.history.summarize(self.llm.as_ref(), &config.llm.model).await {
                Ok(summary) => debug!(summary_len = summary.len(), "LoopDriver::iterate: history summarized"),
                Err(e) => warn!(kind = e.kind(), "Summarization failed, keeping previous summary: {}", e),
            }
        }

        if let Some(text) = &response {
            self.storage
                .append_transcript(&TranscriptEntry::new(&s.run_id, iteration, &s.question, text))
                .await
                .context("Failed to append transcript")?;
            self.advance_question(s, text).await;
        } else if let Some(note) = &failure {
            self.storage
                .append_transcript(&TranscriptEntry::new(&s.run_id, iteration, &s.question, note))
                .await
                .context("Failed to append transcript")?;
        }

        s.iteration += 1;
        let state = RunState::capture(&s.run_id, s.iteration, &s.question, s.module.as_deref(), &s.history);
        self.storage
            .save_state(&state)
            .await
            .context("Failed to write run-state snapshot")?;

        let limit = config.run.max_consecutive_failures;
        if limit > 0 && s.consecutive_failures >= limit {
            return Ok(Some(StopReason::TooManyFailures(s.consecutive_failures)));
        }
        Ok(None)
    }

    /// Interpret the response, fold it into the project, write snippet files
    async fn apply_response(&self, s: &mut Session, text: &str) {
        let output = &self.config.output;
        let interpretation = self.interpreter.interpret(text);
        let options = ReconcileOptions {
            extract_snippets: output.extract_snippets,
            assign_filenames: output.save_snippet_files,
            extract_diagrams: output.extract_diagrams,
        };
        let result = reconcile(&mut s.project, interpretation, s.module.as_deref(), options, Local::now());
        s.module = result.module;

        if output.save_snippet_files {
            for snippet in &result.new_snippets {
                match self.storage.save_snippet(snippet).await {
                    Ok(path) => debug!(path = %path.display(), "LoopDriver::apply_response: snippet saved"),
                    Err(e) => warn!("Failed to save snippet file: {}", e),
                }
            }
        }
    }

    /// Derive the next pending question; failures keep the current one
    async fn advance_question(&self, s: &mut Session, response: &str) {
        let snapshot = self
            .config
            .context
            .include_project_snapshot
            .then(|| describe_project(&s.project));
        let prompt = match self
            .prompts
            .next_question(response, snapshot.as_deref(), s.module.as_deref())
        {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!("Failed to build next-question prompt: {}", e);
                return;
            }
        };

        match llm::query(self.llm.as_ref(), &self.config.llm.model, prompt).await {
            Ok(raw) => match clean_question(&raw) {
                Some(question) => {
                    debug!(%question, "LoopDriver::advance_question: next question");
                    s.question = question;
                }
                None => warn!("Next-question derivation was empty; keeping current question"),
            },
            Err(e) => warn!(kind = e.kind(), "Next-question derivation failed, keeping current question: {}", e),
        }
    }

    /// STOPPING then DONE: persist the project and report totals
    async fn finalize(&mut self, s: Session, reason: StopReason, started: Instant) -> eyre::Result<RunSummary> {
        self.set_status(DriverStatus::Stopping);
        match &reason {
            StopReason::Interrupted => warn!("Run interrupted by user"),
            StopReason::Failed(e) => error!("Run stopped on error: {}", e),
            StopReason::GatewayAborted(_) | StopReason::TooManyFailures(_) => warn!("Run stopped: {}", reason),
            StopReason::TimeBudget | StopReason::IterationBudget => info!("Run stopped: {}", reason),
        }

        self.storage
            .save_project(&s.project, ProjectFile::Output)
            .await
            .context("Failed to write final project")?;

        if self.config.output.write_report {
            match self.storage.save_report(&s.project.to_markdown()).await {
                Ok(path) => info!(path = %path.display(), "Report written"),
                Err(e) => warn!("Failed to write report: {}", e),
            }
        }

        let summary = RunSummary {
            run_id: s.run_id,
            iterations: s.iteration - s.first_iteration,
            next_iteration: s.iteration,
            elapsed: started.elapsed(),
            component_count: s.project.components.len(),
            feature_count: s.project.feature_count(),
            snippet_count: s.project.snippet_count(),
            stop_reason: reason,
        };
        info!(
            run_id = %summary.run_id,
            iterations = summary.iterations,
            elapsed_secs = summary.elapsed.as_secs(),
            features = summary.feature_count,
            "Run finished: {}",
            summary.stop_reason
        );
        self.set_status(DriverStatus::Done);
        Ok(summary)
    }
}

/// Transcript text standing in for a response the model never gave
fn failure_note(e: &LlmError) -> String {
    let retry = if e.is_transient() { "transient" } else { "permanent" };
    format!("[no response: {} error, {}] {}", e.kind(), retry, e)
}
