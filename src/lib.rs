//! Planloop - unattended planning-document elaboration loop
//!
//! Planloop reads a set of planning documents and repeatedly asks a local
//! model endpoint about them. Each answer is mined for module names, code
//! blocks and diagrams, which accumulate in a structured [`domain::Project`].
//! The next question is derived from the previous answer, so the run needs
//! no operator once started.
//!
//! # Modules
//!
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface
//! - [`llm`] - Model gateway trait and Ollama implementation
//! - [`domain`] - Project, component, feature and snippet types
//! - [`history`] - Bounded conversation history with rolling summary
//! - [`interpret`] - Response extraction and project reconciliation
//! - [`prompts`] - Embedded instructions and prompt assembly
//! - [`planning`] - Planning document loader
//! - [`state`] - Run-state snapshot, transcript and storage
//! - [`r#loop`] - Iteration driver

pub mod cli;
pub mod config;
pub mod domain;
pub mod history;
pub mod interpret;
pub mod llm;
pub mod planning;
pub mod prompts;
pub mod state;

// Note: 'loop' is a reserved keyword, so we use r#loop
#[path = "loop/mod.rs"]
pub mod r#loop;

// Re-export commonly used types
pub use config::{Config, GatewayErrorPolicy, LlmConfig, Overrides};
pub use domain::{CodeSnippet, Component, Feature, Project};
pub use history::{ConversationHistory, Turn};
pub use interpret::{Interpretation, PatternInterpreter, ResponseInterpreter};
pub use llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, OllamaClient};
pub use r#loop::{DriverStatus, LoopDriver, RunSummary, StopReason};
pub use state::{FileStorage, ProjectFile, RunState, Storage, StorageError, StoragePaths, TranscriptEntry};
