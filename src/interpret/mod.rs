//! Response interpreter
//!
//! Turns raw completion text into project changes in two steps:
//! [`ResponseInterpreter::interpret`] extracts module name, feature
//! description, code blocks and diagram sections; [`reconcile`] folds the
//! result into the [`Project`](crate::domain::Project). Only the first step
//! knows anything about the text format, so a structured-output contract can
//! replace [`PatternInterpreter`] without touching the driver.

mod extract;
mod reconcile;

pub use extract::PatternInterpreter;
pub use reconcile::{ReconcileOptions, Reconciled, reconcile};

use crate::domain::CodeSnippet;

/// Everything extracted from one response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interpretation {
    pub module: Option<String>,
    pub description: Option<String>,
    pub snippets: Vec<CodeSnippet>,
    pub diagrams: Vec<String>,
}

/// Extracts structure from free-text model output
pub trait ResponseInterpreter: Send + Sync {
    fn interpret(&self, text: &str) -> Interpretation;
}
