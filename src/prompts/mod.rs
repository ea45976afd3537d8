//! Prompt assembly
//!
//! Embedded default texts plus the builder that lays out every request
//! sent to the model.

mod builder;
mod embedded;

pub use builder::{PromptBuilder, PromptInput, clean_question, describe_project};
pub use embedded::{CLOSING_GUIDANCE, DEFAULT_INITIAL_QUESTION, DEFAULT_SYSTEM_PROMPT, NEXT_QUESTION_INSTRUCTION};
