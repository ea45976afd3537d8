//! Embedded default prompts
//!
//! These are compiled into the binary; `run.system-prompt` and
//! `run.initial-question` in the config file override the first two.

/// Static instructions at the top of every main prompt
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an AI developer who analyzes planning documents and implements the features they describe.
Analyze the planning document below and design the features it needs.
Give detailed, concrete implementation approaches and code examples.

When your answer concerns a specific module, put it on its own line as
`Module: <module name>` and describe the feature on a line
`Feature description: <one sentence>`.
Put every piece of code in a fenced block tagged with its language.
"#;

/// Question asked on the first iteration of a fresh run
pub const DEFAULT_INITIAL_QUESTION: &str = "According to this planning document, which core features are needed?";

/// Closing sentence after the pending question
pub const CLOSING_GUIDANCE: &str =
    "Please give a detailed and concrete answer. Include code examples and implementation steps.";

/// Instruction for deriving the next question from the last answer
pub const NEXT_QUESTION_INSTRUCTION: &str = "Analyze the following AI answer and write the single most relevant, \
     in-depth follow-up question that moves the implementation of the planning document forward. \
     Output only the question.";

/// Main prompt layout; section order is fixed
pub(crate) const PROMPT_TEMPLATE: &str = r#"{{instructions}}

# Planning document
{{planning_doc}}

{{#if summary}}# Summary of the earlier conversation
{{summary}}

{{/if}}# Previous conversation
{{history}}

{{#if project}}# Current project state
{{project}}

{{/if}}# Current question
{{question}}

{{closing}}
"#;

/// Follow-up question prompt layout
pub(crate) const NEXT_QUESTION_TEMPLATE: &str = r#"{{instruction}}

{{#if project}}# Current project state
{{project}}

{{/if}}{{#if module}}Module currently being worked on: {{module}}

{{/if}}# Answer
{{response}}

Question:"#;
