//! PromptBuilder - renders the main and follow-up prompts

use std::fmt::Write as _;

use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded::{CLOSING_GUIDANCE, NEXT_QUESTION_INSTRUCTION, NEXT_QUESTION_TEMPLATE, PROMPT_TEMPLATE};
use crate::domain::Project;

const PROMPT: &str = "prompt";
const NEXT_QUESTION: &str = "next-question";

/// Inputs of one main prompt
///
/// Rendering is a pure function of these fields. Empty `summary` or absent
/// `project` sections are left out; the order of the remaining sections
/// never changes.
#[derive(Debug, Clone, Serialize)]
pub struct PromptInput<'a> {
    pub instructions: &'a str,
    pub planning_doc: &'a str,
    pub summary: Option<&'a str>,
    pub history: &'a str,
    pub project: Option<&'a str>,
    pub question: &'a str,
}

#[derive(Serialize)]
struct PromptContext<'a> {
    #[serde(flatten)]
    input: &'a PromptInput<'a>,
    closing: &'a str,
}

#[derive(Serialize)]
struct NextQuestionContext<'a> {
    instruction: &'a str,
    response: &'a str,
    project: Option<&'a str>,
    module: Option<&'a str>,
}

/// Renders prompts from the embedded templates
pub struct PromptBuilder {
    handlebars: Handlebars<'static>,
}

impl PromptBuilder {
    pub fn new() -> eyre::Result<Self> {
        let mut handlebars = Handlebars::new();
        // Prompts are plain text, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars
            .register_template_string(PROMPT, PROMPT_TEMPLATE)
            .map_err(|e| eyre::eyre!("Invalid prompt template: {}", e))?;
        handlebars
            .register_template_string(NEXT_QUESTION, NEXT_QUESTION_TEMPLATE)
            .map_err(|e| eyre::eyre!("Invalid next-question template: {}", e))?;
        Ok(Self { handlebars })
    }

    /// Assemble the main prompt
    pub fn build(&self, input: &PromptInput<'_>) -> eyre::Result<String> {
        debug!(
            question_len = input.question.len(),
            has_summary = input.summary.is_some_and(|s| !s.is_empty()),
            has_project = input.project.is_some(),
            "PromptBuilder::build: called"
        );
        let context = PromptContext {
            input,
            closing: CLOSING_GUIDANCE,
        };
        self.handlebars
            .render(PROMPT, &context)
            .map_err(|e| eyre::eyre!("Failed to render prompt: {}", e))
    }

    /// Assemble the prompt that derives the next question from an answer
    pub fn next_question(
        &self,
        response: &str,
        project: Option<&str>,
        module: Option<&str>,
    ) -> eyre::Result<String> {
        debug!(response_len = response.len(), ?module, "PromptBuilder::next_question: called");
        let context = NextQuestionContext {
            instruction: NEXT_QUESTION_INSTRUCTION,
            response,
            project,
            module,
        };
        self.handlebars
            .render(NEXT_QUESTION, &context)
            .map_err(|e| eyre::eyre!("Failed to render next-question prompt: {}", e))
    }
}

/// Describe the project for a prompt: every component and feature with its
/// description and snippet count, but no snippet bodies
pub fn describe_project(project: &Project) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Project: {}", project.name);
    if !project.description.is_empty() {
        let _ = writeln!(out, "{}", project.description);
    }
    if project.components.is_empty() {
        let _ = writeln!(out, "No components yet.");
        return out;
    }
    let _ = writeln!(out, "Components ({}):", project.components.len());
    for component in &project.components {
        let _ = writeln!(out, "- {}: {}", component.name, component.description);
        for feature in &component.features {
            let _ = writeln!(
                out,
                "  - {}: {} ({} snippet{})",
                feature.name,
                feature.description,
                feature.code_snippets.len(),
                if feature.code_snippets.len() == 1 { "" } else { "s" }
            );
        }
    }
    out
}

/// Normalize a derived question: trim and drop a leading `Question:` label
pub fn clean_question(raw: &str) -> Option<String> {
    let mut text = raw.trim();
    for label in ["Question:", "question:", "질문:", "**Question:**"] {
        if let Some(rest) = text.strip_prefix(label) {
            text = rest.trim();
            break;
        }
    }
    let text = text.trim_matches('"').trim();
    (!text.is_empty()).then(|| text.to_string())
}
