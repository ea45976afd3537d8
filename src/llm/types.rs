//! Request/response types for the model endpoint
//!
//! The endpoint is a plain prompt-in, text-out generator: one request carries
//! the whole prompt, one response carries the whole completion.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// A completion request - everything needed for one endpoint call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,

    /// Full prompt text
    pub prompt: String,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        let model = model.into();
        let prompt = prompt.into();
        debug!(%model, prompt_len = prompt.len(), "CompletionRequest::new: called");
        Self { model, prompt }
    }
}

/// Response from a completion request
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    /// Completion text
    pub content: String,

    /// Token usage reported by the endpoint
    pub usage: TokenUsage,

    /// Server-side generation time, when reported
    pub duration: Option<Duration>,
}

impl CompletionResponse {
    /// Response carrying only text
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Token usage for a single call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Wire format of an Ollama `/api/generate` request body
#[derive(Debug, Serialize)]
pub(crate) struct GenerateBody<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
}

/// Wire format of a non-streaming Ollama `/api/generate` reply
#[derive(Debug, Deserialize)]
pub(crate) struct GenerateReply {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
    /// Nanoseconds
    #[serde(default)]
    pub total_duration: Option<u64>,
}

impl GenerateReply {
    pub fn usage(&self) -> TokenUsage {
        TokenUsage {
            input_tokens: self.prompt_eval_count.unwrap_or(0),
            output_tokens: self.eval_count.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_body_is_non_streaming() {
        let body = GenerateBody {
            model: "phi4",
            prompt: "hello",
            stream: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "phi4");
        assert_eq!(json["prompt"], "hello");
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn test_generate_reply_parses_usage() {
        let json = r#"{
            "model": "phi4",
            "created_at": "2024-05-01T10:00:00Z",
            "response": "Here is the plan.",
            "done": true,
            "total_duration": 2500000000,
            "prompt_eval_count": 120,
            "eval_count": 48
        }"#;
        let reply: GenerateReply = serde_json::from_str(json).unwrap();

        assert_eq!(reply.response.as_deref(), Some("Here is the plan."));
        assert_eq!(
            reply.usage(),
            TokenUsage {
                input_tokens: 120,
                output_tokens: 48
            }
        );
        assert_eq!(reply.total_duration, Some(2_500_000_000));
    }

    #[test]
    fn test_generate_reply_error_payload() {
        let reply: GenerateReply = serde_json::from_str(r#"{"error":"model 'x' not found"}"#).unwrap();
        assert!(reply.response.is_none());
        assert_eq!(reply.error.as_deref(), Some("model 'x' not found"));
    }
}
