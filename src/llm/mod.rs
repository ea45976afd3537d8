//! Model query gateway
//!
//! Provides the [`LlmClient`] seam, the Ollama implementation and the typed
//! error every caller has to handle.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod ollama;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use ollama::OllamaClient;
pub use types::{CompletionRequest, CompletionResponse, TokenUsage};

use crate::config::LlmConfig;

/// Create an LLM client based on the provider specified in config
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaClient::from_config(config)?)),
        other => {
            debug!(provider = %other, "create_client: unknown provider");
            Err(LlmError::InvalidResponse(format!(
                "Unknown LLM provider: '{}'. Supported: ollama",
                other
            )))
        }
    }
}

/// Send one prompt to the endpoint and return only the completion text
pub async fn query(llm: &dyn LlmClient, model: &str, prompt: impl Into<String>) -> Result<String, LlmError> {
    let response = llm.complete(CompletionRequest::new(model, prompt)).await?;
    debug!(
        content_len = response.content.len(),
        input_tokens = response.usage.input_tokens,
        output_tokens = response.usage.output_tokens,
        elapsed_ms = response.duration.map_or(0, |d| d.as_millis() as u64),
        "query: completed"
    );
    Ok(response.content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client_ollama() {
        assert!(create_client(&LlmConfig::default()).is_ok());
    }

    #[test]
    fn test_create_client_unknown_provider() {
        let config = LlmConfig {
            provider: "anthropic".to_string(),
            ..Default::default()
        };
        let err = create_client(&config).err().unwrap();
        assert!(err.to_string().contains("Unknown LLM provider"));
    }
}
