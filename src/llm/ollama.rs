//! Ollama generate API client implementation
//!
//! Implements the LlmClient trait for a local Ollama server's
//! `/api/generate` endpoint in non-streaming mode. There is no retry here:
//! a failed call is reported once and the driver decides what to do.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::types::{GenerateBody, GenerateReply};
use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError};
use crate::config::LlmConfig;

/// Ollama API client
pub struct OllamaClient {
    base_url: String,
    http: Client,
    timeout: Duration,
}

impl OllamaClient {
    /// Create a new client from configuration
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(?config, "from_config: called");
        let timeout = Duration::from_millis(config.timeout_ms);

        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    /// Pull a readable message out of an error body
    fn error_message(body: &str) -> String {
        serde_json::from_str::<GenerateReply>(body)
            .ok()
            .and_then(|reply| reply.error)
            .unwrap_or_else(|| body.trim().to_string())
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(model = %request.model, prompt_len = request.prompt.len(), "complete: called");
        let body = GenerateBody {
            model: &request.model,
            prompt: &request.prompt,
            stream: false,
        };

        let response = match self.http.post(self.endpoint()).json(&body).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                debug!(error = %e, "complete: timed out");
                return Err(LlmError::Timeout(self.timeout));
            }
            Err(e) => {
                debug!(error = %e, "complete: network error");
                return Err(LlmError::Network(e));
            }
        };

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            debug!(%status, "complete: API error");
            return Err(LlmError::ApiError {
                status,
                message: Self::error_message(&text),
            });
        }

        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(self.timeout)
            } else {
                LlmError::Network(e)
            }
        })?;
        let reply: GenerateReply = serde_json::from_str(&text)?;

        if let Some(error) = reply.error.clone()
            && reply.response.is_none()
        {
            debug!(%error, "complete: error payload with success status");
            return Err(LlmError::ApiError { status, message: error });
        }

        let usage = reply.usage();
        let duration = reply.total_duration.map(Duration::from_nanos);
        let content = reply
            .response
            .ok_or_else(|| LlmError::InvalidResponse("reply has no 'response' field".to_string()))?;

        debug!(content_len = content.len(), ?usage, "complete: success");
        Ok(CompletionResponse {
            content,
            usage,
            duration,
        })
    }
}
