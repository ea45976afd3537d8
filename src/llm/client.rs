//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless model gateway - each call is independent
///
/// Conversation state lives with the caller (history, summary, project
/// snapshot are all folded into the prompt), so implementations only move
/// one prompt to the endpoint and one completion back. Failures come back
/// as [`LlmError`], never as completion text.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request and wait for the full reply
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::debug;

    /// Scripted client: returns queued results in order
    pub struct MockLlmClient {
        responses: Mutex<Vec<Result<CompletionResponse, LlmError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
        call_count: AtomicUsize,
    }

    impl MockLlmClient {
        pub fn new(responses: Vec<Result<CompletionResponse, LlmError>>) -> Self {
            debug!(response_count = %responses.len(), "MockLlmClient::new: called");
            let mut responses = responses;
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
                call_count: AtomicUsize::new(0),
            }
        }

        /// Convenience constructor for all-success scripts
        pub fn with_texts(texts: &[&str]) -> Self {
            Self::new(texts.iter().map(|t| Ok(CompletionResponse::text(*t))).collect())
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Prompts received so far, in call order
        pub fn prompts(&self) -> Vec<String> {
            self.requests
                .lock()
                .map(|r| r.iter().map(|req| req.prompt.clone()).collect())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            debug!("MockLlmClient::complete: called");
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request);
            }
            let next = self.responses.lock().ok().and_then(|mut r| r.pop());
            next.unwrap_or_else(|| {
                debug!("MockLlmClient::complete: no more mock responses");
                Err(LlmError::InvalidResponse("No more mock responses".to_string()))
            })
        }
    }

    /// Client that answers every prompt with the same text
    pub struct FixedLlmClient {
        reply: String,
        call_count: AtomicUsize,
    }

    impl FixedLlmClient {
        pub fn new(reply: impl Into<String>) -> Self {
            Self {
                reply: reply.into(),
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmClient for FixedLlmClient {
        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            Ok(CompletionResponse::text(self.reply.clone()))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_client_returns_responses_in_order() {
            let client = MockLlmClient::with_texts(&["Response 1", "Response 2"]);

            let req = CompletionRequest::new("phi4", "Test");

            let resp1 = client.complete(req.clone()).await.unwrap();
            assert_eq!(resp1.content, "Response 1");

            let resp2 = client.complete(req.clone()).await.unwrap();
            assert_eq!(resp2.content, "Response 2");

            assert_eq!(client.call_count(), 2);
            assert_eq!(client.prompts(), vec!["Test".to_string(), "Test".to_string()]);
        }

        #[tokio::test]
        async fn test_mock_client_errors_when_exhausted() {
            let client = MockLlmClient::new(vec![]);

            let result = client.complete(CompletionRequest::new("phi4", "Test")).await;
            assert!(result.is_err());
        }

        #[tokio::test]
        async fn test_fixed_client_repeats() {
            let client = FixedLlmClient::new("same");
            for _ in 0..3 {
                let resp = client.complete(CompletionRequest::new("phi4", "q")).await.unwrap();
                assert_eq!(resp.content, "same");
            }
            assert_eq!(client.call_count(), 3);
        }
    }
}
