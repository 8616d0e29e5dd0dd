//! Mock model client for testing.
//!
//! Configurable implementation of the [`ModelClient`] port so modules with
//! `allow_llm` can be exercised without calling real provider APIs.
//!
//! # Example
//!
//! ```ignore
//! let client = MockModelClient::new().with_response("summary text");
//! let response = client.complete(ModelRequest::new("prompt")).await?;
//! assert_eq!(response.content, "summary text");
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ports::{ModelClient, ModelError, ModelInfo, ModelRequest, ModelResponse, TokenUsage};

/// A scripted reply for the mock client.
#[derive(Debug, Clone)]
enum MockReply {
    Success(String),
    Error(ModelError),
}

/// Mock [`ModelClient`] with canned responses and call capture.
///
/// Responses are consumed in order; once the queue is empty a fixed default
/// reply is returned.
///
/// # Panics
///
/// Methods may panic if internal locks are poisoned; acceptable for tests.
pub struct MockModelClient {
    replies: Mutex<VecDeque<MockReply>>,
    calls: Mutex<Vec<ModelRequest>>,
    info: ModelInfo,
}

impl Default for MockModelClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockModelClient {
    /// Creates a mock with an empty script.
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            info: ModelInfo::new("mock", "mock-model-1"),
        }
    }

    /// Queues a successful response.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        self.replies
            .lock()
            .expect("MockModelClient: replies lock poisoned")
            .push_back(MockReply::Success(content.into()));
        self
    }

    /// Queues an error.
    pub fn with_error(self, error: ModelError) -> Self {
        self.replies
            .lock()
            .expect("MockModelClient: replies lock poisoned")
            .push_back(MockReply::Error(error));
        self
    }

    /// Number of completed calls.
    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .expect("MockModelClient: calls lock poisoned")
            .len()
    }

    /// Captured requests, in call order.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.calls
            .lock()
            .expect("MockModelClient: calls lock poisoned")
            .clone()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        self.calls
            .lock()
            .expect("MockModelClient: calls lock poisoned")
            .push(request.clone());

        let reply = self
            .replies
            .lock()
            .expect("MockModelClient: replies lock poisoned")
            .pop_front();

        match reply {
            Some(MockReply::Error(error)) => Err(error),
            Some(MockReply::Success(content)) => {
                let usage = TokenUsage::new(
                    request.prompt.split_whitespace().count() as u32,
                    content.split_whitespace().count() as u32,
                );
                Ok(ModelResponse { content, usage })
            }
            None => Ok(ModelResponse {
                content: "mock response".to_string(),
                usage: TokenUsage::new(0, 2),
            }),
        }
    }

    fn model_info(&self) -> ModelInfo {
        self.info.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_responses_are_consumed_in_order() {
        let client = MockModelClient::new()
            .with_response("first")
            .with_response("second");

        let one = client.complete(ModelRequest::new("a b c")).await.unwrap();
        let two = client.complete(ModelRequest::new("d")).await.unwrap();

        assert_eq!(one.content, "first");
        assert_eq!(one.usage.prompt_tokens, 3);
        assert_eq!(two.content, "second");
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn exhausted_script_falls_back_to_default() {
        let client = MockModelClient::new();
        let response = client.complete(ModelRequest::new("p")).await.unwrap();
        assert_eq!(response.content, "mock response");
    }

    #[tokio::test]
    async fn scripted_errors_surface() {
        let client =
            MockModelClient::new().with_error(ModelError::Unavailable { message: "down".into() });
        let err = client.complete(ModelRequest::new("p")).await.unwrap_err();
        assert!(matches!(err, ModelError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn requests_are_captured() {
        let client = MockModelClient::new().with_response("ok");
        client
            .complete(ModelRequest::new("prompt").with_max_tokens(10))
            .await
            .unwrap();

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].max_tokens, Some(10));
    }
}
