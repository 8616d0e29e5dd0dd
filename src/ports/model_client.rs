//! Model Client Port - Interface for LLM provider access.
//!
//! Analysis modules registered with `allow_llm` receive an implementation of
//! this port through their [`AnalysisContext`]. The concrete HTTP clients
//! (OpenAI-compatible endpoints, streaming, SSE re-chunking) live outside
//! this crate; here only the capability the analysis core consumes is
//! defined.
//!
//! [`AnalysisContext`]: crate::domain::analysis::AnalysisContext

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for single-shot LLM completions.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Generates one completion.
    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ModelError>;

    /// Provider and model identity, for usage reporting.
    fn model_info(&self) -> ModelInfo;
}

/// Request for a model completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    /// User prompt.
    pub prompt: String,
    /// System prompt guiding model behavior.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Maximum tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ModelRequest {
    /// Creates a request from a prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            max_tokens: None,
            temperature: None,
        }
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the token ceiling.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Response from a model completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Generated content.
    pub content: String,
    /// Token usage of the call.
    pub usage: TokenUsage,
}

/// Token usage of one model call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub prompt_tokens: u32,
    /// Tokens in the completion.
    pub completion_tokens: u32,
    /// Total tokens.
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Creates usage; total is derived.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Provider identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Provider name, e.g. `openai`.
    pub provider: String,
    /// Model identifier.
    pub model: String,
}

impl ModelInfo {
    /// Creates provider identity.
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }
}

/// Model client errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    /// Rate limited by the provider.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until retry is allowed.
        retry_after_secs: u32,
    },

    /// Provider is unavailable.
    #[error("provider unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// Network failure during the request.
    #[error("network error: {0}")]
    Network(String),

    /// Provider response could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// Authentication failed.
    #[error("authentication failed")]
    AuthenticationFailed,
}

impl ModelError {
    /// Returns true when retrying later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ModelError::RateLimited { .. } | ModelError::Unavailable { .. } | ModelError::Network(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_works() {
        let request = ModelRequest::new("Summarize the run")
            .with_system_prompt("Be terse")
            .with_max_tokens(256)
            .with_temperature(0.2);

        assert_eq!(request.prompt, "Summarize the run");
        assert_eq!(request.system_prompt.as_deref(), Some("Be terse"));
        assert_eq!(request.max_tokens, Some(256));
    }

    #[test]
    fn token_usage_derives_total() {
        let usage = TokenUsage::new(100, 40);
        assert_eq!(usage.total_tokens, 140);
    }

    #[test]
    fn retryable_classification() {
        assert!(ModelError::RateLimited { retry_after_secs: 5 }.is_retryable());
        assert!(ModelError::Network("reset".into()).is_retryable());
        assert!(!ModelError::AuthenticationFailed.is_retryable());
        assert!(!ModelError::Parse("bad json".into()).is_retryable());
    }
}
