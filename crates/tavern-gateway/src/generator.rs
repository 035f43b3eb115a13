//! The generation boundary.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// One request to a text generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Instructions framing the task.
    pub system_prompt: String,
    /// The task itself.
    pub user_prompt: String,
    /// Upper bound on response length.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl GenerationRequest {
    /// Build a request with the given prompts and limits.
    pub fn new(
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            max_tokens,
            temperature,
        }
    }
}

/// Anything that turns a prompt into text, or fails.
///
/// Implementations must be cheap to share across tasks; the returned future
/// is `Send` so callers may run it on a multi-threaded runtime.
pub trait TextGenerator: Send + Sync {
    /// Generate text for `request`.
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<String, GatewayError>> + Send;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// A generator that is switched off. Every call fails immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledGateway;

impl TextGenerator for DisabledGateway {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, GatewayError> {
        Err(GatewayError::Unavailable(
            "no text generation backend configured".to_owned(),
        ))
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_gateway_always_fails() {
        let request = GenerationRequest::new("system", "user", 64, 0.5);
        let result = DisabledGateway.generate(&request).await;
        assert!(matches!(result, Err(GatewayError::Unavailable(_))));
        assert_eq!(DisabledGateway.name(), "disabled");
    }
}
