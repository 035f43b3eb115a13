//! Gateway configuration.
//!
//! Credentials come from the environment, never from the YAML file:
//!
//! - `LLM_BACKEND` -- `openai` (also `deepseek`, `ollama`) or `anthropic`
//! - `LLM_API_URL` -- base API URL
//! - `LLM_API_KEY` -- API key
//! - `LLM_MODEL` -- model name
//!
//! When `LLM_BACKEND` is unset the gateway is disabled and every generation
//! request takes the fallback path. Timeouts and retries live in the `llm`
//! section of the YAML file ([`LlmConfig`]); sampling limits travel on each
//! [`GenerationRequest`](crate::GenerationRequest).

use serde::Deserialize;

use tavern_types::RetryPolicy;

use crate::error::GatewayError;

/// Supported LLM backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible API (works with `OpenAI`, `DeepSeek`, Ollama).
    OpenAi,
    /// Anthropic Messages API.
    Anthropic,
}

impl BackendType {
    /// Parse a backend name as written in `LLM_BACKEND`.
    pub fn parse(name: &str) -> Result<Self, GatewayError> {
        match name.trim().to_lowercase().as_str() {
            "openai" | "deepseek" | "ollama" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            other => Err(GatewayError::Config(format!("unknown backend type: {other}"))),
        }
    }
}

/// Connection details of one LLM backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Which API dialect to speak.
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
}

impl GatewayConfig {
    /// Load the backend from `LLM_*` environment variables.
    ///
    /// Returns `Ok(None)` when `LLM_BACKEND` is unset, and an error when it
    /// is set but the other variables are missing or it names an unknown
    /// backend.
    pub fn from_env() -> Result<Option<Self>, GatewayError> {
        Self::from_lookup("LLM", |name| std::env::var(name).ok())
    }

    /// Load from `<prefix>_BACKEND`, `<prefix>_API_URL`, `<prefix>_API_KEY`
    /// and `<prefix>_MODEL` using an arbitrary variable source.
    pub fn from_lookup(
        prefix: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, GatewayError> {
        let Some(backend) = lookup(&format!("{prefix}_BACKEND")).filter(|v| !v.trim().is_empty())
        else {
            return Ok(None);
        };
        let required = |suffix: &str| {
            let name = format!("{prefix}_{suffix}");
            lookup(&name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| GatewayError::Config(format!("missing required env var {name}")))
        };

        Ok(Some(Self {
            backend_type: BackendType::parse(&backend)?,
            api_url: required("API_URL")?.trim_end_matches('/').to_owned(),
            api_key: required("API_KEY")?,
            model: required("MODEL")?,
        }))
    }
}

/// The `llm` section of the simulation config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LlmConfig {
    /// Master switch. When false, no backend is built even if the
    /// environment names one.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Deadline for a single attempt, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Backoff between attempts.
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl LlmConfig {
    /// Per-attempt deadline.
    pub const fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            timeout_ms: default_timeout_ms(),
            retry: RetryPolicy::default(),
        }
    }
}

const fn default_enabled() -> bool {
    true
}

const fn default_timeout_ms() -> u64 {
    8_000
}
