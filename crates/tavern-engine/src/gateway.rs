//! Selection of the text generator the narrative engine talks to.

use tavern_gateway::{
    DisabledGateway, GatewayConfig, GatewayError, GenerationRequest, LlmBackend, LlmConfig,
    ResilientGateway, TextGenerator, create_backend,
};

/// Either a live backend behind timeouts and retries, or nothing.
pub enum Gateway {
    /// HTTP backend configured from the environment.
    Live(ResilientGateway<LlmBackend>),
    /// Generation switched off; every request falls back.
    Disabled(DisabledGateway),
}

impl Gateway {
    /// Build from optional credentials and the `llm` config section.
    pub fn from_parts(credentials: Option<GatewayConfig>, llm: &LlmConfig) -> Self {
        match credentials {
            Some(credentials) if llm.enabled => {
                tracing::info!(
                    backend = ?credentials.backend_type,
                    model = %credentials.model,
                    timeout_ms = llm.timeout_ms,
                    max_attempts = llm.retry.max_attempts,
                    "Text generation enabled"
                );
                Self::Live(ResilientGateway::new(
                    create_backend(&credentials),
                    llm.timeout(),
                    llm.retry,
                ))
            }
            Some(_) => {
                tracing::info!("Text generation disabled by config, using fallback content");
                Self::Disabled(DisabledGateway)
            }
            None => {
                tracing::info!("No LLM credentials in environment, using fallback content");
                Self::Disabled(DisabledGateway)
            }
        }
    }

    /// Build from `LLM_*` environment variables.
    pub fn from_env(llm: &LlmConfig) -> Result<Self, GatewayError> {
        Ok(Self::from_parts(GatewayConfig::from_env()?, llm))
    }
}

impl TextGenerator for Gateway {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
        match self {
            Self::Live(gateway) => gateway.generate(request).await,
            Self::Disabled(gateway) => gateway.generate(request).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Live(gateway) => gateway.inner().name(),
            Self::Disabled(gateway) => gateway.name(),
        }
    }
}
