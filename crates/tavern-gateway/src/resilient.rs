//! Deadline and retry wrapper around any [`TextGenerator`].
//!
//! Each attempt runs under its own deadline. Transient failures (transport
//! errors, timeouts, 429 and 5xx) are retried with exponential backoff from
//! the [`RetryPolicy`]; anything else, and the last transient failure,
//! surfaces to the caller, who then takes the fallback path.

use std::time::Duration;

use tavern_types::RetryPolicy;

use crate::error::GatewayError;
use crate::generator::{GenerationRequest, TextGenerator};

/// A generator with per-attempt timeouts and bounded retries.
#[derive(Debug, Clone)]
pub struct ResilientGateway<G> {
    inner: G,
    timeout: Duration,
    retry: RetryPolicy,
}

impl<G: TextGenerator> ResilientGateway<G> {
    /// Wrap `inner` with the given deadline and retry policy.
    pub const fn new(inner: G, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            inner,
            timeout,
            retry,
        }
    }

    /// The wrapped generator.
    pub const fn inner(&self) -> &G {
        &self.inner
    }

    async fn attempt(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
        match tokio::time::timeout(self.timeout, self.inner.generate(request)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(GatewayError::Timeout(
                u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }
}

impl<G: TextGenerator> TextGenerator for ResilientGateway<G> {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
        let attempts = self.retry.attempts();
        let mut attempt = 1;
        loop {
            match self.attempt(request).await {
                Ok(text) => {
                    tracing::debug!(
                        backend = self.inner.name(),
                        attempt,
                        chars = text.len(),
                        "Generation succeeded"
                    );
                    return Ok(text);
                }
                Err(err) if err.is_transient() && attempt < attempts => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        backend = self.inner.name(),
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Generation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        backend = self.inner.name(),
                        attempt,
                        error = %err,
                        "Generation failed"
                    );
                    return Err(err);
                }
            }
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
