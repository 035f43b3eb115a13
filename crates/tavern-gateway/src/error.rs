//! Error types for the text-generation gateway.
//!
//! Callers in the narrative engine never propagate these: any
//! [`GatewayError`] means "use the local fallback". The variants exist so
//! logs say why.

/// Errors that can occur while generating text.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The HTTP request could not be sent or its body read.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The response did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The attempt exceeded its deadline.
    #[error("generation timed out after {0} ms")]
    Timeout(u64),

    /// Configuration is invalid or incomplete.
    #[error("config error: {0}")]
    Config(String),

    /// No generator is available.
    #[error("text generation unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    /// Whether another attempt could plausibly succeed.
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Malformed(_) | Self::Config(_) | Self::Unavailable(_) => false,
        }
    }
}
