//! Error types for the tavern engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps every failure
//! mode during startup, snapshot handling, and the tick loop.

/// Top-level error for the tavern engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: tavern_narrative::ConfigError,
    },

    /// Snapshot persistence failed.
    #[error("memory error: {source}")]
    Memory {
        /// The underlying memory error.
        #[from]
        source: tavern_memory::MemoryError,
    },

    /// Roster registration failed.
    #[error("economy error: {source}")]
    Economy {
        /// The underlying economy error.
        #[from]
        source: tavern_economy::EconomyError,
    },

    /// Gateway credentials were present but invalid.
    #[error("gateway error: {source}")]
    Gateway {
        /// The underlying gateway error.
        #[from]
        source: tavern_gateway::GatewayError,
    },

    /// Narrative engine construction failed.
    #[error("narrative error: {source}")]
    Narrative {
        /// The underlying narrative error.
        #[from]
        source: tavern_narrative::NarrativeError,
    },
}
