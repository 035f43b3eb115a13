//! Error types for the economy.
//!
//! Rejected transactions are not errors: they are appended to the log with
//! `success = false`. [`EconomyError`] covers misuse of the API itself.

use rust_decimal::Decimal;

use tavern_types::{AgentId, EventId, ResourceKind};

/// Errors returned by economy operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EconomyError {
    /// The agent already has an account.
    #[error("agent {0} is already registered")]
    DuplicateAgent(AgentId),

    /// The agent has no account.
    #[error("agent {0} is not registered")]
    UnknownAgent(AgentId),

    /// The reserved market key cannot hold an account.
    #[error("the market participant cannot be registered as an agent")]
    ReservedAgent,

    /// Reputation feedback for this event was already applied.
    #[error("reputation feedback for event {0} was already applied")]
    EventAlreadyApplied(EventId),

    /// Pricing the requested amount does not fit in a `Decimal`.
    #[error("pricing {amount} {} overflowed", .resource.as_str())]
    PriceOverflow {
        /// Resource being priced.
        resource: ResourceKind,
        /// Amount requested.
        amount: Decimal,
    },
}
