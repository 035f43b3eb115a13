//! Type-safe identifier wrappers.
//!
//! Records created at runtime (memories, messages, transactions, events,
//! quests, rumors) get a UUID v7 (time-ordered) newtype so identifiers of
//! different kinds cannot be mixed at compile time. Agents are configured
//! up front and keep a stable, human-readable string key instead.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a stored memory record.
    MemoryId
}

define_id! {
    /// Unique identifier for a shared-memory grant.
    SharedMemoryId
}

define_id! {
    /// Unique identifier for a mailbox message.
    MessageId
}

define_id! {
    /// Unique identifier for an entry in the transaction log.
    TransactionId
}

define_id! {
    /// Unique identifier for a rumor listed on the market.
    RumorId
}

define_id! {
    /// Unique identifier for a narrative event.
    EventId
}

define_id! {
    /// Unique identifier for a quest.
    QuestId
}

/// Key of the synthetic counterparty that stands in for the open market.
pub const MARKET_AGENT: &str = "market";

/// Stable string key of an agent.
///
/// Agents are declared in configuration and never destroyed, so their key is
/// a plain name chosen by the operator (e.g. `"innkeeper_mira"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Create an agent key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The synthetic market participant used as counterparty for trades
    /// with the outside world.
    pub fn market() -> Self {
        Self(MARKET_AGENT.to_owned())
    }

    /// Whether this key names the synthetic market participant.
    pub fn is_market(&self) -> bool {
        self.0 == MARKET_AGENT
    }

    /// Borrow the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for AgentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for AgentId {
    fn from(key: String) -> Self {
        Self(key)
    }
}
