//! Shared type definitions for the tavern simulation.
//!
//! Every other crate in the workspace speaks in terms of these types: the
//! memory store persists [`MemoryRecord`]s, the economy appends
//! [`Transaction`]s, and the narrative engine produces [`Event`]s and
//! [`Quest`]s.
//!
//! # Modules
//!
//! - [`ids`] -- UUID v7 wrappers for runtime records and string agent keys
//! - [`enums`] -- Closed enumerations (memory kinds, resources, events, quests)
//! - [`records`] -- Memories, messages, transactions, events, quests, state
//! - [`retry`] -- Bounded exponential backoff policy

pub mod enums;
pub mod ids;
pub mod records;
pub mod retry;

// Re-export all public types at crate root for convenience.
pub use enums::{
    AgentRole, Atmosphere, EventPolarity, EventType, Importance, MemoryKind, MessageKind,
    QuestStatus, QuestType, ResourceKind, TimeOfDay, TransactionKind, Weather,
};
pub use ids::{
    AgentId, EventId, MARKET_AGENT, MemoryId, MessageId, QuestId, RumorId, SharedMemoryId,
    TransactionId,
};
pub use records::{
    AgentProfile, ContextValue, Event, MemoryContext, MemoryRecord, Message, NarrativeState,
    Quest, RumorListing, SharedMemory, TavernEconomicState, Tension, Transaction,
};
pub use retry::RetryPolicy;
