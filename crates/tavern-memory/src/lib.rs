//! Episodic memory for tavern agents.
//!
//! The [`MemoryStore`] owns every agent's memory records, the shared-memory
//! grants between agents, per-agent mailboxes, and the directed relationship
//! matrix. It is the leaf of the simulation: the economy mirrors
//! transactions into it and the narrative engine records events in it.
//!
//! # Modules
//!
//! - [`store`] -- Storage, retrieval, search, sharing, messaging
//! - [`relationships`] -- Bounded directed weights and their labels
//! - [`mailbox`] -- Read modes for per-recipient message queues
//! - [`snapshot`] -- JSON snapshot save/load with retry
//! - [`config`] -- Store and persistence settings
//! - [`error`] -- Persistence errors

pub mod config;
pub mod error;
pub mod mailbox;
pub mod relationships;
pub mod snapshot;
pub mod store;

pub use config::{MemoryConfig, PersistenceConfig};
pub use error::MemoryError;
pub use mailbox::ReadMode;
pub use relationships::{RelationshipLabel, RelationshipMatrix};
pub use snapshot::{MemorySnapshot, SNAPSHOT_VERSION, SnapshotStore};
pub use store::{AgentContext, MemoryQuery, MemoryStats, MemoryStore, NewMemory, SHARED_TAG};
