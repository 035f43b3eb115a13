//! Memory store and persistence configuration.

use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::Deserialize;

use tavern_types::{Importance, RetryPolicy};

/// Tuning knobs for the memory store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MemoryConfig {
    /// Records kept per agent before the lowest-ranked are evicted.
    #[serde(default = "default_max_memories")]
    pub max_memories_per_agent: usize,

    /// Relationship nudge from sharer to each recipient.
    #[serde(default = "default_share_forward_delta")]
    pub share_forward_delta: Decimal,

    /// Relationship nudge from each recipient back to the sharer.
    #[serde(default = "default_share_return_delta")]
    pub share_return_delta: Decimal,

    /// Importance of the interaction memories written for every message.
    #[serde(default = "default_message_importance")]
    pub message_importance: Importance,

    /// Unread messages kept per mailbox; the oldest are dropped beyond it.
    #[serde(default = "default_max_messages")]
    pub max_messages_per_mailbox: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_memories_per_agent: default_max_memories(),
            share_forward_delta: default_share_forward_delta(),
            share_return_delta: default_share_return_delta(),
            message_importance: default_message_importance(),
            max_messages_per_mailbox: default_max_messages(),
        }
    }
}

const fn default_max_memories() -> usize {
    1000
}

fn default_share_forward_delta() -> Decimal {
    Decimal::new(10, 2)
}

fn default_share_return_delta() -> Decimal {
    Decimal::new(5, 2)
}

const fn default_message_importance() -> Importance {
    Importance::Medium
}

const fn default_max_messages() -> usize {
    200
}

/// Where and how often memory snapshots are written.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PersistenceConfig {
    /// Directory holding `<namespace>.json` files.
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,

    /// Snapshot namespace used by the engine.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Ticks between periodic snapshots (0 disables periodic saves).
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval_ticks: u64,

    /// Backoff applied to snapshot file I/O.
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: default_snapshot_dir(),
            namespace: default_namespace(),
            snapshot_interval_ticks: default_snapshot_interval(),
            retry: RetryPolicy::default(),
        }
    }
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("data/snapshots")
}

fn default_namespace() -> String {
    String::from("tavern")
}

const fn default_snapshot_interval() -> u64 {
    10
}
