//! Core records of the tavern simulation.
//!
//! Memories, messages, transactions, and events are append-only once
//! created; only access metadata on [`MemoryRecord`] and objective progress
//! on [`Quest`] mutate afterward. The two continuously mutated aggregates
//! are [`TavernEconomicState`] and [`NarrativeState`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::{
    AgentRole, Atmosphere, EventType, Importance, MemoryKind, MessageKind, QuestStatus, QuestType,
    ResourceKind, TimeOfDay, TransactionKind, Weather,
};
use crate::ids::{
    AgentId, EventId, MemoryId, MessageId, QuestId, RumorId, SharedMemoryId, TransactionId,
};

// ---------------------------------------------------------------------------
// Context values
// ---------------------------------------------------------------------------

/// A scalar stored in a memory's context map.
///
/// Restricted to a handful of kinds so persistence and search stay well
/// defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ContextValue {
    /// Free text.
    Text(String),
    /// Whole number.
    Integer(i64),
    /// Exact decimal number.
    Number(Decimal),
    /// Boolean flag.
    Flag(bool),
}

impl core::fmt::Display for ContextValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Flag(flag) => write!(f, "{flag}"),
        }
    }
}

impl From<&str> for ContextValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for ContextValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<i64> for ContextValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<Decimal> for ContextValue {
    fn from(n: Decimal) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for ContextValue {
    fn from(flag: bool) -> Self {
        Self::Flag(flag)
    }
}

/// Structured key-value context attached to a memory.
pub type MemoryContext = BTreeMap<String, ContextValue>;

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// Static description of an agent, loaded from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Stable key.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Faction tag.
    pub faction: String,
    /// Narrative function.
    pub role: AgentRole,
    /// One-line character description used in prompts.
    #[serde(default)]
    pub description: String,
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// A single episodic memory owned by one agent.
///
/// Content is immutable once stored; `access_count` and `last_accessed_at`
/// are updated on retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique identifier.
    pub id: MemoryId,
    /// Owning agent.
    pub agent_id: AgentId,
    /// Category.
    pub kind: MemoryKind,
    /// What happened.
    pub content: String,
    /// Retention importance.
    pub importance: Importance,
    /// When the memory was stored.
    pub created_at: DateTime<Utc>,
    /// Structured details.
    #[serde(default)]
    pub context: MemoryContext,
    /// Other agents involved.
    #[serde(default)]
    pub related_agents: Vec<AgentId>,
    /// Free-form labels.
    #[serde(default)]
    pub tags: Vec<String>,
    /// How many times the memory has been retrieved.
    #[serde(default)]
    pub access_count: u64,
    /// Last retrieval time.
    #[serde(default)]
    pub last_accessed_at: Option<DateTime<Utc>>,
}

/// A memory made visible to other agents.
///
/// Carries a copy of the original content so recipients keep it even after
/// the sharer's record is evicted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedMemory {
    /// Unique identifier of the grant.
    pub id: SharedMemoryId,
    /// The shared record.
    pub memory_id: MemoryId,
    /// Category of the original.
    pub kind: MemoryKind,
    /// Content of the original.
    pub content: String,
    /// Importance of the original.
    pub importance: Importance,
    /// Creation time of the original.
    pub created_at: DateTime<Utc>,
    /// Tags of the original.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Agent that shared it.
    pub shared_by: AgentId,
    /// Recipients.
    pub shared_with: Vec<AgentId>,
    /// When it was shared.
    pub shared_at: DateTime<Utc>,
}

/// An ephemeral mailbox entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier.
    pub id: MessageId,
    /// Sender.
    pub from: AgentId,
    /// Recipient.
    pub to: AgentId,
    /// Text.
    pub body: String,
    /// Category.
    pub kind: MessageKind,
    /// When it was sent.
    pub sent_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Economy
// ---------------------------------------------------------------------------

/// An entry in the append-only transaction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier.
    pub id: TransactionId,
    /// Category.
    pub kind: TransactionKind,
    /// Initiator first, counterparty second, witnesses after.
    pub participants: Vec<AgentId>,
    /// Amount moved per resource (positive: initiator pays).
    pub resource_delta: BTreeMap<ResourceKind, Decimal>,
    /// Human-readable summary.
    pub description: String,
    /// Commit time.
    pub occurred_at: DateTime<Utc>,
    /// Whether balances changed.
    pub success: bool,
    /// Narrative consequences, or the rejection reason.
    pub consequences: Vec<String>,
}

/// A rumor traded as currency. Its value is fixed at listing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RumorListing {
    /// Unique identifier.
    pub id: RumorId,
    /// The rumor text.
    pub content: String,
    /// Agent who sold it.
    pub trader: AgentId,
    /// Appraised value.
    pub value: Decimal,
    /// Listing time.
    pub listed_at: DateTime<Utc>,
}

/// Aggregate economic condition of the tavern.
///
/// `reputation_score`, `information_value`, `influence_level`,
/// `supply_quality`, and `patron_satisfaction` live in `[0, 100]`;
/// `total_wealth` never drops below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TavernEconomicState {
    /// Coin in the tavern's coffers.
    pub total_wealth: Decimal,
    /// Standing of the tavern.
    pub reputation_score: Decimal,
    /// Worth of the information flowing through.
    pub information_value: Decimal,
    /// Pull with the factions.
    pub influence_level: Decimal,
    /// Quality of food and drink.
    pub supply_quality: Decimal,
    /// How happy the regulars are.
    pub patron_satisfaction: Decimal,
    /// Multiplier applied to every price.
    pub global_price_multiplier: Decimal,
    /// Per-resource price multipliers.
    pub price_multipliers: BTreeMap<ResourceKind, Decimal>,
}

impl TavernEconomicState {
    /// Clamp every bounded scalar back into range.
    pub fn clamp_bounds(&mut self) {
        let hundred = Decimal::ONE_HUNDRED;
        self.total_wealth = self.total_wealth.max(Decimal::ZERO);
        self.reputation_score = self.reputation_score.clamp(Decimal::ZERO, hundred);
        self.information_value = self.information_value.clamp(Decimal::ZERO, hundred);
        self.influence_level = self.influence_level.clamp(Decimal::ZERO, hundred);
        self.supply_quality = self.supply_quality.clamp(Decimal::ZERO, hundred);
        self.patron_satisfaction = self.patron_satisfaction.clamp(Decimal::ZERO, hundred);
    }
}

// ---------------------------------------------------------------------------
// Narrative
// ---------------------------------------------------------------------------

/// Narrative tension, always within `[0, 100]`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Tension(u8);

impl Tension {
    /// Upper bound.
    pub const MAX: u8 = 100;

    /// Build a tension level, clamping into range.
    pub fn new(level: i32) -> Self {
        let clamped = level.clamp(0, i32::from(Self::MAX));
        Self(u8::try_from(clamped).unwrap_or(Self::MAX))
    }

    /// Current level.
    pub const fn level(self) -> u8 {
        self.0
    }

    /// Shift by `delta`, saturating at the bounds.
    #[must_use]
    pub fn apply(self, delta: i32) -> Self {
        Self::new(i32::from(self.0).saturating_add(delta))
    }

    /// Atmosphere bucket for this level.
    pub const fn atmosphere(self) -> Atmosphere {
        Atmosphere::from_tension(self.0)
    }
}

/// Simulation-wide narrative state.
///
/// The atmosphere is not stored: it is always derived from the tension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeState {
    /// Current tension.
    pub tension: Tension,
    /// Recently active events, oldest first.
    pub active_event_ids: Vec<EventId>,
    /// Open quests, oldest first.
    pub active_quest_ids: Vec<QuestId>,
    /// Current time of day.
    pub time_of_day: TimeOfDay,
    /// Current weather.
    pub weather: Weather,
}

impl NarrativeState {
    /// Derived atmosphere.
    pub const fn atmosphere(&self) -> Atmosphere {
        self.tension.atmosphere()
    }
}

/// A narrative event. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier.
    pub id: EventId,
    /// Kind of event.
    pub event_type: EventType,
    /// Headline.
    pub title: String,
    /// What happens.
    pub description: String,
    /// Agents involved.
    pub participants: Vec<AgentId>,
    /// Shift applied to narrative tension.
    pub tension_change: i32,
    /// Follow-on effects.
    pub consequences: Vec<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A quest posted in the tavern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    /// Unique identifier.
    pub id: QuestId,
    /// Kind of quest.
    pub quest_type: QuestType,
    /// Headline.
    pub title: String,
    /// Details.
    pub description: String,
    /// Ordered objectives.
    pub objectives: Vec<String>,
    /// Promised rewards.
    pub rewards: Vec<String>,
    /// Difficulty in `[1, 10]`.
    pub difficulty: u8,
    /// Agents the quest needs.
    pub required_agents: Vec<AgentId>,
    /// Lifecycle state.
    pub status: QuestStatus,
    /// Completion flag per objective.
    pub progress: BTreeMap<String, bool>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Quest {
    /// Number of objectives marked done.
    pub fn completed_objectives(&self) -> usize {
        self.progress.values().filter(|done| **done).count()
    }
}
