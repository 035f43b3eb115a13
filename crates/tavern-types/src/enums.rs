//! Closed enumerations for the tavern simulation.
//!
//! Every decision point in the simulation (event selection, transaction
//! consequences, role routing) matches exhaustively over one of these, so a
//! new kind is a compile-time-checked extension. All enums serialize with
//! stable `snake_case` names.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// Category of a memory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// Something the agent saw or heard.
    Observation,
    /// An exchange with another agent (messages, transactions, dialogue).
    Interaction,
    /// A choice the agent made.
    Decision,
    /// An emotional reaction.
    Emotion,
    /// A change in how the agent regards someone.
    Relationship,
    /// A narrative event the agent took part in.
    Event,
    /// A rumor the agent heard or traded.
    Rumor,
    /// A perceived danger.
    Threat,
}

impl MemoryKind {
    /// Every memory kind, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Observation,
        Self::Interaction,
        Self::Decision,
        Self::Emotion,
        Self::Relationship,
        Self::Event,
        Self::Rumor,
        Self::Threat,
    ];

    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Observation => "observation",
            Self::Interaction => "interaction",
            Self::Decision => "decision",
            Self::Emotion => "emotion",
            Self::Relationship => "relationship",
            Self::Event => "event",
            Self::Rumor => "rumor",
            Self::Threat => "threat",
        }
    }
}

/// How important a memory is. Ordered `Low < Medium < High < Critical`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    /// Routine detail.
    #[default]
    Low,
    /// Worth remembering.
    Medium,
    /// Significant.
    High,
    /// Life-changing; automatically shared with related agents.
    Critical,
}

impl Importance {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Category of a mailbox message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Ordinary conversation.
    #[default]
    Direct,
    /// A trade proposal or answer.
    Trade,
    /// A rumor passed along.
    Rumor,
    /// A warning about danger.
    Warning,
    /// A request for help or a favor.
    Request,
}

impl MessageKind {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Trade => "trade",
            Self::Rumor => "rumor",
            Self::Warning => "warning",
            Self::Request => "request",
        }
    }
}

// ---------------------------------------------------------------------------
// Economy
// ---------------------------------------------------------------------------

/// A resource held in an agent's balance sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Coin.
    Gold,
    /// Standing among patrons, bounded to `[0, 100]` per agent.
    Reputation,
    /// Useful knowledge.
    Information,
    /// Pull with factions.
    Influence,
    /// Food, drink, and goods.
    Supplies,
    /// Owed favors.
    Favors,
}

impl ResourceKind {
    /// Every resource kind, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Gold,
        Self::Reputation,
        Self::Information,
        Self::Influence,
        Self::Supplies,
        Self::Favors,
    ];

    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gold => "gold",
            Self::Reputation => "reputation",
            Self::Information => "information",
            Self::Influence => "influence",
            Self::Supplies => "supplies",
            Self::Favors => "favors",
        }
    }
}

/// Category of an economic transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Buying goods.
    Purchase,
    /// Selling goods.
    Sale,
    /// A barter between two parties.
    Trade,
    /// Knowledge exchanged for value.
    InformationExchange,
    /// A payment for looking the other way.
    Bribe,
    /// A favor granted or called in.
    Favor,
    /// Payment for work.
    Service,
    /// Something given freely.
    Gift,
    /// A rumor sold to the market.
    RumorTrade,
    /// Payout for a completed quest.
    QuestReward,
    /// A stochastic market movement.
    MarketShift,
}

impl TransactionKind {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Sale => "sale",
            Self::Trade => "trade",
            Self::InformationExchange => "information_exchange",
            Self::Bribe => "bribe",
            Self::Favor => "favor",
            Self::Service => "service",
            Self::Gift => "gift",
            Self::RumorTrade => "rumor_trade",
            Self::QuestReward => "quest_reward",
            Self::MarketShift => "market_shift",
        }
    }
}

// ---------------------------------------------------------------------------
// Narrative
// ---------------------------------------------------------------------------

/// The eight kinds of narrative event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A stranger walks in.
    StrangerArrival,
    /// Whispers travel between tables.
    RumorSpread,
    /// A fight breaks out.
    BrawlBreakout,
    /// Someone offers work.
    QuestOpportunity,
    /// A betrayal comes to light.
    BetrayalRevealed,
    /// Two parties join forces.
    AllianceFormed,
    /// A danger looms over the tavern.
    ThreatEmerges,
    /// Envoys arrive to negotiate.
    DiplomaticMission,
}

impl EventType {
    /// Every event type, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::StrangerArrival,
        Self::RumorSpread,
        Self::BrawlBreakout,
        Self::QuestOpportunity,
        Self::BetrayalRevealed,
        Self::AllianceFormed,
        Self::ThreatEmerges,
        Self::DiplomaticMission,
    ];

    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StrangerArrival => "stranger_arrival",
            Self::RumorSpread => "rumor_spread",
            Self::BrawlBreakout => "brawl_breakout",
            Self::QuestOpportunity => "quest_opportunity",
            Self::BetrayalRevealed => "betrayal_revealed",
            Self::AllianceFormed => "alliance_formed",
            Self::ThreatEmerges => "threat_emerges",
            Self::DiplomaticMission => "diplomatic_mission",
        }
    }
}

/// Whether an event is good, bad, or indifferent news for the tavern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPolarity {
    /// Good news.
    Positive,
    /// Bad news.
    Negative,
    /// Neither.
    Neutral,
}

/// Kind of quest offered in the tavern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestType {
    /// Carry something somewhere.
    Delivery,
    /// Find out what happened.
    Investigation,
    /// Broker an agreement.
    Diplomacy,
    /// Recover a lost item.
    Retrieval,
    /// Hunt someone down.
    Bounty,
    /// Save someone.
    Rescue,
}

impl QuestType {
    /// Every quest type.
    pub const ALL: [Self; 6] = [
        Self::Delivery,
        Self::Investigation,
        Self::Diplomacy,
        Self::Retrieval,
        Self::Bounty,
        Self::Rescue,
    ];

    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delivery => "delivery",
            Self::Investigation => "investigation",
            Self::Diplomacy => "diplomacy",
            Self::Retrieval => "retrieval",
            Self::Bounty => "bounty",
            Self::Rescue => "rescue",
        }
    }
}

/// Lifecycle state of a quest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    /// Posted, nobody has made progress yet.
    #[default]
    Available,
    /// At least one objective done.
    Active,
    /// All objectives done.
    Completed,
    /// Abandoned or lost.
    Failed,
}

impl QuestStatus {
    /// Whether the quest still accepts objective completions.
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Available | Self::Active)
    }
}

/// Mood of the common room, derived from tension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Atmosphere {
    /// Tension below 25.
    Calm,
    /// Tension 25 to 49.
    Tense,
    /// Tension 50 to 74.
    Hostile,
    /// Tension 75 and above.
    Explosive,
}

impl Atmosphere {
    /// Bucket a tension level into an atmosphere using the 25/50/75
    /// thresholds.
    pub const fn from_tension(tension: u8) -> Self {
        if tension < 25 {
            Self::Calm
        } else if tension < 50 {
            Self::Tense
        } else if tension < 75 {
            Self::Hostile
        } else {
            Self::Explosive
        }
    }

    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Calm => "calm",
            Self::Tense => "tense",
            Self::Hostile => "hostile",
            Self::Explosive => "explosive",
        }
    }
}

/// Time of day in the tavern. Advances one step per narrative tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    /// Breakfast crowd.
    Morning,
    /// Quiet hours.
    Afternoon,
    /// The busiest stretch.
    #[default]
    Evening,
    /// Late drinkers and schemers.
    Night,
}

impl TimeOfDay {
    /// The following time of day, wrapping at night.
    pub const fn next(self) -> Self {
        match self {
            Self::Morning => Self::Afternoon,
            Self::Afternoon => Self::Evening,
            Self::Evening => Self::Night,
            Self::Night => Self::Morning,
        }
    }

    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
            Self::Night => "night",
        }
    }
}

/// Weather outside.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    /// Clear skies.
    #[default]
    Clear,
    /// Rain.
    Rainy,
    /// Thunder and wind.
    Stormy,
    /// Thick fog.
    Foggy,
}

impl Weather {
    /// Every weather kind, in declaration order.
    pub const ALL: [Self; 4] = [Self::Clear, Self::Rainy, Self::Stormy, Self::Foggy];

    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Rainy => "rainy",
            Self::Stormy => "stormy",
            Self::Foggy => "foggy",
        }
    }
}

/// Narrative function of an agent. Static configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Runs the tavern.
    Innkeeper,
    /// Buys and sells.
    Merchant,
    /// Hands out work.
    QuestGiver,
    /// Keeps the old stories.
    LoreKeeper,
    /// Trades in secrets.
    Informant,
    /// Sword for hire.
    Mercenary,
    /// A regular.
    Patron,
}

impl AgentRole {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Innkeeper => "innkeeper",
            Self::Merchant => "merchant",
            Self::QuestGiver => "quest_giver",
            Self::LoreKeeper => "lore_keeper",
            Self::Informant => "informant",
            Self::Mercenary => "mercenary",
            Self::Patron => "patron",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn importance_is_totally_ordered() {
        assert!(Importance::Low < Importance::Medium);
        assert!(Importance::Medium < Importance::High);
        assert!(Importance::High < Importance::Critical);
    }

    #[test]
    fn atmosphere_thresholds() {
        assert_eq!(Atmosphere::from_tension(0), Atmosphere::Calm);
        assert_eq!(Atmosphere::from_tension(24), Atmosphere::Calm);
        assert_eq!(Atmosphere::from_tension(25), Atmosphere::Tense);
        assert_eq!(Atmosphere::from_tension(49), Atmosphere::Tense);
        assert_eq!(Atmosphere::from_tension(50), Atmosphere::Hostile);
        assert_eq!(Atmosphere::from_tension(74), Atmosphere::Hostile);
        assert_eq!(Atmosphere::from_tension(75), Atmosphere::Explosive);
        assert_eq!(Atmosphere::from_tension(100), Atmosphere::Explosive);
    }

    #[test]
    fn time_of_day_cycles() {
        let mut time = TimeOfDay::Morning;
        for _ in 0..4 {
            time = time.next();
        }
        assert_eq!(time, TimeOfDay::Morning);
    }

    #[test]
    fn event_type_names_match_serde() {
        for event_type in EventType::ALL {
            let json = serde_json::to_string(&event_type).unwrap_or_default();
            assert_eq!(json, format!("\"{}\"", event_type.as_str()));
        }
    }

    #[test]
    fn only_open_quests_accept_progress() {
        assert!(QuestStatus::Available.is_open());
        assert!(QuestStatus::Active.is_open());
        assert!(!QuestStatus::Completed.is_open());
        assert!(!QuestStatus::Failed.is_open());
    }
}
