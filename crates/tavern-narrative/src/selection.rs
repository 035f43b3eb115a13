//! Weighted rules behind every stochastic narrative choice.
//!
//! The story runs in three bands keyed on tension: below 30 the tavern is
//! being introduced, below 60 conflicts escalate, and from 60 up the story
//! heads for a climax. Event types and quest types are drawn with
//! band-specific weights. Everything here is a pure function of its inputs
//! plus the supplied RNG, so callers can test it with a seeded `SmallRng`.

use rand::Rng;
use rand::seq::IndexedRandom;
use rust_decimal::Decimal;

use tavern_types::{EventType, QuestType, Tension};

/// Active events beyond which new threads are damped.
const CROWDED_EVENTS: usize = 3;

/// Narrative phase derived from tension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryBand {
    /// Tension below 30.
    Introduction,
    /// Tension below 60.
    Escalation,
    /// Tension 60 and above.
    Climax,
}

impl StoryBand {
    /// Band for `tension`.
    pub const fn of(tension: Tension) -> Self {
        match tension.level() {
            0..30 => Self::Introduction,
            30..60 => Self::Escalation,
            _ => Self::Climax,
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Relative weight of each event type in `band`, before crowding.
const fn event_weights(band: StoryBand) -> [(EventType, u32); 8] {
    match band {
        StoryBand::Introduction => [
            (EventType::StrangerArrival, 4),
            (EventType::QuestOpportunity, 4),
            (EventType::DiplomaticMission, 2),
            (EventType::RumorSpread, 2),
            (EventType::AllianceFormed, 1),
            (EventType::ThreatEmerges, 0),
            (EventType::BrawlBreakout, 0),
            (EventType::BetrayalRevealed, 0),
        ],
        StoryBand::Escalation => [
            (EventType::RumorSpread, 4),
            (EventType::AllianceFormed, 3),
            (EventType::ThreatEmerges, 4),
            (EventType::DiplomaticMission, 1),
            (EventType::QuestOpportunity, 1),
            (EventType::StrangerArrival, 1),
            (EventType::BrawlBreakout, 1),
            (EventType::BetrayalRevealed, 0),
        ],
        StoryBand::Climax => [
            (EventType::BrawlBreakout, 4),
            (EventType::BetrayalRevealed, 4),
            (EventType::ThreatEmerges, 3),
            (EventType::RumorSpread, 1),
            (EventType::AllianceFormed, 1),
            (EventType::DiplomaticMission, 1),
            (EventType::StrangerArrival, 0),
            (EventType::QuestOpportunity, 0),
        ],
    }
}

/// Whether an event type opens a new story thread.
const fn opens_thread(event_type: EventType) -> bool {
    matches!(
        event_type,
        EventType::StrangerArrival | EventType::QuestOpportunity | EventType::ThreatEmerges
    )
}

/// Whether an event type tends to resolve open threads.
const fn resolves_threads(event_type: EventType) -> bool {
    matches!(
        event_type,
        EventType::AllianceFormed | EventType::DiplomaticMission
    )
}

/// Final weights for the current tension and number of active events.
///
/// With more than three active events, thread-opening types lose half their
/// weight and resolving types gain one point per extra event.
pub fn weighted_event_types(tension: Tension, active_events: usize) -> Vec<(EventType, u32)> {
    let crowding = active_events.saturating_sub(CROWDED_EVENTS);
    let bonus = u32::try_from(crowding).unwrap_or(u32::MAX);
    event_weights(StoryBand::of(tension))
        .into_iter()
        .map(|(event_type, weight)| {
            let adjusted = if crowding == 0 {
                weight
            } else if opens_thread(event_type) {
                weight / 2
            } else if resolves_threads(event_type) {
                weight.saturating_add(bonus)
            } else {
                weight
            };
            (event_type, adjusted)
        })
        .collect()
}

/// Draw an event type.
pub fn choose_event_type(
    rng: &mut impl Rng,
    tension: Tension,
    active_events: usize,
) -> EventType {
    choose_weighted(rng, &weighted_event_types(tension, active_events))
        .unwrap_or(EventType::RumorSpread)
}

/// Inclusive tension-change range of each event type.
pub const fn tension_range(event_type: EventType) -> (i32, i32) {
    match event_type {
        EventType::StrangerArrival => (2, 8),
        EventType::RumorSpread => (5, 12),
        EventType::BrawlBreakout => (15, 30),
        EventType::QuestOpportunity => (-5, 3),
        EventType::BetrayalRevealed => (20, 35),
        EventType::AllianceFormed => (-15, -5),
        EventType::ThreatEmerges => (10, 25),
        EventType::DiplomaticMission => (-12, -3),
    }
}

/// Draw a tension change for `event_type` from its range.
pub fn roll_tension_change(rng: &mut impl Rng, event_type: EventType) -> i32 {
    let (low, high) = tension_range(event_type);
    rng.random_range(low..=high)
}

// ---------------------------------------------------------------------------
// Quests
// ---------------------------------------------------------------------------

/// Relative weight of each quest type in `band`.
const fn quest_weights(band: StoryBand) -> [(QuestType, u32); 6] {
    match band {
        StoryBand::Introduction => [
            (QuestType::Delivery, 4),
            (QuestType::Investigation, 2),
            (QuestType::Diplomacy, 2),
            (QuestType::Retrieval, 2),
            (QuestType::Bounty, 0),
            (QuestType::Rescue, 0),
        ],
        StoryBand::Escalation => [
            (QuestType::Investigation, 4),
            (QuestType::Retrieval, 2),
            (QuestType::Diplomacy, 2),
            (QuestType::Bounty, 1),
            (QuestType::Rescue, 1),
            (QuestType::Delivery, 1),
        ],
        StoryBand::Climax => [
            (QuestType::Bounty, 4),
            (QuestType::Rescue, 4),
            (QuestType::Investigation, 1),
            (QuestType::Diplomacy, 1),
            (QuestType::Retrieval, 0),
            (QuestType::Delivery, 0),
        ],
    }
}

/// Draw a quest type for the current tension.
pub fn choose_quest_type(rng: &mut impl Rng, tension: Tension) -> QuestType {
    choose_weighted(rng, &quest_weights(StoryBand::of(tension))).unwrap_or(QuestType::Delivery)
}

/// Default difficulty: `3 + tension/20 + active_quests/2`, within `[1, 10]`.
pub fn quest_difficulty(tension: Tension, active_quests: usize) -> u8 {
    let from_quests = u8::try_from(active_quests / 2).unwrap_or(u8::MAX);
    3u8.saturating_add(tension.level() / 20)
        .saturating_add(from_quests)
        .clamp(1, 10)
}

// ---------------------------------------------------------------------------
// Advancing
// ---------------------------------------------------------------------------

/// Player-action keywords and their tension shifts, checked in order.
pub const ACTION_KEYWORDS: [(&str, i32); 5] = [
    ("investigate", 5),
    ("challenge", 15),
    ("negotiate", -5),
    ("attack", 25),
    ("retreat", -10),
];

/// Tension shift for one player action: the first keyword found wins,
/// unmatched actions shift nothing.
pub fn action_tension_delta(action: &str) -> i32 {
    let action = action.to_lowercase();
    ACTION_KEYWORDS
        .iter()
        .find(|(keyword, _)| action.contains(keyword))
        .map_or(0, |(_, delta)| *delta)
}

/// Probability of an automatic event this advance.
///
/// The adjustments stack additively on `base`: +0.10 when tension is below
/// 30, -0.15 with more than three active events, and +0.40 / +0.20 / +0.10
/// when tavern reputation is below 25, below 50, or above 80. The sum is
/// clamped to `[0, 1]`.
pub fn auto_event_chance(
    base: f64,
    tension: Tension,
    active_events: usize,
    tavern_reputation: Decimal,
) -> f64 {
    let mut chance = base;
    if tension.level() < 30 {
        chance += 0.10;
    }
    if active_events > CROWDED_EVENTS {
        chance -= 0.15;
    }
    if tavern_reputation < Decimal::from(25) {
        chance += 0.40;
    } else if tavern_reputation < Decimal::from(50) {
        chance += 0.20;
    } else if tavern_reputation > Decimal::from(80) {
        chance += 0.10;
    }
    if chance.is_nan() {
        0.0
    } else {
        chance.clamp(0.0, 1.0)
    }
}

/// Sample `true` with probability `p`, treating NaN as zero.
pub fn roll(rng: &mut impl Rng, p: f64) -> bool {
    if p.is_nan() {
        return false;
    }
    rng.random_bool(p.clamp(0.0, 1.0))
}

fn choose_weighted<T: Copy>(rng: &mut impl Rng, weights: &[(T, u32)]) -> Option<T> {
    weights
        .choose_weighted(rng, |(_, weight)| *weight)
        .ok()
        .map(|(item, _)| *item)
}
