//! Reputation feedback from narrative events.
//!
//! Every event type carries a fixed base delta for the tavern's reputation.
//! The tavern moves by `base - tension_change * 0.1`, so tense events cost
//! extra standing. Each participant's own reputation moves according to the
//! event's polarity:
//!
//! | Polarity | Agent delta |
//! |----------|-------------|
//! | Positive | `0.5 * abs(base)` |
//! | Negative | `0.3 * base` |
//! | Neutral  | `0.2 * base` |
//!
//! Feedback for an event is applied at most once.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tavern_types::{AgentId, Event, EventId, EventPolarity, EventType, ResourceKind};

use crate::economy::{REPUTATION_CAP, TavernEconomy};
use crate::error::EconomyError;

/// Base tavern reputation delta of an event type.
pub fn base_reputation_delta(event_type: EventType) -> Decimal {
    match event_type {
        EventType::QuestOpportunity => Decimal::from(3),
        EventType::BetrayalRevealed => Decimal::from(-8),
        EventType::DiplomaticMission => Decimal::from(5),
        EventType::StrangerArrival => Decimal::ONE,
        EventType::RumorSpread => Decimal::from(-2),
        EventType::AllianceFormed => Decimal::from(4),
        EventType::BrawlBreakout => Decimal::from(-6),
        EventType::ThreatEmerges => Decimal::from(-5),
    }
}

/// Whether an event type is good or bad news.
pub const fn polarity(event_type: EventType) -> EventPolarity {
    match event_type {
        EventType::QuestOpportunity | EventType::DiplomaticMission | EventType::AllianceFormed => {
            EventPolarity::Positive
        }
        EventType::BetrayalRevealed | EventType::BrawlBreakout | EventType::ThreatEmerges => {
            EventPolarity::Negative
        }
        EventType::StrangerArrival | EventType::RumorSpread => EventPolarity::Neutral,
    }
}

/// Tavern reputation delta for an event, before clamping.
pub fn tavern_delta(event_type: EventType, tension_change: i32) -> Decimal {
    base_reputation_delta(event_type) - Decimal::from(tension_change) * Decimal::new(1, 1)
}

/// A participant's reputation delta for an event, before clamping.
pub fn agent_delta(event_type: EventType) -> Decimal {
    let base = base_reputation_delta(event_type);
    match polarity(event_type) {
        EventPolarity::Positive => base.abs() * Decimal::new(5, 1),
        EventPolarity::Negative => base * Decimal::new(3, 1),
        EventPolarity::Neutral => base * Decimal::new(2, 1),
    }
}

/// What one event did to reputations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationFeedback {
    /// The event applied.
    pub event_id: EventId,
    /// Shift applied to the tavern score, before clamping.
    pub tavern_delta: Decimal,
    /// Shift applied to each known participant, before clamping.
    pub agent_deltas: BTreeMap<AgentId, Decimal>,
}

impl TavernEconomy {
    /// Push an event's reputation consequences into the economy.
    ///
    /// Participants without an account are skipped. A second call with the
    /// same event id is refused.
    pub fn update_reputation_on_event(
        &self,
        event: &Event,
    ) -> Result<ReputationFeedback, EconomyError> {
        let mut state = self.write_state();
        if !state.applied_events.insert(event.id) {
            return Err(EconomyError::EventAlreadyApplied(event.id));
        }

        let tavern_shift = tavern_delta(event.event_type, event.tension_change);
        state.tavern.reputation_score += tavern_shift;
        state.tavern.clamp_bounds();

        let shift = agent_delta(event.event_type);
        let mut agent_deltas = BTreeMap::new();
        for participant in &event.participants {
            if agent_deltas.contains_key(participant) {
                continue;
            }
            let Some(reputation) = state
                .balances
                .get_mut(participant)
                .and_then(|b| b.get_mut(&ResourceKind::Reputation))
            else {
                tracing::warn!(
                    event_id = %event.id,
                    agent = %participant,
                    "Skipping reputation feedback for unregistered participant"
                );
                continue;
            };
            *reputation = (*reputation + shift).clamp(Decimal::ZERO, REPUTATION_CAP);
            agent_deltas.insert(participant.clone(), shift);
        }

        tracing::debug!(
            event_id = %event.id,
            event_type = event.event_type.as_str(),
            tavern_delta = %tavern_shift,
            tavern_reputation = %state.tavern.reputation_score,
            agents = agent_deltas.len(),
            "Applied reputation feedback"
        );
        Ok(ReputationFeedback {
            event_id: event.id,
            tavern_delta: tavern_shift,
            agent_deltas,
        })
    }
}
