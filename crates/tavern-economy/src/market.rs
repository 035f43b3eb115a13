//! Stochastic market events.
//!
//! Each call to [`TavernEconomy::simulate_economic_events`] rolls three
//! independent events: a price fluctuation on one resource (±0.05 to 0.20 on
//! its multiplier, kept within `[0.5, 2.0]`), a tavern reputation swing (±1
//! to 5), and a supply-quality swing (±2 to 8). Every event that fires is
//! logged as a `market_shift` transaction so the aggregate change stays
//! traceable.

use std::collections::BTreeMap;

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tavern_types::{AgentId, ResourceKind, Transaction, TransactionId, TransactionKind};

use crate::economy::{EconomyState, TavernEconomy};

/// Lowest per-resource price multiplier.
const MULTIPLIER_MIN: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// Highest per-resource price multiplier.
const MULTIPLIER_MAX: Decimal = Decimal::from_parts(2, 0, 0, false, 0);

/// What a market event changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEventKind {
    /// A resource's price multiplier moved.
    PriceFluctuation {
        /// Affected resource.
        resource: ResourceKind,
        /// Requested shift.
        change: Decimal,
        /// Multiplier after clamping.
        multiplier: Decimal,
    },
    /// The tavern's reputation moved.
    ReputationSwing {
        /// Requested shift.
        change: Decimal,
        /// Score after clamping.
        score: Decimal,
    },
    /// Supply quality moved.
    SupplySwing {
        /// Requested shift.
        change: Decimal,
        /// Quality after clamping.
        quality: Decimal,
    },
}

/// A market event that fired, with the log entry recording it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketEvent {
    /// What changed.
    pub kind: MarketEventKind,
    /// Human-readable summary.
    pub description: String,
    /// The `market_shift` transaction logged for it.
    pub transaction_id: TransactionId,
}

/// Sample a probability, treating NaN as never and clamping into `[0, 1]`.
pub(crate) fn roll(rng: &mut impl Rng, probability: f64) -> bool {
    if probability.is_nan() {
        return false;
    }
    rng.random_bool(probability.clamp(0.0, 1.0))
}

/// `low..=high` scaled by `10^-scale`, with a random sign.
fn signed_amount(rng: &mut impl Rng, low: i64, high: i64, scale: u32) -> Decimal {
    let magnitude = rng.random_range(low..=high);
    let signed = if rng.random_bool(0.5) {
        magnitude
    } else {
        -magnitude
    };
    Decimal::new(signed, scale)
}

impl TavernEconomy {
    /// Roll this round's market events and apply those that fire.
    pub fn simulate_economic_events(&self, rng: &mut impl Rng) -> Vec<MarketEvent> {
        let odds = self.config.market_events;
        let mut events = Vec::new();
        let mut state = self.write_state();

        if roll(rng, odds.price_fluctuation_chance) {
            let index = rng.random_range(0..ResourceKind::ALL.len());
            let resource = ResourceKind::ALL
                .get(index)
                .copied()
                .unwrap_or(ResourceKind::Gold);
            let change = signed_amount(rng, 5, 20, 2);
            let entry = state
                .tavern
                .price_multipliers
                .entry(resource)
                .or_insert(Decimal::ONE);
            *entry = (*entry + change).clamp(MULTIPLIER_MIN, MULTIPLIER_MAX);
            let multiplier = *entry;
            let description = format!(
                "{} prices shifted by {change} (multiplier now {multiplier})",
                resource.as_str()
            );
            let transaction_id = log_market_shift(&mut state, &description, resource, change);
            events.push(MarketEvent {
                kind: MarketEventKind::PriceFluctuation {
                    resource,
                    change,
                    multiplier,
                },
                description,
                transaction_id,
            });
        }

        if roll(rng, odds.reputation_swing_chance) {
            let change = signed_amount(rng, 1, 5, 0);
            state.tavern.reputation_score += change;
            state.tavern.clamp_bounds();
            let score = state.tavern.reputation_score;
            let description = format!("Tavern reputation swung by {change} to {score}");
            let transaction_id =
                log_market_shift(&mut state, &description, ResourceKind::Reputation, change);
            events.push(MarketEvent {
                kind: MarketEventKind::ReputationSwing { change, score },
                description,
                transaction_id,
            });
        }

        if roll(rng, odds.supply_swing_chance) {
            let change = signed_amount(rng, 2, 8, 0);
            state.tavern.supply_quality += change;
            state.tavern.clamp_bounds();
            let quality = state.tavern.supply_quality;
            let description = format!("Supply quality swung by {change} to {quality}");
            let transaction_id =
                log_market_shift(&mut state, &description, ResourceKind::Supplies, change);
            events.push(MarketEvent {
                kind: MarketEventKind::SupplySwing { change, quality },
                description,
                transaction_id,
            });
        }

        if !events.is_empty() {
            tracing::info!(count = events.len(), "Market events fired");
        }
        events
    }
}

/// Append a market-only log entry recording an aggregate shift.
fn log_market_shift(
    state: &mut EconomyState,
    description: &str,
    resource: ResourceKind,
    change: Decimal,
) -> TransactionId {
    let transaction = Transaction {
        id: TransactionId::new(),
        kind: TransactionKind::MarketShift,
        participants: vec![AgentId::market()],
        resource_delta: BTreeMap::from([(resource, change)]),
        description: description.to_owned(),
        occurred_at: Utc::now(),
        success: true,
        consequences: vec!["market conditions shifted".to_owned()],
    };
    let id = transaction.id;
    state.log.push(transaction);
    id
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use rust_decimal_macros::dec;
    use tavern_memory::MemoryStore;

    use super::*;
    use crate::config::{EconomyConfig, MarketEventConfig};

    fn economy_with(odds: MarketEventConfig) -> TavernEconomy {
        let config = EconomyConfig {
            market_events: odds,
            ..EconomyConfig::default()
        };
        TavernEconomy::new(config, Arc::new(MemoryStore::default()))
    }

    #[test]
    fn certain_events_all_fire_and_are_logged() {
        let economy = economy_with(MarketEventConfig {
            price_fluctuation_chance: 1.0,
            reputation_swing_chance: 1.0,
            supply_swing_chance: 1.0,
        });
        let mut rng = SmallRng::seed_from_u64(7);
        let events = economy.simulate_economic_events(&mut rng);
        assert_eq!(events.len(), 3);
        let log = economy.transactions();
        assert_eq!(log.len(), 3);
        assert!(log.iter().all(|t| t.kind == TransactionKind::MarketShift));
    }

    #[test]
    fn impossible_events_never_fire() {
        let economy = economy_with(MarketEventConfig {
            price_fluctuation_chance: 0.0,
            reputation_swing_chance: f64::NAN,
            supply_swing_chance: -3.0,
        });
        let mut rng = SmallRng::seed_from_u64(7);
        assert!(economy.simulate_economic_events(&mut rng).is_empty());
        assert_eq!(economy.transaction_count(), 0);
    }

    #[test]
    fn repeated_events_stay_in_bounds() {
        let economy = economy_with(MarketEventConfig {
            price_fluctuation_chance: 1.0,
            reputation_swing_chance: 1.0,
            supply_swing_chance: 1.0,
        });
        let mut rng = SmallRng::seed_from_u64(99);
        for _ in 0..500 {
            for event in economy.simulate_economic_events(&mut rng) {
                match event.kind {
                    MarketEventKind::PriceFluctuation { change, .. } => {
                        assert!(change.abs() >= dec!(0.05) && change.abs() <= dec!(0.20));
                    }
                    MarketEventKind::ReputationSwing { change, .. } => {
                        assert!(change.abs() >= dec!(1) && change.abs() <= dec!(5));
                    }
                    MarketEventKind::SupplySwing { change, .. } => {
                        assert!(change.abs() >= dec!(2) && change.abs() <= dec!(8));
                    }
                }
            }
        }
        let tavern = economy.tavern_state();
        assert!(tavern.reputation_score >= dec!(0) && tavern.reputation_score <= dec!(100));
        assert!(tavern.supply_quality >= dec!(0) && tavern.supply_quality <= dec!(100));
        assert!(
            tavern
                .price_multipliers
                .values()
                .all(|m| *m >= dec!(0.5) && *m <= dec!(2))
        );
    }
}
