//! Directed relationship weights between agents.
//!
//! Weights live in `[-1.0, 1.0]` and are clamped on every update, so a long
//! run of friendly gestures saturates at 1 rather than drifting past it.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tavern_types::AgentId;

/// Maximum weight (sworn allies).
const WEIGHT_MAX: Decimal = Decimal::ONE;

/// Minimum weight (open enemies).
const WEIGHT_MIN: Decimal = Decimal::NEGATIVE_ONE;

/// Coarse reading of a relationship weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipLabel {
    /// Weight at or above 0.5.
    Ally,
    /// Weight at or above 0.2.
    Friendly,
    /// Anything in between.
    Neutral,
    /// Weight at or below -0.2.
    Wary,
    /// Weight at or below -0.5.
    Hostile,
}

impl RelationshipLabel {
    /// Bucket a weight.
    pub fn from_weight(weight: Decimal) -> Self {
        if weight >= Decimal::new(5, 1) {
            Self::Ally
        } else if weight >= Decimal::new(2, 1) {
            Self::Friendly
        } else if weight <= Decimal::new(-5, 1) {
            Self::Hostile
        } else if weight <= Decimal::new(-2, 1) {
            Self::Wary
        } else {
            Self::Neutral
        }
    }

    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ally => "ally",
            Self::Friendly => "friendly",
            Self::Neutral => "neutral",
            Self::Wary => "wary",
            Self::Hostile => "hostile",
        }
    }
}

/// Sparse directed weight matrix. Missing entries read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationshipMatrix {
    weights: BTreeMap<AgentId, BTreeMap<AgentId, Decimal>>,
}

impl RelationshipMatrix {
    /// An empty matrix.
    pub const fn new() -> Self {
        Self {
            weights: BTreeMap::new(),
        }
    }

    /// Rebuild from a raw nested map, clamping every entry.
    pub fn from_weights(weights: BTreeMap<AgentId, BTreeMap<AgentId, Decimal>>) -> Self {
        let weights = weights
            .into_iter()
            .map(|(from, row)| {
                let row = row
                    .into_iter()
                    .map(|(to, weight)| (to, clamp_weight(weight)))
                    .collect();
                (from, row)
            })
            .collect();
        Self { weights }
    }

    /// Weight from `from` toward `to`.
    pub fn get(&self, from: &AgentId, to: &AgentId) -> Decimal {
        self.weights
            .get(from)
            .and_then(|row| row.get(to))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Every weight `from` holds toward others.
    pub fn row(&self, from: &AgentId) -> BTreeMap<AgentId, Decimal> {
        self.weights.get(from).cloned().unwrap_or_default()
    }

    /// Shift one direction by `delta`, saturating. Returns the new weight.
    pub fn nudge(&mut self, from: &AgentId, to: &AgentId, delta: Decimal) -> Decimal {
        let entry = self
            .weights
            .entry(from.clone())
            .or_default()
            .entry(to.clone())
            .or_insert(Decimal::ZERO);
        *entry = clamp_weight(entry.saturating_add(delta));
        *entry
    }

    /// Raw nested map, for persistence.
    pub const fn as_map(&self) -> &BTreeMap<AgentId, BTreeMap<AgentId, Decimal>> {
        &self.weights
    }
}

/// Clamp a weight into `[-1, 1]`.
fn clamp_weight(weight: Decimal) -> Decimal {
    weight.clamp(WEIGHT_MIN, WEIGHT_MAX)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn unknown_pair_reads_zero() {
        let matrix = RelationshipMatrix::new();
        assert_eq!(
            matrix.get(&AgentId::new("a"), &AgentId::new("b")),
            Decimal::ZERO
        );
    }

    #[test]
    fn nudge_is_directional() {
        let mut matrix = RelationshipMatrix::new();
        let a = AgentId::new("a");
        let b = AgentId::new("b");
        matrix.nudge(&a, &b, dec!(0.3));
        assert_eq!(matrix.get(&a, &b), dec!(0.3));
        assert_eq!(matrix.get(&b, &a), Decimal::ZERO);
    }

    #[test]
    fn nudge_saturates_both_ends() {
        let mut matrix = RelationshipMatrix::new();
        let a = AgentId::new("a");
        let b = AgentId::new("b");
        matrix.nudge(&a, &b, dec!(0.8));
        assert_eq!(matrix.nudge(&a, &b, dec!(0.5)), dec!(1));
        assert_eq!(matrix.nudge(&a, &b, dec!(-3)), dec!(-1));
    }

    #[test]
    fn from_weights_clamps_out_of_range_entries() {
        let mut row = BTreeMap::new();
        row.insert(AgentId::new("b"), dec!(4));
        let mut raw = BTreeMap::new();
        raw.insert(AgentId::new("a"), row);
        let matrix = RelationshipMatrix::from_weights(raw);
        assert_eq!(matrix.get(&AgentId::new("a"), &AgentId::new("b")), dec!(1));
    }

    #[test]
    fn labels_follow_thresholds() {
        assert_eq!(RelationshipLabel::from_weight(dec!(0.5)), RelationshipLabel::Ally);
        assert_eq!(RelationshipLabel::from_weight(dec!(0.2)), RelationshipLabel::Friendly);
        assert_eq!(RelationshipLabel::from_weight(dec!(0.19)), RelationshipLabel::Neutral);
        assert_eq!(RelationshipLabel::from_weight(dec!(-0.2)), RelationshipLabel::Wary);
        assert_eq!(RelationshipLabel::from_weight(dec!(-0.9)), RelationshipLabel::Hostile);
    }
}
