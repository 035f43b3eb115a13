//! Agent wealth status.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tavern_types::{AgentId, ResourceKind};

use crate::economy::{Balances, TavernEconomy, price_in};
use crate::error::EconomyError;

/// Fixed-threshold wealth bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WealthClass {
    /// Below 100.
    Poor,
    /// 100 to 299.
    Modest,
    /// 300 to 599.
    Comfortable,
    /// 600 to 999.
    Wealthy,
    /// 1000 and above.
    Rich,
}

impl WealthClass {
    /// Bucket a total wealth figure.
    pub fn from_total(total: Decimal) -> Self {
        if total < Decimal::from(100) {
            Self::Poor
        } else if total < Decimal::from(300) {
            Self::Modest
        } else if total < Decimal::from(600) {
            Self::Comfortable
        } else if total < Decimal::from(1000) {
            Self::Wealthy
        } else {
            Self::Rich
        }
    }
}

/// An agent's holdings valued at current prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WealthStatus {
    /// The agent.
    pub agent_id: AgentId,
    /// Raw balances.
    pub resources: Balances,
    /// Sum of each amount times its current price.
    pub total_wealth: Decimal,
    /// Bucket of `total_wealth`.
    pub wealth_class: WealthClass,
    /// Weighted leverage score in `[0, 100]`.
    pub market_power: Decimal,
}

/// Weighted sum of raw amounts, clamped to `[0, 100]`.
///
/// Weights: gold 0.3, reputation 0.25, influence 0.25, information 0.15,
/// favors 0.05. Supplies carry no weight.
pub fn market_power(balances: &Balances) -> Decimal {
    let amount = |resource: ResourceKind| {
        balances.get(&resource).copied().unwrap_or(Decimal::ZERO)
    };
    let weights = [
        (ResourceKind::Gold, Decimal::new(30, 2)),
        (ResourceKind::Reputation, Decimal::new(25, 2)),
        (ResourceKind::Influence, Decimal::new(25, 2)),
        (ResourceKind::Information, Decimal::new(15, 2)),
        (ResourceKind::Favors, Decimal::new(5, 2)),
    ];
    let raw = weights.iter().fold(Decimal::ZERO, |sum, (resource, weight)| {
        sum.saturating_add(amount(*resource).saturating_mul(*weight))
    });
    raw.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
}

impl TavernEconomy {
    /// Value `agent`'s holdings at current prices. The total saturates at
    /// `Decimal::MAX`.
    pub fn get_agent_wealth_status(&self, agent: &AgentId) -> Result<WealthStatus, EconomyError> {
        let state = self.read_state();
        let resources = state
            .balances
            .get(agent)
            .cloned()
            .ok_or_else(|| EconomyError::UnknownAgent(agent.clone()))?;
        let total_wealth = resources
            .iter()
            .fold(Decimal::ZERO, |total, (resource, amount)| {
                let price = price_in(&self.config, &state.tavern, *resource);
                total.saturating_add(amount.saturating_mul(price))
            });
        Ok(WealthStatus {
            agent_id: agent.clone(),
            total_wealth,
            wealth_class: WealthClass::from_total(total_wealth),
            market_power: market_power(&resources),
            resources,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn class_thresholds() {
        assert_eq!(WealthClass::from_total(dec!(99.99)), WealthClass::Poor);
        assert_eq!(WealthClass::from_total(dec!(100)), WealthClass::Modest);
        assert_eq!(WealthClass::from_total(dec!(300)), WealthClass::Comfortable);
        assert_eq!(WealthClass::from_total(dec!(600)), WealthClass::Wealthy);
        assert_eq!(WealthClass::from_total(dec!(1000)), WealthClass::Rich);
    }

    #[test]
    fn market_power_weights_and_cap() {
        let modest = BTreeMap::from([
            (ResourceKind::Gold, dec!(100)),
            (ResourceKind::Reputation, dec!(50)),
            (ResourceKind::Information, dec!(10)),
            (ResourceKind::Influence, dec!(10)),
            (ResourceKind::Supplies, dec!(20)),
        ]);
        assert_eq!(market_power(&modest), dec!(46.5));

        let tycoon = BTreeMap::from([(ResourceKind::Gold, dec!(10000))]);
        assert_eq!(market_power(&tycoon), dec!(100));

        let hoard = BTreeMap::from([
            (ResourceKind::Gold, Decimal::MAX),
            (ResourceKind::Influence, Decimal::MAX),
        ]);
        assert_eq!(market_power(&hoard), dec!(100));
    }
}
