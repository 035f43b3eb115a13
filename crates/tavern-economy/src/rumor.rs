//! Rumors as currency.
//!
//! A rumor's worth comes from two documented business rules:
//!
//! - **Keyword multipliers.** The base value is multiplied once for every
//!   listed keyword the rumor mentions (case-insensitive substring).
//! - **Trader reputation.** The result is scaled by `reputation / 50`,
//!   floored at one half, so a disreputable trader still gets half value.
//!
//! The resource it buys costs `base_price * amount * global_multiplier *
//! 0.6`, with a further discount when buying information or reputation. The
//! trade goes through iff the rumor is worth at least the cost. No gold
//! leaves the trader: the rumor itself is the payment. An amount too large
//! to price is refused rather than rounded.

use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tavern_memory::NewMemory;
use tavern_types::{
    AgentId, Importance, MemoryKind, ResourceKind, RumorId, RumorListing, TransactionKind,
};

use crate::config::RumorConfig;
use crate::economy::{EconomyState, REPUTATION_CAP, TavernEconomy};
use crate::error::EconomyError;

/// Keywords that make a rumor more valuable, with their multipliers.
pub const KEYWORD_MULTIPLIERS: [(&str, Decimal); 8] = [
    ("chaos", Decimal::from_parts(15, 0, 0, false, 1)),
    ("treasure", Decimal::from_parts(18, 0, 0, false, 1)),
    ("danger", Decimal::from_parts(14, 0, 0, false, 1)),
    ("secret", Decimal::from_parts(17, 0, 0, false, 1)),
    ("ancient", Decimal::from_parts(16, 0, 0, false, 1)),
    ("hidden", Decimal::from_parts(15, 0, 0, false, 1)),
    ("cultist", Decimal::from_parts(19, 0, 0, false, 1)),
    ("passage", Decimal::from_parts(13, 0, 0, false, 1)),
];

/// Reputation that earns a rumor its full value.
const NOMINAL_REPUTATION: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Lowest fraction of nominal value a rumor can be worth.
const REPUTATION_FLOOR: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// Appraisal of a prospective rumor trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RumorQuote {
    /// Worth of the rumor after keyword and reputation scaling.
    pub rumor_value: Decimal,
    /// Price of the requested resources.
    pub resource_cost: Decimal,
    /// Keywords that matched.
    pub keywords: Vec<String>,
}

impl RumorQuote {
    /// Whether the rumor pays for the resources.
    pub fn is_affordable(&self) -> bool {
        self.rumor_value >= self.resource_cost
    }
}

/// Nominal value of `content` and the keywords that raised it.
pub fn content_value(content: &str, base_value: Decimal) -> (Decimal, Vec<String>) {
    let lowered = content.to_lowercase();
    let mut value = base_value;
    let mut matched = Vec::new();
    for (keyword, multiplier) in KEYWORD_MULTIPLIERS {
        if lowered.contains(keyword) {
            value = value.saturating_mul(multiplier);
            matched.push(keyword.to_owned());
        }
    }
    (value, matched)
}

/// Reputation scaling: `reputation / 50`, never below one half.
pub fn reputation_factor(reputation: Decimal) -> Decimal {
    (reputation / NOMINAL_REPUTATION).max(REPUTATION_FLOOR)
}

/// Rumor price of `amount` units of `resource`, or `None` on overflow.
pub fn rumor_resource_cost(
    rumors: &RumorConfig,
    base_price: Decimal,
    global_multiplier: Decimal,
    resource: ResourceKind,
    amount: Decimal,
) -> Option<Decimal> {
    let extra = match resource {
        ResourceKind::Information => rumors.information_discount,
        ResourceKind::Reputation => rumors.reputation_discount,
        ResourceKind::Gold
        | ResourceKind::Influence
        | ResourceKind::Supplies
        | ResourceKind::Favors => Decimal::ONE,
    };
    base_price
        .checked_mul(amount)?
        .checked_mul(global_multiplier)?
        .checked_mul(rumors.trade_discount)?
        .checked_mul(extra)
}

impl TavernEconomy {
    /// Appraise a rumor trade without executing it.
    pub fn quote_rumor(
        &self,
        trader: &AgentId,
        content: &str,
        resource: ResourceKind,
        amount: Decimal,
    ) -> Result<RumorQuote, EconomyError> {
        let state = self.read_state();
        self.quote_locked(&state, trader, content, resource, amount)
    }

    fn quote_locked(
        &self,
        state: &EconomyState,
        trader: &AgentId,
        content: &str,
        resource: ResourceKind,
        amount: Decimal,
    ) -> Result<RumorQuote, EconomyError> {
        let reputation = state
            .balances
            .get(trader)
            .ok_or_else(|| EconomyError::UnknownAgent(trader.clone()))?
            .get(&ResourceKind::Reputation)
            .copied()
            .unwrap_or(Decimal::ZERO);

        let (nominal, keywords) = content_value(content, self.config.rumors.base_value);
        let overflow = || EconomyError::PriceOverflow { resource, amount };
        let rumor_value = nominal
            .checked_mul(reputation_factor(reputation))
            .ok_or_else(overflow)?;
        let resource_cost = rumor_resource_cost(
            &self.config.rumors,
            self.config.base_price(resource),
            state.tavern.global_price_multiplier,
            resource,
            amount,
        )
        .ok_or_else(overflow)?;
        Ok(RumorQuote {
            rumor_value,
            resource_cost,
            keywords,
        })
    }

    /// Sell a rumor to the market for `amount` units of `resource`.
    ///
    /// Returns `true` iff the trade went through: the rumor was worth at
    /// least the resource cost, the resource was credited, and the rumor was
    /// listed. Unknown traders, blank rumors, non-positive amounts, and
    /// amounts too large to price return `false`.
    ///
    /// A trader already at the reputation cap cannot buy reputation, since
    /// the credit would be absorbed by the cap. Below the cap the credit
    /// saturates at it.
    pub fn trade_rumor_for_resources(
        &self,
        trader: &AgentId,
        content: &str,
        resource: ResourceKind,
        amount: Decimal,
    ) -> bool {
        let content = content.trim();
        if content.is_empty() || amount <= Decimal::ZERO {
            return false;
        }

        let (transaction, listing) = {
            let mut state = self.write_state();
            let quote = match self.quote_locked(&state, trader, content, resource, amount) {
                Ok(quote) => quote,
                Err(err) => {
                    tracing::debug!(trader = %trader, error = %err, "Rumor trade refused");
                    return false;
                }
            };
            if !quote.is_affordable() {
                tracing::debug!(
                    trader = %trader,
                    value = %quote.rumor_value,
                    cost = %quote.resource_cost,
                    "Rumor not worth the asking price"
                );
                return false;
            }
            let at_cap = state
                .balances
                .get(trader)
                .and_then(|b| b.get(&ResourceKind::Reputation))
                .is_some_and(|r| *r >= REPUTATION_CAP);
            if resource == ResourceKind::Reputation && at_cap {
                tracing::debug!(trader = %trader, "Rumor trade refused, reputation already capped");
                return false;
            }

            let delta = BTreeMap::from([(resource, -amount)]);
            let description = format!("Sold a rumor for {amount} {}", resource.as_str());
            let transaction = self.commit_locked(
                &mut state,
                TransactionKind::RumorTrade,
                &[trader.clone(), AgentId::market()],
                &delta,
                &description,
            );
            if !transaction.success {
                return false;
            }

            let listing = RumorListing {
                id: RumorId::new(),
                content: content.to_owned(),
                trader: trader.clone(),
                value: quote.rumor_value,
                listed_at: Utc::now(),
            };
            state.rumors.push(listing.clone());
            (transaction, listing)
        };

        tracing::info!(
            trader = %trader,
            rumor_id = %listing.id,
            value = %listing.value,
            resource = resource.as_str(),
            %amount,
            "Rumor traded"
        );
        self.mirror_to_memory(&transaction);
        self.memory.store_memory(
            trader,
            NewMemory::new(
                MemoryKind::Rumor,
                format!("Sold the rumor \"{content}\" for {amount} {}", resource.as_str()),
            )
            .importance(Importance::Medium)
            .with_context("rumor_id", listing.id.to_string())
            .with_context("value", listing.value)
            .tag("rumor_trade"),
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn keywords_multiply_once_each() {
        let (value, keywords) = content_value("An ANCIENT hidden passage, hidden well", dec!(25));
        assert_eq!(value, dec!(78));
        assert_eq!(keywords, ["ancient", "hidden", "passage"]);
    }

    #[test]
    fn plain_rumor_keeps_base_value() {
        let (value, keywords) = content_value("the ale is watered down", dec!(25));
        assert_eq!(value, dec!(25));
        assert!(keywords.is_empty());
    }

    #[test]
    fn reputation_factor_is_floored_at_half() {
        assert_eq!(reputation_factor(dec!(50)), dec!(1));
        assert_eq!(reputation_factor(dec!(100)), dec!(2));
        assert_eq!(reputation_factor(dec!(10)), dec!(0.5));
        assert_eq!(reputation_factor(dec!(0)), dec!(0.5));
    }

    #[test]
    fn resource_specific_discounts() {
        let rumors = RumorConfig::default();
        let info = rumor_resource_cost(&rumors, dec!(15), dec!(1), ResourceKind::Information, dec!(2));
        assert_eq!(info, Some(dec!(14.4)));
        let rep = rumor_resource_cost(&rumors, dec!(10), dec!(1), ResourceKind::Reputation, dec!(5));
        assert_eq!(rep, Some(dec!(21)));
        let gold = rumor_resource_cost(&rumors, dec!(1), dec!(1.5), ResourceKind::Gold, dec!(10));
        assert_eq!(gold, Some(dec!(9)));
    }

    #[test]
    fn oversized_amounts_do_not_price() {
        let rumors = RumorConfig::default();
        let cost =
            rumor_resource_cost(&rumors, dec!(10), dec!(1), ResourceKind::Reputation, Decimal::MAX);
        assert_eq!(cost, None);
    }

    #[test]
    fn keyword_stacking_saturates() {
        let (value, _) = content_value("ancient hidden passage", Decimal::MAX);
        assert_eq!(value, Decimal::MAX);
    }
}
