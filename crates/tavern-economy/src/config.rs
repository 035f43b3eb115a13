//! Economy configuration.
//!
//! Every value has a default, so an empty `economy:` section in the YAML
//! yields a playable economy.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Deserialize;

use tavern_types::ResourceKind;

/// Economy parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EconomyConfig {
    /// Balances every newly registered agent starts with.
    #[serde(default = "default_starting_balances")]
    pub starting_balances: BTreeMap<ResourceKind, Decimal>,

    /// Nominal unit price of each resource in gold.
    #[serde(default = "default_base_prices")]
    pub base_prices: BTreeMap<ResourceKind, Decimal>,

    /// Share of gold the tavern keeps from market-party transactions.
    #[serde(default = "default_tavern_cut_rate")]
    pub tavern_cut_rate: Decimal,

    /// Rumor valuation and pricing.
    #[serde(default)]
    pub rumors: RumorConfig,

    /// Starting condition of the tavern itself.
    #[serde(default)]
    pub tavern: TavernStartConfig,

    /// Odds of each stochastic market event per call.
    #[serde(default)]
    pub market_events: MarketEventConfig,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_balances: default_starting_balances(),
            base_prices: default_base_prices(),
            tavern_cut_rate: default_tavern_cut_rate(),
            rumors: RumorConfig::default(),
            tavern: TavernStartConfig::default(),
            market_events: MarketEventConfig::default(),
        }
    }
}

impl EconomyConfig {
    /// Base price of `resource`, zero if unpriced.
    pub fn base_price(&self, resource: ResourceKind) -> Decimal {
        self.base_prices
            .get(&resource)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

fn default_starting_balances() -> BTreeMap<ResourceKind, Decimal> {
    BTreeMap::from([
        (ResourceKind::Gold, Decimal::from(100)),
        (ResourceKind::Reputation, Decimal::from(50)),
        (ResourceKind::Information, Decimal::from(10)),
        (ResourceKind::Influence, Decimal::from(10)),
        (ResourceKind::Supplies, Decimal::from(20)),
        (ResourceKind::Favors, Decimal::ZERO),
    ])
}

fn default_base_prices() -> BTreeMap<ResourceKind, Decimal> {
    BTreeMap::from([
        (ResourceKind::Gold, Decimal::ONE),
        (ResourceKind::Reputation, Decimal::from(10)),
        (ResourceKind::Information, Decimal::from(15)),
        (ResourceKind::Influence, Decimal::from(20)),
        (ResourceKind::Supplies, Decimal::from(5)),
        (ResourceKind::Favors, Decimal::from(25)),
    ])
}

fn default_tavern_cut_rate() -> Decimal {
    Decimal::new(10, 2)
}

/// Rumor-as-currency parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RumorConfig {
    /// Nominal value of a rumor before keyword multipliers.
    #[serde(default = "default_rumor_base_value")]
    pub base_value: Decimal,

    /// Standing discount applied to every rumor purchase.
    #[serde(default = "default_rumor_discount")]
    pub trade_discount: Decimal,

    /// Extra discount when buying information.
    #[serde(default = "default_information_discount")]
    pub information_discount: Decimal,

    /// Extra discount when buying reputation.
    #[serde(default = "default_reputation_discount")]
    pub reputation_discount: Decimal,
}

impl Default for RumorConfig {
    fn default() -> Self {
        Self {
            base_value: default_rumor_base_value(),
            trade_discount: default_rumor_discount(),
            information_discount: default_information_discount(),
            reputation_discount: default_reputation_discount(),
        }
    }
}

fn default_rumor_base_value() -> Decimal {
    Decimal::from(25)
}

fn default_rumor_discount() -> Decimal {
    Decimal::new(6, 1)
}

fn default_information_discount() -> Decimal {
    Decimal::new(8, 1)
}

fn default_reputation_discount() -> Decimal {
    Decimal::new(7, 1)
}

/// Initial tavern scalars.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TavernStartConfig {
    /// Coin in the coffers.
    #[serde(default = "default_wealth")]
    pub total_wealth: Decimal,
    /// Reputation score.
    #[serde(default = "default_fifty")]
    pub reputation_score: Decimal,
    /// Information value.
    #[serde(default = "default_information_value")]
    pub information_value: Decimal,
    /// Influence level.
    #[serde(default = "default_influence_level")]
    pub influence_level: Decimal,
    /// Supply quality.
    #[serde(default = "default_sixty")]
    pub supply_quality: Decimal,
    /// Patron satisfaction.
    #[serde(default = "default_sixty")]
    pub patron_satisfaction: Decimal,
}

impl Default for TavernStartConfig {
    fn default() -> Self {
        Self {
            total_wealth: default_wealth(),
            reputation_score: default_fifty(),
            information_value: default_information_value(),
            influence_level: default_influence_level(),
            supply_quality: default_sixty(),
            patron_satisfaction: default_sixty(),
        }
    }
}

fn default_wealth() -> Decimal {
    Decimal::from(1000)
}

fn default_fifty() -> Decimal {
    Decimal::from(50)
}

fn default_information_value() -> Decimal {
    Decimal::from(20)
}

fn default_influence_level() -> Decimal {
    Decimal::from(30)
}

fn default_sixty() -> Decimal {
    Decimal::from(60)
}

/// Probabilities of the three independent market events.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MarketEventConfig {
    /// Chance of a price fluctuation.
    #[serde(default = "default_price_chance")]
    pub price_fluctuation_chance: f64,
    /// Chance of a reputation swing.
    #[serde(default = "default_reputation_chance")]
    pub reputation_swing_chance: f64,
    /// Chance of a supply-quality swing.
    #[serde(default = "default_supply_chance")]
    pub supply_swing_chance: f64,
}

impl Default for MarketEventConfig {
    fn default() -> Self {
        Self {
            price_fluctuation_chance: default_price_chance(),
            reputation_swing_chance: default_reputation_chance(),
            supply_swing_chance: default_supply_chance(),
        }
    }
}

const fn default_price_chance() -> f64 {
    0.30
}

const fn default_reputation_chance() -> f64 {
    0.20
}

const fn default_supply_chance() -> f64 {
    0.25
}
