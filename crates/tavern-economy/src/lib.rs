//! The tavern economy.
//!
//! Holds every agent's resources, executes validated transactions, runs the
//! rumor-as-currency market, rolls stochastic market events, and receives
//! reputation feedback from narrative events.
//!
//! # Modules
//!
//! - [`economy`] -- [`TavernEconomy`]: balances, transaction log, projections
//! - [`effects`] -- Fixed tavern effects and consequences per transaction kind
//! - [`rumor`] -- Rumor valuation and rumor-for-resource trades
//! - [`market`] -- Price, reputation, and supply swings
//! - [`reputation`] -- Event-driven reputation feedback
//! - [`wealth`] -- Wealth classes and market power
//! - [`config`] -- Economy parameters
//! - [`error`] -- [`EconomyError`]
//!
//! # Invariants
//!
//! No balance is ever negative; tavern scalars and agent reputation stay
//! within `[0, 100]`; the transaction log is append-only.

pub mod config;
pub mod economy;
pub mod effects;
pub mod error;
pub mod market;
pub mod reputation;
pub mod rumor;
pub mod wealth;

pub use config::{EconomyConfig, MarketEventConfig, RumorConfig, TavernStartConfig};
pub use economy::{Balances, EconomicSummary, ResourceDelta, TavernEconomy};
pub use error::EconomyError;
pub use market::{MarketEvent, MarketEventKind};
pub use reputation::ReputationFeedback;
pub use rumor::RumorQuote;
pub use wealth::{WealthClass, WealthStatus};
