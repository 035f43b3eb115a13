//! The tavern economy: resource custody and atomic transactions.
//!
//! [`TavernEconomy`] owns every agent's balances, the append-only
//! transaction log, the rumor market, and the aggregate
//! [`TavernEconomicState`], all behind one [`RwLock`]. A transaction is
//! validated completely before any balance moves, then committed in one
//! step under the write lock, so concurrent callers always observe some
//! serial order of whole transactions.
//!
//! Committed transactions are mirrored into the [`MemoryStore`] as
//! INTERACTION memories after the economy lock has been released.
//!
//! # Direction
//!
//! `participants[0]` is the initiator and `participants[1]` the
//! counterparty (the synthetic market when omitted). A positive amount in
//! the resource delta moves from initiator to counterparty; a negative
//! amount moves the other way. Further participants are witnesses: they
//! remember the transaction but no balance of theirs changes. The market
//! has unlimited stock and no balance.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tavern_memory::{MemoryStore, NewMemory};
use tavern_types::{
    AgentId, EventId, MemoryKind, ResourceKind, RumorListing, TavernEconomicState, Transaction,
    TransactionId, TransactionKind,
};

use crate::config::EconomyConfig;
use crate::effects::effects_of;
use crate::error::EconomyError;

/// Resource amounts held by one agent.
pub type Balances = BTreeMap<ResourceKind, Decimal>;

/// Per-resource amounts moved by a transaction.
pub type ResourceDelta = BTreeMap<ResourceKind, Decimal>;

/// Upper bound of any agent's reputation balance.
pub(crate) const REPUTATION_CAP: Decimal = Decimal::ONE_HUNDRED;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Everything guarded by the economy lock.
#[derive(Debug)]
pub(crate) struct EconomyState {
    pub(crate) balances: BTreeMap<AgentId, Balances>,
    pub(crate) log: Vec<Transaction>,
    pub(crate) rumors: Vec<RumorListing>,
    pub(crate) tavern: TavernEconomicState,
    pub(crate) applied_events: BTreeSet<EventId>,
}

/// Read-only projection for presentation layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomicSummary {
    /// Aggregate tavern condition.
    pub tavern: TavernEconomicState,
    /// Current unit price of every resource.
    pub prices: BTreeMap<ResourceKind, Decimal>,
    /// Registered agents.
    pub agent_count: usize,
    /// Log length.
    pub transaction_count: usize,
    /// Log entries with `success = false`.
    pub rejected_transactions: usize,
    /// Rumors listed on the market.
    pub rumors_listed: usize,
    /// Sum of listed rumor values.
    pub rumor_market_value: Decimal,
    /// Up to five most recent log entries, newest first.
    pub recent_transactions: Vec<Transaction>,
}

/// Resource ledger, rumor market, and tavern aggregate.
#[derive(Debug)]
pub struct TavernEconomy {
    pub(crate) config: EconomyConfig,
    pub(crate) memory: Arc<MemoryStore>,
    state: RwLock<EconomyState>,
}

impl TavernEconomy {
    /// Create an economy with no agents, mirroring into `memory`.
    pub fn new(config: EconomyConfig, memory: Arc<MemoryStore>) -> Self {
        let start = &config.tavern;
        let mut tavern = TavernEconomicState {
            total_wealth: start.total_wealth,
            reputation_score: start.reputation_score,
            information_value: start.information_value,
            influence_level: start.influence_level,
            supply_quality: start.supply_quality,
            patron_satisfaction: start.patron_satisfaction,
            global_price_multiplier: Decimal::ONE,
            price_multipliers: ResourceKind::ALL
                .iter()
                .map(|resource| (*resource, Decimal::ONE))
                .collect(),
        };
        tavern.clamp_bounds();

        Self {
            config,
            memory,
            state: RwLock::new(EconomyState {
                balances: BTreeMap::new(),
                log: Vec::new(),
                rumors: Vec::new(),
                tavern,
                applied_events: BTreeSet::new(),
            }),
        }
    }

    /// Active configuration.
    pub const fn config(&self) -> &EconomyConfig {
        &self.config
    }

    pub(crate) fn read_state(&self) -> RwLockReadGuard<'_, EconomyState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write_state(&self) -> RwLockWriteGuard<'_, EconomyState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open an account for `agent` with the configured starting balances.
    pub fn register_agent(&self, agent: &AgentId) -> Result<(), EconomyError> {
        if agent.is_market() {
            return Err(EconomyError::ReservedAgent);
        }
        let mut state = self.write_state();
        if state.balances.contains_key(agent) {
            return Err(EconomyError::DuplicateAgent(agent.clone()));
        }
        let mut balances: Balances = ResourceKind::ALL
            .iter()
            .map(|resource| (*resource, Decimal::ZERO))
            .collect();
        for (resource, amount) in &self.config.starting_balances {
            balances.insert(*resource, (*amount).max(Decimal::ZERO));
        }
        if let Some(reputation) = balances.get_mut(&ResourceKind::Reputation) {
            *reputation = (*reputation).min(REPUTATION_CAP);
        }
        state.balances.insert(agent.clone(), balances);
        tracing::info!(agent = %agent, "Registered agent account");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Validate and commit a transaction, returning the logged entry.
    ///
    /// A rejected transaction is still logged, with `success = false` and a
    /// `rejected: ...` consequence, and leaves every balance untouched.
    pub fn execute_transaction(
        &self,
        kind: TransactionKind,
        participants: &[AgentId],
        resource_delta: &ResourceDelta,
        description: &str,
    ) -> Transaction {
        let transaction = {
            let mut state = self.write_state();
            self.commit_locked(&mut state, kind, participants, resource_delta, description)
        };
        if transaction.success {
            self.mirror_to_memory(&transaction);
        }
        transaction
    }

    /// Validate, apply, and log under an already-held write lock.
    pub(crate) fn commit_locked(
        &self,
        state: &mut EconomyState,
        kind: TransactionKind,
        participants: &[AgentId],
        resource_delta: &ResourceDelta,
        description: &str,
    ) -> Transaction {
        let outcome = validate(state, participants, resource_delta);
        let (success, consequences) = match outcome {
            Ok(transfers) => {
                apply_transfers(state, &transfers);
                let effects = effects_of(kind);
                let mut tavern = state.tavern.clone();
                if let Some(gold) = market_gold(participants, resource_delta) {
                    let cut = gold.saturating_mul(self.config.tavern_cut_rate);
                    tavern.total_wealth = tavern.total_wealth.saturating_add(cut);
                }
                effects.apply(&mut tavern);
                state.tavern = tavern;
                let consequences = effects
                    .consequences
                    .iter()
                    .map(|c| (*c).to_owned())
                    .collect();
                (true, consequences)
            }
            Err(reason) => (false, vec![format!("rejected: {reason}")]),
        };

        let transaction = Transaction {
            id: TransactionId::new(),
            kind,
            participants: participants.to_vec(),
            resource_delta: resource_delta.clone(),
            description: description.to_owned(),
            occurred_at: Utc::now(),
            success,
            consequences,
        };
        if success {
            tracing::debug!(
                transaction_id = %transaction.id,
                kind = kind.as_str(),
                participants = participants.len(),
                "Committed transaction"
            );
        } else {
            tracing::debug!(
                transaction_id = %transaction.id,
                kind = kind.as_str(),
                reason = ?transaction.consequences,
                "Rejected transaction"
            );
        }
        state.log.push(transaction.clone());
        transaction
    }

    /// Record a committed transaction in each participant's memory.
    pub(crate) fn mirror_to_memory(&self, transaction: &Transaction) {
        let importance = effects_of(transaction.kind).memory_importance;
        for agent in transaction.participants.iter().filter(|a| !a.is_market()) {
            let others = transaction
                .participants
                .iter()
                .filter(|other| *other != agent && !other.is_market())
                .cloned();
            let memory = NewMemory::new(
                MemoryKind::Interaction,
                format!(
                    "Took part in a {} transaction: {}",
                    transaction.kind.as_str(),
                    transaction.description
                ),
            )
            .importance(importance)
            .with_context("transaction_id", transaction.id.to_string())
            .with_context("kind", transaction.kind.as_str())
            .related(others)
            .tag("transaction")
            .tag(transaction.kind.as_str());
            self.memory.store_memory(agent, memory);
        }
    }

    // -----------------------------------------------------------------------
    // Read projections
    // -----------------------------------------------------------------------

    /// Balances of `agent`, if registered.
    pub fn balances(&self, agent: &AgentId) -> Option<Balances> {
        self.read_state().balances.get(agent).cloned()
    }

    /// Whether `agent` has an account.
    pub fn is_registered(&self, agent: &AgentId) -> bool {
        self.read_state().balances.contains_key(agent)
    }

    /// Every registered agent.
    pub fn agents(&self) -> Vec<AgentId> {
        self.read_state().balances.keys().cloned().collect()
    }

    /// The whole transaction log in commit order.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.read_state().log.clone()
    }

    /// Log entries naming `agent`, in commit order.
    pub fn transactions_for(&self, agent: &AgentId) -> Vec<Transaction> {
        self.read_state()
            .log
            .iter()
            .filter(|t| t.participants.contains(agent))
            .cloned()
            .collect()
    }

    /// Number of log entries.
    pub fn transaction_count(&self) -> usize {
        self.read_state().log.len()
    }

    /// Listed rumors in listing order.
    pub fn rumor_listings(&self) -> Vec<RumorListing> {
        self.read_state().rumors.clone()
    }

    /// Copy of the tavern aggregate.
    pub fn tavern_state(&self) -> TavernEconomicState {
        self.read_state().tavern.clone()
    }

    /// Unit price of `resource`: base price times the global and
    /// per-resource multipliers.
    pub fn current_price(&self, resource: ResourceKind) -> Decimal {
        let state = self.read_state();
        price_in(&self.config, &state.tavern, resource)
    }

    /// Consistent summary of the whole economy. Mutates nothing.
    pub fn economic_summary(&self) -> EconomicSummary {
        let state = self.read_state();
        let prices = ResourceKind::ALL
            .iter()
            .map(|resource| (*resource, price_in(&self.config, &state.tavern, *resource)))
            .collect();
        EconomicSummary {
            tavern: state.tavern.clone(),
            prices,
            agent_count: state.balances.len(),
            transaction_count: state.log.len(),
            rejected_transactions: state.log.iter().filter(|t| !t.success).count(),
            rumors_listed: state.rumors.len(),
            rumor_market_value: state
                .rumors
                .iter()
                .fold(Decimal::ZERO, |sum, r| sum.saturating_add(r.value)),
            recent_transactions: state.log.iter().rev().take(5).cloned().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation and application
// ---------------------------------------------------------------------------

/// One leg of a validated transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Transfer {
    pub(crate) resource: ResourceKind,
    pub(crate) amount: Decimal,
    pub(crate) from: AgentId,
    pub(crate) to: AgentId,
}

/// Check participants and funds. Returns the legs to apply.
fn validate(
    state: &EconomyState,
    participants: &[AgentId],
    resource_delta: &ResourceDelta,
) -> Result<Vec<Transfer>, String> {
    let Some(initiator) = participants.first() else {
        return Err("no participants".to_owned());
    };
    let market = AgentId::market();
    let counterparty = participants.get(1).unwrap_or(&market);
    if counterparty == initiator {
        return Err(format!("{initiator} cannot transact with itself"));
    }
    for agent in participants.iter().filter(|a| !a.is_market()) {
        if !state.balances.contains_key(agent) {
            return Err(format!("unknown participant {agent}"));
        }
    }

    let mut transfers = Vec::with_capacity(resource_delta.len());
    for (resource, amount) in resource_delta {
        if amount.is_zero() {
            continue;
        }
        let (from, to) = if amount.is_sign_positive() {
            (initiator, counterparty)
        } else {
            (counterparty, initiator)
        };
        let amount = amount.abs();
        if !from.is_market() {
            let available = state
                .balances
                .get(from)
                .and_then(|b| b.get(resource))
                .copied()
                .unwrap_or(Decimal::ZERO);
            if available < amount {
                return Err(format!(
                    "insufficient {} for {from}: needs {amount}, has {available}",
                    resource.as_str()
                ));
            }
        }
        transfers.push(Transfer {
            resource: *resource,
            amount,
            from: from.clone(),
            to: to.clone(),
        });
    }
    Ok(transfers)
}

/// Move validated amounts. The market side of a leg is a no-op.
pub(crate) fn apply_transfers(state: &mut EconomyState, transfers: &[Transfer]) {
    for transfer in transfers {
        if let Some(balance) = state
            .balances
            .get_mut(&transfer.from)
            .and_then(|b| b.get_mut(&transfer.resource))
        {
            *balance = (*balance - transfer.amount).max(Decimal::ZERO);
        }
        if !transfer.to.is_market() {
            credit(state, &transfer.to, transfer.resource, transfer.amount);
        }
    }
}

/// Add to a balance, saturating reputation at its cap.
pub(crate) fn credit(
    state: &mut EconomyState,
    agent: &AgentId,
    resource: ResourceKind,
    amount: Decimal,
) {
    if let Some(balances) = state.balances.get_mut(agent) {
        let balance = balances.entry(resource).or_insert(Decimal::ZERO);
        let raised = balance.saturating_add(amount);
        *balance = if resource == ResourceKind::Reputation {
            raised.min(REPUTATION_CAP)
        } else {
            raised
        };
    }
}

/// Gold flowing through a transaction with the market on one side.
fn market_gold(participants: &[AgentId], resource_delta: &ResourceDelta) -> Option<Decimal> {
    let market_involved = participants.first().is_some_and(AgentId::is_market)
        || participants.get(1).is_none_or(AgentId::is_market);
    let gold = resource_delta.get(&ResourceKind::Gold)?.abs();
    (market_involved && !gold.is_zero()).then_some(gold)
}

/// Price lookup against a borrowed state. Saturates at `Decimal::MAX`.
pub(crate) fn price_in(
    config: &EconomyConfig,
    tavern: &TavernEconomicState,
    resource: ResourceKind,
) -> Decimal {
    let multiplier = tavern
        .price_multipliers
        .get(&resource)
        .copied()
        .unwrap_or(Decimal::ONE);
    config
        .base_price(resource)
        .saturating_mul(tavern.global_price_multiplier)
        .saturating_mul(multiplier)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn economy() -> TavernEconomy {
        TavernEconomy::new(EconomyConfig::default(), Arc::new(MemoryStore::default()))
    }

    fn gold(amount: Decimal) -> ResourceDelta {
        BTreeMap::from([(ResourceKind::Gold, amount)])
    }

    #[test]
    fn register_rejects_duplicates_and_market() {
        let economy = economy();
        let mira = AgentId::new("mira");
        assert!(economy.register_agent(&mira).is_ok());
        assert_eq!(
            economy.register_agent(&mira),
            Err(EconomyError::DuplicateAgent(mira.clone()))
        );
        assert_eq!(
            economy.register_agent(&AgentId::market()),
            Err(EconomyError::ReservedAgent)
        );
        assert_eq!(
            economy.balances(&mira).unwrap().get(&ResourceKind::Gold),
            Some(&dec!(100))
        );
    }

    #[test]
    fn positive_delta_pays_counterparty() {
        let economy = economy();
        let mira = AgentId::new("mira");
        let bram = AgentId::new("bram");
        economy.register_agent(&mira).unwrap();
        economy.register_agent(&bram).unwrap();

        let tx = economy.execute_transaction(
            TransactionKind::Trade,
            &[mira.clone(), bram.clone()],
            &gold(dec!(30)),
            "ale barrels",
        );
        assert!(tx.success);
        assert_eq!(economy.balances(&mira).unwrap()[&ResourceKind::Gold], dec!(70));
        assert_eq!(economy.balances(&bram).unwrap()[&ResourceKind::Gold], dec!(130));
    }

    #[test]
    fn negative_delta_pays_initiator() {
        let economy = economy();
        let mira = AgentId::new("mira");
        let bram = AgentId::new("bram");
        economy.register_agent(&mira).unwrap();
        economy.register_agent(&bram).unwrap();

        let tx = economy.execute_transaction(
            TransactionKind::Sale,
            &[mira.clone(), bram.clone()],
            &gold(dec!(-40)),
            "sold a cask",
        );
        assert!(tx.success);
        assert_eq!(economy.balances(&mira).unwrap()[&ResourceKind::Gold], dec!(140));
        assert_eq!(economy.balances(&bram).unwrap()[&ResourceKind::Gold], dec!(60));
    }

    #[test]
    fn insufficient_funds_reject_atomically() {
        let economy = economy();
        let mira = AgentId::new("mira");
        let bram = AgentId::new("bram");
        economy.register_agent(&mira).unwrap();
        economy.register_agent(&bram).unwrap();

        let delta = BTreeMap::from([
            (ResourceKind::Gold, dec!(10)),
            (ResourceKind::Influence, dec!(500)),
        ]);
        let before_tavern = economy.tavern_state();
        let tx = economy.execute_transaction(
            TransactionKind::Bribe,
            &[mira.clone(), bram.clone()],
            &delta,
            "too generous",
        );
        assert!(!tx.success);
        assert!(tx.consequences[0].starts_with("rejected: insufficient influence"));
        assert_eq!(economy.balances(&mira).unwrap()[&ResourceKind::Gold], dec!(100));
        assert_eq!(economy.balances(&bram).unwrap()[&ResourceKind::Gold], dec!(100));
        assert_eq!(economy.tavern_state(), before_tavern);
        assert_eq!(economy.transaction_count(), 1);
        assert_eq!(economy.memory.memory_count(&mira), 0);
    }

    #[test]
    fn unknown_and_self_participants_are_rejected() {
        let economy = economy();
        let mira = AgentId::new("mira");
        economy.register_agent(&mira).unwrap();

        let unknown = economy.execute_transaction(
            TransactionKind::Gift,
            &[mira.clone(), AgentId::new("ghost")],
            &gold(dec!(1)),
            "to nobody",
        );
        assert!(!unknown.success);
        let selfish = economy.execute_transaction(
            TransactionKind::Gift,
            &[mira.clone(), mira.clone()],
            &gold(dec!(1)),
            "to myself",
        );
        assert!(!selfish.success);
        let empty = economy.execute_transaction(TransactionKind::Gift, &[], &gold(dec!(1)), "");
        assert!(!empty.success);
    }

    #[test]
    fn market_purchase_feeds_tavern_cut_and_reputation() {
        let economy = economy();
        let mira = AgentId::new("mira");
        economy.register_agent(&mira).unwrap();

        let tx = economy.execute_transaction(
            TransactionKind::Purchase,
            std::slice::from_ref(&mira),
            &gold(dec!(50)),
            "a round for the house",
        );
        assert!(tx.success);
        let tavern = economy.tavern_state();
        assert_eq!(tavern.total_wealth, dec!(1005));
        assert_eq!(tavern.reputation_score, dec!(50.3));
        assert_eq!(economy.memory.memory_count(&mira), 1);
    }

    #[test]
    fn market_has_unlimited_stock() {
        let economy = economy();
        let mira = AgentId::new("mira");
        economy.register_agent(&mira).unwrap();

        let tx = economy.execute_transaction(
            TransactionKind::QuestReward,
            &[AgentId::market(), mira.clone()],
            &gold(dec!(5000)),
            "dragon slain",
        );
        assert!(tx.success);
        assert_eq!(economy.balances(&mira).unwrap()[&ResourceKind::Gold], dec!(5100));
    }

    #[test]
    fn tavern_cut_saturates_on_huge_rewards() {
        let economy = economy();
        let mira = AgentId::new("mira");
        economy.register_agent(&mira).unwrap();

        for _ in 0..12 {
            let tx = economy.execute_transaction(
                TransactionKind::QuestReward,
                &[AgentId::market(), mira.clone()],
                &gold(Decimal::MAX),
                "the crown jewels",
            );
            assert!(tx.success);
        }
        assert_eq!(economy.tavern_state().total_wealth, Decimal::MAX);
        assert_eq!(economy.balances(&mira).unwrap()[&ResourceKind::Gold], Decimal::MAX);
    }

    #[test]
    fn reputation_credit_saturates() {
        let economy = economy();
        let mira = AgentId::new("mira");
        economy.register_agent(&mira).unwrap();

        let delta = BTreeMap::from([(ResourceKind::Reputation, dec!(-80))]);
        let tx = economy.execute_transaction(
            TransactionKind::Favor,
            std::slice::from_ref(&mira),
            &delta,
            "the guild vouches for her",
        );
        assert!(tx.success);
        assert_eq!(
            economy.balances(&mira).unwrap()[&ResourceKind::Reputation],
            dec!(100)
        );
    }

    #[test]
    fn witnesses_remember_but_keep_balances() {
        let economy = economy();
        let mira = AgentId::new("mira");
        let bram = AgentId::new("bram");
        let finn = AgentId::new("finn");
        for agent in [&mira, &bram, &finn] {
            economy.register_agent(agent).unwrap();
        }

        let tx = economy.execute_transaction(
            TransactionKind::InformationExchange,
            &[mira.clone(), bram.clone(), finn.clone()],
            &BTreeMap::from([(ResourceKind::Information, dec!(5))]),
            "maps traded under the stairs",
        );
        assert!(tx.success);
        assert_eq!(
            economy.balances(&finn).unwrap()[&ResourceKind::Information],
            dec!(10)
        );
        assert_eq!(economy.memory.memory_count(&finn), 1);
    }

    #[test]
    fn summary_is_idempotent() {
        let economy = economy();
        let mira = AgentId::new("mira");
        economy.register_agent(&mira).unwrap();
        economy.execute_transaction(
            TransactionKind::Service,
            std::slice::from_ref(&mira),
            &gold(dec!(5)),
            "a hot bath",
        );
        assert_eq!(economy.economic_summary(), economy.economic_summary());
        assert_eq!(economy.economic_summary().transaction_count, 1);
    }
}
