//! Property-style integration tests for the tavern economy: non-negative
//! balances, serializable concurrency, reputation feedback, and the rumor
//! trade threshold.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use tavern_economy::{EconomyConfig, EconomyError, TavernEconomy, WealthClass};
use tavern_memory::{MemoryQuery, MemoryStore};
use tavern_types::{
    AgentId, Event, EventId, EventType, MemoryKind, ResourceKind, TransactionKind,
};

fn economy_with(agents: &[&str]) -> (TavernEconomy, Vec<AgentId>) {
    let economy = TavernEconomy::new(EconomyConfig::default(), Arc::new(MemoryStore::default()));
    let ids: Vec<AgentId> = agents.iter().map(|a| AgentId::new(*a)).collect();
    for id in &ids {
        economy.register_agent(id).unwrap();
    }
    (economy, ids)
}

fn betrayal(participants: Vec<AgentId>) -> Event {
    Event {
        id: EventId::new(),
        event_type: EventType::BetrayalRevealed,
        title: "The ledger was forged".to_owned(),
        description: "Someone cooked the books.".to_owned(),
        participants,
        tension_change: 30,
        consequences: Vec::new(),
        created_at: Utc::now(),
    }
}

#[test]
fn random_transaction_sequences_never_go_negative() {
    let (economy, agents) = economy_with(&["a", "b", "c", "d"]);
    let mut rng = SmallRng::seed_from_u64(2024);
    let kinds = [
        TransactionKind::Trade,
        TransactionKind::Purchase,
        TransactionKind::Bribe,
        TransactionKind::Gift,
    ];

    let mut previous_len = 0;
    for _ in 0..400 {
        let from = &agents[rng.random_range(0..agents.len())];
        let to = &agents[rng.random_range(0..agents.len())];
        let resource = ResourceKind::ALL[rng.random_range(0..ResourceKind::ALL.len())];
        let amount = Decimal::new(rng.random_range(-6_000..=6_000), 2);
        let kind = kinds[rng.random_range(0..kinds.len())];

        let before_from = economy.balances(from).unwrap();
        let before_to = economy.balances(to).unwrap();
        let tx = economy.execute_transaction(
            kind,
            &[from.clone(), to.clone()],
            &BTreeMap::from([(resource, amount)]),
            "fuzz",
        );
        if !tx.success {
            assert_eq!(economy.balances(from).unwrap(), before_from);
            assert_eq!(economy.balances(to).unwrap(), before_to);
        }

        for agent in &agents {
            let balances = economy.balances(agent).unwrap();
            assert!(balances.values().all(|v| *v >= Decimal::ZERO));
            assert!(balances[&ResourceKind::Reputation] <= dec!(100));
        }
        let tavern = economy.tavern_state();
        assert!(tavern.reputation_score >= Decimal::ZERO);
        assert!(tavern.reputation_score <= dec!(100));

        let len = economy.transaction_count();
        assert_eq!(len, previous_len + 1);
        previous_len = len;
    }
}

#[test]
fn insufficient_payer_is_rejected_with_no_changes() {
    let (economy, agents) = economy_with(&["mira", "bram"]);
    let tx = economy.execute_transaction(
        TransactionKind::Purchase,
        &agents,
        &BTreeMap::from([(ResourceKind::Gold, dec!(100.01))]),
        "more than she has",
    );
    assert!(!tx.success);
    assert_eq!(economy.balances(&agents[0]).unwrap()[&ResourceKind::Gold], dec!(100));
    assert_eq!(economy.balances(&agents[1]).unwrap()[&ResourceKind::Gold], dec!(100));
}

#[test]
fn concurrent_disjoint_transactions_lose_no_updates() {
    let names: Vec<String> = (0..8).map(|n| format!("agent_{n}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let (economy, agents) = economy_with(&refs);
    let economy = Arc::new(economy);

    std::thread::scope(|scope| {
        for pair in agents.chunks(2) {
            let economy = Arc::clone(&economy);
            scope.spawn(move || {
                for _ in 0..50 {
                    economy.execute_transaction(
                        TransactionKind::Trade,
                        pair,
                        &BTreeMap::from([(ResourceKind::Gold, dec!(1))]),
                        "a copper for a copper",
                    );
                }
            });
        }
    });

    for pair in agents.chunks(2) {
        assert_eq!(economy.balances(&pair[0]).unwrap()[&ResourceKind::Gold], dec!(50));
        assert_eq!(economy.balances(&pair[1]).unwrap()[&ResourceKind::Gold], dec!(150));
    }
    assert_eq!(economy.transaction_count(), 200);
}

#[test]
fn betrayal_feedback_matches_worked_example() {
    let (economy, agents) = economy_with(&["A"]);
    let event = betrayal(agents.clone());

    let feedback = economy.update_reputation_on_event(&event).unwrap();
    assert_eq!(feedback.tavern_delta, dec!(-11));
    assert_eq!(feedback.agent_deltas[&agents[0]], dec!(-2.4));
    assert_eq!(economy.tavern_state().reputation_score, dec!(39));
    assert_eq!(
        economy.balances(&agents[0]).unwrap()[&ResourceKind::Reputation],
        dec!(47.6)
    );
}

#[test]
fn feedback_is_applied_once_and_skips_strangers() {
    let (economy, agents) = economy_with(&["A"]);
    let event = betrayal(vec![agents[0].clone(), AgentId::new("drifter")]);

    let feedback = economy.update_reputation_on_event(&event).unwrap();
    assert_eq!(feedback.agent_deltas.len(), 1);
    assert_eq!(
        economy.update_reputation_on_event(&event),
        Err(EconomyError::EventAlreadyApplied(event.id))
    );
    assert_eq!(economy.tavern_state().reputation_score, dec!(39));
}

#[test]
fn repeated_betrayals_clamp_at_zero() {
    let (economy, agents) = economy_with(&["A"]);
    for _ in 0..20 {
        economy
            .update_reputation_on_event(&betrayal(agents.clone()))
            .unwrap();
    }
    assert_eq!(economy.tavern_state().reputation_score, Decimal::ZERO);
    assert!(economy.balances(&agents[0]).unwrap()[&ResourceKind::Reputation] >= Decimal::ZERO);
}

#[test]
fn rumor_trade_succeeds_iff_value_covers_cost() {
    let (economy, agents) = economy_with(&["mira"]);
    let mira = &agents[0];
    let content = "ancient hidden passage";

    let quote = economy
        .quote_rumor(mira, content, ResourceKind::Information, dec!(1))
        .unwrap();
    assert!(quote.rumor_value >= dec!(60));

    // One unit of information costs 15 * 0.6 * 0.8 = 7.2; 78 buys ten units
    // (72) but not eleven (79.2).
    let too_much = economy
        .quote_rumor(mira, content, ResourceKind::Information, dec!(11))
        .unwrap();
    assert!(!too_much.is_affordable());
    assert!(!economy.trade_rumor_for_resources(mira, content, ResourceKind::Information, dec!(11)));
    assert!(economy.rumor_listings().is_empty());

    assert!(economy.trade_rumor_for_resources(mira, content, ResourceKind::Information, dec!(10)));
    let listings = economy.rumor_listings();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].value, dec!(78));
    assert_eq!(
        economy.balances(mira).unwrap()[&ResourceKind::Information],
        dec!(20)
    );
    assert_eq!(economy.balances(mira).unwrap()[&ResourceKind::Gold], dec!(100));

    let rumors = economy.transactions_for(mira);
    assert_eq!(rumors.len(), 1);
    assert_eq!(rumors[0].kind, TransactionKind::RumorTrade);
}

#[test]
fn rumor_trade_is_remembered() {
    let memory = Arc::new(MemoryStore::default());
    let economy = TavernEconomy::new(EconomyConfig::default(), Arc::clone(&memory));
    let mira = AgentId::new("mira");
    economy.register_agent(&mira).unwrap();

    assert!(economy.trade_rumor_for_resources(&mira, "cultist treasure", ResourceKind::Gold, dec!(5)));
    let query = MemoryQuery {
        kind: Some(MemoryKind::Rumor),
        ..MemoryQuery::default()
    };
    let rumors = memory.retrieve_memories(&mira, query);
    assert_eq!(rumors.len(), 1);
    assert!(rumors[0].content.contains("cultist treasure"));
}

#[test]
fn unknown_trader_cannot_trade_rumors() {
    let (economy, _) = economy_with(&[]);
    let ghost = AgentId::new("ghost");
    assert!(matches!(
        economy.quote_rumor(&ghost, "secret", ResourceKind::Gold, dec!(1)),
        Err(EconomyError::UnknownAgent(_))
    ));
    assert!(!economy.trade_rumor_for_resources(&ghost, "secret", ResourceKind::Gold, dec!(1)));
}

#[test]
fn wealth_status_values_holdings_at_current_prices() {
    let (economy, agents) = economy_with(&["mira"]);
    let status = economy.get_agent_wealth_status(&agents[0]).unwrap();
    // 100*1 + 50*10 + 10*15 + 10*20 + 20*5 + 0*25
    assert_eq!(status.total_wealth, dec!(1050));
    assert_eq!(status.wealth_class, WealthClass::Rich);
    assert_eq!(status.market_power, dec!(46.5));
    assert!(economy.get_agent_wealth_status(&AgentId::new("ghost")).is_err());
}

#[test]
fn oversized_rumor_trade_is_refused_and_the_economy_stays_usable() {
    let (economy, agents) = economy_with(&["mira"]);
    let mira = &agents[0];
    let content = "ancient hidden passage";
    let before = economy.balances(mira).unwrap();

    assert!(matches!(
        economy.quote_rumor(mira, content, ResourceKind::Reputation, Decimal::MAX),
        Err(EconomyError::PriceOverflow {
            resource: ResourceKind::Reputation,
            ..
        })
    ));
    assert!(!economy.trade_rumor_for_resources(
        mira,
        content,
        ResourceKind::Reputation,
        Decimal::MAX
    ));
    assert_eq!(economy.balances(mira).unwrap(), before);
    assert!(economy.rumor_listings().is_empty());

    assert!(economy.trade_rumor_for_resources(mira, content, ResourceKind::Information, dec!(1)));
}

#[test]
fn capped_trader_cannot_buy_reputation_with_rumors() {
    let (economy, agents) = economy_with(&["mira"]);
    let mira = &agents[0];
    let content = "ancient hidden passage";
    let raise = economy.execute_transaction(
        TransactionKind::QuestReward,
        &[AgentId::market(), mira.clone()],
        &BTreeMap::from([(ResourceKind::Reputation, dec!(50))]),
        "hero of the hour",
    );
    assert!(raise.success);
    assert_eq!(economy.balances(mira).unwrap()[&ResourceKind::Reputation], dec!(100));

    assert!(!economy.trade_rumor_for_resources(mira, content, ResourceKind::Reputation, dec!(1)));
    assert!(economy.rumor_listings().is_empty());
    assert!(economy.trade_rumor_for_resources(mira, content, ResourceKind::Information, dec!(1)));
}

#[test]
fn wealth_status_saturates_for_huge_holdings() {
    let (economy, agents) = economy_with(&["mira"]);
    let mira = &agents[0];
    let reward = economy.execute_transaction(
        TransactionKind::QuestReward,
        &[AgentId::market(), mira.clone()],
        &BTreeMap::from([
            (ResourceKind::Influence, Decimal::MAX / dec!(2)),
            (ResourceKind::Gold, Decimal::MAX),
        ]),
        "a dragon's hoard",
    );
    assert!(reward.success);

    let status = economy.get_agent_wealth_status(mira).unwrap();
    assert_eq!(status.total_wealth, Decimal::MAX);
    assert_eq!(status.wealth_class, WealthClass::Rich);
    assert_eq!(status.market_power, dec!(100));
}
